use argon2::{Argon2, PasswordHash, PasswordVerifier};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::shared::config::{AuthConfig, VerificationKind};
use crate::system::users::UserRecord;

const DEFAULT_SALT: &str = "default_salt";

/// How a presented secret is checked against a user record.
/// Chosen once per deployment.
#[derive(Debug, Clone)]
pub enum Verifier {
    /// Access code = first `length` hex chars of SHA-256(seed + salt);
    /// the seed is the record's credential, or its username when it has none
    SaltedDigest { salt: String, length: usize },
    /// The record carries the hash: an argon2 PHC string or a hex SHA-256 digest
    PreHashed,
}

impl Verifier {
    pub fn from_config(config: &AuthConfig) -> Self {
        match config.strategy {
            VerificationKind::SaltedDigest => {
                let salt = config.salt.clone().unwrap_or_else(|| {
                    tracing::warn!("No password salt configured, using the default salt");
                    DEFAULT_SALT.to_string()
                });
                Verifier::SaltedDigest {
                    salt,
                    length: config.digest_length,
                }
            }
            VerificationKind::PreHashed => Verifier::PreHashed,
        }
    }

    pub fn verify(&self, user: &UserRecord, presented: &str) -> bool {
        match self {
            Verifier::SaltedDigest { salt, length } => {
                let seed = user.credential.as_deref().unwrap_or(&user.username);
                let expected = salted_digest(seed, salt, *length);
                constant_time_eq(expected.as_bytes(), presented.trim().as_bytes())
            }
            Verifier::PreHashed => match user.credential.as_deref() {
                Some(stored) => verify_pre_hashed(stored, presented),
                None => false,
            },
        }
    }
}

/// Hex SHA-256 of `seed + salt`, truncated to `length` characters
pub fn salted_digest(seed: &str, salt: &str, length: usize) -> String {
    let mut digest = sha256_hex(&format!("{}{}", seed, salt));
    digest.truncate(length);
    digest
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn verify_pre_hashed(stored: &str, presented: &str) -> bool {
    let stored = stored.trim();

    if stored.starts_with("$argon2") {
        return match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(presented.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Unparseable argon2 hash in user source: {}", e);
                false
            }
        };
    }

    let presented_hash = sha256_hex(presented);
    constant_time_eq(
        presented_hash.as_bytes(),
        stored.to_ascii_lowercase().as_bytes(),
    )
}

/// Length mismatch returns early; digests compared here have fixed lengths
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use contracts::system::users::Role;

    fn user(username: &str, credential: Option<&str>) -> UserRecord {
        UserRecord {
            username: username.to_string(),
            display_name: "Ana Quispe".to_string(),
            credential: credential.map(|c| c.to_string()),
            role: Role::Analista,
        }
    }

    fn salted() -> Verifier {
        Verifier::SaltedDigest {
            salt: "pepper".to_string(),
            length: 8,
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"ba7816bf", b"ba7816bf"));
        assert!(!constant_time_eq(b"ba7816bf", b"ba7816be"));
        assert!(!constant_time_eq(b"ba7816bf", b"ba7816"));
        assert!(!constant_time_eq(b"", b"a"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_salted_digest_is_truncated_sha256() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(salted_digest("a", "bc", 8), "ba7816bf");
        assert_eq!(salted_digest("ab", "c", 16), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_salted_digest_seeds_from_username() {
        let code = salted_digest("40123456", "pepper", 8);
        let verifier = salted();

        assert!(verifier.verify(&user("40123456", None), &code));
        assert!(verifier.verify(&user("40123456", None), &format!(" {} ", code)));
        assert!(!verifier.verify(&user("40123457", None), &code));
        assert!(!verifier.verify(&user("40123456", None), "40123456"));
    }

    #[test]
    fn test_salted_digest_prefers_credential_seed() {
        let code = salted_digest("semilla", "pepper", 8);
        assert!(salted().verify(&user("40123456", Some("semilla")), &code));
    }

    #[test]
    fn test_pre_hashed_sha256() {
        // sha256("abc")
        let stored = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        assert!(Verifier::PreHashed.verify(&user("1", Some(stored)), "abc"));
        assert!(!Verifier::PreHashed.verify(&user("1", Some(stored)), "abd"));
        assert!(!Verifier::PreHashed.verify(&user("1", None), "abc"));
    }

    #[test]
    fn test_pre_hashed_argon2() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"clave-segura", &salt)
            .unwrap()
            .to_string();

        assert!(Verifier::PreHashed.verify(&user("1", Some(&hash)), "clave-segura"));
        assert!(!Verifier::PreHashed.verify(&user("1", Some(&hash)), "otra"));
        assert!(!Verifier::PreHashed.verify(&user("1", Some("$argon2id$broken")), "otra"));
    }
}
