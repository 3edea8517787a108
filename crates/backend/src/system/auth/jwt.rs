use chrono::Utc;
use contracts::system::auth::SessionClaims;
use contracts::system::users::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;

use super::{AuthError, SessionContext};
use crate::shared::config::CookieConfig;

/// Signs and checks session tokens; the token travels in the session cookie
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    cookie_name: String,
    lifetime: chrono::Duration,
}

impl SessionKeys {
    pub fn from_config(cookie: &CookieConfig) -> Self {
        let secret = match &cookie.key {
            Some(key) if !key.trim().is_empty() => key.clone(),
            _ => {
                tracing::warn!("No cookie key configured; sessions will not survive a restart");
                generate_secret()
            }
        };

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            cookie_name: cookie.name.clone(),
            lifetime: chrono::Duration::days(cookie.expiry_days),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Issue a signed token for an authenticated session
    pub fn issue(&self, session: &SessionContext) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: session.username.clone(),
            name: session.display_name.clone(),
            role: session.role.to_string(),
            sid: uuid::Uuid::new_v4().to_string(),
            exp: (now + self.lifetime).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Validate token signature and expiry and rebuild the session
    pub fn validate(&self, token: &str) -> Result<SessionContext, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AuthError::Unauthenticated)?;

        Ok(SessionContext {
            username: data.claims.sub,
            display_name: data.claims.name,
            role: Role::parse(&data.claims.role),
        })
    }

    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            token,
            self.lifetime.num_seconds()
        )
    }

    pub fn expired_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        )
    }
}

/// Generate a cryptographically secure signing key (256 bits)
fn generate_secret() -> String {
    use base64::{engine::general_purpose, Engine as _};
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    general_purpose::STANDARD.encode(&random_bytes)
}
