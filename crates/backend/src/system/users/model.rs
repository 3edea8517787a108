use contracts::system::users::Role;
use std::collections::HashSet;

/// One employee as listed in the user source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub display_name: String,
    /// Plain seed or password hash, depending on the verification strategy
    pub credential: Option<String>,
    pub role: Role,
}

/// Turn raw `[role, username, display_name, credential?]` rows into records.
///
/// Short rows and rows without a username are skipped; the first occurrence
/// of a username wins.
pub fn parse_rows(rows: Vec<Vec<String>>) -> Vec<UserRecord> {
    let mut seen = HashSet::new();
    let mut users = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        if row.len() < 3 {
            tracing::warn!("User row {} has {} fields, skipping", index + 1, row.len());
            continue;
        }

        let mut fields = row.into_iter().map(|f| f.trim().to_string());
        let role = fields.next().unwrap_or_default();
        let username = fields.next().unwrap_or_default();
        let display_name = fields.next().unwrap_or_default();
        let credential = fields.next().filter(|c| !c.is_empty());

        if username.is_empty() {
            tracing::warn!("User row {} has an empty username, skipping", index + 1);
            continue;
        }
        if !seen.insert(username.clone()) {
            tracing::warn!("Duplicate username in user source, keeping the first row");
            continue;
        }

        users.push(UserRecord {
            username,
            display_name,
            credential,
            role: Role::parse(&role),
        });
    }

    users
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_parse_rows_skips_short_rows() {
        let users = parse_rows(vec![
            row(&["ANALISTA", "40123456", "Ana Quispe"]),
            row(&["SUPERVISOR", "40999999"]),
            row(&[]),
            row(&["lector", " 41000000 ", "Luis Rojas", "a1b2c3d4"]),
        ]);

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "40123456");
        assert_eq!(users[0].role, Role::Analista);
        assert_eq!(users[0].credential, None);
        assert_eq!(users[1].username, "41000000");
        assert_eq!(users[1].role, Role::Other("lector".to_string()));
        assert_eq!(users[1].credential.as_deref(), Some("a1b2c3d4"));
    }

    #[test]
    fn test_parse_rows_drops_empty_and_duplicate_usernames() {
        let users = parse_rows(vec![
            row(&["ANALISTA", "", "Nadie"]),
            row(&["ANALISTA", "40123456", "Ana Quispe"]),
            row(&["lector", "40123456", "Impostor"]),
        ]);

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name, "Ana Quispe");
    }

    #[test]
    fn test_blank_credential_is_none() {
        let users = parse_rows(vec![row(&["ANALISTA", "1", "Ana", "  "])]);
        assert_eq!(users[0].credential, None);
    }
}
