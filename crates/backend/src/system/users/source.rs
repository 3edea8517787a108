use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use super::file;
use super::model::{parse_rows, UserRecord};
use super::sheets::SheetsSource;
use crate::shared::config::{resolve_path, AuthConfig, EmbeddedUser, UserSourceKind};
use crate::shared::google_auth::GoogleTokenProvider;

#[derive(Debug, Error)]
pub enum UserSourceError {
    #[error("user source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Where the employee list lives. Every variant yields the same raw row shape
/// `[role, username, display_name, credential?]`.
pub enum UserSource {
    Sheets(SheetsSource),
    Embedded(Vec<EmbeddedUser>),
    File(PathBuf),
}

impl UserSource {
    pub fn from_config(
        config: &AuthConfig,
        google: Option<Arc<GoogleTokenProvider>>,
    ) -> anyhow::Result<Self> {
        match config.source {
            UserSourceKind::Sheets => {
                let sheets = config
                    .sheets
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("[auth.sheets] section is missing"))?;
                let auth = google.ok_or_else(|| {
                    anyhow::anyhow!("Sheets user source requires Google service-account credentials")
                })?;
                Ok(UserSource::Sheets(SheetsSource::new(sheets, auth)?))
            }
            UserSourceKind::Embedded => Ok(UserSource::Embedded(config.users.clone())),
            UserSourceKind::File => {
                let file = config
                    .file
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("[auth.file] section is missing"))?;
                Ok(UserSource::File(resolve_path(&file.path)))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            UserSource::Sheets(sheets) => format!("spreadsheet {}", sheets.spreadsheet_id()),
            UserSource::Embedded(users) => format!("embedded config ({} entries)", users.len()),
            UserSource::File(path) => format!("file {}", path.display()),
        }
    }

    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, UserSourceError> {
        match self {
            UserSource::Sheets(sheets) => sheets.fetch_rows().await,
            UserSource::Embedded(users) => Ok(users
                .iter()
                .map(|u| {
                    let mut row = vec![u.role.clone(), u.username.clone(), u.name.clone()];
                    if let Some(credential) = &u.credential {
                        row.push(credential.clone());
                    }
                    row
                })
                .collect()),
            UserSource::File(path) => file::read_rows(path),
        }
    }

    /// Load the whole user list. An empty list counts as unavailable.
    pub async fn resolve_users(&self) -> Result<Vec<UserRecord>, UserSourceError> {
        let rows = self.fetch_rows().await?;
        let total = rows.len();
        let users = parse_rows(rows);

        if users.is_empty() {
            return Err(UserSourceError::SourceUnavailable(format!(
                "no usable users in {}",
                self.describe()
            )));
        }

        tracing::info!(
            "Loaded {} users from {} ({} rows)",
            users.len(),
            self.describe(),
            total
        );
        Ok(users)
    }
}
