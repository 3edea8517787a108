use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Number of month columns every consumption row carries
pub const MONTH_WINDOW: usize = 13;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cookie: CookieConfig,
    pub warehouse: WarehouseConfig,
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub google: Option<GoogleConfig>,
}

/// Service-account credentials shared by the Sheets and BigQuery clients
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GoogleConfig {
    /// Path to the service-account JSON key
    #[serde(default)]
    pub credentials_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserSourceKind {
    Sheets,
    Embedded,
    File,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    /// Access code = truncated SHA-256 of (seed + salt)
    SaltedDigest,
    /// The source carries the password hash
    PreHashed,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub source: UserSourceKind,
    pub strategy: VerificationKind,
    #[serde(default)]
    pub salt: Option<String>,
    #[serde(default = "default_digest_length")]
    pub digest_length: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub sheets: Option<SheetsConfig>,
    #[serde(default)]
    pub file: Option<UserFileConfig>,
    #[serde(default)]
    pub users: Vec<EmbeddedUser>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_sheets_range")]
    pub range: String,
    #[serde(default = "default_sheets_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserFileConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddedUser {
    pub role: String,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub credential: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    /// Signing key; a random one is generated at startup when absent
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            key: None,
            expiry_days: default_expiry_days(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseKind {
    Bigquery,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    pub backend: WarehouseKind,
    pub table: String,
    #[serde(default = "default_row_limit")]
    pub row_limit: u32,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub bigquery: Option<BigQueryConfig>,
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BigQueryConfig {
    pub project_id: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_bigquery_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SqliteConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ColumnsConfig {
    pub fixed_columns: Vec<String>,
    pub month_columns: Vec<String>,
    #[serde(default = "default_account_column")]
    pub account_column: String,
    #[serde(default = "default_sed_column")]
    pub sed_column: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_digest_length() -> usize {
    8
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_sheets_range() -> String {
    "USERS!A2:D".to_string()
}

fn default_sheets_endpoint() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_cookie_name() -> String {
    "maestro_session".to_string()
}

fn default_expiry_days() -> i64 {
    30
}

fn default_row_limit() -> u32 {
    10_000
}

fn default_bigquery_endpoint() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}

fn default_account_column() -> String {
    "Cuenta".to_string()
}

fn default_sed_column() -> String {
    "SED".to_string()
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[auth]
source = "file"
strategy = "salted_digest"

[auth.file]
path = "users.csv"

[warehouse]
backend = "sqlite"
table = "maestros_acumulados_actualizados"

[warehouse.sqlite]
path = "target/db/warehouse.db"

[columns]
fixed_columns = ["Cuenta", "Nombre", "Direccion", "SED", "Tarifa"]
month_columns = [
    "Jun_24", "Jul_24", "Ago_24", "Sep_24", "Oct_24", "Nov_24", "Dic_24",
    "Ene_25", "Feb_25", "Mar_25", "Abr_25", "May_25", "Jun_25",
]
"#;

/// Load configuration from config.toml
///
/// Search order:
/// 1. Path in the MAESTRO_CONFIG environment variable
/// 2. Next to the executable (for production)
/// 3. Falls back to embedded default config
///
/// MAESTRO_PASSWORD_SALT, MAESTRO_COOKIE_KEY and GOOGLE_APPLICATION_CREDENTIALS
/// override the file values.
pub fn load_config() -> anyhow::Result<Config> {
    let mut config = match find_config_file() {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            let contents = std::fs::read_to_string(&path)?;
            parse_config(&contents)?
        }
        None => {
            tracing::info!("Using default embedded configuration");
            parse_config(DEFAULT_CONFIG)?
        }
    };

    if let Ok(salt) = std::env::var("MAESTRO_PASSWORD_SALT") {
        config.auth.salt = Some(salt);
    }
    if let Ok(key) = std::env::var("MAESTRO_COOKIE_KEY") {
        config.cookie.key = Some(key);
    }
    if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
        config.google.get_or_insert_with(GoogleConfig::default).credentials_path = Some(path);
    }

    Ok(config)
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("MAESTRO_CONFIG") {
        return Some(PathBuf::from(path));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }
            tracing::warn!("config.toml not found at: {}", config_path.display());
        }
    }

    None
}

/// Parse and validate a TOML document
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let columns = &self.columns;

        if columns.fixed_columns.is_empty() {
            anyhow::bail!("columns.fixed_columns must not be empty");
        }
        if columns.month_columns.len() != MONTH_WINDOW {
            anyhow::bail!(
                "columns.month_columns must list exactly {} months, got {}",
                MONTH_WINDOW,
                columns.month_columns.len()
            );
        }

        let all = columns
            .fixed_columns
            .iter()
            .chain(columns.month_columns.iter())
            .chain([&columns.account_column, &columns.sed_column]);
        for column in all {
            if !is_valid_identifier(column) {
                anyhow::bail!("Invalid column name: {:?}", column);
            }
        }

        if !is_valid_table_name(&self.warehouse.table) {
            anyhow::bail!("Invalid warehouse table: {:?}", self.warehouse.table);
        }
        if self.warehouse.row_limit == 0 {
            anyhow::bail!("warehouse.row_limit must be positive");
        }
        match self.warehouse.backend {
            WarehouseKind::Bigquery if self.warehouse.bigquery.is_none() => {
                anyhow::bail!("warehouse.backend = \"bigquery\" requires [warehouse.bigquery]")
            }
            WarehouseKind::Sqlite if self.warehouse.sqlite.is_none() => {
                anyhow::bail!("warehouse.backend = \"sqlite\" requires [warehouse.sqlite]")
            }
            _ => {}
        }

        if self.auth.digest_length == 0 || self.auth.digest_length > 64 {
            anyhow::bail!("auth.digest_length must be between 1 and 64");
        }
        match self.auth.source {
            UserSourceKind::Sheets if self.auth.sheets.is_none() => {
                anyhow::bail!("auth.source = \"sheets\" requires [auth.sheets]")
            }
            UserSourceKind::File if self.auth.file.is_none() => {
                anyhow::bail!("auth.source = \"file\" requires [auth.file]")
            }
            _ => {}
        }

        if self.cookie.expiry_days <= 0 {
            anyhow::bail!("cookie.expiry_days must be positive");
        }

        Ok(())
    }
}

/// Column names are interpolated into SQL, so only plain identifiers pass
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `project.dataset.table` style names; BigQuery project ids may contain '-'
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Resolves relative paths relative to the executable directory
pub fn resolve_path(path_str: &str) -> PathBuf {
    let path = Path::new(path_str);

    if path.is_absolute() {
        return path.to_path_buf();
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let resolved = exe_dir.join(path);
            if resolved.exists() {
                return resolved;
            }
        }
    }

    // Fallback: relative to current directory
    PathBuf::from(path_str)
}
