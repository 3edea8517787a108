//! Read-only access to the analytical warehouse holding consumption history.
//!
//! A [`SelectQuery`] describes the single query shape the lookup page issues:
//! a fixed projection, one equality filter and a row limit. Each backend
//! renders it in its own dialect with the filter value bound as a parameter.

pub mod bigquery;
pub mod sqlite;

use async_trait::async_trait;
use contracts::dashboards::d100_consumption_lookup::ConsumptionRow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::shared::config::{resolve_path, WarehouseConfig, WarehouseKind};
use crate::shared::google_auth::GoogleTokenProvider;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("{0}")]
    QueryFailed(String),
}

/// Bound query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    Integer(i64),
}

impl fmt::Display for QueryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParam::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            QueryParam::Integer(i) => write!(f, "{}", i),
        }
    }
}

/// `column = value`; displayed inline, executed with a bound parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: QueryParam,
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    BigQuery,
    Sqlite,
}

/// Name of the single bound parameter in BigQuery standard SQL
pub const SEARCH_PARAM: &str = "search_value";

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub fixed_columns: Vec<String>,
    pub month_columns: Vec<String>,
    pub filter: Filter,
    pub limit: u32,
}

impl SelectQuery {
    /// Render the statement for a backend. The filter value is never inlined.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let (select_clause, table, placeholder) = match dialect {
            Dialect::BigQuery => (
                self.all_columns()
                    .map(|c| format!("`{}`", c))
                    .collect::<Vec<_>>()
                    .join(", "),
                format!("`{}`", self.table),
                format!("@{}", SEARCH_PARAM),
            ),
            Dialect::Sqlite => {
                // Fixed columns read back as text, months as REAL
                let fixed = self
                    .fixed_columns
                    .iter()
                    .map(|c| format!("CAST(`{c}` AS TEXT) AS `{c}`"));
                let months = self
                    .month_columns
                    .iter()
                    .map(|c| format!("CAST(`{c}` AS REAL) AS `{c}`"));
                (
                    fixed.chain(months).collect::<Vec<_>>().join(", "),
                    self.table
                        .split('.')
                        .map(|part| format!("`{}`", part))
                        .collect::<Vec<_>>()
                        .join("."),
                    "?".to_string(),
                )
            }
        };

        format!(
            "SELECT {} FROM {} WHERE `{}` = {} LIMIT {}",
            select_clause, table, self.filter.column, placeholder, self.limit
        )
    }

    pub fn all_columns(&self) -> impl Iterator<Item = &String> {
        self.fixed_columns.iter().chain(self.month_columns.iter())
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self
            .all_columns()
            .map(|c| format!("`{}`", c))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "SELECT {} FROM `{}` WHERE {} LIMIT {}",
            columns, self.table, self.filter, self.limit
        )
    }
}

/// Backend capable of running a [`SelectQuery`]
#[async_trait]
pub trait Warehouse: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the query and return rows aligned with the query's column lists
    async fn fetch(&self, query: &SelectQuery) -> Result<Vec<ConsumptionRow>, WarehouseError>;
}

/// Build the configured backend once; the handle is shared for the process lifetime
pub async fn connect(
    config: &WarehouseConfig,
    google: Option<Arc<GoogleTokenProvider>>,
) -> anyhow::Result<Arc<dyn Warehouse>> {
    match config.backend {
        WarehouseKind::Bigquery => {
            let bq = config
                .bigquery
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("[warehouse.bigquery] section is missing"))?;
            let auth = google
                .ok_or_else(|| anyhow::anyhow!("BigQuery requires Google service-account credentials"))?;
            let warehouse = bigquery::BigQueryWarehouse::new(bq, config.timeout_secs, auth)?;
            tracing::info!("Warehouse: BigQuery project {}", bq.project_id);
            Ok(Arc::new(warehouse))
        }
        WarehouseKind::Sqlite => {
            let sqlite = config
                .sqlite
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("[warehouse.sqlite] section is missing"))?;
            let path = resolve_path(&sqlite.path);
            let warehouse = sqlite::SqliteWarehouse::open(&path, config.timeout_secs).await?;
            tracing::info!("Warehouse: SQLite replica at {}", path.display());
            Ok(Arc::new(warehouse))
        }
    }
}
