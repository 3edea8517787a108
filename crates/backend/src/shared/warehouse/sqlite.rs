use async_trait::async_trait;
use contracts::dashboards::d100_consumption_lookup::ConsumptionRow;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;

use super::{Dialect, QueryParam, SelectQuery, Warehouse, WarehouseError};

/// Local SQLite replica of the warehouse table; the file must already exist.
/// Opened read-only: lookups never write.
pub struct SqliteWarehouse {
    conn: DatabaseConnection,
    timeout: Duration,
}

impl SqliteWarehouse {
    pub async fn open(db_file: &Path, timeout_secs: u64) -> anyhow::Result<Self> {
        if !db_file.exists() {
            anyhow::bail!("warehouse database not found: {}", db_file.display());
        }
        let conn = Database::connect(&sqlite_url(db_file, "ro")?).await?;
        Ok(Self::from_connection(conn, timeout_secs))
    }

    pub fn from_connection(conn: DatabaseConnection, timeout_secs: u64) -> Self {
        Self {
            conn,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// `sqlite://` URL for a file path; Windows drive letters get a leading slash
pub fn sqlite_url(db_file: &Path, mode: &str) -> anyhow::Result<String> {
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    Ok(format!("sqlite://{}{}?mode={}", prefix, normalized, mode))
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch(&self, query: &SelectQuery) -> Result<Vec<ConsumptionRow>, WarehouseError> {
        let sql = query.to_sql(Dialect::Sqlite);
        let value: sea_orm::Value = match &query.filter.value {
            QueryParam::Text(s) => s.clone().into(),
            QueryParam::Integer(i) => (*i).into(),
        };
        let stmt = Statement::from_sql_and_values(DatabaseBackend::Sqlite, &sql, [value]);

        let rows = tokio::time::timeout(self.timeout, self.conn.query_all(stmt))
            .await
            .map_err(|_| {
                WarehouseError::QueryFailed(format!(
                    "query timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| WarehouseError::QueryFailed(e.to_string()))?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let mut fixed = Vec::with_capacity(query.fixed_columns.len());
            for column in &query.fixed_columns {
                let value: Option<String> = row
                    .try_get("", column)
                    .map_err(|e| WarehouseError::QueryFailed(e.to_string()))?;
                fixed.push(value);
            }

            let mut months = Vec::with_capacity(query.month_columns.len());
            for column in &query.month_columns {
                let value: Option<f64> = row
                    .try_get("", column)
                    .map_err(|e| WarehouseError::QueryFailed(e.to_string()))?;
                months.push(value);
            }

            result.push(ConsumptionRow { fixed, months });
        }

        Ok(result)
    }
}
