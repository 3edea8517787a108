use std::sync::Arc;

use contracts::dashboards::d100_consumption_lookup::{
    ConsumptionTable, LookupResponse, LookupStatus, QueryRequest, SearchMode, SearchValue,
};

use super::query::{self, LookupError, QuerySettings};
use super::series::time_series;
use super::statistics::summarize;
use crate::shared::format::format_number;
use crate::shared::warehouse::{SelectQuery, Warehouse};
use crate::system::auth::SessionContext;

pub const NO_ROWS_MESSAGE: &str = "No se encontraron resultados para la búsqueda";

/// Result of running a lookup; an empty result is not an error
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    NoRows,
    Rows(ConsumptionTable),
}

pub struct LookupService {
    warehouse: Arc<dyn Warehouse>,
    settings: QuerySettings,
}

impl LookupService {
    pub fn new(warehouse: Arc<dyn Warehouse>, settings: QuerySettings) -> Self {
        Self {
            warehouse,
            settings,
        }
    }

    pub fn build_query(
        &self,
        mode: SearchMode,
        value: Option<&SearchValue>,
        session: &SessionContext,
    ) -> Result<SelectQuery, LookupError> {
        query::build_query(&self.settings, mode, value, &session.role)
    }

    /// Run one query against the warehouse, awaited, no retries
    pub async fn execute(&self, query: &SelectQuery) -> Result<LookupOutcome, LookupError> {
        let start = std::time::Instant::now();
        tracing::info!("D100 query ({}): {}", self.warehouse.name(), query);

        let rows = self.warehouse.fetch(query).await.map_err(|e| {
            tracing::error!("D100 query failed: {}", e);
            LookupError::from(e)
        })?;

        tracing::info!(
            "D100 query returned {} rows in {}ms",
            rows.len(),
            start.elapsed().as_millis()
        );

        if rows.is_empty() {
            return Ok(LookupOutcome::NoRows);
        }

        Ok(LookupOutcome::Rows(ConsumptionTable {
            fixed_columns: query.fixed_columns.clone(),
            month_columns: query.month_columns.clone(),
            rows,
        }))
    }

    /// Full page flow: build, execute, then statistics and the single-account series
    pub async fn lookup(
        &self,
        session: &SessionContext,
        request: &QueryRequest,
    ) -> Result<LookupResponse, LookupError> {
        let query = self.build_query(
            request.search_mode,
            request.search_value.as_ref(),
            session,
        )?;

        match self.execute(&query).await? {
            LookupOutcome::NoRows => Ok(LookupResponse {
                status: LookupStatus::NoRows,
                message: NO_ROWS_MESSAGE.to_string(),
                table: None,
                statistics: Vec::new(),
                series: None,
            }),
            LookupOutcome::Rows(table) => {
                let statistics = summarize(&table);
                let series = time_series(&table, request.search_mode);
                Ok(LookupResponse {
                    status: LookupStatus::Ok,
                    message: format!(
                        "Datos obtenidos correctamente. {} registros encontrados.",
                        format_number(table.len())
                    ),
                    table: Some(table),
                    statistics,
                    series,
                })
            }
        }
    }
}
