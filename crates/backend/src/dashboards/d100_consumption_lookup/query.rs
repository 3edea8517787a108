use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use contracts::dashboards::d100_consumption_lookup::{SearchMode, SearchValue};
use contracts::shared::message::ApiMessage;
use contracts::system::users::Role;
use thiserror::Error;

use crate::shared::config::Config;
use crate::shared::errors::message_response;
use crate::shared::warehouse::{Filter, QueryParam, SelectQuery, WarehouseError};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Por favor ingrese un valor para buscar")]
    EmptySearchValue,

    #[error("El rol {role} no puede buscar por {mode}")]
    ModeNotPermitted { mode: SearchMode, role: Role },

    #[error("Número de suministro inválido: {0}")]
    InvalidSearchValue(String),

    #[error("Error al ejecutar la consulta: {0}")]
    Warehouse(#[from] WarehouseError),
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match &self {
            LookupError::EmptySearchValue | LookupError::InvalidSearchValue(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            LookupError::ModeNotPermitted { .. } => StatusCode::FORBIDDEN,
            LookupError::Warehouse(_) => StatusCode::BAD_GATEWAY,
        };
        let message = match &self {
            LookupError::Warehouse(_) => ApiMessage::error(self.to_string()),
            _ => ApiMessage::warning(self.to_string()),
        };
        message_response(status, message)
    }
}

/// Everything `build_query` needs from configuration
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub table: String,
    pub fixed_columns: Vec<String>,
    pub month_columns: Vec<String>,
    pub account_column: String,
    pub sed_column: String,
    pub row_limit: u32,
}

impl QuerySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            table: config.warehouse.table.clone(),
            fixed_columns: config.columns.fixed_columns.clone(),
            month_columns: config.columns.month_columns.clone(),
            account_column: config.columns.account_column.clone(),
            sed_column: config.columns.sed_column.clone(),
            row_limit: config.warehouse.row_limit,
        }
    }
}

/// Search modes offered to a role: privileged roles get both
pub fn offered_modes(role: &Role) -> Vec<SearchMode> {
    if role.is_privileged() {
        vec![SearchMode::Account, SearchMode::Sed]
    } else {
        vec![SearchMode::Account]
    }
}

/// Build the lookup query for one submission.
///
/// Rejects modes the role may not use and empty values (empty text, zero
/// account) before anything reaches the warehouse.
pub fn build_query(
    settings: &QuerySettings,
    mode: SearchMode,
    value: Option<&SearchValue>,
    role: &Role,
) -> Result<SelectQuery, LookupError> {
    if !offered_modes(role).contains(&mode) {
        return Err(LookupError::ModeNotPermitted {
            mode,
            role: role.clone(),
        });
    }

    let value = value.ok_or(LookupError::EmptySearchValue)?;
    let filter = match mode {
        SearchMode::Account => Filter {
            column: settings.account_column.clone(),
            value: QueryParam::Integer(account_number(value)?),
        },
        SearchMode::Sed => Filter {
            column: settings.sed_column.clone(),
            value: QueryParam::Text(sed_code(value)?),
        },
    };

    Ok(SelectQuery {
        table: settings.table.clone(),
        fixed_columns: settings.fixed_columns.clone(),
        month_columns: settings.month_columns.clone(),
        filter,
        limit: settings.row_limit,
    })
}

fn account_number(value: &SearchValue) -> Result<i64, LookupError> {
    let number = match value {
        SearchValue::Number(n) => *n,
        SearchValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(LookupError::EmptySearchValue);
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| LookupError::InvalidSearchValue(trimmed.to_string()))?
        }
    };

    if number == 0 {
        return Err(LookupError::EmptySearchValue);
    }
    Ok(number)
}

fn sed_code(value: &SearchValue) -> Result<String, LookupError> {
    let code = match value {
        SearchValue::Number(n) => n.to_string(),
        SearchValue::Text(s) => s.trim().to_string(),
    };

    if code.is_empty() {
        return Err(LookupError::EmptySearchValue);
    }
    Ok(code)
}
