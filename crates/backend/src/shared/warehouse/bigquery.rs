use async_trait::async_trait;
use contracts::dashboards::d100_consumption_lookup::ConsumptionRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::{Dialect, QueryParam, SelectQuery, Warehouse, WarehouseError, SEARCH_PARAM};
use crate::shared::config::BigQueryConfig;
use crate::shared::google_auth::GoogleTokenProvider;

/// HTTP client for the BigQuery `jobs.query` REST endpoint
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    location: Option<String>,
    auth: Arc<GoogleTokenProvider>,
    timeout_secs: u64,
}

impl BigQueryWarehouse {
    pub fn new(
        config: &BigQueryConfig,
        timeout_secs: u64,
        auth: Arc<GoogleTokenProvider>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            // Leave room for BigQuery to answer with jobComplete = false
            .timeout(std::time::Duration::from_secs(timeout_secs + 10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            location: config.location.clone(),
            auth,
            timeout_secs,
        })
    }

    fn query_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.endpoint,
            urlencoding::encode(&self.project_id)
        )
    }

    fn request_body(&self, query: &SelectQuery) -> QueryRequestBody {
        let (param_type, value) = match &query.filter.value {
            QueryParam::Integer(i) => ("INT64", i.to_string()),
            QueryParam::Text(s) => ("STRING", s.clone()),
        };

        QueryRequestBody {
            query: query.to_sql(Dialect::BigQuery),
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: vec![QueryParameter {
                name: SEARCH_PARAM.to_string(),
                parameter_type: ParameterType {
                    r#type: param_type.to_string(),
                },
                parameter_value: ParameterValue { value },
            }],
            timeout_ms: self.timeout_secs * 1000,
            max_results: query.limit,
            location: self.location.clone(),
        }
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    async fn fetch(&self, query: &SelectQuery) -> Result<Vec<ConsumptionRow>, WarehouseError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| WarehouseError::QueryFailed(e.to_string()))?;
        let body = self.request_body(query);

        let response = self
            .client
            .post(self.query_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WarehouseError::QueryFailed(format!(
                        "query timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    WarehouseError::QueryFailed(format!("BigQuery request failed: {}", e))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WarehouseError::QueryFailed(format!("BigQuery response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| text.chars().take(300).collect());
            return Err(WarehouseError::QueryFailed(format!(
                "BigQuery returned {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: QueryResponseBody = serde_json::from_str(&text).map_err(|e| {
            WarehouseError::QueryFailed(format!("unexpected BigQuery response: {}", e))
        })?;

        parse_response(body, query, self.timeout_secs)
    }
}

fn parse_response(
    body: QueryResponseBody,
    query: &SelectQuery,
    timeout_secs: u64,
) -> Result<Vec<ConsumptionRow>, WarehouseError> {
    if let Some(error) = body.errors.first() {
        return Err(WarehouseError::QueryFailed(error.message.clone()));
    }
    if !body.job_complete {
        return Err(WarehouseError::QueryFailed(format!(
            "query timed out after {}s",
            timeout_secs
        )));
    }
    if body.page_token.is_some() {
        tracing::warn!("BigQuery result truncated to the first page");
    }

    // An empty result may come without a schema
    if body.rows.is_empty() {
        return Ok(Vec::new());
    }

    let schema = body.schema.ok_or_else(|| {
        WarehouseError::QueryFailed("BigQuery response has rows but no schema".to_string())
    })?;
    let positions: HashMap<&str, usize> = schema
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.as_str(), i))
        .collect();

    let lookup = |column: &String| -> Result<usize, WarehouseError> {
        positions.get(column.as_str()).copied().ok_or_else(|| {
            WarehouseError::QueryFailed(format!("column {} missing from result", column))
        })
    };
    let fixed_idx = query
        .fixed_columns
        .iter()
        .map(lookup)
        .collect::<Result<Vec<_>, _>>()?;
    let month_idx = query
        .month_columns
        .iter()
        .map(lookup)
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(body.rows.len());
    for row in &body.rows {
        let mut months = Vec::with_capacity(month_idx.len());
        for (&i, column) in month_idx.iter().zip(&query.month_columns) {
            months.push(month_value(row, i, column)?);
        }
        rows.push(ConsumptionRow {
            fixed: fixed_idx.iter().map(|&i| cell_text(row, i)).collect(),
            months,
        });
    }

    Ok(rows)
}

/// Month cells arrive as decimal strings; anything else is bad data, not a gap
fn month_value(row: &TableRow, index: usize, column: &str) -> Result<Option<f64>, WarehouseError> {
    match cell_text(row, index) {
        None => Ok(None),
        Some(text) => text.parse::<f64>().map(Some).map_err(|_| {
            WarehouseError::QueryFailed(format!(
                "non-numeric value {:?} in month column {}",
                text, column
            ))
        }),
    }
}

fn cell_text(row: &TableRow, index: usize) -> Option<String> {
    match row.f.get(index).map(|cell| &cell.v) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequestBody {
    query: String,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<QueryParameter>,
    timeout_ms: u64,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter {
    name: String,
    parameter_type: ParameterType,
    parameter_value: ParameterValue,
}

#[derive(Debug, Serialize)]
struct ParameterType {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ParameterValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponseBody {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    fields: Vec<TableField>,
}

#[derive(Debug, Deserialize)]
struct TableField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorProto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::google_auth::tests::{spawn_google_stub, test_provider};
    use crate::shared::warehouse::Filter;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::atomic::Ordering;

    fn query() -> SelectQuery {
        SelectQuery {
            table: "proj.ds.maestros".to_string(),
            fixed_columns: vec!["Cuenta".to_string(), "SED".to_string()],
            month_columns: vec!["Jun_24".to_string(), "Jul_24".to_string()],
            filter: Filter {
                column: "Cuenta".to_string(),
                value: QueryParam::Integer(500100),
            },
            limit: 10_000,
        }
    }

    fn warehouse() -> BigQueryWarehouse {
        let config = BigQueryConfig {
            project_id: "proj".to_string(),
            location: Some("US".to_string()),
            endpoint: "https://bigquery.googleapis.com/bigquery/v2/".to_string(),
        };
        BigQueryWarehouse::new(&config, 30, test_provider("http://127.0.0.1:9/token")).unwrap()
    }

    async fn jobs_query(
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            == Some("Bearer token-1");
        if !authorized {
            return Err(StatusCode::UNAUTHORIZED);
        }
        assert_eq!(body["parameterMode"], "NAMED");

        Ok(Json(serde_json::json!({
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "Cuenta"}, {"name": "SED"}, {"name": "Jun_24"}, {"name": "Jul_24"}
            ]},
            "rows": [{"f": [{"v": "500100"}, {"v": "X1"}, {"v": "100"}, {"v": "101.5"}]}]
        })))
    }

    #[tokio::test]
    async fn test_fetch_signs_in_once_and_reuses_token() {
        let stub = spawn_google_stub(
            3600,
            Router::new().route("/projects/proj/queries", post(jobs_query)),
        )
        .await;
        let config = BigQueryConfig {
            project_id: "proj".to_string(),
            location: None,
            endpoint: stub.base_url.clone(),
        };
        let warehouse =
            BigQueryWarehouse::new(&config, 30, test_provider(&stub.token_uri)).unwrap();

        for _ in 0..2 {
            let rows = warehouse.fetch(&query()).await.unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].months, vec![Some(100.0), Some(101.5)]);
        }
        assert_eq!(stub.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_failure_is_query_failed() {
        let err = warehouse().fetch(&query()).await.unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_non_numeric_month_cell_fails() {
        let body: QueryResponseBody = serde_json::from_str(
            r#"{
                "jobComplete": true,
                "schema": {"fields": [
                    {"name": "Cuenta"}, {"name": "SED"}, {"name": "Jun_24"}, {"name": "Jul_24"}
                ]},
                "rows": [{"f": [{"v": "500100"}, {"v": "X1"}, {"v": "n/a"}, {"v": null}]}]
            }"#,
        )
        .unwrap();
        let err = parse_response(body, &query(), 30).unwrap_err();
        assert!(err.to_string().contains("Jun_24"));
    }

    #[test]
    fn test_request_body_uses_named_parameter() {
        let body = serde_json::to_value(warehouse().request_body(&query())).unwrap();

        assert_eq!(body["useLegacySql"], false);
        assert_eq!(body["parameterMode"], "NAMED");
        assert_eq!(body["maxResults"], 10_000);
        assert_eq!(body["timeoutMs"], 30_000);
        assert_eq!(body["location"], "US");
        assert_eq!(body["queryParameters"][0]["name"], "search_value");
        assert_eq!(body["queryParameters"][0]["parameterType"]["type"], "INT64");
        assert_eq!(body["queryParameters"][0]["parameterValue"]["value"], "500100");
        assert!(body["query"]
            .as_str()
            .unwrap()
            .ends_with("WHERE `Cuenta` = @search_value LIMIT 10000"));
    }

    #[test]
    fn test_query_url() {
        assert_eq!(
            warehouse().query_url(),
            "https://bigquery.googleapis.com/bigquery/v2/projects/proj/queries"
        );
    }

    #[test]
    fn test_parse_rows_by_schema_name() {
        // Schema order differs from the configured order
        let body: QueryResponseBody = serde_json::from_str(
            r#"{
                "jobComplete": true,
                "schema": {"fields": [
                    {"name": "Jul_24", "type": "FLOAT"},
                    {"name": "SED", "type": "STRING"},
                    {"name": "Cuenta", "type": "INTEGER"},
                    {"name": "Jun_24", "type": "FLOAT"}
                ]},
                "rows": [{"f": [{"v": "12.5"}, {"v": "X1"}, {"v": "500100"}, {"v": null}]}]
            }"#,
        )
        .unwrap();

        let rows = parse_response(body, &query(), 30).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].fixed,
            vec![Some("500100".to_string()), Some("X1".to_string())]
        );
        assert_eq!(rows[0].months, vec![None, Some(12.5)]);
    }

    #[test]
    fn test_incomplete_job_is_a_timeout() {
        let body: QueryResponseBody =
            serde_json::from_str(r#"{"jobComplete": false}"#).unwrap();
        let err = parse_response(body, &query(), 30).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_empty_result_without_schema() {
        let body: QueryResponseBody =
            serde_json::from_str(r#"{"jobComplete": true, "totalRows": "0"}"#).unwrap();
        assert!(parse_response(body, &query(), 30).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column_fails() {
        let body: QueryResponseBody = serde_json::from_str(
            r#"{
                "jobComplete": true,
                "schema": {"fields": [{"name": "Cuenta"}]},
                "rows": [{"f": [{"v": "1"}]}]
            }"#,
        )
        .unwrap();
        let err = parse_response(body, &query(), 30).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
