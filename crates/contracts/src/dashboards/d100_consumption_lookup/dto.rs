use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Search key kind offered on the lookup page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    /// Lookup by customer account ("Suministro")
    #[serde(rename = "Suministro")]
    Account,
    /// Lookup by distribution point code
    #[serde(rename = "SED")]
    Sed,
}

impl SearchMode {
    pub fn label(&self) -> &'static str {
        match self {
            SearchMode::Account => "Suministro",
            SearchMode::Sed => "SED",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw value typed by the user: a number for accounts, a code for SED
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchValue {
    Number(i64),
    Text(String),
}

/// Largest float that still maps onto an integer exactly
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl<'de> Deserialize<'de> for SearchValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        // Clients serializing through JS numbers may send 500100.0
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => SearchValue::Number(n),
            Raw::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
                SearchValue::Number(f as i64)
            }
            Raw::Float(f) => SearchValue::Text(f.to_string()),
            Raw::Text(s) => SearchValue::Text(s),
        })
    }
}

impl From<i64> for SearchValue {
    fn from(value: i64) -> Self {
        SearchValue::Number(value)
    }
}

impl From<&str> for SearchValue {
    fn from(value: &str) -> Self {
        SearchValue::Text(value.to_string())
    }
}

/// POST /api/d100/lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub search_mode: SearchMode,
    #[serde(default)]
    pub search_value: Option<SearchValue>,
}

/// One warehouse row: identifying columns as text, month columns as numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRow {
    pub fixed: Vec<Option<String>>,
    pub months: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionTable {
    pub fixed_columns: Vec<String>,
    pub month_columns: Vec<String>,
    pub rows: Vec<ConsumptionRow>,
}

impl ConsumptionTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Descriptive statistics of one month column (count, mean, std, min, quartiles, max)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub month: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Ok,
    NoRows,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupResponse {
    pub status: LookupStatus,
    pub message: String,
    pub table: Option<ConsumptionTable>,
    #[serde(default)]
    pub statistics: Vec<ColumnSummary>,
    pub series: Option<Vec<SeriesPoint>>,
}
