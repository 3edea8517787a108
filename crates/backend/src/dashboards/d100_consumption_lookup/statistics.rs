use contracts::dashboards::d100_consumption_lookup::{ColumnSummary, ConsumptionTable};

/// Descriptive statistics per month column, nulls ignored
pub fn summarize(table: &ConsumptionTable) -> Vec<ColumnSummary> {
    table
        .month_columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let values: Vec<f64> = table
                .rows
                .iter()
                .filter_map(|row| row.months.get(i).copied().flatten())
                .filter(|v| !v.is_nan())
                .collect();
            describe(column, values)
        })
        .collect()
}

fn describe(column: &str, mut values: Vec<f64>) -> ColumnSummary {
    values.sort_by(|a, b| a.total_cmp(b));
    let count = values.len();

    if count == 0 {
        return ColumnSummary {
            column: column.to_string(),
            count,
            mean: None,
            std: None,
            min: None,
            p25: None,
            p50: None,
            p75: None,
            max: None,
        };
    }

    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    // Sample standard deviation (n - 1)
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    } else {
        None
    };

    ColumnSummary {
        column: column.to_string(),
        count,
        mean: Some(mean),
        std,
        min: values.first().copied(),
        p25: Some(quantile(&values, 0.25)),
        p50: Some(quantile(&values, 0.50)),
        p75: Some(quantile(&values, 0.75)),
        max: values.last().copied(),
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
