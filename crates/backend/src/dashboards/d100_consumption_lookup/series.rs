use contracts::dashboards::d100_consumption_lookup::{ConsumptionTable, SearchMode, SeriesPoint};

/// Month-by-month series for the chart; only for a single account match
pub fn time_series(table: &ConsumptionTable, mode: SearchMode) -> Option<Vec<SeriesPoint>> {
    if mode != SearchMode::Account || table.rows.len() != 1 {
        return None;
    }

    let row = &table.rows[0];
    Some(
        table
            .month_columns
            .iter()
            .enumerate()
            .map(|(i, month)| SeriesPoint {
                month: month.clone(),
                value: row.months.get(i).copied().flatten(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::dashboards::d100_consumption_lookup::ConsumptionRow;

    const MONTHS: [&str; 13] = [
        "Jun_24", "Jul_24", "Ago_24", "Sep_24", "Oct_24", "Nov_24", "Dic_24", "Ene_25", "Feb_25",
        "Mar_25", "Abr_25", "May_25", "Jun_25",
    ];

    fn table(rows: usize) -> ConsumptionTable {
        ConsumptionTable {
            fixed_columns: vec!["Cuenta".to_string()],
            month_columns: MONTHS.iter().map(|m| m.to_string()).collect(),
            rows: (0..rows)
                .map(|r| ConsumptionRow {
                    fixed: vec![Some(r.to_string())],
                    months: (0..MONTHS.len()).map(|i| Some(i as f64)).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_single_account_row_gives_13_points_in_order() {
        let series = time_series(&table(1), SearchMode::Account).unwrap();
        assert_eq!(series.len(), 13);
        for (i, point) in series.iter().enumerate() {
            assert_eq!(point.month, MONTHS[i]);
            assert_eq!(point.value, Some(i as f64));
        }
    }

    #[test]
    fn test_no_series_for_many_rows_or_sed() {
        assert!(time_series(&table(2), SearchMode::Account).is_none());
        assert!(time_series(&table(0), SearchMode::Account).is_none());
        assert!(time_series(&table(1), SearchMode::Sed).is_none());
    }
}
