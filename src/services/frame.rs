// src/services/frame.rs
//
// Alignment and derivation for the macro time series: outer-join the raw
// provider series onto a shared daily index, forward-fill the slower
// (monthly) ones, and compute the derived columns the dashboard reads.
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::models::{CycleSignal, RawSeries, TrendMetric};

pub const POLICY_RATE: &str = "policy_rate";
pub const REPO_RATE: &str = "repo_rate";
pub const HOUSING_SALES: &str = "housing_sales";
pub const FREIGHT_INDEX: &str = "freight_index";
pub const SPREAD_BPS: &str = "spread_bps";

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Date-indexed numeric table. Dates are ascending and unique, and every
/// column holds exactly one value per date once alignment has run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeSeriesTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<Column>,
}

impl TimeSeriesTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }
}

/// Outer-join the raw series onto the union of their dates, forward-fill
/// each column independently, drop the leading rows where any column is
/// still unset, then append `spread_bps = (repo_rate - policy_rate) * 100`.
///
/// An entirely empty input series means the table can never be complete,
/// so the result is an empty table rather than partially-filled rows.
pub fn align_and_derive(raw: &HashMap<String, RawSeries>) -> TimeSeriesTable {
    if raw.is_empty() || raw.values().any(|s| s.is_empty()) {
        return TimeSeriesTable::default();
    }

    let all_dates: BTreeSet<NaiveDate> = raw.values().flat_map(|s| s.keys().copied()).collect();

    // Sorted column order keeps the output deterministic across runs.
    let mut names: Vec<&String> = raw.keys().collect();
    names.sort();

    let mut filled: Vec<(String, Vec<Option<f64>>)> = Vec::with_capacity(names.len());
    for name in names {
        let series = &raw[name];
        let mut last: Option<f64> = None;
        let values = all_dates
            .iter()
            .map(|date| {
                if let Some(v) = series.get(date) {
                    last = Some(*v);
                }
                last
            })
            .collect();
        filled.push((name.clone(), values));
    }

    // First row where every column has an observation behind it.
    let first_complete = (0..all_dates.len())
        .find(|&i| filled.iter().all(|(_, values)| values[i].is_some()));
    let start = match first_complete {
        Some(i) => i,
        None => return TimeSeriesTable::default(),
    };

    let dates: Vec<NaiveDate> = all_dates.into_iter().skip(start).collect();
    let mut columns: Vec<Column> = filled
        .into_iter()
        .map(|(name, values)| Column {
            name,
            values: values
                .into_iter()
                .skip(start)
                .map(|v| v.unwrap_or(f64::NAN))
                .collect(),
        })
        .collect();

    let spread = {
        let policy = columns.iter().find(|c| c.name == POLICY_RATE);
        let repo = columns.iter().find(|c| c.name == REPO_RATE);
        match (policy, repo) {
            (Some(p), Some(r)) => Some(
                r.values
                    .iter()
                    .zip(&p.values)
                    .map(|(repo, policy)| (repo - policy) * 100.0)
                    .collect::<Vec<f64>>(),
            ),
            _ => None,
        }
    };
    if let Some(values) = spread {
        columns.push(Column {
            name: SPREAD_BPS.to_string(),
            values,
        });
    }

    TimeSeriesTable { dates, columns }
}

/// Relative change of `column` versus its value `periods_back` rows earlier.
/// Short history falls back to the earliest row instead of failing; only an
/// empty table, an unknown column, or a zero base yields `None`.
pub fn trend(table: &TimeSeriesTable, column: &str, periods_back: usize) -> Option<f64> {
    let values = table.column(column)?;
    if values.is_empty() {
        return None;
    }
    let idx = values.len().saturating_sub(periods_back).min(values.len() - 1);
    let base = values[idx];
    let latest = *values.last()?;
    if base == 0.0 {
        return None;
    }
    Some(latest / base - 1.0)
}

pub fn trend_metric(
    table: &TimeSeriesTable,
    column: &str,
    periods_back: usize,
) -> Option<TrendMetric> {
    let value = trend(table, column, periods_back)?;
    let latest = *table.column(column)?.last()?;
    Some(TrendMetric {
        column: column.to_string(),
        latest,
        trend: value,
        periods_back,
    })
}

/// Normalize every column to a base-100 index on its first row, for the
/// relative-performance chart. Columns starting at zero (or NaN) are
/// dropped since they cannot be rebased.
pub fn rebase_100(table: &TimeSeriesTable) -> TimeSeriesTable {
    let columns = table
        .columns
        .iter()
        .filter_map(|col| {
            let first = *col.values.first()?;
            if first == 0.0 || first.is_nan() {
                return None;
            }
            Some(Column {
                name: col.name.clone(),
                values: col.values.iter().map(|v| v / first * 100.0).collect(),
            })
        })
        .collect();
    TimeSeriesTable {
        dates: table.dates.clone(),
        columns,
    }
}

/// Aggregate signal over the two leading indicators: both trending down is
/// a contraction warning, one down is mixed, otherwise stable.
pub fn cycle_signal(housing_trend: f64, freight_trend: f64) -> CycleSignal {
    if housing_trend < 0.0 && freight_trend < 0.0 {
        CycleSignal::Contraction
    } else if housing_trend < 0.0 || freight_trend < 0.0 {
        CycleSignal::Mixed
    } else {
        CycleSignal::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily(start: NaiveDate, values: &[f64]) -> RawSeries {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    fn table_of(column: &str, values: &[f64]) -> TimeSeriesTable {
        TimeSeriesTable {
            dates: (0..values.len())
                .map(|i| d(2024, 1, 1) + Duration::days(i as i64))
                .collect(),
            columns: vec![Column {
                name: column.to_string(),
                values: values.to_vec(),
            }],
        }
    }

    #[test]
    fn aligned_index_is_strictly_increasing_and_unique() {
        let start = d(2024, 1, 1);
        let mut raw = HashMap::new();
        raw.insert(POLICY_RATE.to_string(), daily(start, &[1.0, 1.1, 1.2, 1.3]));
        // Overlapping dates from a second source must not duplicate rows.
        raw.insert(
            REPO_RATE.to_string(),
            daily(start + Duration::days(1), &[2.0, 2.1, 2.2]),
        );

        let table = align_and_derive(&raw);
        assert!(!table.is_empty());
        for pair in table.dates.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn empty_input_series_yields_empty_table() {
        let mut raw = HashMap::new();
        raw.insert(POLICY_RATE.to_string(), daily(d(2024, 1, 1), &[1.0, 1.1]));
        raw.insert(REPO_RATE.to_string(), RawSeries::new());

        let table = align_and_derive(&raw);
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 0);
    }

    #[test]
    fn no_input_at_all_yields_empty_table() {
        assert!(align_and_derive(&HashMap::new()).is_empty());
    }

    #[test]
    fn leading_incomplete_rows_are_dropped() {
        let start = d(2024, 1, 1);
        let mut raw = HashMap::new();
        raw.insert(POLICY_RATE.to_string(), daily(start, &[1.0, 1.1, 1.2, 1.3]));
        raw.insert(
            REPO_RATE.to_string(),
            daily(start + Duration::days(2), &[2.0, 2.1]),
        );

        let table = align_and_derive(&raw);
        assert_eq!(table.len(), 2);
        assert_eq!(table.dates[0], start + Duration::days(2));
        assert_eq!(table.column(POLICY_RATE).unwrap(), &[1.2, 1.3]);
    }

    #[test]
    fn spread_matches_rate_difference_rowwise() {
        let start = d(2024, 1, 1);
        let mut raw = HashMap::new();
        raw.insert(POLICY_RATE.to_string(), daily(start, &[5.33; 10]));
        raw.insert(REPO_RATE.to_string(), daily(start, &[5.30; 10]));

        let table = align_and_derive(&raw);
        let spread = table.column(SPREAD_BPS).unwrap();
        assert_eq!(spread.len(), 10);
        for v in spread {
            assert!((v - (-3.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn spread_column_absent_without_both_rates() {
        let mut raw = HashMap::new();
        raw.insert(HOUSING_SALES.to_string(), daily(d(2024, 1, 1), &[1.0, 2.0]));
        let table = align_and_derive(&raw);
        assert!(table.column(SPREAD_BPS).is_none());
    }

    #[test]
    fn monthly_series_forward_fills_across_daily_window() {
        let start = d(2024, 1, 1);
        let mut raw = HashMap::new();
        // One monthly housing print on day 1 of a 30-day daily window.
        raw.insert(
            HOUSING_SALES.to_string(),
            daily(start, &[650_000.0]),
        );
        raw.insert(
            POLICY_RATE.to_string(),
            daily(start, &(0..30).map(|_| 5.0).collect::<Vec<f64>>()),
        );

        let table = align_and_derive(&raw);
        assert_eq!(table.len(), 30);
        for v in table.column(HOUSING_SALES).unwrap() {
            assert_eq!(*v, 650_000.0);
        }
    }

    #[test]
    fn trend_uses_clamped_lookback_index() {
        // 300 rows, 252 back: base row is index 48.
        let mut values: Vec<f64> = vec![1.0; 300];
        values[48] = 2.0;
        *values.last_mut().unwrap() = 3.0;
        let table = table_of(FREIGHT_INDEX, &values);
        let t = trend(&table, FREIGHT_INDEX, 252).unwrap();
        assert!((t - 0.5).abs() < 1e-12);

        // 100 rows, 252 back: falls back to index 0 instead of failing.
        let mut short: Vec<f64> = vec![1.0; 100];
        short[0] = 2.0;
        *short.last_mut().unwrap() = 1.0;
        let table = table_of(FREIGHT_INDEX, &short);
        let t = trend(&table, FREIGHT_INDEX, 252).unwrap();
        assert!((t - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn trend_on_empty_or_unknown_column_is_none() {
        let table = TimeSeriesTable::default();
        assert!(trend(&table, FREIGHT_INDEX, 252).is_none());

        let table = table_of(FREIGHT_INDEX, &[1.0, 2.0]);
        assert!(trend(&table, "nope", 1).is_none());
    }

    #[test]
    fn rebase_starts_every_column_at_100() {
        let table = TimeSeriesTable {
            dates: vec![d(2024, 1, 1), d(2024, 1, 2)],
            columns: vec![
                Column {
                    name: "NVDA".into(),
                    values: vec![500.0, 550.0],
                },
                Column {
                    name: "XLP".into(),
                    values: vec![0.0, 70.0],
                },
            ],
        };
        let rebased = rebase_100(&table);
        // Zero-start column dropped, the other rebased.
        assert_eq!(rebased.columns.len(), 1);
        let values = rebased.column("NVDA").unwrap();
        assert_eq!(values[0], 100.0);
        assert!((values[1] - 110.0).abs() < 1e-9);
    }

    #[test]
    fn cycle_signal_classification() {
        assert_eq!(cycle_signal(0.02, 0.01), CycleSignal::Stable);
        assert_eq!(cycle_signal(-0.02, 0.01), CycleSignal::Mixed);
        assert_eq!(cycle_signal(0.02, -0.01), CycleSignal::Mixed);
        assert_eq!(cycle_signal(-0.02, -0.01), CycleSignal::Contraction);
    }
}
