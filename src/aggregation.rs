//! Buckets a filtered view by calendar day into the series the forecast
//! engine consumes.
//!
//! Only days with at least one transaction produce a point; gap days are not
//! zero-filled. The forecast model regresses on calendar-day offsets, so it
//! tolerates the irregular cadence (a zero-filled gap would be wrong for the
//! mean-unit-price series anyway).

use crate::schema::{RevenuePolicy, Transaction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One daily bucket value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-ordered daily buckets, one per observed calendar day.
pub type DailySeries = Vec<DailyPoint>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    Sum,
    Mean,
}

/// Buckets rows by `transaction_date` and reduces `value` within each
/// bucket with `aggregator`.
pub fn daily_series<F>(table: &[Transaction], value: F, aggregator: Aggregator) -> DailySeries
where
    F: Fn(&Transaction) -> f64,
{
    let mut buckets: BTreeMap<NaiveDate, (f64, u64)> = BTreeMap::new();
    for row in table {
        let bucket = buckets.entry(row.transaction_date).or_insert((0.0, 0));
        bucket.0 += value(row);
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(date, (sum, count))| DailyPoint {
            date,
            value: match aggregator {
                Aggregator::Sum => sum,
                Aggregator::Mean => sum / count as f64,
            },
        })
        .collect()
}

/// Daily revenue under the request's policy; the first forecast input.
pub fn daily_revenue(table: &[Transaction], policy: RevenuePolicy) -> DailySeries {
    daily_series(table, |row| policy.row_revenue(row), Aggregator::Sum)
}

/// Daily mean unit price; the second forecast input.
pub fn daily_mean_unit_price(table: &[Transaction]) -> DailySeries {
    daily_series(table, |row| row.unit_price, Aggregator::Mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn row(day: u32, qty: u32, price: f64, category: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            qty,
            price,
            "Item".to_string(),
            "Type".to_string(),
            category.to_string(),
            "Downtown".to_string(),
        )
    }

    #[test]
    fn test_category_a_revenue_series() {
        // The reference scenario filtered to category "A".
        let table = vec![row(1, 2, 10.0, "A"), row(2, 1, 100.0, "A")];
        let series = daily_revenue(&table, RevenuePolicy::UnitPriceSum);

        assert_eq!(
            series,
            vec![
                DailyPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    value: 10.0,
                },
                DailyPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    value: 100.0,
                },
            ]
        );
    }

    #[test]
    fn test_no_points_for_unobserved_days() {
        let table = vec![row(1, 1, 5.0, "A"), row(10, 1, 7.0, "A")];
        let series = daily_revenue(&table, RevenuePolicy::UnitPriceSum);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn test_bucket_sum_round_trip() {
        let table = vec![
            row(1, 2, 10.0, "A"),
            row(1, 5, 4.0, "B"),
            row(2, 1, 100.0, "A"),
            row(5, 3, 2.5, "B"),
        ];
        let series = daily_revenue(&table, RevenuePolicy::UnitPriceSum);
        let bucketed: f64 = series.iter().map(|p| p.value).sum();
        let unbucketed: f64 = table.iter().map(|t| t.unit_price).sum();
        assert!((bucketed - unbucketed).abs() < 1e-9);
    }

    #[test]
    fn test_mean_aggregator() {
        let table = vec![row(1, 1, 4.0, "A"), row(1, 1, 6.0, "A"), row(2, 1, 9.0, "A")];
        let series = daily_mean_unit_price(&table);
        assert_eq!(series[0].value, 5.0);
        assert_eq!(series[1].value, 9.0);
    }

    #[test]
    fn test_empty_table_yields_empty_series() {
        assert!(daily_revenue(&[], RevenuePolicy::UnitPriceSum).is_empty());
    }
}
