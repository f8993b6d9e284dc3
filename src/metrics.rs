//! Summary metrics over a filtered view.
//!
//! Every grouped reduction runs over a `BTreeMap`, so ties in max/min
//! reductions always resolve to the smallest key: lexicographic for string
//! keys, numeric for hours, Monday-first for weekdays. That ordering is part
//! of the contract, keeping repeated runs reproducible.

use crate::error::{Result, SalesInsightsError};
use crate::schema::{RevenuePolicy, Transaction};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A grouping key together with its summed quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub day: Weekday,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourTotal {
    pub hour: u32,
    pub quantity: u64,
}

/// The fixed set of facts the dashboard displays for one filtered view.
///
/// Computed fresh per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesMetrics {
    /// Row count of the filtered view.
    pub items_sold: usize,
    /// Revenue under the request's [`RevenuePolicy`].
    pub revenue_total: f64,
    pub max_unit_price: f64,
    pub min_unit_price: f64,
    pub most_sold_product: GroupTotal,
    pub least_sold_product: GroupTotal,
    pub most_sold_type: GroupTotal,
    pub most_sold_category: GroupTotal,
    pub busiest_day: DayTotal,
    pub idlest_day: DayTotal,
    pub busiest_hour: HourTotal,
    /// Top 3 hours ranked by transaction count descending, for the textual
    /// "busiest hours" description. Independent of `busiest_hour`, which
    /// ranks by quantity.
    pub busiest_hours: Vec<u32>,
}

/// Computes every metric in one pass per grouping key.
///
/// Fails with [`SalesInsightsError::EmptyInput`] on a zero-row table; the
/// max/min reductions below are undefined on empty input and are never
/// attempted.
pub fn compute_metrics(table: &[Transaction], policy: RevenuePolicy) -> Result<SalesMetrics> {
    if table.is_empty() {
        return Err(SalesInsightsError::EmptyInput);
    }

    let product_qty = quantity_by(table, |t| t.product_detail.as_str());
    let type_qty = quantity_by(table, |t| t.product_type.as_str());
    let category_qty = quantity_by(table, |t| t.product_category.as_str());

    let mut day_qty: BTreeMap<u32, u64> = BTreeMap::new();
    let mut hour_qty: BTreeMap<u32, u64> = BTreeMap::new();
    let mut hour_count: BTreeMap<u32, u64> = BTreeMap::new();
    for row in table {
        *day_qty
            .entry(row.day_of_week.num_days_from_monday())
            .or_insert(0) += u64::from(row.transaction_qty);
        *hour_qty.entry(row.hour).or_insert(0) += u64::from(row.transaction_qty);
        *hour_count.entry(row.hour).or_insert(0) += 1;
    }

    let (busiest_day_idx, busiest_day_qty) = arg_max(&day_qty);
    let (idlest_day_idx, idlest_day_qty) = arg_min(&day_qty);
    let (busiest_hour, busiest_hour_qty) = arg_max(&hour_qty);

    let (most_product, most_product_qty) = arg_max(&product_qty);
    let (least_product, least_product_qty) = arg_min(&product_qty);
    let (most_type, most_type_qty) = arg_max(&type_qty);
    let (most_category, most_category_qty) = arg_max(&category_qty);

    let revenue_total = table.iter().map(|t| policy.row_revenue(t)).sum();
    let max_unit_price = table.iter().map(|t| t.unit_price).fold(f64::MIN, f64::max);
    let min_unit_price = table.iter().map(|t| t.unit_price).fold(f64::MAX, f64::min);

    Ok(SalesMetrics {
        items_sold: table.len(),
        revenue_total,
        max_unit_price,
        min_unit_price,
        most_sold_product: GroupTotal {
            key: most_product.to_string(),
            quantity: most_product_qty,
        },
        least_sold_product: GroupTotal {
            key: least_product.to_string(),
            quantity: least_product_qty,
        },
        most_sold_type: GroupTotal {
            key: most_type.to_string(),
            quantity: most_type_qty,
        },
        most_sold_category: GroupTotal {
            key: most_category.to_string(),
            quantity: most_category_qty,
        },
        busiest_day: DayTotal {
            day: weekday_from_index(busiest_day_idx),
            quantity: busiest_day_qty,
        },
        idlest_day: DayTotal {
            day: weekday_from_index(idlest_day_idx),
            quantity: idlest_day_qty,
        },
        busiest_hour: HourTotal {
            hour: busiest_hour,
            quantity: busiest_hour_qty,
        },
        busiest_hours: top_hours_by_count(&hour_count, 3),
    })
}

/// Sums `transaction_qty` grouped by `key`.
fn quantity_by<'a, F>(table: &'a [Transaction], key: F) -> BTreeMap<&'a str, u64>
where
    F: Fn(&'a Transaction) -> &'a str,
{
    let mut totals = BTreeMap::new();
    for row in table {
        *totals.entry(key(row)).or_insert(0) += u64::from(row.transaction_qty);
    }
    totals
}

/// First entry with the maximal value. BTreeMap iteration order makes the
/// smallest key win ties.
fn arg_max<K: Copy + Ord>(totals: &BTreeMap<K, u64>) -> (K, u64) {
    let mut best = None;
    for (key, &value) in totals {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((*key, value)),
        }
    }
    // Callers guarantee a non-empty map; compute_metrics rejects empty tables.
    best.unwrap()
}

fn arg_min<K: Copy + Ord>(totals: &BTreeMap<K, u64>) -> (K, u64) {
    let mut best = None;
    for (key, &value) in totals {
        match best {
            Some((_, best_value)) if value >= best_value => {}
            _ => best = Some((*key, value)),
        }
    }
    best.unwrap()
}

fn top_hours_by_count(hour_count: &BTreeMap<u32, u64>, n: usize) -> Vec<u32> {
    let mut ranked: Vec<(u32, u64)> = hour_count.iter().map(|(h, c)| (*h, *c)).collect();
    // Count descending, then lower hour first.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(h, _)| h).collect()
}

fn weekday_from_index(num_days_from_monday: u32) -> Weekday {
    match num_days_from_monday {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn row(
        date: (i32, u32, u32),
        hour: u32,
        qty: u32,
        price: f64,
        detail: &str,
        category: &str,
    ) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            qty,
            price,
            detail.to_string(),
            format!("{} type", category),
            category.to_string(),
            "Downtown".to_string(),
        )
    }

    /// The reference scenario: category "B" (qty 5) beats "A" (qty 3 total),
    /// 3 items sold, unit-price revenue 114.
    fn scenario() -> Vec<Transaction> {
        vec![
            row((2024, 1, 1), 9, 2, 10.0, "Alpha", "A"),
            row((2024, 1, 1), 10, 5, 4.0, "Beta", "B"),
            row((2024, 1, 2), 11, 1, 100.0, "Gamma", "A"),
        ]
    }

    #[test]
    fn test_reference_scenario() {
        let metrics = compute_metrics(&scenario(), RevenuePolicy::UnitPriceSum).unwrap();

        assert_eq!(metrics.items_sold, 3);
        assert_eq!(metrics.revenue_total, 114.0);
        assert_eq!(metrics.max_unit_price, 100.0);
        assert_eq!(metrics.min_unit_price, 4.0);
        assert_eq!(metrics.most_sold_category.key, "B");
        assert_eq!(metrics.most_sold_category.quantity, 5);
        assert_eq!(metrics.most_sold_product.key, "Beta");
        assert_eq!(metrics.least_sold_product.key, "Gamma");
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let err = compute_metrics(&[], RevenuePolicy::UnitPriceSum).unwrap_err();
        assert!(matches!(err, SalesInsightsError::EmptyInput));
    }

    #[test]
    fn test_quantity_conservation() {
        let table = scenario();
        let per_product = quantity_by(&table, |t| t.product_detail.as_str());
        let grouped_total: u64 = per_product.values().sum();
        let table_total: u64 = table.iter().map(|t| u64::from(t.transaction_qty)).sum();
        assert_eq!(grouped_total, table_total);
    }

    #[test]
    fn test_tie_breaks_are_lexicographic() {
        let table = vec![
            row((2024, 1, 1), 9, 3, 5.0, "Zeta", "Z"),
            row((2024, 1, 1), 10, 3, 5.0, "Alpha", "A"),
        ];
        let metrics = compute_metrics(&table, RevenuePolicy::UnitPriceSum).unwrap();
        assert_eq!(metrics.most_sold_product.key, "Alpha");
        assert_eq!(metrics.least_sold_product.key, "Alpha");
    }

    #[test]
    fn test_busiest_and_idlest_day() {
        // 2024-01-01 is a Monday, 2024-01-02 a Tuesday.
        let metrics = compute_metrics(&scenario(), RevenuePolicy::UnitPriceSum).unwrap();
        assert_eq!(metrics.busiest_day.day, Weekday::Mon);
        assert_eq!(metrics.busiest_day.quantity, 7);
        assert_eq!(metrics.idlest_day.day, Weekday::Tue);
        assert_eq!(metrics.idlest_day.quantity, 1);
    }

    #[test]
    fn test_busiest_hours_rank_by_count_not_quantity() {
        let table = vec![
            // Hour 9: two transactions, small quantities.
            row((2024, 1, 1), 9, 1, 5.0, "A", "A"),
            row((2024, 1, 1), 9, 1, 5.0, "B", "A"),
            // Hour 15: one transaction, huge quantity.
            row((2024, 1, 1), 15, 50, 5.0, "C", "A"),
            // Hour 12: one transaction.
            row((2024, 1, 1), 12, 1, 5.0, "D", "A"),
        ];
        let metrics = compute_metrics(&table, RevenuePolicy::UnitPriceSum).unwrap();

        assert_eq!(metrics.busiest_hour.hour, 15);
        assert_eq!(metrics.busiest_hours, vec![9, 12, 15]);
    }

    #[test]
    fn test_revenue_policy_flows_through() {
        let metrics = compute_metrics(&scenario(), RevenuePolicy::QuantityTimesPrice).unwrap();
        assert_eq!(metrics.revenue_total, 2.0 * 10.0 + 5.0 * 4.0 + 100.0);
    }
}
