use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single point-of-sale transaction row.
///
/// `hour` and `day_of_week` are derived columns, computed once at
/// construction from `transaction_time` and `transaction_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_date: NaiveDate,
    pub transaction_time: NaiveTime,
    pub transaction_qty: u32,
    pub unit_price: f64,
    pub product_detail: String,
    pub product_type: String,
    pub product_category: String,
    pub store_location: String,
    pub hour: u32,
    pub day_of_week: Weekday,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transaction_date: NaiveDate,
        transaction_time: NaiveTime,
        transaction_qty: u32,
        unit_price: f64,
        product_detail: String,
        product_type: String,
        product_category: String,
        store_location: String,
    ) -> Self {
        Self {
            hour: transaction_time.hour(),
            day_of_week: transaction_date.weekday(),
            transaction_date,
            transaction_time,
            transaction_qty,
            unit_price,
            product_detail,
            product_type,
            product_category,
            store_location,
        }
    }
}

/// The request-scoped row table produced by ingestion.
pub type Table = Vec<Transaction>;

/// How a row contributes to "revenue".
///
/// The definition is a per-request policy so that one choice flows
/// uniformly through metrics, daily aggregation, and forecasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenuePolicy {
    /// Sum of `unit_price` alone.
    #[default]
    UnitPriceSum,
    /// Sum of `transaction_qty * unit_price`.
    QuantityTimesPrice,
}

impl RevenuePolicy {
    pub fn row_revenue(&self, row: &Transaction) -> f64 {
        match self {
            RevenuePolicy::UnitPriceSum => row.unit_price,
            RevenuePolicy::QuantityTimesPrice => row.transaction_qty as f64 * row.unit_price,
        }
    }
}

/// The filter the presentation layer builds from its widgets.
///
/// The date range is inclusive on both ends. An empty categorical set
/// matches nothing; "select all" must be expressed as the full available
/// set, which [`FilterSelection::all_from`] builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub store_locations: BTreeSet<String>,
    pub product_categories: BTreeSet<String>,
    pub product_types: BTreeSet<String>,
}

impl FilterSelection {
    /// Builds the selection that matches every row of `table`: the full date
    /// range and the full set of every categorical dimension.
    ///
    /// Returns `None` for an empty table, which has no date range to span.
    pub fn all_from(table: &[Transaction]) -> Option<Self> {
        let start_date = table.iter().map(|t| t.transaction_date).min()?;
        let end_date = table.iter().map(|t| t.transaction_date).max()?;

        Some(Self {
            start_date,
            end_date,
            store_locations: table.iter().map(|t| t.store_location.clone()).collect(),
            product_categories: table.iter().map(|t| t.product_category.clone()).collect(),
            product_types: table.iter().map(|t| t.product_type.clone()).collect(),
        })
    }

    pub fn matches(&self, row: &Transaction) -> bool {
        row.transaction_date >= self.start_date
            && row.transaction_date <= self.end_date
            && self.store_locations.contains(&row.store_location)
            && self.product_categories.contains(&row.product_category)
            && self.product_types.contains(&row.product_type)
    }
}

/// Request-level forecast configuration.
///
/// Seasonal components are switched on explicitly, never inferred from the
/// data. An intra-day component is unidentifiable on day-bucketed series,
/// so the sub-yearly component offered here is weekly (day-of-week).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOptions {
    /// Number of future days to predict beyond the observed history.
    pub horizon_days: u32,
    /// Month-of-year seasonal component.
    pub yearly_seasonality: bool,
    /// Day-of-week seasonal component.
    pub weekly_seasonality: bool,
    /// Width of the uncertainty band, e.g. 0.80 for an 80% interval.
    pub interval_width: f64,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            yearly_seasonality: true,
            weekly_seasonality: true,
            interval_width: 0.80,
        }
    }
}

/// Everything one analysis request needs beyond the table and the filter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub revenue_policy: RevenuePolicy,
    pub forecast: ForecastOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: (i32, u32, u32), location: &str, category: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            1,
            5.0,
            "Latte".to_string(),
            "Drink".to_string(),
            category.to_string(),
            location.to_string(),
        )
    }

    #[test]
    fn test_derived_fields() {
        let t = Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), // a Monday
            NaiveTime::from_hms_opt(14, 45, 10).unwrap(),
            3,
            2.5,
            "Espresso".to_string(),
            "Drink".to_string(),
            "Coffee".to_string(),
            "Downtown".to_string(),
        );
        assert_eq!(t.hour, 14);
        assert_eq!(t.day_of_week, Weekday::Mon);
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let t = row((2024, 1, 1), "Downtown", "Coffee");
        let mut selection = FilterSelection::all_from(std::slice::from_ref(&t)).unwrap();
        assert!(selection.matches(&t));

        selection.product_categories.clear();
        assert!(!selection.matches(&t));
    }

    #[test]
    fn test_all_from_spans_every_dimension() {
        let table = vec![
            row((2024, 1, 3), "Downtown", "Coffee"),
            row((2024, 1, 1), "Uptown", "Tea"),
            row((2024, 1, 2), "Downtown", "Bakery"),
        ];
        let selection = FilterSelection::all_from(&table).unwrap();

        assert_eq!(selection.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(selection.end_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(selection.store_locations.len(), 2);
        assert_eq!(selection.product_categories.len(), 3);
        assert!(table.iter().all(|t| selection.matches(t)));
    }

    #[test]
    fn test_all_from_empty_table() {
        assert!(FilterSelection::all_from(&[]).is_none());
    }

    #[test]
    fn test_revenue_policy() {
        let mut t = row((2024, 1, 1), "Downtown", "Coffee");
        t.transaction_qty = 4;
        t.unit_price = 2.5;

        assert_eq!(RevenuePolicy::UnitPriceSum.row_revenue(&t), 2.5);
        assert_eq!(RevenuePolicy::QuantityTimesPrice.row_revenue(&t), 10.0);
    }

    #[test]
    fn test_serialization_round_trip() {
        let t = row((2024, 1, 1), "Downtown", "Coffee");
        let json = serde_json::to_string(&t).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
