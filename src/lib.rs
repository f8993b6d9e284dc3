//! # Sales Insights
//!
//! A library for turning a point-of-sale transaction table into the numbers
//! a business-intelligence dashboard renders: filtered summary metrics,
//! daily revenue and unit-price series, and 30-day seasonal forecasts with
//! uncertainty bands.
//!
//! ## Pipeline
//!
//! Ingestion → filter → { metrics, daily aggregation → forecast }. Every
//! stage is a pure transformation over the table; the only stateful object
//! is the fitted forecast model, which lives inside one `analyze` call. The
//! current filter selection travels as an explicit value, so there is no
//! session state anywhere in the crate.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_insights::*;
//!
//! let table = ingestion::load_workbook(&upload_bytes)?;
//! let selection = FilterSelection::all_from(&table).expect("non-empty upload");
//!
//! match analyze_sales(&table, &selection, &AnalysisOptions::default())? {
//!     AnalysisOutcome::NoData => render_no_data_banner(),
//!     AnalysisOutcome::Report(report) => render(report),
//! }
//! ```

pub mod aggregation;
pub mod error;
pub mod filter;
pub mod forecast;
pub mod ingestion;
pub mod metrics;
pub mod schema;

pub use aggregation::{daily_mean_unit_price, daily_revenue, daily_series, Aggregator, DailyPoint, DailySeries};
pub use error::{Result, SalesInsightsError};
pub use filter::filter;
pub use forecast::{forecast_daily, ForecastPoint, ForecastSeries, SeasonalTrendModel};
pub use ingestion::{load_csv, load_csv_path, load_workbook, REQUIRED_COLUMNS, TRANSACTIONS_SHEET};
pub use metrics::{compute_metrics, DayTotal, GroupTotal, HourTotal, SalesMetrics};
pub use schema::*;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Everything one render cycle needs, computed from one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub metrics: SalesMetrics,
    pub daily_revenue: DailySeries,
    pub daily_unit_price: DailySeries,
    /// `None` when the filtered view has too little history to fit a model;
    /// the presentation layer shows "insufficient history" for that panel.
    pub revenue_forecast: Option<ForecastSeries>,
    pub unit_price_forecast: Option<ForecastSeries>,
}

/// Distinguishes "the filter matched nothing" from an actual report.
///
/// An empty view is user-visible state, not an error, and it short-circuits
/// before any metric or forecast is attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisOutcome {
    NoData,
    Report(SalesReport),
}

pub struct SalesAnalyzer;

impl SalesAnalyzer {
    /// Runs the full pipeline for one request: filter, metrics, daily
    /// aggregation, and both forecasts.
    ///
    /// A fit that fails with [`SalesInsightsError::InsufficientData`]
    /// degrades that panel to `None` instead of failing the request; any
    /// other error propagates.
    pub fn analyze(
        table: &[Transaction],
        selection: &FilterSelection,
        options: &AnalysisOptions,
    ) -> Result<AnalysisOutcome> {
        let view = filter::filter(table, selection);
        if view.is_empty() {
            warn!("Filter selection matched no rows");
            return Ok(AnalysisOutcome::NoData);
        }

        info!(
            "Analyzing {} of {} transactions ({} to {})",
            view.len(),
            table.len(),
            selection.start_date,
            selection.end_date
        );

        let metrics = metrics::compute_metrics(&view, options.revenue_policy)?;

        let daily_revenue = aggregation::daily_revenue(&view, options.revenue_policy);
        let daily_unit_price = aggregation::daily_mean_unit_price(&view);

        let revenue_forecast = fit_or_skip(&daily_revenue, options, "revenue")?;
        let unit_price_forecast = fit_or_skip(&daily_unit_price, options, "unit price")?;

        Ok(AnalysisOutcome::Report(SalesReport {
            metrics,
            daily_revenue,
            daily_unit_price,
            revenue_forecast,
            unit_price_forecast,
        }))
    }
}

/// Free-function alias for [`SalesAnalyzer::analyze`].
pub fn analyze_sales(
    table: &[Transaction],
    selection: &FilterSelection,
    options: &AnalysisOptions,
) -> Result<AnalysisOutcome> {
    SalesAnalyzer::analyze(table, selection, options)
}

fn fit_or_skip(
    series: &DailySeries,
    options: &AnalysisOptions,
    panel: &str,
) -> Result<Option<ForecastSeries>> {
    match forecast::forecast_daily(series, &options.forecast) {
        Ok(forecast) => {
            debug!("Forecasted {} points for the {} panel", forecast.len(), panel);
            Ok(Some(forecast))
        }
        Err(SalesInsightsError::InsufficientData(days)) => {
            warn!(
                "Skipping {} forecast: {} day(s) of history is insufficient",
                panel, days
            );
            Ok(None)
        }
        Err(other) => Err(other),
    }
}
