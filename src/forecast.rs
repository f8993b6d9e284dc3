//! Seasonal trend forecasting over a daily series.
//!
//! The model is deliberately closed-form: a least-squares linear trend over
//! calendar-day offsets, optional day-of-week and month-of-year seasonal
//! indices estimated from the trend residuals, and an uncertainty band from
//! the residual standard deviation. One pass over the history fits it, so
//! an oversized upload cannot stall a request the way an iterative fit can.
//!
//! The model lives for one request: fit, predict, drop.

use crate::aggregation::DailyPoint;
use crate::error::{Result, SalesInsightsError};
use crate::schema::ForecastOptions;
use chrono::{Datelike, Days, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;

/// One forecast value with its uncertainty band.
///
/// Invariant: `lower <= estimate <= upper`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Every observed history date plus the future horizon, date-ordered.
pub type ForecastSeries = Vec<ForecastPoint>;

/// A trend-plus-seasonality model fitted to one daily series.
#[derive(Debug, Clone)]
pub struct SeasonalTrendModel {
    origin: NaiveDate,
    history: Vec<NaiveDate>,
    intercept: f64,
    slope: f64,
    weekly: Option<[f64; 7]>,
    yearly: Option<[f64; 12]>,
    sigma: f64,
    z: f64,
}

impl SeasonalTrendModel {
    /// Fits the model to a daily series.
    ///
    /// Needs at least 2 distinct day-buckets; fewer fail with
    /// [`SalesInsightsError::InsufficientData`]. Seasonal components are
    /// estimated only when the corresponding option flag is set, never
    /// inferred from the data.
    pub fn fit(series: &[DailyPoint], options: &ForecastOptions) -> Result<Self> {
        if !(options.interval_width > 0.0 && options.interval_width < 1.0) {
            return Err(SalesInsightsError::InvalidIntervalWidth(
                options.interval_width,
            ));
        }

        // Collapse duplicate dates defensively; callers normally pass the
        // output of daily bucketing, which is already unique per day.
        let buckets: BTreeMap<NaiveDate, f64> = series
            .iter()
            .filter(|p| p.value.is_finite())
            .map(|p| (p.date, p.value))
            .collect();
        if buckets.len() < 2 {
            return Err(SalesInsightsError::InsufficientData(buckets.len()));
        }

        let origin = *buckets.keys().next().unwrap();
        let history: Vec<NaiveDate> = buckets.keys().copied().collect();
        let points: Vec<(f64, f64)> = buckets
            .iter()
            .map(|(date, value)| ((*date - origin).num_days() as f64, *value))
            .collect();

        let (intercept, slope) = least_squares(&points);

        let mut residuals: Vec<(NaiveDate, f64)> = buckets
            .iter()
            .map(|(date, value)| {
                let x = (*date - origin).num_days() as f64;
                (*date, value - (intercept + slope * x))
            })
            .collect();

        let weekly = options.weekly_seasonality.then(|| {
            let indices = grouped_means(&residuals, |date| {
                date.weekday().num_days_from_monday() as usize
            });
            for (date, residual) in residuals.iter_mut() {
                *residual -= indices[date.weekday().num_days_from_monday() as usize];
            }
            indices
        });

        let yearly = options.yearly_seasonality.then(|| {
            let indices = grouped_means(&residuals, |date| date.month0() as usize);
            for (date, residual) in residuals.iter_mut() {
                *residual -= indices[date.month0() as usize];
            }
            indices
        });

        let sigma = std_deviation(&residuals);
        let z = Normal::new(0.0, 1.0)
            .unwrap()
            .inverse_cdf(0.5 + options.interval_width / 2.0);

        debug!(
            "Fitted seasonal trend model: {} days of history, slope {:.4}, sigma {:.4}",
            buckets.len(),
            slope,
            sigma
        );

        Ok(Self {
            origin,
            history,
            intercept,
            slope,
            weekly,
            yearly,
            sigma,
            z,
        })
    }

    /// Predicts every observed history date plus `horizon_days` days beyond
    /// the last one.
    ///
    /// The band over the history uses the residual deviation directly; over
    /// the future it widens with the square root of the distance past the
    /// last observation. Bounds are clamped around the estimate, so the
    /// `lower <= estimate <= upper` invariant holds regardless of the
    /// arithmetic above it.
    pub fn predict(&self, horizon_days: u32) -> ForecastSeries {
        let last = *self.history.last().unwrap_or(&self.origin);

        let mut forecast: ForecastSeries = self
            .history
            .iter()
            .map(|date| self.point(*date, self.sigma))
            .collect();

        for offset in 1..=u64::from(horizon_days) {
            let date = last + Days::new(offset);
            let se = self.sigma * (offset as f64).sqrt();
            forecast.push(self.point(date, se));
        }

        forecast
    }

    fn point(&self, date: NaiveDate, se: f64) -> ForecastPoint {
        let estimate = self.estimate_for(date);
        let lower = estimate - self.z * se;
        let upper = estimate + self.z * se;
        ForecastPoint {
            date,
            estimate,
            lower: lower.min(estimate),
            upper: upper.max(estimate),
        }
    }

    fn estimate_for(&self, date: NaiveDate) -> f64 {
        let x = (date - self.origin).num_days() as f64;
        let mut estimate = self.intercept + self.slope * x;
        if let Some(weekly) = &self.weekly {
            estimate += weekly[date.weekday().num_days_from_monday() as usize];
        }
        if let Some(yearly) = &self.yearly {
            estimate += yearly[date.month0() as usize];
        }
        estimate
    }
}

/// Fit-then-predict convenience for one request.
pub fn forecast_daily(series: &[DailyPoint], options: &ForecastOptions) -> Result<ForecastSeries> {
    let model = SeasonalTrendModel::fit(series, options)?;
    Ok(model.predict(options.horizon_days))
}

/// Ordinary least squares over (x, y) pairs with at least 2 distinct x.
fn least_squares(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (x, y) in points {
        cov += (x - mean_x) * (y - mean_y);
        var += (x - mean_x) * (x - mean_x);
    }

    let slope = if var > 0.0 { cov / var } else { 0.0 };
    (mean_y - slope * mean_x, slope)
}

/// Mean residual per group key; groups with no observations stay at 0.0,
/// so unseen weekdays/months contribute nothing to a prediction.
fn grouped_means<const N: usize, F>(residuals: &[(NaiveDate, f64)], key: F) -> [f64; N]
where
    F: Fn(&NaiveDate) -> usize,
{
    let mut sums = [0.0; N];
    let mut counts = [0u32; N];
    for (date, residual) in residuals {
        let idx = key(date);
        sums[idx] += residual;
        counts[idx] += 1;
    }
    let mut means = [0.0; N];
    for i in 0..N {
        if counts[i] > 0 {
            means[i] = sums[i] / counts[i] as f64;
        }
    }
    means
}

fn std_deviation(residuals: &[(NaiveDate, f64)]) -> f64 {
    let n = residuals.len() as f64;
    let mean = residuals.iter().map(|(_, r)| r).sum::<f64>() / n;
    let variance = residuals
        .iter()
        .map(|(_, r)| (r - mean) * (r - mean))
        .sum::<f64>()
        / n;
    variance.sqrt()
}
