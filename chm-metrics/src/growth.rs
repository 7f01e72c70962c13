use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::{config::MetricsConfig, extract::SiteRecord, table::nan_as_empty};

// 1970-01-01 counted from 0001-01-01 as day 1
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub height_m: f64,
}

/// Slope and standard error are per year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthRate {
    pub slope_per_year: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub std_error_per_year: f64,
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Fitted(GrowthRate),
    InsufficientData { valid: usize },
    NumericalFailure(String),
}

/// Two observations give NaN p-value and standard error.
pub fn fit(observations: &[Observation], config: &MetricsConfig) -> FitOutcome {
    let points: Vec<(f64, f64)> = observations
        .iter()
        .filter(|o| o.height_m.is_finite())
        .map(|o| (days_since_epoch(o.date), o.height_m))
        .collect();
    if points.len() < 2 {
        return FitOutcome::InsufficientData {
            valid: points.len(),
        };
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    let mut ss_yy = 0.0;
    for &(x, y) in &points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        ss_xx += dx * dx;
        ss_xy += dx * dy;
        ss_yy += dy * dy;
    }
    if ss_xx == 0.0 {
        return FitOutcome::NumericalFailure("all observations share one date".to_string());
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;
    if !(slope.is_finite() && intercept.is_finite()) {
        return FitOutcome::NumericalFailure(format!(
            "non-finite coefficients (slope {slope}, intercept {intercept})"
        ));
    }

    let ss_res: f64 = points
        .iter()
        .map(|&(x, y)| {
            let r = y - (intercept + slope * x);
            r * r
        })
        .sum();
    // NaN when ss_yy is zero
    let r_squared = 1.0 - ss_res / ss_yy;

    let dof = points.len() - 2;
    let (std_error, p_value) = if dof == 0 {
        (f64::NAN, f64::NAN)
    } else {
        let std_error = (ss_res / dof as f64 / ss_xx).sqrt();
        match slope_p_value(slope / std_error, dof) {
            Ok(p) => (std_error, p),
            Err(reason) => return FitOutcome::NumericalFailure(reason),
        }
    };

    FitOutcome::Fitted(GrowthRate {
        slope_per_year: slope * config.days_per_year,
        intercept,
        r_squared,
        p_value,
        std_error_per_year: std_error * config.days_per_year,
        observations: points.len(),
    })
}

fn slope_p_value(t: f64, dof: usize) -> Result<f64, String> {
    if t.is_infinite() {
        return Ok(0.0);
    }
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    let dist = StudentsT::new(0.0, 1.0, dof as f64).map_err(|e| e.to_string())?;
    Ok(2.0 * (1.0 - dist.cdf(t.abs())))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub short_id: String,
    #[serde(with = "nan_as_empty")]
    pub growth_rate_m_per_year: f64,
    #[serde(with = "nan_as_empty")]
    pub intercept: f64,
    #[serde(with = "nan_as_empty")]
    pub r_squared: f64,
    #[serde(with = "nan_as_empty")]
    pub p_value: f64,
    #[serde(with = "nan_as_empty")]
    pub std_error_m_per_year: f64,
}

impl GrowthRecord {
    pub fn missing(short_id: &str) -> Self {
        Self {
            short_id: short_id.to_string(),
            growth_rate_m_per_year: f64::NAN,
            intercept: f64::NAN,
            r_squared: f64::NAN,
            p_value: f64::NAN,
            std_error_m_per_year: f64::NAN,
        }
    }

    fn fitted(short_id: &str, rate: &GrowthRate) -> Self {
        Self {
            short_id: short_id.to_string(),
            growth_rate_m_per_year: rate.slope_per_year,
            intercept: rate.intercept,
            r_squared: rate.r_squared,
            p_value: rate.p_value,
            std_error_m_per_year: rate.std_error_per_year,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthFilter {
    pub exclude_veg_type: Option<String>,
    pub before_year: Option<i32>,
    pub min_area_m2: Option<f64>,
}

impl Default for GrowthFilter {
    fn default() -> Self {
        Self {
            exclude_veg_type: Some("pasture".to_string()),
            before_year: Some(2021),
            min_area_m2: Some(10_000.0),
        }
    }
}

impl GrowthFilter {
    pub fn none() -> Self {
        Self {
            exclude_veg_type: None,
            before_year: None,
            min_area_m2: None,
        }
    }

    pub fn accepts(&self, record: &SiteRecord) -> bool {
        let veg_ok = match &self.exclude_veg_type {
            Some(excluded) => record.veg_type.as_ref().is_some_and(|v| v != excluded),
            None => true,
        };
        let year_ok = match self.before_year {
            Some(before) => record.rehab_year.is_some_and(|y| y < before),
            None => true,
        };
        let area_ok = match self.min_area_m2 {
            Some(min) => record.area_m2_from_chm > min,
            None => true,
        };
        veg_ok && year_ok && area_ok
    }
}

pub fn growth_rates(
    records: &[SiteRecord],
    filter: &GrowthFilter,
    config: &MetricsConfig,
) -> Vec<GrowthRecord> {
    let mut sites: BTreeMap<&str, Vec<Observation>> = BTreeMap::new();
    for record in records.iter().filter(|r| filter.accepts(r)) {
        sites
            .entry(record.short_id.as_str())
            .or_default()
            .push(Observation {
                date: record.date,
                height_m: record.p90_height_m,
            });
    }
    log::info!(
        "fitting growth rates for {} sites ({} of {} surveys kept)",
        sites.len(),
        sites.values().map(Vec::len).sum::<usize>(),
        records.len()
    );

    sites
        .into_iter()
        .map(|(short_id, observations)| match fit(&observations, config) {
            FitOutcome::Fitted(rate) => GrowthRecord::fitted(short_id, &rate),
            FitOutcome::InsufficientData { valid } => {
                log::debug!("{short_id}: {valid} valid observations, growth rate left missing");
                GrowthRecord::missing(short_id)
            }
            FitOutcome::NumericalFailure(reason) => {
                log::warn!("{short_id}: regression failed: {reason}");
                GrowthRecord::missing(short_id)
            }
        })
        .collect()
}

/// Sites with a positive growth rate, fastest first.
pub fn rank(records: &[GrowthRecord]) -> Vec<GrowthRecord> {
    let mut ranked: Vec<GrowthRecord> = records
        .iter()
        .filter(|r| r.growth_rate_m_per_year > 0.0)
        .cloned()
        .collect();
    ranked.sort_by(|a, b| b.growth_rate_m_per_year.total_cmp(&a.growth_rate_m_per_year));
    ranked
}
