//! Optional smoothing of per-frame feature ratios.
//!
//! Landmark jitter makes single-frame ratios noisy. Each feature can be
//! passed through a small scalar filter before classification; by
//! default no smoothing is applied.

/// Moving average filter for simple smoothing
pub mod moving_average;

/// Median filter for outlier rejection
pub mod median;

/// Exponential filter for responsive smoothing
pub mod exponential;

use crate::{geometry::FeatureVector, Error, Result};

/// Trait for scalar feature filters
pub trait FeatureFilter: Send + Sync {
    /// Feed one sample and return the smoothed value
    fn apply(&mut self, value: f64) -> f64;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes values through unchanged
pub struct NoFilter;

impl FeatureFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        value
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

fn parse_param<T: std::str::FromStr>(spec: &str, raw: Option<&str>, default: T) -> Result<T> {
    raw.map_or(Ok(default), |raw| {
        raw.parse().map_err(|_| {
            Error::FilterError(format!("Invalid parameter '{raw}' in filter spec '{spec}'"))
        })
    })
}

/// Create a filter from a spec such as `none`, `moving_average:5`,
/// `median:5` or `exponential:0.5`.
///
/// # Errors
///
/// Returns [`Error::FilterError`] for unknown names and out-of-range
/// parameters.
pub fn create_filter(spec: &str) -> Result<Box<dyn FeatureFilter>> {
    let lowered = spec.trim().to_lowercase();
    let mut parts = lowered.split(':');
    let name = parts.next().unwrap_or_default();
    let param = parts.next();
    if parts.next().is_some() {
        return Err(Error::FilterError(format!("Too many parameters in filter spec '{spec}'")));
    }

    match name {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "moving_average" | "movingaverage" => {
            let window = parse_param(spec, param, 5usize)?;
            Ok(Box::new(moving_average::MovingAverageFilter::new(window)?))
        }
        "median" => {
            let window = parse_param(spec, param, 5usize)?;
            Ok(Box::new(median::MedianFilter::new(window)?))
        }
        "exponential" => {
            let alpha = parse_param(spec, param, 0.5f64)?;
            Ok(Box::new(exponential::ExponentialFilter::new(alpha)?))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {spec}"))),
    }
}

/// One filter per feature of a [`FeatureVector`]
pub struct FeatureSmoother {
    filters: [Box<dyn FeatureFilter>; 6],
}

impl FeatureSmoother {
    /// Build a smoother that applies the same filter spec to every feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid.
    pub fn new(spec: &str) -> Result<Self> {
        Ok(Self {
            filters: [
                create_filter(spec)?,
                create_filter(spec)?,
                create_filter(spec)?,
                create_filter(spec)?,
                create_filter(spec)?,
                create_filter(spec)?,
            ],
        })
    }

    /// Smooth one frame of features
    pub fn apply(&mut self, features: &FeatureVector) -> FeatureVector {
        let [ear, ear_left, ear_right, ebr, mar, smile] = &mut self.filters;
        FeatureVector {
            ear: ear.apply(features.ear),
            ear_left: ear_left.apply(features.ear_left),
            ear_right: ear_right.apply(features.ear_right),
            ebr: ebr.apply(features.ebr),
            mar: mar.apply(features.mar),
            smile: smile.apply(features.smile),
        }
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.filters[0].name()
    }
}
