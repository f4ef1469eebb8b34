//! Two-parameter Weibull lifetime model (optional location offset)
//!
//! Wraps `statrs` for the distribution itself and the gamma function used
//! by the MTTF formula. The quantile is computed in closed form,
//! t_p = η·(-ln(1-p))^(1/β), which is exact for the Weibull CDF.

use statrs::distribution::{ContinuousCDF, Weibull};
use statrs::function::gamma::gamma;

use crate::config::{ConfigError, LifetimeParameters};

/// Weibull lifetime distribution for one sensor class.
#[derive(Debug, Clone)]
pub struct WeibullModel {
    shape: f64,
    scale: f64,
    location: f64,
    dist: Weibull,
}

impl WeibullModel {
    /// Build a model from validated lifetime parameters.
    ///
    /// Non-positive shape or scale is an invalid configuration; config
    /// validation rejects it at load time, so hitting this error at runtime
    /// indicates parameters that bypassed `RigConfig::validate`.
    pub fn new(params: &LifetimeParameters) -> Result<Self, ConfigError> {
        let dist = Weibull::new(params.shape, params.scale).map_err(|e| {
            ConfigError::Invalid(format!(
                "invalid Weibull parameters (shape {}, scale {}): {e}",
                params.shape, params.scale
            ))
        })?;
        Ok(Self {
            shape: params.shape,
            scale: params.scale,
            location: params.location,
            dist,
        })
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// CDF at the given operating age: the probability the unit has already
    /// failed. Ages below the location offset (and negative ages) map to 0.
    /// Always in [0, 1].
    pub fn failure_probability(&self, age_hours: f64) -> f64 {
        let effective_age = (age_hours - self.location).max(0.0);
        self.dist.cdf(effective_age).clamp(0.0, 1.0)
    }

    /// Survival probability: 1 - failure_probability.
    pub fn reliability(&self, age_hours: f64) -> f64 {
        1.0 - self.failure_probability(age_hours)
    }

    /// Mean time to failure: γ + η·Γ(1 + 1/β), in hours.
    pub fn mttf_hours(&self) -> f64 {
        self.location + self.scale * gamma(1.0 + 1.0 / self.shape)
    }

    /// Age at which cumulative failure probability reaches `p`, in hours.
    /// `p` is clamped away from the endpoints to keep the result finite.
    pub fn quantile(&self, p: f64) -> f64 {
        let p = p.clamp(1e-12, 1.0 - 1e-12);
        self.location + self.scale * (-(1.0 - p).ln()).powf(1.0 / self.shape)
    }
}
