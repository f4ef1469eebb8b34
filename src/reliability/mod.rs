//! Reliability Estimation Engine
//!
//! Fits each sensor's operating age to a class-level two-parameter Weibull
//! lifetime distribution and derives failure probability, remaining useful
//! life, and a degradation-trend signal from recent history.
//!
//! - `weibull`: the lifetime model (CDF, quantile, MTTF via the gamma function)
//! - `trend`: linear degradation fit with Pearson-based confidence
//! - `estimator`: age estimation, confidence scoring, and the batch analysis run

mod estimator;
mod trend;
mod weibull;

pub use estimator::{AnalysisRunSummary, ReliabilityEstimator, SensorFailure};
pub use trend::fit_degradation_trend;
pub use weibull::WeibullModel;
