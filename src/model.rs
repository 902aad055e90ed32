use crate::data::LapSample;
use crate::error::{Result, StrategyError};
use crate::provider::CoefficientProvider;
use crate::tyre::DegradationCoefficients;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Samples slower than this multiple of the compound's fastest lap are anomalies.
pub const ANOMALY_FACTOR: f64 = 1.15;
pub const MIN_SAMPLES: usize = 5;

/// Fitted `a * exp(b * age)` curves, one per compound that had enough data.
#[derive(Debug, Clone, Default)]
pub struct DegradationModel {
    fits: BTreeMap<String, DegradationCoefficients>,
}

impl DegradationModel {
    pub fn fit(samples: &HashMap<String, Vec<LapSample>>) -> Self {
        let mut fits = BTreeMap::new();
        for (compound, laps) in samples {
            match Self::fit_compound(compound, laps) {
                Ok(coeffs) => {
                    debug!(compound = %compound, a = coeffs.a, b = coeffs.b, "fitted degradation curve");
                    fits.insert(compound.to_uppercase(), coeffs);
                }
                Err(e) => warn!(compound = %compound, error = %e, "skipping compound"),
            }
        }
        Self { fits }
    }

    /// Log-linear least squares: `ln(t) = ln(a) + b * age`.
    pub fn fit_compound(compound: &str, samples: &[LapSample]) -> Result<DegradationCoefficients> {
        let fit_err = |reason: String| StrategyError::Fit {
            compound: compound.to_string(),
            reason,
        };

        let fastest = samples
            .iter()
            .map(|s| s.lap_time)
            .filter(|t| t.is_finite() && *t > 0.0)
            .fold(f64::INFINITY, f64::min);
        let clean: Vec<&LapSample> = samples
            .iter()
            .filter(|s| s.lap_time.is_finite() && s.lap_time > 0.0 && s.lap_time <= fastest * ANOMALY_FACTOR)
            .collect();

        if clean.len() < MIN_SAMPLES {
            return Err(fit_err(format!("{} usable laps, need {MIN_SAMPLES}", clean.len())));
        }
        let ages: BTreeSet<u32> = clean.iter().map(|s| s.tyre_age).collect();
        if ages.len() < 2 {
            return Err(fit_err("all laps share one tyre age".to_string()));
        }

        let feats: Vec<f64> = clean.iter().map(|s| s.tyre_age as f64).collect();
        let targets: Vec<f64> = clean.iter().map(|s| s.lap_time.ln()).collect();
        let x = Array2::from_shape_vec((clean.len(), 1), feats).map_err(|e| fit_err(e.to_string()))?;
        let y = Array1::from_vec(targets);
        let ds = Dataset::new(x, y);

        let fitted = LinearRegression::new()
            .fit(&ds)
            .map_err(|e| fit_err(e.to_string()))?;

        let a = fitted.intercept().exp();
        let b = fitted.params()[0];
        if !(a.is_finite() && b.is_finite()) {
            return Err(fit_err(format!("fit diverged (a={a}, b={b})")));
        }
        Ok(DegradationCoefficients::new(a, b, 0.0))
    }

    pub fn compounds(&self) -> impl Iterator<Item = &str> {
        self.fits.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }

    /// Mean absolute error of the fitted curve against observed laps, in seconds.
    pub fn mean_absolute_error(&self, compound: &str, samples: &[LapSample]) -> Option<f64> {
        let coeffs = self.fits.get(&compound.to_uppercase())?;
        if samples.is_empty() {
            return None;
        }
        let total: f64 = samples
            .iter()
            .map(|s| (coeffs.evaluate(s.tyre_age as usize) - s.lap_time).abs())
            .sum();
        Some(total / samples.len() as f64)
    }
}

impl CoefficientProvider for DegradationModel {
    fn coefficients(&self, compound: &str) -> Result<DegradationCoefficients> {
        self.fits
            .get(&compound.to_uppercase())
            .copied()
            .ok_or_else(|| StrategyError::UnknownCompound(compound.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(a: f64, b: f64, ages: std::ops::Range<u32>) -> Vec<LapSample> {
        ages.map(|age| LapSample {
            tyre_age: age,
            lap_time: a * (b * age as f64).exp(),
        })
        .collect()
    }

    #[test]
    fn recovers_exact_exponential() {
        let samples = synthetic(78.0, 0.004, 1..20);
        let coeffs = DegradationModel::fit_compound("SOFT", &samples).unwrap();
        assert!((coeffs.a - 78.0).abs() < 1e-6);
        assert!((coeffs.b - 0.004).abs() < 1e-8);
        assert_eq!(coeffs.c, 0.0);
    }

    #[test]
    fn discards_anomalous_laps() {
        let mut samples = synthetic(80.0, 0.002, 1..15);
        samples.push(LapSample {
            tyre_age: 7,
            lap_time: 140.0,
        });
        let coeffs = DegradationModel::fit_compound("HARD", &samples).unwrap();
        assert!((coeffs.a - 80.0).abs() < 1e-6);
    }

    #[test]
    fn too_little_data_is_a_fit_error() {
        let samples = synthetic(80.0, 0.002, 1..4);
        assert!(matches!(
            DegradationModel::fit_compound("SOFT", &samples),
            Err(StrategyError::Fit { .. })
        ));
        let flat: Vec<LapSample> = (0..6).map(|_| LapSample { tyre_age: 3, lap_time: 80.0 }).collect();
        assert!(DegradationModel::fit_compound("SOFT", &flat).is_err());
    }

    #[test]
    fn provides_fitted_compounds_only() {
        let mut samples = HashMap::new();
        samples.insert("MEDIUM".to_string(), synthetic(79.0, 0.003, 1..12));
        samples.insert("SOFT".to_string(), synthetic(78.0, 0.005, 1..3));
        let model = DegradationModel::fit(&samples);

        assert_eq!(model.compounds().collect::<Vec<_>>(), ["MEDIUM"]);
        assert!(model.coefficients("medium").is_ok());
        assert!(matches!(
            model.coefficients("SOFT"),
            Err(StrategyError::UnknownCompound(_))
        ));
        let mae = model.mean_absolute_error("MEDIUM", &samples["MEDIUM"]).unwrap();
        assert!(mae < 1e-6);
    }
}
