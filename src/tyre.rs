use crate::error::{Result, StrategyError};
use serde::{Deserialize, Serialize};

/// Coefficients of the exponential degradation curve `c + a * exp(b * lap)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradationCoefficients {
    pub a: f64,
    pub b: f64,
    #[serde(default)]
    pub c: f64,
}

impl DegradationCoefficients {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// A compound that never degrades: every lap takes `lap_time` seconds.
    pub fn constant(lap_time: f64) -> Self {
        Self::new(0.0, 0.0, lap_time)
    }

    pub fn evaluate(&self, stint_lap: usize) -> f64 {
        self.c + self.a * (self.b * stint_lap as f64).exp()
    }
}

// one compound with its lap-time curve precomputed over [0, horizon]
#[derive(Debug, Clone, PartialEq)]
pub struct TyreCompound {
    name: String,
    coefficients: DegradationCoefficients,
    lap_times: Vec<f64>,
}

impl TyreCompound {
    pub fn new(
        name: impl Into<String>,
        coefficients: DegradationCoefficients,
        horizon: usize,
    ) -> Result<Self> {
        let name = name.into();
        let DegradationCoefficients { a, b, c } = coefficients;
        if !(a.is_finite() && b.is_finite() && c.is_finite()) {
            return Err(StrategyError::InvalidCoefficients {
                compound: name,
                reason: format!("coefficients must be finite (a={a}, b={b}, c={c})"),
            });
        }

        let lap_times: Vec<f64> = (0..=horizon).map(|l| coefficients.evaluate(l)).collect();
        if let Some(lap) = lap_times.iter().position(|t| !t.is_finite()) {
            return Err(StrategyError::InvalidCoefficients {
                compound: name,
                reason: format!("lap-time curve overflows at stint lap {lap}"),
            });
        }

        Ok(Self {
            name,
            coefficients,
            lap_times,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coefficients(&self) -> DegradationCoefficients {
        self.coefficients
    }

    /// Largest stint lap for which the curve is tabulated.
    pub fn horizon(&self) -> usize {
        self.lap_times.len() - 1
    }

    /// Lap time for the given lap of a stint (0 is the first lap on fresh tyres).
    /// Beyond the horizon the curve stays flat at its last tabulated value.
    pub fn lap_time(&self, stint_lap: usize) -> f64 {
        let idx = stint_lap.min(self.horizon());
        self.lap_times[idx]
    }
}
