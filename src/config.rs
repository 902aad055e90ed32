//! Race configuration.
//!
//! A `StrategyConfig` is what comes off disk (TOML). Resolving it against a
//! coefficient provider yields a validated `RaceConfig`, which is the only thing
//! the solver accepts.

use crate::error::{Result, StrategyError};
use crate::provider::{CoefficientProvider, CoefficientTable};
use crate::tyre::{DegradationCoefficients, TyreCompound};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Widest compound set a `u32` usage mask can hold with room to spare.
pub const MASK_BITS: usize = 16;
/// Hard ceiling on race length, whatever `[limits]` asks for.
pub const MAX_TOTAL_LAPS: usize = 10_000;
/// Hard ceiling on `(laps + 1) * 2^compounds` DP cells.
pub const MAX_DP_STATES: usize = 1 << 23;

/// Upper bounds on problem size. Solver work grows with `laps^2 * compounds`
/// and memory with `laps * 2^compounds`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverLimits {
    pub max_total_laps: usize,
    pub max_compounds: usize,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            max_total_laps: 500,
            max_compounds: 8,
        }
    }
}

impl SolverLimits {
    /// Checks problem size before anything proportional to it is allocated.
    pub fn check(&self, total_laps: usize, n_compounds: usize) -> Result<()> {
        if total_laps == 0 {
            return Err(invalid("total_laps must be greater than zero"));
        }
        let max_compounds = self.max_compounds.min(MASK_BITS);
        if n_compounds > max_compounds {
            return Err(invalid(format!(
                "{n_compounds} compounds exceeds the limit of {max_compounds}"
            )));
        }
        let max_total_laps = self.max_total_laps.min(MAX_TOTAL_LAPS);
        if total_laps > max_total_laps {
            return Err(invalid(format!(
                "{total_laps} laps exceeds the limit of {max_total_laps}"
            )));
        }
        let states = (total_laps + 1) << n_compounds;
        if states > MAX_DP_STATES {
            return Err(invalid(format!(
                "{total_laps} laps with {n_compounds} compounds needs {states} states, limit is {MAX_DP_STATES}"
            )));
        }
        Ok(())
    }
}

/// A validated race: ready to be handed to the solver.
#[derive(Debug, Clone)]
pub struct RaceConfig {
    total_laps: usize,
    pit_loss: f64,
    compounds: Vec<TyreCompound>,
}

impl RaceConfig {
    pub fn new(total_laps: usize, pit_loss: f64, compounds: Vec<TyreCompound>) -> Result<Self> {
        Self::with_limits(total_laps, pit_loss, compounds, SolverLimits::default())
    }

    pub fn with_limits(
        total_laps: usize,
        pit_loss: f64,
        compounds: Vec<TyreCompound>,
        limits: SolverLimits,
    ) -> Result<Self> {
        limits.check(total_laps, compounds.len())?;
        if !pit_loss.is_finite() || pit_loss < 0.0 {
            return Err(invalid(format!(
                "pit_loss must be a non-negative number, got {pit_loss}"
            )));
        }
        if compounds.is_empty() {
            return Err(invalid("at least one compound is required"));
        }

        let mut seen = HashSet::new();
        for compound in &compounds {
            if !seen.insert(compound.name()) {
                return Err(invalid(format!(
                    "compound {} is listed more than once",
                    compound.name()
                )));
            }
            if compound.horizon() < total_laps {
                return Err(invalid(format!(
                    "lap-time curve for {} covers {} laps but the race is {total_laps} laps",
                    compound.name(),
                    compound.horizon()
                )));
            }
        }

        Ok(Self {
            total_laps,
            pit_loss,
            compounds,
        })
    }

    pub fn total_laps(&self) -> usize {
        self.total_laps
    }

    pub fn pit_loss(&self) -> f64 {
        self.pit_loss
    }

    /// Compounds in the order the solver tries them.
    pub fn compounds(&self) -> &[TyreCompound] {
        &self.compounds
    }
}

fn invalid(msg: impl Into<String>) -> StrategyError {
    StrategyError::InvalidConfig(msg.into())
}

/// Race description as written in a config file.
///
/// ```toml
/// total_laps = 70
/// pit_loss = 25.0
/// compounds = ["SOFT", "MEDIUM", "HARD"]
///
/// [coefficients.SOFT]
/// a = 0.9
/// b = 0.05
/// c = 77.5
///
/// [adjustments]
/// HARD = 0.4
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub total_laps: usize,
    pub pit_loss: f64,
    /// Order matters: ties between equally fast strategies go to the earlier compound.
    pub compounds: Vec<String>,
    #[serde(default)]
    pub coefficients: HashMap<String, DegradationCoefficients>,
    /// Added to the `c` coefficient of the named compound.
    #[serde(default)]
    pub adjustments: HashMap<String, f64>,
    #[serde(default)]
    pub limits: SolverLimits,
}

impl StrategyConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| StrategyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| StrategyError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Coefficients given inline in the config file. Two entries whose names
    /// differ only in case are rejected.
    pub fn inline_coefficients(&self) -> Result<CoefficientTable> {
        let mut table = CoefficientTable::new();
        for (name, coeffs) in &self.coefficients {
            table.try_insert(name, *coeffs)?;
        }
        Ok(table)
    }

    /// Look up every compound, apply adjustments and validate the race.
    pub fn build_race(&self, provider: &dyn CoefficientProvider) -> Result<RaceConfig> {
        // size check comes first: every compound allocates a table per lap
        self.limits.check(self.total_laps, self.compounds.len())?;
        let adjustments = self.normalized_adjustments()?;

        let compounds = self
            .compounds
            .iter()
            .map(|name| {
                let mut coeffs = provider.coefficients(name)?;
                if let Some(offset) = adjustments.get(&name.to_uppercase()) {
                    coeffs.c += offset;
                }
                debug!(compound = %name, a = coeffs.a, b = coeffs.b, c = coeffs.c, "resolved compound");
                TyreCompound::new(name.to_uppercase(), coeffs, self.total_laps)
            })
            .collect::<Result<Vec<_>>>()?;

        RaceConfig::with_limits(self.total_laps, self.pit_loss, compounds, self.limits)
    }

    fn normalized_adjustments(&self) -> Result<BTreeMap<String, f64>> {
        let mut normalized = BTreeMap::new();
        for (name, offset) in &self.adjustments {
            if normalized.insert(name.to_uppercase(), *offset).is_some() {
                return Err(invalid(format!(
                    "adjustment for {} is given more than once",
                    name.to_uppercase()
                )));
            }
        }
        Ok(normalized)
    }
}
