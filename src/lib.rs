//! Time-optimal tyre strategy for a fixed-length race.
//!
//! Each compound gets an exponential lap-time curve. A dynamic program over
//! `(laps completed, compounds used)` then picks the fastest split of the race
//! into stints that uses at least two different compounds, paying the pit loss
//! once per stop.
//!
//! ```
//! use tyre_strategy::{solve, DegradationCoefficients, RaceConfig, TyreCompound};
//!
//! let soft = TyreCompound::new("SOFT", DegradationCoefficients::constant(10.0), 4)?;
//! let hard = TyreCompound::new("HARD", DegradationCoefficients::constant(11.0), 4)?;
//! let race = RaceConfig::new(4, 0.0, vec![soft, hard])?;
//!
//! let result = solve(&race);
//! assert_eq!(result.best_time, 41.0);
//! # Ok::<(), tyre_strategy::StrategyError>(())
//! ```
//!
//! Coefficients come from a [`CoefficientProvider`]: a fixed table, or a
//! [`DegradationModel`] fitted from lap telemetry.

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod provider;
pub mod stint;
pub mod strategy;
pub mod tyre;

pub use config::{RaceConfig, SolverLimits, StrategyConfig};
pub use data::{DataProcessor, LapSample};
pub use error::{Result, StrategyError};
pub use model::DegradationModel;
pub use provider::{CoefficientProvider, CoefficientTable};
pub use stint::{stint_time, Stint, StintCostTable};
pub use strategy::{solve, PlannedStint, StrategyResult, StrategySolver};
pub use tyre::{DegradationCoefficients, TyreCompound};
