use crate::error::{Result, StrategyError};
use crate::tyre::TyreCompound;

/// A run of consecutive laps on one set of tyres.
#[derive(Debug, Clone, PartialEq)]
pub struct Stint<'a> {
    compound: &'a TyreCompound,
    length: usize,
    total_time: f64,
}

impl<'a> Stint<'a> {
    pub fn new(compound: &'a TyreCompound, length: usize) -> Result<Self> {
        let total_time = stint_time(compound, length)?;
        Ok(Self {
            compound,
            length,
            total_time,
        })
    }

    pub fn compound(&self) -> &'a TyreCompound {
        self.compound
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}

/// Sum of the first `length` lap times of a compound, accumulated left to right.
pub fn stint_time(compound: &TyreCompound, length: usize) -> Result<f64> {
    if length < 1 {
        return Err(StrategyError::InvalidLength { length });
    }
    Ok((0..length).fold(0.0, |acc, lap| acc + compound.lap_time(lap)))
}

/// Prefix sums of a compound's lap times, so any stint cost is a lookup.
///
/// `prefix[k]` holds the time of a `k`-lap stint. The sums are built in the same
/// order as [`stint_time`], so the two agree bit for bit.
#[derive(Debug, Clone)]
pub struct StintCostTable {
    prefix: Vec<f64>,
}

impl StintCostTable {
    pub fn new(compound: &TyreCompound, max_length: usize) -> Self {
        let mut prefix = Vec::with_capacity(max_length + 1);
        let mut acc = 0.0;
        prefix.push(acc);
        for lap in 0..max_length {
            acc += compound.lap_time(lap);
            prefix.push(acc);
        }
        Self { prefix }
    }

    pub fn max_length(&self) -> usize {
        self.prefix.len() - 1
    }

    pub fn cost(&self, length: usize) -> Result<f64> {
        if length < 1 || length > self.max_length() {
            return Err(StrategyError::InvalidLength { length });
        }
        Ok(self.prefix[length])
    }

    // caller guarantees 1 <= length <= max_length
    pub(crate) fn cost_unchecked(&self, length: usize) -> f64 {
        self.prefix[length]
    }
}
