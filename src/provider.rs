use crate::error::{Result, StrategyError};
use crate::tyre::DegradationCoefficients;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use csv::ReaderBuilder;

/// Anything that can hand out degradation coefficients for a compound name.
///
/// The solver never sees this: coefficients are resolved into `TyreCompound`s
/// before a race is built.
pub trait CoefficientProvider {
    fn coefficients(&self, compound: &str) -> Result<DegradationCoefficients>;
}

#[derive(Debug, Deserialize)]
struct CoefficientRow {
    compound: String,
    a: f64,
    b: f64,
    c: Option<f64>,
}

/// Fixed compound -> coefficients lookup. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct CoefficientTable {
    entries: HashMap<String, DegradationCoefficients>,
}

impl CoefficientTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, compound: &str, coefficients: DegradationCoefficients) {
        self.entries.insert(compound.to_uppercase(), coefficients);
    }

    /// Like [`insert`](Self::insert), but a name already present (in any case)
    /// is an error rather than an overwrite.
    pub fn try_insert(&mut self, compound: &str, coefficients: DegradationCoefficients) -> Result<()> {
        let key = compound.to_uppercase();
        if self.entries.contains_key(&key) {
            return Err(StrategyError::InvalidConfig(format!(
                "coefficients for {key} are given more than once"
            )));
        }
        self.entries.insert(key, coefficients);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a CSV with header `compound,a,b,c` (`c` may be left empty).
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_csv_reader<R: Read>(rdr: R) -> Result<Self> {
        let reader = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(rdr);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut table = Self::new();
        for row in reader.deserialize() {
            let row: CoefficientRow = row?;
            table.try_insert(&row.compound, DegradationCoefficients::new(row.a, row.b, row.c.unwrap_or(0.0)))?;
        }
        Ok(table)
    }
}

impl CoefficientProvider for CoefficientTable {
    fn coefficients(&self, compound: &str) -> Result<DegradationCoefficients> {
        self.entries
            .get(&compound.to_uppercase())
            .copied()
            .ok_or_else(|| StrategyError::UnknownCompound(compound.to_string()))
    }
}
