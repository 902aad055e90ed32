use crate::error::Result;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Stints this short or shorter say nothing useful about degradation.
pub const MIN_STINT_LAPS: usize = 5;
/// Laps this much faster than their stint median are push laps.
pub const PUSH_LAP_MARGIN: f64 = 1.5;

// column names as exported by the timing feed
#[derive(Debug, Deserialize)]
struct RawLapData {
    #[serde(rename = "Driver")] driver: String,
    #[serde(rename = "LapNumber")] lap_number: f64,
    #[serde(rename = "Compound")] compound: String,
    #[serde(rename = "TyreLife")] tyre_life: f64,
    #[serde(rename = "LapTimeSeconds")] lap_time_seconds: Option<f64>,
    #[serde(rename = "PitOutTime")] pit_out_time: Option<String>,
    #[serde(rename = "PitInTime")] pit_in_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedLapData {
    pub driver: String,
    pub lap_number: u32,
    pub compound: String,
    pub tyre_life: u32,
    pub lap_time_seconds: f64,
    pub is_pit_out_lap: bool,
    pub is_pit_in_lap: bool,
}

/// One cleaned observation for curve fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapSample {
    pub tyre_age: u32,
    pub lap_time: f64,
}

/// Lap telemetry regrouped per driver, each driver's laps in lap order.
pub struct DataProcessor {
    pub driver_data: HashMap<String, Vec<ProcessedLapData>>,
}

impl DataProcessor {
    pub fn new<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = ReaderBuilder::new().has_headers(true).from_path(filename)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let reader = ReaderBuilder::new().has_headers(true).from_reader(rdr);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut driver_data: HashMap<String, Vec<ProcessedLapData>> = HashMap::new();
        let mut skipped = 0usize;

        for res in reader.deserialize() {
            let raw: RawLapData = res?;
            let lap_time = match raw.lap_time_seconds {
                Some(t) if t.is_finite() && t > 0.0 => t,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            let lap_ok = raw.lap_number.is_finite() && raw.lap_number >= 1.0;
            let age_ok = raw.tyre_life.is_finite() && raw.tyre_life >= 0.0;
            if raw.driver.is_empty() || raw.compound.is_empty() || !lap_ok || !age_ok {
                skipped += 1;
                continue;
            }
            let lap = ProcessedLapData {
                driver: raw.driver,
                lap_number: raw.lap_number.round() as u32,
                compound: raw.compound.to_uppercase(),
                tyre_life: raw.tyre_life.round() as u32,
                lap_time_seconds: lap_time,
                is_pit_out_lap: raw.pit_out_time.is_some_and(|s| !s.is_empty()),
                is_pit_in_lap: raw.pit_in_time.is_some_and(|s| !s.is_empty()),
            };
            driver_data.entry(lap.driver.clone()).or_default().push(lap);
        }

        for laps in driver_data.values_mut() {
            laps.sort_by_key(|d| d.lap_number);
        }
        if skipped > 0 {
            warn!(skipped, "dropped telemetry rows without a usable lap time");
        }
        debug!(drivers = driver_data.len(), "loaded lap telemetry");
        Ok(DataProcessor { driver_data })
    }

    /// Every stint driven, across all drivers.
    pub fn stints(&self) -> Vec<&[ProcessedLapData]> {
        self.driver_data
            .values()
            .flat_map(|laps| split_stints(laps))
            .collect()
    }

    /// Clean laps per compound, ready for fitting.
    ///
    /// Short stints are dropped entirely; within a stint the opening lap,
    /// pit-out laps and push laps are dropped.
    pub fn fitting_samples(&self) -> HashMap<String, Vec<LapSample>> {
        let mut samples: HashMap<String, Vec<LapSample>> = HashMap::new();
        for stint in self.stints() {
            if stint.len() <= MIN_STINT_LAPS {
                continue;
            }
            let times: Vec<f64> = stint.iter().map(|l| l.lap_time_seconds).collect();
            let threshold = median(&times) - PUSH_LAP_MARGIN;
            let kept = stint
                .iter()
                .skip(1)
                .filter(|l| !l.is_pit_out_lap && l.lap_time_seconds > threshold)
                .map(|l| LapSample {
                    tyre_age: l.tyre_life,
                    lap_time: l.lap_time_seconds,
                });
            samples.entry(stint[0].compound.clone()).or_default().extend(kept);
        }
        samples
    }
}

// A stint ends on a pit-in lap, right before a pit-out lap, when the compound
// changes, or at the driver's last lap.
fn split_stints(laps: &[ProcessedLapData]) -> Vec<&[ProcessedLapData]> {
    let mut stints = Vec::new();
    let mut start = 0;
    for (i, curr) in laps.iter().enumerate() {
        let is_stint_end = match laps.get(i + 1) {
            None => true,
            Some(next) => curr.is_pit_in_lap || next.is_pit_out_lap || next.compound != curr.compound,
        };
        if is_stint_end {
            stints.push(&laps[start..=i]);
            start = i + 1;
        }
    }
    stints
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.is_empty() {
        f64::NAN
    } else if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Driver,LapNumber,Compound,TyreLife,LapTimeSeconds,PitOutTime,PitInTime\n";

    fn csv_of(rows: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for row in rows {
            s.push_str(row);
            s.push('\n');
        }
        s
    }

    #[test]
    fn groups_and_sorts_by_driver() {
        let data = csv_of(&[
            "VER,2,medium,2,81.0,,",
            "VER,1,medium,1,82.0,,",
            "HAM,1,hard,1,83.0,,",
            "HAM,2,hard,2,,,",
        ]);
        let processor = DataProcessor::from_reader(data.as_bytes()).unwrap();
        let ver = &processor.driver_data["VER"];
        assert_eq!(ver.iter().map(|l| l.lap_number).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(ver[0].compound, "MEDIUM");
        assert_eq!(processor.driver_data["HAM"].len(), 1);
    }

    #[test]
    fn nan_lap_number_or_tyre_life_is_skipped() {
        let data = csv_of(&[
            "VER,NaN,MEDIUM,1,82.0,,",
            "VER,2,MEDIUM,NaN,82.1,,",
            "VER,3,MEDIUM,inf,82.2,,",
            "VER,4,MEDIUM,4,82.3,,",
        ]);
        let processor = DataProcessor::from_reader(data.as_bytes()).unwrap();
        let ver = &processor.driver_data["VER"];
        assert_eq!(ver.len(), 1);
        assert_eq!(ver[0].lap_number, 4);
        assert_eq!(ver[0].tyre_life, 4);
    }

    #[test]
    fn splits_on_pit_and_compound_change() {
        let data = csv_of(&[
            "VER,1,MEDIUM,1,82.0,,",
            "VER,2,MEDIUM,2,82.1,,",
            "VER,3,MEDIUM,3,85.0,,1:02:03",
            "VER,4,HARD,1,90.0,1:02:30,",
            "VER,5,HARD,2,83.0,,",
            "VER,6,SOFT,1,81.0,,",
        ]);
        let processor = DataProcessor::from_reader(data.as_bytes()).unwrap();
        let lengths: Vec<usize> = processor.stints().iter().map(|s| s.len()).collect();
        assert_eq!(lengths, [3, 2, 1]);
    }

    #[test]
    fn cleaning_drops_short_stints_first_laps_and_push_laps() {
        let mut rows = vec![
            "VER,1,SOFT,1,80.0,,".to_string(),
            "VER,2,SOFT,2,80.0,,".to_string(),
        ];
        for lap in 3..=12 {
            rows.push(format!("LEC,{lap},MEDIUM,{lap},{},,", if lap == 5 { 75.0 } else { 81.0 }));
        }
        let refs: Vec<&str> = rows.iter().map(|s| s.as_str()).collect();
        let processor = DataProcessor::from_reader(csv_of(&refs).as_bytes()).unwrap();
        let samples = processor.fitting_samples();

        assert!(!samples.contains_key("SOFT"));
        let medium = &samples["MEDIUM"];
        // ten laps, minus the opening lap, minus the push lap
        assert_eq!(medium.len(), 8);
        assert!(medium.iter().all(|s| s.lap_time == 81.0));
        assert!(medium.iter().all(|s| s.tyre_age != 3));
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert!(median(&[]).is_nan());
    }
}
