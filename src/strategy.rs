use crate::config::RaceConfig;
use crate::stint::StintCostTable;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// A stint in the chosen plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStint {
    pub compound: String,
    pub length: usize,
    pub stint_time: f64,
}

/// Outcome of a solve. When no plan satisfies the two-compound rule,
/// `best_time` is `+inf` and `strategy` is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub best_time: f64,
    pub strategy: Vec<PlannedStint>,
}

impl StrategyResult {
    pub fn infeasible() -> Self {
        Self {
            best_time: f64::INFINITY,
            strategy: Vec::new(),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.best_time.is_finite()
    }

    pub fn pit_stops(&self) -> usize {
        self.strategy.len().saturating_sub(1)
    }

    pub fn total_laps(&self) -> usize {
        self.strategy.iter().map(|s| s.length).sum()
    }
}

impl fmt::Display for StrategyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_feasible() {
            return write!(f, "no strategy uses two compounds");
        }
        let plan: Vec<String> = self
            .strategy
            .iter()
            .map(|s| format!("{}x{}", s.compound, s.length))
            .collect();
        write!(
            f,
            "{} : {:.3}s (stops: {})",
            plan.join(" -> "),
            self.best_time,
            self.pit_stops()
        )
    }
}

// How a DP cell was reached: the state we came from and the stint driven.
#[derive(Debug, Clone, Copy)]
struct Backpointer {
    lap: usize,
    mask: usize,
    compound: usize,
    length: usize,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    time: f64,
    from: Option<Backpointer>,
}

/// Dynamic program over `(laps completed, compounds used)`.
///
/// Transitions are explored with laps ascending, then masks ascending, then
/// compounds in configured order, then stint lengths ascending. A cell only
/// changes on a strictly faster arrival, so among equally fast plans the first
/// one found in that order wins.
#[derive(Debug)]
pub struct StrategySolver<'a> {
    race: &'a RaceConfig,
    costs: Vec<StintCostTable>,
}

impl<'a> StrategySolver<'a> {
    pub fn new(race: &'a RaceConfig) -> Self {
        let costs = race
            .compounds()
            .iter()
            .map(|c| StintCostTable::new(c, race.total_laps()))
            .collect();
        Self { race, costs }
    }

    pub fn solve(&self) -> StrategyResult {
        let laps = self.race.total_laps();
        let n_compounds = self.race.compounds().len();
        let masks = 1usize << n_compounds;
        let pit_loss = self.race.pit_loss();

        debug!(laps, compounds = n_compounds, pit_loss, "solving race strategy");

        let mut table: Vec<Option<Cell>> = vec![None; (laps + 1) * masks];
        let idx = |lap: usize, mask: usize| lap * masks + mask;
        table[idx(0, 0)] = Some(Cell {
            time: 0.0,
            from: None,
        });

        let mut relaxations = 0usize;
        for lap in 0..laps {
            let pit = if lap > 0 { pit_loss } else { 0.0 };
            for mask in 0..masks {
                let Some(cell) = table[idx(lap, mask)] else {
                    continue;
                };
                for (compound, costs) in self.costs.iter().enumerate() {
                    let next_mask = mask | (1 << compound);
                    for length in 1..=(laps - lap) {
                        let time = cell.time + (costs.cost_unchecked(length) + pit);
                        let target = &mut table[idx(lap + length, next_mask)];
                        if target.map_or(true, |t| time < t.time) {
                            *target = Some(Cell {
                                time,
                                from: Some(Backpointer {
                                    lap,
                                    mask,
                                    compound,
                                    length,
                                }),
                            });
                            relaxations += 1;
                        }
                    }
                }
            }
        }
        debug!(relaxations, "dynamic program complete");

        let best = (0..masks)
            .filter(|mask| mask.count_ones() >= 2)
            .filter_map(|mask| table[idx(laps, mask)].map(|cell| (mask, cell)))
            .fold(None, |best: Option<(usize, Cell)>, (mask, cell)| match best {
                Some((_, b)) if b.time <= cell.time => best,
                _ => Some((mask, cell)),
            });

        let Some((mask, cell)) = best else {
            warn!(laps, compounds = n_compounds, "no strategy satisfies the two-compound rule");
            return StrategyResult::infeasible();
        };

        let strategy = self.reconstruct(&table, masks, laps, mask);
        let result = StrategyResult {
            best_time: cell.time,
            strategy,
        };
        info!(best_time = result.best_time, stops = result.pit_stops(), "strategy found");
        result
    }

    fn reconstruct(
        &self,
        table: &[Option<Cell>],
        masks: usize,
        mut lap: usize,
        mut mask: usize,
    ) -> Vec<PlannedStint> {
        let compounds = self.race.compounds();
        let mut stints = Vec::new();
        while let Some(back) = table[lap * masks + mask].and_then(|cell| cell.from) {
            stints.push(PlannedStint {
                compound: compounds[back.compound].name().to_string(),
                length: back.length,
                stint_time: self.costs[back.compound].cost_unchecked(back.length),
            });
            lap = back.lap;
            mask = back.mask;
        }
        stints.reverse();
        stints
    }
}

/// Solve a race in one call.
pub fn solve(race: &RaceConfig) -> StrategyResult {
    StrategySolver::new(race).solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tyre::{DegradationCoefficients, TyreCompound};

    fn constant(name: &str, lap_time: f64, horizon: usize) -> TyreCompound {
        TyreCompound::new(name, DegradationCoefficients::constant(lap_time), horizon).unwrap()
    }

    fn race(laps: usize, pit_loss: f64, compounds: Vec<TyreCompound>) -> RaceConfig {
        RaceConfig::new(laps, pit_loss, compounds).unwrap()
    }

    #[test]
    fn four_lap_two_compound_race() {
        let r = race(4, 0.0, vec![constant("A", 10.0, 4), constant("B", 11.0, 4)]);
        let result = solve(&r);
        assert_eq!(result.best_time, 41.0);
        assert_eq!(result.strategy.len(), 2);
        assert_eq!(result.total_laps(), 4);
        let a_laps: usize = result
            .strategy
            .iter()
            .filter(|s| s.compound == "A")
            .map(|s| s.length)
            .sum();
        assert_eq!(a_laps, 3);
    }

    #[test]
    fn ties_go_to_first_enumerated_plan() {
        // every two-compound split costs 40; the first arrival at (4, {A,B})
        // is from (1, {A}) with B for 3 laps
        let r = race(4, 0.0, vec![constant("A", 10.0, 4), constant("B", 10.0, 4)]);
        let result = solve(&r);
        assert_eq!(result.best_time, 40.0);
        assert_eq!(
            result.strategy,
            vec![
                PlannedStint {
                    compound: "A".into(),
                    length: 1,
                    stint_time: 10.0
                },
                PlannedStint {
                    compound: "B".into(),
                    length: 3,
                    stint_time: 30.0
                },
            ]
        );
    }

    #[test]
    fn single_compound_is_infeasible() {
        for laps in [1, 2, 10] {
            let result = solve(&race(laps, 20.0, vec![constant("SOFT", 80.0, laps)]));
            assert!(!result.is_feasible());
            assert_eq!(result.best_time, f64::INFINITY);
            assert!(result.strategy.is_empty());
        }
    }

    #[test]
    fn one_lap_race_is_infeasible() {
        let r = race(1, 0.0, vec![constant("SOFT", 80.0, 1), constant("HARD", 81.0, 1)]);
        assert_eq!(solve(&r), StrategyResult::infeasible());
    }

    #[test]
    fn pit_loss_charged_per_stop() {
        let r = race(6, 25.0, vec![constant("SOFT", 80.0, 6), constant("HARD", 81.0, 6)]);
        let result = solve(&r);
        assert_eq!(result.pit_stops(), 1);
        assert_eq!(result.best_time, 5.0 * 80.0 + 81.0 + 25.0);
    }

    #[test]
    fn degrading_tyres_force_extra_stops() {
        let soft = TyreCompound::new("SOFT", DegradationCoefficients::new(0.5, 0.5, 80.0), 20)
            .unwrap();
        let hard = TyreCompound::new("HARD", DegradationCoefficients::new(0.5, 0.4, 80.5), 20)
            .unwrap();
        let result = solve(&race(20, 1.0, vec![soft, hard]));
        assert!(result.is_feasible());
        assert!(result.pit_stops() >= 2);
        assert_eq!(result.total_laps(), 20);
        let summed: f64 = result.strategy.iter().map(|s| s.stint_time).sum::<f64>()
            + result.pit_stops() as f64 * 1.0;
        assert!((summed - result.best_time).abs() < 1e-9);
    }

    #[test]
    fn display_lists_stints() {
        let r = race(4, 0.0, vec![constant("A", 10.0, 4), constant("B", 11.0, 4)]);
        let text = solve(&r).to_string();
        assert!(text.contains("41.000s"));
        assert!(text.contains("(stops: 1)"));
        assert_eq!(
            StrategyResult::infeasible().to_string(),
            "no strategy uses two compounds"
        );
    }
}
