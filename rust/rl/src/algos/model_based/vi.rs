use super::{common::*, MdpSolver};
use gridworld::common::utils::argmax_first;
use gridworld::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueIterationConfig {
    pub gamma: Continous,
    pub epsilon: Continous,
    /// Sweeps allowed before giving up; unbounded when `None`.
    pub max_iterations: Option<usize>,
    /// Also assign greedy actions to Terminal cells.
    pub include_terminal: bool,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            epsilon: 1e-6,
            max_iterations: None,
            include_terminal: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Iterating,
    Converged,
    CapReached,
}

/// Synchronous (Jacobi) value iteration over a [`GridWorld`].
///
/// Every sweep reads only the previous sweep's values. The solver stops once the
/// sup-norm change drops to `ε (1 - γ) / γ`, which bounds the distance to the optimal
/// values by `ε`.
pub struct ValueIteration<'w> {
    world: &'w GridWorld,
    config: ValueIterationConfig,
    /// Reachable distributions per cell, indexed by [`Action::index`].
    model: HashMap<Cell, Vec<Vec<Transition>>>,
    v: ValueFunction,
    residuals: Vec<Continous>,
    phase: Phase,
}

impl<'w> ValueIteration<'w> {
    pub fn new(world: &'w GridWorld, config: ValueIterationConfig) -> Result<Self> {
        check_discount(config.gamma)?;
        check_positive("epsilon", config.epsilon)?;

        let mut model = HashMap::new();
        for c in world.cells() {
            let ts = Action::ALL
                .iter()
                .map(|&a| world.reachable_distribution(c, a))
                .collect::<Result<Vec<_>>>()?;
            model.insert(c, ts);
        }

        Ok(Self {
            world,
            config,
            model,
            v: ValueFunction::new(),
            residuals: Vec::new(),
            phase: Phase::Uninitialized,
        })
    }

    pub fn config(&self) -> &ValueIterationConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn threshold(&self) -> Continous {
        self.config.epsilon * (1. - self.config.gamma) / self.config.gamma
    }

    pub fn values(&self) -> &ValueFunction {
        &self.v
    }

    /// Residual of every sweep so far, in order.
    pub fn residuals(&self) -> &[Continous] {
        &self.residuals
    }

    fn initialize(&mut self) {
        self.v = self
            .world
            .cells()
            .map(|c| {
                let v = if self.world.is_terminal(c) {
                    self.world.reward_of(c).unwrap_or_default()
                } else {
                    0.
                };
                (c, v)
            })
            .collect();
        self.residuals.clear();
        self.phase = Phase::Iterating;
    }

    fn expected_value(&self, c: Cell, a: Action) -> Option<Continous> {
        self.model.get(&c).map(|ts| {
            ts[a.index()]
                .iter()
                .map(|t| t.probability * self.v.get(&t.next_state).copied().unwrap_or_default())
                .sum()
        })
    }

    fn greedy(&self, c: Cell) -> Option<(Action, Continous)> {
        argmax_first(Action::ALL, |&a| {
            self.expected_value(c, a).unwrap_or(Continous::NEG_INFINITY)
        })
        .filter(|(_, v)| v.is_finite())
    }

    /// One Jacobi backup of every Accessible cell. Returns the residual.
    ///
    /// Sweeping past a finished run puts the solver back into [`Phase::Iterating`].
    pub fn sweep(&mut self) -> Continous {
        if self.phase == Phase::Uninitialized {
            self.initialize();
        }
        self.phase = Phase::Iterating;

        let backups = self
            .world
            .accessible_cells()
            .filter_map(|c| {
                let (_, best) = self.greedy(c)?;
                let r = self.world.reward_of(c).ok()?;
                Some((c, r + self.config.gamma * best))
            })
            .collect::<Vec<_>>();

        let mut residual: Continous = 0.;
        for (c, v) in backups {
            if let Some(prev) = self.v.insert(c, v) {
                residual = residual.max((v - prev).abs());
            }
        }
        self.residuals.push(residual);
        debug!(sweep = self.residuals.len(), residual, "Value iteration sweep");

        residual
    }

    /// Sweeps from fresh values until the stopping test passes or the cap is hit.
    pub fn exec(&mut self) -> Outcome<ValueFunction> {
        self.initialize();
        let threshold = self.threshold();

        loop {
            let iterations = self.residuals.len();
            if self.config.max_iterations.is_some_and(|cap| iterations >= cap) {
                self.phase = Phase::CapReached;
                let residual = self.residuals.last().copied().unwrap_or(Continous::INFINITY);
                warn!(iterations, residual, threshold, "Value iteration hit its iteration cap");
                return self.outcome(false);
            }

            let residual = self.sweep();
            if residual <= threshold {
                self.phase = Phase::Converged;
                info!(iterations = self.residuals.len(), residual, "Value iteration converged");
                return self.outcome(true);
            }
        }
    }

    fn outcome(&self, converged: bool) -> Outcome<ValueFunction> {
        Outcome {
            value: self.v.clone(),
            iterations: self.residuals.len(),
            residual: self.residuals.last().copied().unwrap_or(Continous::INFINITY),
            converged,
        }
    }

    /// `r(c) + γ Σ p V[next]` under the current values.
    pub fn q_value(&self, c: Cell, a: Action) -> Option<Continous> {
        let r = self.world.reward_of(c).ok()?;
        Some(r + self.config.gamma * self.expected_value(c, a)?)
    }

    fn has_policy_entry(&self, c: Cell) -> bool {
        self.world.is_accessible(c) || (self.config.include_terminal && self.world.is_terminal(c))
    }

    /// Greedy policy for the current values. The first action in [`Action::ALL`] wins ties.
    pub fn policy(&self) -> TabularPolicy {
        self.world
            .cells()
            .filter(|&c| self.has_policy_entry(c))
            .filter_map(|c| self.greedy(c).map(|(a, _)| (c, a)))
            .collect()
    }
}

impl<'w> MdpSolver<Cell, Action> for ValueIteration<'w> {
    fn v_star(&self, s: &Cell) -> Option<Continous> {
        self.v.get(s).copied()
    }

    fn q_star(&self, s: &Cell, a: &Action) -> Option<Continous> {
        self.q_value(*s, *a)
    }

    fn pi_star(&self, s: &Cell) -> Option<Action> {
        if !self.has_policy_entry(*s) {
            return None;
        }

        self.greedy(*s).map(|(a, _)| a)
    }
}
