use crate::algos::model_based::{common::*, MdpSolver};
use gridworld::common::utils::argmax_first;
use gridworld::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const EPISODES_PER_LOG: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    pub alpha: Continous,
    pub gamma: Continous,
    pub episodes: usize,
    pub steps: usize,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            gamma: 0.9,
            episodes: 2000,
            steps: 100,
        }
    }
}

/// Tabular Q-learning with uniformly random exploration.
///
/// The update backs up the reward of the cell being left, the same convention as
/// [`crate::algos::model_based::vi::ValueIteration`]. Episodes may start on a Terminal
/// cell and act from it; an episode ends once a move lands on a Terminal cell.
/// Nothing checks that the budget was large enough to converge.
pub struct QLearning<'w> {
    world: &'w GridWorld,
    config: QLearningConfig,
    cells: Vec<Cell>,
    q: QValues,
}

impl<'w> QLearning<'w> {
    pub fn new(world: &'w GridWorld, config: QLearningConfig) -> Result<Self> {
        if !(config.alpha > 0. && config.alpha <= 1.) {
            return Err(MdpError::configuration(format!(
                "Learning rate {} is not in (0, 1].",
                config.alpha
            )));
        }
        check_discount(config.gamma)?;

        let mut learner = Self {
            world,
            config,
            cells: world.cells().collect(),
            q: QValues::new(),
        };
        learner.reset();

        Ok(learner)
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    /// Every entry back to the immediate reward of its cell.
    pub fn reset(&mut self) {
        self.q = self
            .cells
            .iter()
            .flat_map(|&c| {
                let r = self.world.reward_of(c).unwrap_or_default();
                Action::ALL.into_iter().map(move |a| ((c, a), r))
            })
            .collect();
    }

    pub fn q_values(&self) -> &QValues {
        &self.q
    }

    fn max_q(&self, c: Cell) -> Continous {
        Action::ALL
            .iter()
            .filter_map(|a| self.q.get(&(c, *a)))
            .copied()
            .fold(Continous::NEG_INFINITY, Continous::max)
    }

    /// Runs the configured number of episodes on top of the current table and returns
    /// the greedy policy.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<TabularPolicy> {
        let QLearningConfig {
            alpha,
            gamma,
            episodes,
            steps,
        } = self.config;

        let mut largest_update: Continous = 0.;
        for episode in 1..=episodes {
            let Some(&start) = self.cells.choose(rng) else {
                break;
            };

            let mut s = start;
            for _ in 0..steps {
                let a = Action::ALL.choose(rng).copied().unwrap_or(Action::N);
                let (next, _) = self.world.sample_move(s, a, rng)?;
                let target = self.world.reward_of(s)? + gamma * self.max_q(next);

                let q = self.q.entry((s, a)).or_default();
                let updated = (1. - alpha) * *q + alpha * target;
                largest_update = largest_update.max((updated - *q).abs());
                *q = updated;

                if self.world.is_terminal(next) {
                    break;
                }
                s = next;
            }

            if episode % EPISODES_PER_LOG == 0 {
                debug!(episode, largest_update, "Q-learning progress");
                largest_update = 0.;
            }
        }
        info!(episodes, steps, "Q-learning finished");

        Ok(self.policy())
    }

    /// First action in [`Action::ALL`] with the largest Q value.
    pub fn best_action(&self, c: Cell) -> Option<Action> {
        argmax_first(Action::ALL, |a| {
            self.q.get(&(c, *a)).copied().unwrap_or(Continous::NEG_INFINITY)
        })
        .filter(|(_, q)| q.is_finite())
        .map(|(a, _)| a)
    }

    /// Greedy actions for every Accessible and Terminal cell.
    pub fn policy(&self) -> TabularPolicy {
        self.cells
            .iter()
            .filter_map(|&c| self.best_action(c).map(|a| (c, a)))
            .collect()
    }
}

impl<'w> MdpSolver<Cell, Action> for QLearning<'w> {
    fn v_star(&self, s: &Cell) -> Option<Continous> {
        Some(self.max_q(*s)).filter(|v| v.is_finite())
    }

    fn q_star(&self, s: &Cell, a: &Action) -> Option<Continous> {
        self.q.get(&(*s, *a)).copied()
    }

    fn pi_star(&self, s: &Cell) -> Option<Action> {
        self.best_action(*s)
    }
}
