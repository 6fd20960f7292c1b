use crate::algos::model_based::pi::{FiniteMdp, TransitionKey};
use crate::algos::model_based::vi::ValueIterationConfig;
use crate::algos::model_free::q_learning::QLearningConfig;
use gridworld::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { max_steps: 100 }
    }
}

/// Everything the solvers can be tuned with. Missing fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub value_iteration: ValueIterationConfig,
    pub q_learning: QLearningConfig,
    pub simulation: SimulationConfig,
    pub seed: Option<u64>,
}

impl SolverConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| MdpError::configuration(format!("Bad solver config: {e}")))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub from: usize,
    pub to: usize,
    pub action: usize,
    pub probability: Continous,
}

/// JSON form of a [`FiniteMdp`]. The number of states is the length of `rewards`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiniteMdpFile {
    pub n_actions: usize,
    pub rewards: Vec<Continous>,
    pub gamma: Continous,
    pub transitions: Vec<TransitionEntry>,
}

impl FiniteMdpFile {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| MdpError::configuration(format!("Bad MDP file: {e}")))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Repeated keys are summed.
    pub fn into_mdp(self) -> Result<FiniteMdp> {
        let mut transitions = HashMap::<TransitionKey, Continous>::new();
        for t in self.transitions {
            let key = TransitionKey {
                from: t.from,
                to: t.to,
                action: t.action,
            };
            *transitions.entry(key).or_default() += t.probability;
        }

        FiniteMdp::new(
            self.rewards.len(),
            self.n_actions,
            self.rewards,
            transitions,
            self.gamma,
        )
    }
}
