use crate::algos::model_based::pi::*;
use gridworld::*;
use std::collections::HashMap;

/// The 3-state, 2-action "smart train" MDP. `(from, to, action) -> probability`.
const TRANSITIONS: [((usize, usize, usize), Continous); 18] = [
    ((0, 0, 0), 0.7),
    ((0, 0, 1), 0.5),
    ((1, 0, 0), 0.4),
    ((1, 0, 1), 0.2),
    ((2, 0, 0), 0.2),
    ((2, 0, 1), 0.1),
    ((0, 1, 0), 0.1),
    ((0, 1, 1), 0.3),
    ((1, 1, 0), 0.4),
    ((1, 1, 1), 0.7),
    ((2, 1, 0), 0.2),
    ((2, 1, 1), 0.1),
    ((0, 2, 0), 0.2),
    ((0, 2, 1), 0.2),
    ((1, 2, 0), 0.2),
    ((1, 2, 1), 0.1),
    ((2, 2, 0), 0.6),
    ((2, 2, 1), 0.8),
];

pub const REWARDS: [Continous; 3] = [0., 10., 27.];

pub const GAMMA: Continous = 0.9;

pub fn smart_train(rewards: [Continous; 3], gamma: Continous) -> Result<FiniteMdp> {
    let transitions = TRANSITIONS
        .iter()
        .map(|&((from, to, action), p)| (TransitionKey { from, to, action }, p))
        .collect::<HashMap<_, _>>();

    FiniteMdp::new(3, 2, rewards.to_vec(), transitions, gamma)
}
