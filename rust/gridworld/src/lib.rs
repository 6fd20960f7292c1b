extern crate ndarray;
extern crate rand;
extern crate serde;

pub mod common;
pub mod error;
pub mod kernel;
pub mod map;
pub mod mdps;
pub mod render;
pub mod world;

pub use common::defs::*;
pub use error::{MdpError, Result};
pub use kernel::KernelModel;
pub use map::{parse_map, MapSource};
pub use mdps::*;
pub use world::GridWorld;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an agent may do with a cell. Fixed for the lifetime of a [`GridWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Inaccessible,
    Accessible,
    Terminal,
}

impl CellType {
    /// Map files encode cell types as `0`, `1` and `2`.
    pub fn from_code(code: Discrete) -> Option<Self> {
        match code {
            0 => Some(Self::Inaccessible),
            1 => Some(Self::Accessible),
            2 => Some(Self::Terminal),
            _ => None,
        }
    }

    pub fn code(&self) -> Discrete {
        match self {
            Self::Inaccessible => 0,
            Self::Accessible => 1,
            Self::Terminal => 2,
        }
    }
}

/// The 8 compass directions. The declaration order is the tie-break order used by every solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::N,
        Action::NE,
        Action::E,
        Action::SE,
        Action::S,
        Action::SW,
        Action::W,
        Action::NW,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Unit move `(dx, dy)`; north is `+y`.
    pub fn delta(&self) -> (Discrete, Discrete) {
        match self {
            Action::N => (0, 1),
            Action::NE => (1, 1),
            Action::E => (1, 0),
            Action::SE => (1, -1),
            Action::S => (0, -1),
            Action::SW => (-1, -1),
            Action::W => (-1, 0),
            Action::NW => (-1, 1),
        }
    }

    /// Neighbouring compass directions, counter-clockwise first.
    pub fn neighbours(&self) -> (Action, Action) {
        let i = self.index();
        (Self::ALL[(i + 7) % 8], Self::ALL[(i + 1) % 8])
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::N => "N",
            Action::NE => "NE",
            Action::E => "E",
            Action::SE => "SE",
            Action::S => "S",
            Action::SW => "SW",
            Action::W => "W",
            Action::NW => "NW",
        }
    }

    pub fn arrow(&self) -> char {
        match self {
            Action::N => '↑',
            Action::NE => '↗',
            Action::E => '→',
            Action::SE => '↘',
            Action::S => '↓',
            Action::SW => '↙',
            Action::W => '←',
            Action::NW => '↖',
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = MdpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| MdpError::Configuration(format!("Unrecognized action: {s}")))
    }
}

/// One entry of a reachable-state distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next_state: Cell,
    pub probability: Continous,
    pub reward: f64,
    pub done: bool,
}
