use crate::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type Discrete = i32;
pub type Continous = f64;

/// Grid coordinate: `x` indexes columns, `y` indexes rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: Discrete,
    pub y: Discrete,
}

impl Cell {
    pub const fn new(x: Discrete, y: Discrete) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: Discrete, dy: Discrete) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(Discrete, Discrete)> for Cell {
    fn from((x, y): (Discrete, Discrete)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

pub type ValueFunction = HashMap<Cell, Continous>;

pub type QValues = HashMap<(Cell, Action), Continous>;

/// A visited state and the reward collected on entering it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeEvent<S> {
    pub s: S,
    pub r: f64,
}

pub trait Policy<S, A> {
    fn policy(&self, s: &S) -> Option<A>;
}
