use crate::{common::utils::*, Action, Continous, Discrete, MdpError, Result};
use ndarray::Array2;

/// Per-action 3x3 distributions over relative one-step moves.
///
/// Orientation: matrix row `r` holds the moves with `dy = 1 - r` (row 0 is north) and
/// column `c` holds the moves with `dx = c - 1` (column 0 is west). This is also the
/// layout of the map files.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelModel {
    matrices: Vec<Array2<Continous>>,
}

impl KernelModel {
    /// `matrices` are given in [`Action::ALL`] order.
    pub fn new(matrices: Vec<Array2<Continous>>) -> Result<Self> {
        if matrices.len() != Action::ALL.len() {
            return Err(MdpError::configuration(format!(
                "Expected {} kernels, one per action, got {}.",
                Action::ALL.len(),
                matrices.len()
            )));
        }

        for (a, m) in Action::ALL.iter().zip(&matrices) {
            if m.dim() != (3, 3) {
                return Err(MdpError::configuration(format!(
                    "Kernel for {a} has shape {:?}, expected (3, 3).",
                    m.dim()
                )));
            }
            if m.iter().any(|p| !p.is_finite() || *p < 0.) {
                return Err(MdpError::configuration(format!(
                    "Kernel for {a} has a negative or non-finite probability."
                )));
            }
            if !sums_to_one(m.iter()) {
                return Err(MdpError::configuration(format!(
                    "Kernel for {a} sums to {}, not 1.",
                    m.sum()
                )));
            }
        }

        Ok(Self { matrices })
    }

    /// Every action moves exactly where it points.
    pub fn deterministic() -> Self {
        Self {
            matrices: spread(1.),
        }
    }

    /// `p_intended` on the intended move, the rest split evenly between the two
    /// neighbouring compass directions.
    pub fn slippery(p_intended: Continous) -> Result<Self> {
        if !(0. ..=1.).contains(&p_intended) {
            return Err(MdpError::configuration(format!(
                "Intended-move probability {p_intended} is not in [0, 1]."
            )));
        }

        Self::new(spread(p_intended))
    }

    pub fn kernel_for(&self, action: Action) -> &Array2<Continous> {
        &self.matrices[action.index()]
    }

    /// `((dx, dy), p)` for all 9 relative moves, in row-major matrix order.
    pub fn offsets(
        &self,
        action: Action,
    ) -> impl Iterator<Item = ((Discrete, Discrete), Continous)> + '_ {
        self.kernel_for(action)
            .indexed_iter()
            .map(|((r, c), &p)| ((c as Discrete - 1, 1 - r as Discrete), p))
    }
}

fn spread(p_intended: Continous) -> Vec<Array2<Continous>> {
    let p_side = (1. - p_intended) / 2.;
    Action::ALL
        .iter()
        .map(|a| {
            let (left, right) = a.neighbours();
            let mut m = Array2::zeros((3, 3));
            for (b, p) in [(*a, p_intended), (left, p_side), (right, p_side)] {
                m[kernel_index(b.delta())] += p;
            }
            m
        })
        .collect()
}

/// Matrix index holding the move `(dx, dy)`.
fn kernel_index((dx, dy): (Discrete, Discrete)) -> [usize; 2] {
    [(1 - dy) as usize, (dx + 1) as usize]
}
