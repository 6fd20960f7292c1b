use crate::{render, *};
use itertools::iproduct;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// A rectangular world of typed, rewarded cells with locally stochastic movement.
///
/// Both arrays are indexed `[[y, x]]`. The world is read-only once built, so any number
/// of solvers may share it.
#[derive(Debug, Clone)]
pub struct GridWorld {
    types: Array2<CellType>,
    rewards: Array2<f64>,
    kernel: KernelModel,
}

impl GridWorld {
    pub fn new(types: Array2<CellType>, rewards: Array2<f64>, kernel: KernelModel) -> Result<Self> {
        if types.dim() != rewards.dim() {
            return Err(MdpError::configuration(format!(
                "Cell types {:?} and rewards {:?} differ in shape.",
                types.dim(),
                rewards.dim()
            )));
        }
        if types.is_empty() {
            return Err(MdpError::configuration("The grid has no cells."));
        }
        if let Some(((y, x), r)) = rewards.indexed_iter().find(|(_, r)| !r.is_finite()) {
            return Err(MdpError::configuration(format!(
                "Reward {r} of cell ({x}, {y}) is not finite."
            )));
        }

        Ok(Self {
            types,
            rewards,
            kernel,
        })
    }

    pub fn rows(&self) -> usize {
        self.types.nrows()
    }

    pub fn cols(&self) -> usize {
        self.types.ncols()
    }

    pub fn kernel(&self) -> &KernelModel {
        &self.kernel
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (0..self.cols() as Discrete).contains(&cell.x) && (0..self.rows() as Discrete).contains(&cell.y)
    }

    fn index(&self, cell: Cell) -> Result<[usize; 2]> {
        if self.contains(cell) {
            Ok([cell.y as usize, cell.x as usize])
        } else {
            Err(MdpError::OutOfBounds {
                cell,
                cols: self.cols(),
                rows: self.rows(),
            })
        }
    }

    pub fn cell_type(&self, cell: Cell) -> Result<CellType> {
        Ok(self.types[self.index(cell)?])
    }

    pub fn reward_of(&self, cell: Cell) -> Result<f64> {
        Ok(self.rewards[self.index(cell)?])
    }

    pub fn is_terminal(&self, cell: Cell) -> bool {
        matches!(self.cell_type(cell), Ok(CellType::Terminal))
    }

    pub fn is_accessible(&self, cell: Cell) -> bool {
        matches!(self.cell_type(cell), Ok(CellType::Accessible))
    }

    /// `to` when it is inside the grid and not Inaccessible, otherwise `from`.
    pub fn attempt_move(&self, from: Cell, to: Cell) -> Cell {
        match self.cell_type(to) {
            Ok(CellType::Accessible | CellType::Terminal) => to,
            _ => from,
        }
    }

    /// Full distribution over the cells reachable from `cell` under `action`.
    ///
    /// Offsets that collapse onto the same cell (typically several blocked moves that
    /// bounce back to `cell`) are merged by summing their probabilities. Entries follow
    /// the kernel's row-major offset order, so results are reproducible.
    pub fn reachable_distribution(&self, cell: Cell, action: Action) -> Result<Vec<Transition>> {
        self.index(cell)?;

        let mut ts: Vec<Transition> = Vec::with_capacity(9);
        for ((dx, dy), p) in self.kernel.offsets(action) {
            if p <= 0. {
                continue;
            }

            let next_state = self.attempt_move(cell, cell.offset(dx, dy));
            match ts.iter_mut().find(|t| t.next_state == next_state) {
                Some(t) => t.probability += p,
                None => ts.push(Transition {
                    next_state,
                    probability: p,
                    reward: self.reward_of(next_state)?,
                    done: self.is_terminal(next_state),
                }),
            }
        }

        Ok(ts)
    }

    /// Draws one outcome of `action` from `cell` and returns it with its reward.
    ///
    /// A single uniform draw is matched against the cumulative kernel probabilities in the
    /// same offset order as [`GridWorld::reachable_distribution`].
    pub fn sample_move<R: Rng + ?Sized>(
        &self,
        cell: Cell,
        action: Action,
        rng: &mut R,
    ) -> Result<(Cell, f64)> {
        self.index(cell)?;

        let u: Continous = rng.gen();
        let mut cumulative = 0.;
        let mut chosen = (0, 0);
        for (offset, p) in self.kernel.offsets(action) {
            if p <= 0. {
                continue;
            }

            cumulative += p;
            chosen = offset;
            if u < cumulative {
                break;
            }
        }

        let next = self.attempt_move(cell, cell.offset(chosen.0, chosen.1));
        Ok((next, self.reward_of(next)?))
    }

    /// Accessible and Terminal cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        iproduct!(0..self.rows(), 0..self.cols())
            .filter(|&(y, x)| self.types[[y, x]] != CellType::Inaccessible)
            .map(|(y, x)| Cell::new(x as Discrete, y as Discrete))
    }

    pub fn accessible_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells().filter(|&c| self.is_accessible(c))
    }

    pub fn terminal_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells().filter(|&c| self.is_terminal(c))
    }

    /// A uniformly random action for every Accessible and Terminal cell.
    pub fn random_policy<R: Rng + ?Sized>(&self, rng: &mut R) -> TabularPolicy {
        self.cells()
            .filter_map(|c| Action::ALL.choose(rng).map(|a| (c, *a)))
            .collect()
    }
}

impl fmt::Display for GridWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "types:")?;
        writeln!(f, "{}", render::render_types(self))?;
        writeln!(f, "rewards:")?;
        write!(f, "{}", render::render_rewards(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::utils::PROBABILITY_TOLERANCE;
    use float_eq::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    use crate::CellType::{Accessible as A, Inaccessible as I, Terminal as T};

    /// 3x3 with a wall in the middle of the bottom row and a goal top right.
    fn small_world(kernel: KernelModel) -> GridWorld {
        GridWorld::new(
            array![[A, I, A], [A, A, A], [A, A, T]],
            array![[-0.1, 0., -0.1], [-0.1, -0.1, -0.1], [-0.1, -0.1, 1.]],
            kernel,
        )
        .unwrap()
    }

    #[test]
    fn out_of_bounds_cells_are_errors() {
        let w = small_world(KernelModel::deterministic());
        for c in [Cell::new(-1, 0), Cell::new(3, 0), Cell::new(0, 3)] {
            assert!(matches!(w.cell_type(c), Err(MdpError::OutOfBounds { .. })));
            assert!(w.reward_of(c).is_err());
        }
        assert_eq!(w.cell_type(Cell::new(2, 2)).unwrap(), T);
        assert_float_eq!(w.reward_of(Cell::new(2, 2)).unwrap(), 1., abs <= 0.);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let r = GridWorld::new(
            array![[A, A]],
            array![[0.], [0.]],
            KernelModel::deterministic(),
        );
        assert!(matches!(r, Err(MdpError::Configuration(_))));
    }

    #[test]
    fn blocked_moves_stay_put() {
        let w = small_world(KernelModel::deterministic());
        let origin = Cell::new(0, 0);
        assert_eq!(w.attempt_move(origin, Cell::new(1, 0)), origin);
        assert_eq!(w.attempt_move(origin, Cell::new(-1, 0)), origin);
        assert_eq!(w.attempt_move(origin, Cell::new(0, 1)), Cell::new(0, 1));
        assert_eq!(w.attempt_move(origin, Cell::new(2, 2)), Cell::new(2, 2));
    }

    #[test]
    fn distributions_sum_to_one_everywhere() {
        let kernel = KernelModel::new(vec![Array2::from_elem((3, 3), 1. / 9.); 8]).unwrap();
        for w in [small_world(kernel), small_world(KernelModel::slippery(0.6).unwrap())] {
            for c in w.cells() {
                for a in Action::ALL {
                    let ts = w.reachable_distribution(c, a).unwrap();
                    let total: f64 = ts.iter().map(|t| t.probability).sum();
                    assert_float_eq!(total, 1., abs <= PROBABILITY_TOLERANCE);
                }
            }
        }
    }

    #[test]
    fn redirected_mass_accumulates_on_origin() {
        let kernel = KernelModel::new(vec![Array2::from_elem((3, 3), 1. / 9.); 8]).unwrap();
        let w = small_world(kernel);

        // From the corner: 5 offsets leave the grid and 1 hits the wall.
        let ts = w.reachable_distribution(Cell::new(0, 0), Action::N).unwrap();
        let origin = ts.iter().find(|t| t.next_state == Cell::new(0, 0)).unwrap();
        assert_float_eq!(origin.probability, 7. / 9., abs <= 1e-12);
        assert_eq!(ts.len(), 3);

        let terminal = w
            .reachable_distribution(Cell::new(1, 1), Action::NE)
            .unwrap()
            .into_iter()
            .find(|t| t.done)
            .unwrap();
        assert_eq!(terminal.next_state, Cell::new(2, 2));
        assert_float_eq!(terminal.reward, 1., abs <= 0.);
    }

    #[test]
    fn sampling_agrees_with_the_distribution() {
        let w = small_world(KernelModel::slippery(0.6).unwrap());
        let rng = &mut StdRng::seed_from_u64(2718);
        let n = 20000;

        for (cell, action) in [(Cell::new(1, 1), Action::NE), (Cell::new(0, 0), Action::E)] {
            let mut counts = HashMap::new();
            for _ in 0..n {
                let (next, r) = w.sample_move(cell, action, rng).unwrap();
                assert_eq!(r, w.reward_of(next).unwrap());
                *counts.entry(next).or_insert(0usize) += 1;
            }

            for t in w.reachable_distribution(cell, action).unwrap() {
                let freq = counts.remove(&t.next_state).unwrap_or(0) as f64 / n as f64;
                assert_float_eq!(freq, t.probability, abs <= 2e-2);
            }
            assert!(counts.is_empty(), "sampled unreachable cells: {counts:?}");
        }
    }

    #[test]
    fn deterministic_samples_follow_the_action() {
        let w = small_world(KernelModel::deterministic());
        let rng = &mut StdRng::seed_from_u64(7);
        let (next, r) = w.sample_move(Cell::new(1, 1), Action::NE, rng).unwrap();
        assert_eq!(next, Cell::new(2, 2));
        assert_float_eq!(r, 1., abs <= 0.);

        let (next, _) = w.sample_move(Cell::new(0, 0), Action::E, rng).unwrap();
        assert_eq!(next, Cell::new(0, 0));
    }

    #[test]
    fn cells_skip_walls() {
        let w = small_world(KernelModel::deterministic());
        assert_eq!(w.cells().count(), 8);
        assert_eq!(w.accessible_cells().count(), 7);
        assert_eq!(w.terminal_cells().collect::<Vec<_>>(), vec![Cell::new(2, 2)]);

        let pi = w.random_policy(&mut StdRng::seed_from_u64(1));
        assert_eq!(pi.len(), 8);
        assert_eq!(pi.get(&Cell::new(1, 0)), None);
    }
}
