use gridworld::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::iter::FusedIterator;

pub trait EpisodeGenerator<S> {
    fn generate(&mut self, n: usize) -> Result<Vec<Vec<EpisodeEvent<S>>>>;
}

/// Rejects starts outside the grid or on an Inaccessible cell.
fn check_start(world: &GridWorld, start: Cell) -> Result<()> {
    match world.cell_type(start)? {
        CellType::Inaccessible => Err(MdpError::configuration(format!(
            "Cannot start on the inaccessible cell {start}."
        ))),
        _ => Ok(()),
    }
}

/// The moves of one episode under a policy, produced lazily.
///
/// Ends after `max_steps` events, right after entering a Terminal cell, or at a cell the
/// policy has no action for. Starting on a Terminal cell yields nothing. A failed draw is
/// yielded once as an error and ends the trajectory.
pub struct Trajectory<'a, P: ?Sized, R: ?Sized> {
    world: &'a GridWorld,
    policy: &'a P,
    rng: &'a mut R,
    current: Cell,
    remaining: usize,
}

impl<'a, P, R> Trajectory<'a, P, R>
where
    P: Policy<Cell, Action> + ?Sized,
    R: Rng + ?Sized,
{
    pub fn new(
        world: &'a GridWorld,
        policy: &'a P,
        start: Cell,
        max_steps: usize,
        rng: &'a mut R,
    ) -> Result<Self> {
        check_start(world, start)?;

        Ok(Self {
            world,
            policy,
            rng,
            current: start,
            remaining: if world.is_terminal(start) { 0 } else { max_steps },
        })
    }

    pub fn current(&self) -> Cell {
        self.current
    }
}

impl<'a, P, R> Iterator for Trajectory<'a, P, R>
where
    P: Policy<Cell, Action> + ?Sized,
    R: Rng + ?Sized,
{
    type Item = Result<EpisodeEvent<Cell>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let Some(a) = self.policy.policy(&self.current) else {
            self.remaining = 0;
            return None;
        };
        let (s, r) = match self.world.sample_move(self.current, a, &mut *self.rng) {
            Ok(step) => step,
            Err(e) => {
                self.remaining = 0;
                return Some(Err(e));
            }
        };

        self.current = s;
        self.remaining = if self.world.is_terminal(s) {
            0
        } else {
            self.remaining - 1
        };
        Some(Ok(EpisodeEvent { s, r }))
    }
}

impl<'a, P, R> FusedIterator for Trajectory<'a, P, R>
where
    P: Policy<Cell, Action> + ?Sized,
    R: Rng + ?Sized,
{
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollout {
    /// Visited cells, starting with the start cell.
    pub cells: Vec<Cell>,
    /// Reward of the start cell plus every reward collected on the way.
    pub cumulative_reward: Continous,
}

pub fn simulate<P, R>(
    world: &GridWorld,
    policy: &P,
    start: Cell,
    max_steps: usize,
    rng: &mut R,
) -> Result<Rollout>
where
    P: Policy<Cell, Action> + ?Sized,
    R: Rng + ?Sized,
{
    let mut rollout = Rollout {
        cells: vec![start],
        cumulative_reward: world.reward_of(start)?,
    };
    for e in Trajectory::new(world, policy, start, max_steps, rng)? {
        let e = e?;
        rollout.cells.push(e.s);
        rollout.cumulative_reward += e.r;
    }

    Ok(rollout)
}

/// Episodes of a fixed policy from uniformly random Accessible starts.
///
/// Each episode opens with the start cell and its reward.
pub struct PolicyEpisodes<'a, P: ?Sized, R> {
    world: &'a GridWorld,
    policy: &'a P,
    max_steps: usize,
    rng: R,
}

impl<'a, P, R> PolicyEpisodes<'a, P, R>
where
    P: Policy<Cell, Action> + ?Sized,
    R: Rng,
{
    pub fn new(world: &'a GridWorld, policy: &'a P, max_steps: usize, rng: R) -> Self {
        Self {
            world,
            policy,
            max_steps,
            rng,
        }
    }
}

impl<'a, P, R> EpisodeGenerator<Cell> for PolicyEpisodes<'a, P, R>
where
    P: Policy<Cell, Action> + ?Sized,
    R: Rng,
{
    fn generate(&mut self, n: usize) -> Result<Vec<Vec<EpisodeEvent<Cell>>>> {
        let starts = self.world.accessible_cells().collect::<Vec<_>>();

        let mut episodes = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(&s) = starts.choose(&mut self.rng) else {
                break;
            };

            let mut episode = vec![EpisodeEvent {
                s,
                r: self.world.reward_of(s)?,
            }];
            for e in Trajectory::new(self.world, self.policy, s, self.max_steps, &mut self.rng)? {
                episode.push(e?);
            }
            episodes.push(episode);
        }

        Ok(episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algos::model_based::vi::*;
    use crate::envs::toy_grids::*;
    use float_eq::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn walking_into_a_wall_never_moves() {
        let w = corridor();
        let rng = &mut StdRng::seed_from_u64(0);
        let rollout = simulate(&w, &ConstantPolicy(Action::W), Cell::new(1, 0), 5, rng).unwrap();

        assert_eq!(rollout.cells, vec![Cell::new(1, 0); 6]);
        assert_float_eq!(rollout.cumulative_reward, -6., abs <= 0.);
    }

    #[test]
    fn stops_on_entering_a_terminal() {
        let w = corridor();
        let rng = &mut StdRng::seed_from_u64(0);
        let rollout = simulate(&w, &ConstantPolicy(Action::E), Cell::new(1, 0), 100, rng).unwrap();

        assert_eq!(
            rollout.cells,
            vec![Cell::new(1, 0), Cell::new(2, 0), Cell::new(3, 0)]
        );
        assert_float_eq!(rollout.cumulative_reward, 8., abs <= 1e-12);
    }

    #[test]
    fn terminal_and_unmapped_starts_stay_put() {
        let w = corridor();
        let rng = &mut StdRng::seed_from_u64(0);

        let rollout = simulate(&w, &ConstantPolicy(Action::W), Cell::new(3, 0), 10, rng).unwrap();
        assert_eq!(rollout.cells, vec![Cell::new(3, 0)]);
        assert_float_eq!(rollout.cumulative_reward, 10., abs <= 0.);

        let rollout = simulate(&w, &TabularPolicy::new(), Cell::new(2, 0), 10, rng).unwrap();
        assert_eq!(rollout.cells, vec![Cell::new(2, 0)]);
    }

    #[test]
    fn invalid_starts_are_rejected() {
        let w = corridor();
        let rng = &mut StdRng::seed_from_u64(0);
        let pi = ConstantPolicy(Action::E);

        assert!(matches!(
            simulate(&w, &pi, Cell::new(0, 0), 10, rng),
            Err(MdpError::Configuration(_))
        ));
        assert!(matches!(
            simulate(&w, &pi, Cell::new(0, 1), 10, rng),
            Err(MdpError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn rollouts_end_at_the_budget_or_a_terminal() {
        let w = four_by_three(KernelModel::slippery(0.8).unwrap());
        let mut vi = ValueIteration::new(&w, Default::default()).unwrap();
        vi.exec();
        let pi = vi.policy();

        for seed in 0..50 {
            let rng = &mut StdRng::seed_from_u64(seed);
            let rollout = simulate(&w, &pi, Cell::new(0, 0), 8, rng).unwrap();
            let last = *rollout.cells.last().unwrap();

            assert!(rollout.cells.len() <= 9);
            assert!(rollout.cells.iter().all(|&c| w.cell_type(c).unwrap() != CellType::Inaccessible));
            assert!(rollout.cells.len() == 9 || w.is_terminal(last));
            assert!(rollout.cells[..rollout.cells.len() - 1].iter().all(|&c| !w.is_terminal(c)));
        }
    }

    #[test]
    fn trajectories_are_fused() {
        let w = corridor();
        let rng = &mut StdRng::seed_from_u64(0);
        let pi = ConstantPolicy(Action::E);
        let mut t = Trajectory::new(&w, &pi, Cell::new(2, 0), 10, rng).unwrap();

        assert_eq!(
            t.next().transpose().unwrap(),
            Some(EpisodeEvent { s: Cell::new(3, 0), r: 10. })
        );
        assert_eq!(t.current(), Cell::new(3, 0));
        assert!(t.next().is_none());
        assert!(t.next().is_none());
    }

    #[test]
    fn failed_draws_surface_as_errors() {
        let w = corridor();
        let rng = &mut StdRng::seed_from_u64(0);
        let pi = ConstantPolicy(Action::E);
        let mut t = Trajectory {
            world: &w,
            policy: &pi,
            rng,
            current: Cell::new(7, 0),
            remaining: 3,
        };

        assert!(matches!(t.next(), Some(Err(MdpError::OutOfBounds { .. }))));
        assert!(t.next().is_none());
        assert_eq!(t.current(), Cell::new(7, 0));
    }

    #[test]
    fn episodes_open_with_their_start() {
        let w = corridor();
        let pi = ConstantPolicy(Action::E);
        let mut episodes = PolicyEpisodes::new(&w, &pi, 10, StdRng::seed_from_u64(5));

        let eps = episodes.generate(20).unwrap();
        assert_eq!(eps.len(), 20);
        for ep in eps {
            assert!(w.is_accessible(ep[0].s));
            assert_float_eq!(ep[0].r, -1., abs <= 0.);
            assert_eq!(ep.last().unwrap().s, Cell::new(3, 0));
        }
    }
}
