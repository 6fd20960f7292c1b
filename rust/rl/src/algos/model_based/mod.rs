pub mod common;
pub mod pi;
pub mod vi;

use gridworld::*;

/// Read access to what a solver has computed so far. Sutton & Barto 2018 notation.
pub trait MdpSolver<S, A> {
    fn v_star(&self, s: &S) -> Option<Continous>;

    fn q_star(&self, s: &S, a: &A) -> Option<Continous>;

    fn pi_star(&self, s: &S) -> Option<A>;
}

/// Acts greedily with respect to a solver.
pub struct MdpSolverPolicy<'a, T: ?Sized> {
    pub mdp_solver: &'a T,
}

impl<'a, S, A, T> Policy<S, A> for MdpSolverPolicy<'a, T>
where
    T: MdpSolver<S, A> + ?Sized,
{
    fn policy(&self, s: &S) -> Option<A> {
        self.mdp_solver.pi_star(s)
    }
}
