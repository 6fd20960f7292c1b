use super::{common::*, MdpSolver};
use gridworld::common::utils::*;
use gridworld::*;
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Key of the finite transition relation: `P(to | from, action)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionKey {
    pub from: usize,
    pub to: usize,
    pub action: usize,
}

/// Largest number of joint policies [`FiniteMdp::improve_policy_exhaustive`] will enumerate.
pub const MAX_JOINT_CANDIDATES: usize = 1 << 20;

/// A small MDP given as explicit tables. States and actions are indices.
#[derive(Debug, Clone)]
pub struct FiniteMdp {
    n_s: usize,
    n_a: usize,
    rewards: DVector<Continous>,
    transitions: HashMap<TransitionKey, Continous>,
    gamma: Continous,
}

impl FiniteMdp {
    /// Keys missing from `transitions` have probability 0.
    pub fn new(
        n_s: usize,
        n_a: usize,
        rewards: Vec<Continous>,
        transitions: HashMap<TransitionKey, Continous>,
        gamma: Continous,
    ) -> Result<Self> {
        check_discount(gamma)?;
        if n_s == 0 || n_a == 0 {
            return Err(MdpError::configuration(format!(
                "Need at least one state and one action, got {n_s} and {n_a}."
            )));
        }
        if rewards.len() != n_s {
            return Err(MdpError::configuration(format!(
                "Expected {n_s} rewards, got {}.",
                rewards.len()
            )));
        }

        for (k, p) in &transitions {
            if k.from >= n_s || k.to >= n_s || k.action >= n_a {
                return Err(MdpError::configuration(format!("Transition {k:?} is out of range.")));
            }
            if !p.is_finite() || *p < 0. {
                return Err(MdpError::configuration(format!(
                    "Transition {k:?} has invalid probability {p}."
                )));
            }
        }

        for (from, action) in (0..n_s).cartesian_product(0..n_a) {
            let row = (0..n_s)
                .map(|to| transitions.get(&TransitionKey { from, to, action }).copied())
                .map(Option::unwrap_or_default)
                .collect::<Vec<_>>();
            if !sums_to_one(&row) {
                return Err(MdpError::configuration(format!(
                    "Probabilities out of state {from} under action {action} sum to {}.",
                    row.iter().sum::<Continous>()
                )));
            }
        }

        Ok(Self {
            n_s,
            n_a,
            rewards: DVector::from_vec(rewards),
            transitions,
            gamma,
        })
    }

    pub fn n_s(&self) -> usize {
        self.n_s
    }

    pub fn n_a(&self) -> usize {
        self.n_a
    }

    pub fn gamma(&self) -> Continous {
        self.gamma
    }

    pub fn rewards(&self) -> &DVector<Continous> {
        &self.rewards
    }

    pub fn probability(&self, from: usize, to: usize, action: usize) -> Continous {
        self.transitions
            .get(&TransitionKey { from, to, action })
            .copied()
            .unwrap_or_default()
    }

    fn check_policy(&self, pi: &[usize]) -> Result<()> {
        if pi.len() != self.n_s || pi.iter().any(|&a| a >= self.n_a) {
            return Err(MdpError::configuration(format!(
                "Policy {pi:?} does not map {} states to actions below {}.",
                self.n_s, self.n_a
            )));
        }

        Ok(())
    }

    /// Column-stochastic matrix of the chain induced by `pi`: `T[(to, from)] = P(to | from, pi[from])`.
    pub fn transition_matrix(&self, pi: &[usize]) -> Result<DMatrix<Continous>> {
        self.check_policy(pi)?;

        Ok(DMatrix::from_fn(self.n_s, self.n_s, |to, from| {
            self.probability(from, to, pi[from])
        }))
    }

    /// Exact solution of `V = R + γ Tᵀ V`.
    pub fn evaluate_policy(&self, pi: &[usize]) -> Result<DVector<Continous>> {
        let t = self.transition_matrix(pi)?;
        let a = DMatrix::identity(self.n_s, self.n_s) - t.transpose() * self.gamma;

        a.lu()
            .solve(&self.rewards)
            .ok_or_else(|| MdpError::configuration(format!("Policy {pi:?} gives a singular system.")))
    }

    /// `Σ_to P(to | s, a) V[to]`.
    pub fn expected_value(&self, s: usize, a: usize, v: &DVector<Continous>) -> Continous {
        (0..self.n_s).map(|to| self.probability(s, to, a) * v[to]).sum()
    }

    /// Greedy policy for `v`, one state at a time. The first action wins ties.
    pub fn improve_policy(&self, v: &DVector<Continous>) -> Vec<usize> {
        (0..self.n_s)
            .map(|s| {
                argmax_first(0..self.n_a, |&a| self.expected_value(s, a, v))
                    .map_or(0, |(a, _)| a)
            })
            .collect()
    }

    /// Searches all `n_a^n_s` joint policies for the largest summed one-step value.
    ///
    /// This is exponential in the number of states and only serves as a reference for
    /// [`FiniteMdp::improve_policy`], which finds the same policy since the objective is a
    /// sum of per-state terms.
    pub fn improve_policy_exhaustive(&self, v: &DVector<Continous>) -> Result<Vec<usize>> {
        let candidates = u32::try_from(self.n_s)
            .ok()
            .and_then(|n_s| self.n_a.checked_pow(n_s))
            .filter(|&n| n <= MAX_JOINT_CANDIDATES)
            .ok_or_else(|| {
                MdpError::configuration(format!(
                    "{}^{} joint policies exceed the limit of {MAX_JOINT_CANDIDATES}.",
                    self.n_a, self.n_s
                ))
            })?;
        debug!(candidates, "Enumerating joint policies");

        let mut best: Option<(Vec<usize>, Continous)> = None;
        for pi in (0..self.n_s).map(|_| 0..self.n_a).multi_cartesian_product() {
            let t = self.transition_matrix(&pi)?;
            let total = (t.transpose() * v).sum();
            match best {
                Some((_, b)) if total <= b => {}
                _ => best = Some((pi, total)),
            }
        }

        Ok(best.map(|(pi, _)| pi).unwrap_or_default())
    }

    /// Runs [`PolicyIteration`] from `pi0`.
    pub fn policy_iteration(
        &self,
        pi0: Vec<usize>,
        max_iterations: usize,
    ) -> Result<Outcome<FiniteSolution>> {
        PolicyIteration::new(self, pi0)?.exec(max_iterations)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiniteSolution {
    pub policy: Vec<usize>,
    pub values: Vec<Continous>,
}

/// Alternates exact evaluation and greedy improvement until the policy stops changing.
pub struct PolicyIteration<'m> {
    mdp: &'m FiniteMdp,
    pi: Vec<usize>,
    v: DVector<Continous>,
}

impl<'m> PolicyIteration<'m> {
    pub fn new(mdp: &'m FiniteMdp, pi0: Vec<usize>) -> Result<Self> {
        mdp.check_policy(&pi0)?;

        Ok(Self {
            mdp,
            pi: pi0,
            v: DVector::zeros(mdp.n_s()),
        })
    }

    pub fn exec(&mut self, max_iterations: usize) -> Result<Outcome<FiniteSolution>> {
        let mut iterations = 0;
        let mut residual = Continous::INFINITY;
        loop {
            if iterations >= max_iterations {
                warn!(iterations, policy = ?self.pi, "Policy iteration hit its iteration cap");
                return Ok(self.outcome(iterations, residual, false));
            }

            iterations += 1;
            let v = self.mdp.evaluate_policy(&self.pi)?;
            if iterations > 1 {
                residual = (&v - &self.v).amax();
            }
            self.v = v;

            let improved = self.mdp.improve_policy(&self.v);
            debug!(
                iteration = iterations,
                policy = ?self.pi,
                values = ?self.v.as_slice(),
                improved = ?improved,
                "Policy iteration round"
            );

            if improved == self.pi {
                info!(iterations, policy = ?self.pi, "Policy iteration converged");
                return Ok(self.outcome(iterations, residual, true));
            }
            self.pi = improved;
        }
    }

    fn outcome(&self, iterations: usize, residual: Continous, converged: bool) -> Outcome<FiniteSolution> {
        Outcome {
            value: FiniteSolution {
                policy: self.pi.clone(),
                values: self.v.iter().copied().collect(),
            },
            iterations,
            residual,
            converged,
        }
    }
}

impl<'m> MdpSolver<usize, usize> for PolicyIteration<'m> {
    fn v_star(&self, s: &usize) -> Option<Continous> {
        self.v.get(*s).copied()
    }

    fn q_star(&self, s: &usize, a: &usize) -> Option<Continous> {
        if *s >= self.mdp.n_s() || *a >= self.mdp.n_a() {
            return None;
        }

        Some(self.mdp.rewards()[*s] + self.mdp.gamma() * self.mdp.expected_value(*s, *a, &self.v))
    }

    fn pi_star(&self, s: &usize) -> Option<usize> {
        self.pi.get(*s).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::smart_train::*;
    use float_eq::*;
    use rstest::rstest;

    #[test]
    fn transition_matrix_columns_are_distributions() {
        let mdp = smart_train(REWARDS, GAMMA).unwrap();
        let t = mdp.transition_matrix(&[0, 1, 0]).unwrap();

        for from in 0..3 {
            assert_float_eq!(t.column(from).sum(), 1., abs <= 1e-12);
        }
        assert_float_eq!(t[(1, 0)], 0.1, abs <= 0.);
        assert_float_eq!(t[(1, 1)], 0.7, abs <= 0.);
    }

    #[rstest]
    #[case(vec![0, 0, 0])]
    #[case(vec![1, 0, 1])]
    #[case(vec![1, 1, 0])]
    fn evaluation_satisfies_the_bellman_equation(#[case] pi: Vec<usize>) {
        let mdp = smart_train(REWARDS, GAMMA).unwrap();
        let v = mdp.evaluate_policy(&pi).unwrap();
        let t = mdp.transition_matrix(&pi).unwrap();
        let rhs = mdp.rewards() + t.transpose() * &v * GAMMA;

        assert_float_eq!(
            v.iter().copied().collect::<Vec<_>>(),
            rhs.iter().copied().collect::<Vec<_>>(),
            abs_all <= 1e-9
        );
    }

    #[test]
    fn smart_train_optimal_policy() {
        let mdp = smart_train(REWARDS, GAMMA).unwrap();
        let outcome = mdp.policy_iteration(vec![0, 0, 0], 10).unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 2);
        let solution = outcome.into_converged().unwrap();
        assert_eq!(solution.policy, vec![1, 0, 1]);
        assert_float_eq!(
            solution.values,
            vec![11610. / 91., 970. / 7., 16560. / 91.],
            abs_all <= 1e-9
        );
    }

    #[test]
    fn other_rewards_change_the_policy() {
        let mdp = smart_train([0., 20., 20.], GAMMA).unwrap();
        let solution = mdp
            .policy_iteration(vec![0, 0, 0], 10)
            .unwrap()
            .into_converged()
            .unwrap();
        assert_eq!(solution.policy, vec![1, 1, 1]);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let mdp = smart_train(REWARDS, GAMMA).unwrap();
        let outcome = mdp.policy_iteration(vec![0, 0, 0], 1).unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.value.policy, vec![1, 0, 1]);
        assert!(matches!(
            outcome.into_converged(),
            Err(MdpError::NonConvergence { iterations: 1, .. })
        ));
    }

    #[rstest]
    #[case(vec![0, 0, 0])]
    #[case(vec![1, 0, 1])]
    #[case(vec![0, 1, 1])]
    fn exhaustive_and_per_state_improvement_agree(#[case] pi: Vec<usize>) {
        for rewards in [REWARDS, [0., 20., 20.], [5., -3., 1.]] {
            let mdp = smart_train(rewards, GAMMA).unwrap();
            let v = mdp.evaluate_policy(&pi).unwrap();
            assert_eq!(
                mdp.improve_policy_exhaustive(&v).unwrap(),
                mdp.improve_policy(&v)
            );
        }
    }

    #[test]
    fn exhaustive_search_refuses_large_instances() {
        let n_s = 21;
        let transitions = (0..n_s)
            .flat_map(|from| (0..2).map(move |action| (TransitionKey { from, to: from, action }, 1.)))
            .collect();
        let mdp = FiniteMdp::new(n_s, 2, vec![0.; n_s], transitions, 0.5).unwrap();

        assert!(matches!(
            mdp.improve_policy_exhaustive(&DVector::zeros(n_s)),
            Err(MdpError::Configuration(_))
        ));
    }

    #[test]
    fn solver_view_matches_solution() {
        let mdp = smart_train(REWARDS, GAMMA).unwrap();
        let mut pi = PolicyIteration::new(&mdp, vec![0, 0, 0]).unwrap();
        let solution = pi.exec(10).unwrap().into_converged().unwrap();

        for s in 0..3 {
            assert_eq!(pi.pi_star(&s), Some(solution.policy[s]));
            let q = pi.q_star(&s, &solution.policy[s]).unwrap();
            assert_float_eq!(q, pi.v_star(&s).unwrap(), abs <= 1e-9);
        }
        assert_eq!(pi.q_star(&3, &0), None);
    }

    #[rstest]
    #[case::bad_gamma(vec![0.], vec![((0, 0, 0), 1.)], 1.)]
    #[case::reward_count(vec![0., 1.], vec![((0, 0, 0), 1.)], 0.9)]
    #[case::row_sum(vec![0.], vec![((0, 0, 0), 0.5)], 0.9)]
    #[case::out_of_range(vec![0.], vec![((0, 0, 0), 1.), ((0, 1, 0), 0.)], 0.9)]
    fn invalid_mdps_are_rejected(
        #[case] rewards: Vec<f64>,
        #[case] ts: Vec<((usize, usize, usize), f64)>,
        #[case] gamma: f64,
    ) {
        let ts = ts
            .into_iter()
            .map(|((from, to, action), p)| (TransitionKey { from, to, action }, p))
            .collect();
        assert!(matches!(
            FiniteMdp::new(1, 1, rewards, ts, gamma),
            Err(MdpError::Configuration(_))
        ));
    }
}
