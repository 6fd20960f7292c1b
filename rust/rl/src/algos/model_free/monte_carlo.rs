use crate::mdps::mdp_simulator::EpisodeGenerator;
use gridworld::*;
use std::collections::HashMap;
use std::hash::Hash;

/// Monte-Carlo policy evaluation, counting only the first visit to a state per episode.
///
/// Episodes must open with the start state; `ep[t + 1].r` is the reward collected on the
/// move out of `ep[t].s`. States never visited are absent from the result.
pub fn mc_first_visit<S, G>(ep_gen: &mut G, gamma: Continous, n_ep: usize) -> Result<HashMap<S, Continous>>
where
    S: Clone + Eq + Hash,
    G: EpisodeGenerator<S> + ?Sized,
{
    mc_core(ep_gen, gamma, n_ep, true)
}

/// Like [`mc_first_visit`] but averages over every visit.
pub fn mc_every_visit<S, G>(ep_gen: &mut G, gamma: Continous, n_ep: usize) -> Result<HashMap<S, Continous>>
where
    S: Clone + Eq + Hash,
    G: EpisodeGenerator<S> + ?Sized,
{
    mc_core(ep_gen, gamma, n_ep, false)
}

fn mc_core<S, G>(
    ep_gen: &mut G,
    gamma: Continous,
    n_ep: usize,
    first_visit_only: bool,
) -> Result<HashMap<S, Continous>>
where
    S: Clone + Eq + Hash,
    G: EpisodeGenerator<S> + ?Sized,
{
    let mut returns = HashMap::<S, (Continous, usize)>::new();

    for ep in ep_gen.generate(n_ep)?.iter().take(n_ep) {
        let mut g = 0.;
        for t in (0..ep.len().saturating_sub(1)).rev() {
            g = gamma * g + ep[t + 1].r;
            if !first_visit_only || is_first_visit(ep, t) {
                let (sum, visits) = returns.entry(ep[t].s.clone()).or_default();
                *sum += g;
                *visits += 1;
            }
        }
    }

    Ok(returns
        .into_iter()
        .map(|(s, (sum, visits))| (s, sum / visits as Continous))
        .collect())
}

fn is_first_visit<S: PartialEq>(ep: &[EpisodeEvent<S>], t: usize) -> bool {
    !ep.iter().take(t).any(|x| x.s == ep[t].s)
}
