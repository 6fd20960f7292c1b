use gridworld::*;

pub const PROBLEM_MAP: &str = include_str!("../../../../data/problem.mdp");

#[allow(dead_code)]
pub fn problem_world() -> GridWorld {
    parse_map(PROBLEM_MAP).unwrap()
}

#[allow(dead_code)]
pub fn probability_of(ts: &[Transition], cell: Cell) -> f64 {
    ts.iter()
        .filter(|t| t.next_state == cell)
        .map(|t| t.probability)
        .sum()
}
