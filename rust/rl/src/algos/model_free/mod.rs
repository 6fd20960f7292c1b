pub mod monte_carlo;
pub mod q_learning;
