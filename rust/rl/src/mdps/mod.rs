pub mod markov_chain;
pub mod mdp_simulator;
