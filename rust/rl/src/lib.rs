pub mod algos;
pub mod config;
pub mod envs;
pub mod mdps;
