pub mod smart_train;
pub mod toy_grids;
