pub mod defs;
pub mod utils;
