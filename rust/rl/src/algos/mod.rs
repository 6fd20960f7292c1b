pub mod model_based;
pub mod model_free;
