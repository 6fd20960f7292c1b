use crate::Cell;

pub type Result<T> = std::result::Result<T, MdpError>;

#[derive(Debug, thiserror::Error)]
pub enum MdpError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cell {cell} is outside the {cols}x{rows} grid")]
    OutOfBounds { cell: Cell, cols: usize, rows: usize },

    #[error("No convergence after {iterations} iterations (residual {residual:e})")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("Malformed map at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),
}

impl MdpError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}
