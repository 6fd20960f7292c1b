//! Loader for the `.mdp` text map format.
//!
//! ```text
//! rows cols
//! rows lines of `cols` pairs: type reward      (type: 0 inaccessible, 1 accessible, 2 terminal)
//! 8 x 3 lines of 3 probabilities               (one 3x3 kernel per action, N first)
//! ```
//!
//! Map line `i` holds the cells with `y = i`; kernels use the [`KernelModel`] orientation.

use crate::*;
use ndarray::Array2;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub fn parse_map(text: &str) -> Result<GridWorld> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let mut next_line = |what: &str| {
        lines.next().ok_or_else(|| MdpError::Parse {
            line: text.lines().count() + 1,
            reason: format!("Unexpected end of input, expected {what}."),
        })
    };

    let (line, header) = next_line("the `rows cols` header")?;
    let header = tokens::<usize>(line, header, 2)?;
    let (rows, cols) = (header[0], header[1]);
    if rows == 0 || cols == 0 {
        return Err(MdpError::Parse {
            line,
            reason: format!("Grid must not be empty, got {rows}x{cols}."),
        });
    }

    let mut types = Vec::with_capacity(rows * cols);
    let mut rewards = Vec::with_capacity(rows * cols);
    for y in 0..rows {
        let (line, row) = next_line(&format!("map row {y}"))?;
        let pairs = row.split_whitespace().collect::<Vec<_>>();
        if pairs.len() != 2 * cols {
            return Err(MdpError::Parse {
                line,
                reason: format!("Expected {} tokens, found {}.", 2 * cols, pairs.len()),
            });
        }

        for pair in pairs.chunks_exact(2) {
            let ty = parse_token::<Discrete>(line, pair[0])
                .and_then(|code| {
                    CellType::from_code(code).ok_or_else(|| MdpError::Parse {
                        line,
                        reason: format!("Unknown cell type {code}."),
                    })
                })?;
            types.push(ty);
            rewards.push(parse_token::<f64>(line, pair[1])?);
        }
    }

    let mut kernels = Vec::with_capacity(Action::ALL.len());
    for a in Action::ALL {
        let mut probs = Vec::with_capacity(9);
        for r in 0..3 {
            let (line, row) = next_line(&format!("row {r} of the {a} kernel"))?;
            probs.extend(tokens::<Continous>(line, row, 3)?);
        }
        kernels.push(to_array((3, 3), probs)?);
    }

    if let Some((line, _)) = lines.next() {
        return Err(MdpError::Parse {
            line,
            reason: "Unexpected content after the last kernel.".into(),
        });
    }

    GridWorld::new(
        to_array((rows, cols), types)?,
        to_array((rows, cols), rewards)?,
        KernelModel::new(kernels)?,
    )
}

fn parse_token<T: FromStr>(line: usize, token: &str) -> Result<T> {
    token.parse::<T>().map_err(|_| MdpError::Parse {
        line,
        reason: format!("Cannot parse '{token}'."),
    })
}

fn tokens<T: FromStr>(line: usize, text: &str, n: usize) -> Result<Vec<T>> {
    let ts = text
        .split_whitespace()
        .map(|t| parse_token::<T>(line, t))
        .collect::<Result<Vec<_>>>()?;
    if ts.len() != n {
        return Err(MdpError::Parse {
            line,
            reason: format!("Expected {n} values, found {}.", ts.len()),
        });
    }

    Ok(ts)
}

fn to_array<T>(shape: (usize, usize), data: Vec<T>) -> Result<Array2<T>> {
    Array2::from_shape_vec(shape, data).map_err(|e| MdpError::configuration(e.to_string()))
}

/// Where a map comes from: a local file or an `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapSource {
    File(PathBuf),
    Url(String),
}

impl MapSource {
    pub fn read_to_string(&self) -> Result<String> {
        match self {
            MapSource::File(path) => Ok(std::fs::read_to_string(path)?),
            MapSource::Url(url) => {
                let client = reqwest::blocking::Client::builder().build()?;
                Ok(client.get(url).send()?.error_for_status()?.text()?)
            }
        }
    }

    pub fn load(&self) -> Result<GridWorld> {
        let world = parse_map(&self.read_to_string()?)?;
        info!(source = %self, rows = world.rows(), cols = world.cols(), "Loaded map");

        Ok(world)
    }
}

impl FromStr for MapSource {
    type Err = MdpError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(MdpError::configuration("Empty map location."));
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(MapSource::Url(s.to_string()))
        } else {
            Ok(MapSource::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapSource::File(path) => write!(f, "{}", path.display()),
            MapSource::Url(url) => f.write_str(url),
        }
    }
}
