use gridworld::common::utils::*;
use gridworld::*;
use nalgebra::{DMatrix, DVector};

/// A finite Markov chain `x(t+1) = T x(t)` with a column-stochastic `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovChain {
    t: DMatrix<Continous>,
}

impl MarkovChain {
    pub fn new(t: DMatrix<Continous>) -> Result<Self> {
        if t.is_empty() || !t.is_square() {
            return Err(MdpError::configuration(format!(
                "Transition matrix must be square and non-empty, got {}x{}.",
                t.nrows(),
                t.ncols()
            )));
        }
        if t.iter().any(|p| !p.is_finite() || *p < 0.) {
            return Err(MdpError::configuration(
                "Transition probabilities must be finite and non-negative.",
            ));
        }
        if let Some(j) = (0..t.ncols()).find(|&j| !sums_to_one(t.column(j).iter())) {
            return Err(MdpError::configuration(format!(
                "Column {j} sums to {}.",
                t.column(j).sum()
            )));
        }

        Ok(Self { t })
    }

    /// Rows of `T`, as the chain is usually written down.
    pub fn from_rows(n: usize, rows: &[Continous]) -> Result<Self> {
        if rows.len() != n * n {
            return Err(MdpError::configuration(format!(
                "Expected {} entries, got {}.",
                n * n,
                rows.len()
            )));
        }

        Self::new(DMatrix::from_row_slice(n, n, rows))
    }

    pub fn n_s(&self) -> usize {
        self.t.nrows()
    }

    pub fn matrix(&self) -> &DMatrix<Continous> {
        &self.t
    }

    fn check_distribution(&self, x: &DVector<Continous>) -> Result<()> {
        if x.len() != self.n_s() || !sums_to_one(x.iter()) || x.iter().any(|p| *p < 0.) {
            return Err(MdpError::configuration(format!(
                "{:?} is not a distribution over {} states.",
                x.as_slice(),
                self.n_s()
            )));
        }

        Ok(())
    }

    pub fn step(&self, x: &DVector<Continous>) -> Result<DVector<Continous>> {
        self.check_distribution(x)?;

        Ok(&self.t * x)
    }

    /// `Tⁿ x0`.
    pub fn distribution_after(&self, x0: &DVector<Continous>, n: usize) -> Result<DVector<Continous>> {
        self.check_distribution(x0)?;

        Ok((0..n).fold(x0.clone(), |x, _| &self.t * x))
    }

    /// `x0, T x0, T² x0, ...`, without end.
    pub fn evolve(&self, x0: DVector<Continous>) -> Result<impl Iterator<Item = DVector<Continous>> + '_> {
        self.check_distribution(&x0)?;

        Ok(std::iter::successors(Some(x0), move |x| Some(&self.t * x)))
    }

    /// The distribution with `T x = x`, from `(T - I) x = 0` with the last equation
    /// replaced by `Σ x = 1`.
    pub fn stationary_distribution(&self) -> Result<DVector<Continous>> {
        let n = self.n_s();
        let mut a = &self.t - DMatrix::identity(n, n);
        a.row_mut(n - 1).fill(1.);
        let mut b = DVector::zeros(n);
        b[n - 1] = 1.;

        a.lu().solve(&b).ok_or_else(|| {
            MdpError::configuration("The chain has no unique stationary distribution.")
        })
    }
}
