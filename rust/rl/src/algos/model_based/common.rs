use gridworld::*;

/// Result of an iterative solver, including runs stopped by an iteration cap.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub iterations: usize,
    /// Sup-norm change of the last iteration; infinite if none ran.
    pub residual: Continous,
    pub converged: bool,
}

impl<T> Outcome<T> {
    /// The value if the convergence test passed, [`MdpError::NonConvergence`] otherwise.
    pub fn into_converged(self) -> Result<T> {
        if self.converged {
            Ok(self.value)
        } else {
            Err(MdpError::NonConvergence {
                iterations: self.iterations,
                residual: self.residual,
            })
        }
    }
}

/// Discount factors must lie in the open interval (0, 1); at 1 the stopping bound is
/// undefined and the Bellman backup is no longer a contraction.
pub fn check_discount(gamma: Continous) -> Result<()> {
    if gamma > 0. && gamma < 1. {
        Ok(())
    } else {
        Err(MdpError::configuration(format!(
            "Discount factor {gamma} is not in (0, 1)."
        )))
    }
}

pub fn check_positive(name: &str, x: Continous) -> Result<()> {
    if x > 0. && x.is_finite() {
        Ok(())
    } else {
        Err(MdpError::configuration(format!(
            "{name} must be positive and finite, got {x}."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.5, true)]
    #[case(0.999, true)]
    #[case(0., false)]
    #[case(1., false)]
    #[case(-0.3, false)]
    #[case(f64::NAN, false)]
    fn discount_range(#[case] gamma: f64, #[case] ok: bool) {
        assert_eq!(check_discount(gamma).is_ok(), ok);
    }

    #[test]
    fn capped_outcomes_become_errors() {
        let o = Outcome {
            value: 3,
            iterations: 10,
            residual: 0.5,
            converged: false,
        };
        assert!(matches!(
            o.clone().into_converged(),
            Err(MdpError::NonConvergence { iterations: 10, .. })
        ));

        let o = Outcome { converged: true, ..o };
        assert_eq!(o.into_converged().unwrap(), 3);
    }
}
