use thiserror::Error;

/// Failures of the k-space numerical kernels.
///
/// These are precondition/postcondition violations of pure numerics; nothing
/// is retried internally. The caller owns any restart policy, e.g. re-running
/// the equilibrium solve from a different initial guess.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum KSpaceError {
    /// Newton-Raphson did not reach its relative-step tolerance within the
    /// configured iteration cap.
    #[error(
        "equilibrium solve did not converge after {iterations} iterations \
         (last relative step {last_step:e})"
    )]
    NonConvergence { iterations: usize, last_step: f64 },

    /// A division the discretization should have made impossible: a
    /// zero-magnitude group velocity or a zero equilibrium-energy derivative.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
}

pub type Result<T> = std::result::Result<T, KSpaceError>;
