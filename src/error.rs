use core::fmt::{Debug, Display};

use displaydoc::Display;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum Error<Amt: Display> {
    /// Invalid request where sender and receiver are the same
    TransferToSelf,
    /// Invalid request value, expected positive amount
    NonPositiveValue,
    /// Invalid hop bound, expected at least one hop
    ZeroHopBound,
    /// Failed to build capacity graph: {0}
    GraphBuild(String),
    /// No trust path connects sender and receiver within the hop bound
    NoConnection,
    /// Requested value exceeds the achievable flow of {achievable}
    InsufficientCapacity { achievable: Amt },
    /// Max flow solver specific error: {0}
    Solver(String),
    /// Flow assignment left undischarged flow with no path remaining
    Decomposition,
}

impl<Amt: Debug + Display> std::error::Error for Error<Amt> {}
