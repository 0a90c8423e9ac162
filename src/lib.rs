#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications,
    rust_2018_idioms
)]
#![forbid(unsafe_code)]

//! Transitive transfer routing for mutual-credit currency networks.
//!
//! Every participant issues a personal currency, and a transfer between two
//! accounts that hold no direct mutual trust is decomposed into a chain of
//! elementary transfers through trusted intermediaries, each hop bounded by
//! the capacity of a trust edge.
//!
//! [`CapacityGraph`] materializes a bounded-depth snapshot of the trust
//! network around one request, [`MaxFlow`] computes how much of the
//! requested amount is deliverable and on which edges, and [`decompose`]
//! turns the per-edge flows into an ordered, executable [`TransferPlan`].
//! [`Router`] composes the three behind a single entry point.
//!
//! The core is pure and synchronous: it performs no I/O of its own and
//! reaches the outside world only through the injected [`TrustAdapter`].

mod account;
mod algo;
mod amount;
mod error;
mod graph;
mod plan;
mod router;
mod trust;

pub use crate::account::AccountId;
pub use crate::algo::max_flow::{shortest_augmenting_max_flow, MaxFlowError, ShortestAugmenting};
pub use crate::algo::{FlowAssignment, MaxFlow};
pub use crate::amount::Amount;
pub use crate::error::Error;
pub use crate::graph::{CapacityGraph, EdgeData, EdgeIndex, NodeIndex};
pub use crate::plan::{decompose, Transaction, TransferPlan};
pub use crate::router::{Router, TransferRequest};
pub use crate::trust::{
    BalanceFraction, CapacityPolicy, RawTrustRecord, TrustAdapter, TrustRecord, TrustRecordError,
    MAX_LIMIT_PERCENTAGE,
};
