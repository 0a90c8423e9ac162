use core::fmt::Debug;

use num_traits::Zero;

use crate::account::AccountId;
use crate::amount::Amount;
use crate::graph::{CapacityGraph, EdgeIndex};

pub mod max_flow;

/// Per-edge flows achieved by one max-flow computation.
///
/// Kept apart from the graph as a parallel array keyed by edge index; the
/// graph itself is a read-only snapshot and is never retrofitted with flow
/// state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlowAssignment<Amt> {
    flows: Vec<Amt>,
    value: Amt,
}

impl<Amt: Amount> FlowAssignment<Amt> {
    pub(crate) fn zero(edge_count: usize) -> Self {
        Self {
            flows: vec![Amt::zero(); edge_count],
            value: Amt::zero(),
        }
    }

    /// The value delivered from source to sink.
    pub fn value(&self) -> &Amt {
        &self.value
    }

    pub fn flow(&self, edge: EdgeIndex) -> &Amt {
        &self.flows[edge.index()]
    }

    /// Edges carrying strictly positive flow.
    pub fn positive_flows(&self) -> impl Iterator<Item = (EdgeIndex, &Amt)> + '_ {
        self.flows
            .iter()
            .enumerate()
            .filter(|(_, flow)| !flow.is_zero())
            .map(|(index, flow)| (EdgeIndex::new(index), flow))
    }

    pub(crate) fn flow_mut(&mut self, edge: EdgeIndex) -> &mut Amt {
        &mut self.flows[edge.index()]
    }

    pub(crate) fn flows(&self) -> &[Amt] {
        &self.flows
    }

    pub(crate) fn set_value(&mut self, value: Amt) {
        self.value = value;
    }
}

/// The maximum flow algorithm.
pub trait MaxFlow {
    type AccountId: AccountId;
    type Amount: Amount;
    type Error: Debug;

    /// Run the algorithm over the specified graph and return per-edge flows
    /// whose value is `min(requested, max_flow(graph, source, sink))`.
    ///
    /// Whether a shortfall against `requested` is acceptable is the
    /// caller's decision, not the solver's.
    fn max_flow(
        &self,
        graph: &CapacityGraph<Self::AccountId, Self::Amount>,
        source: &Self::AccountId,
        sink: &Self::AccountId,
        requested: &Self::Amount,
    ) -> Result<FlowAssignment<Self::Amount>, Self::Error>;
}
