use std::collections::{BTreeMap, BTreeSet};

use itertools::process_results;
use num_traits::Zero;
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

pub use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::account::AccountId;
use crate::amount::Amount;
use crate::error::Error;
use crate::trust::{CapacityPolicy, TrustAdapter, TrustRecord};

/// Payload of one directed trust edge: how much of whose currency may be
/// relayed along it in the current snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeData<A, Amt> {
    pub capacity: Amt,
    pub currency_owner: A,
}

/// A per-request snapshot of the trust network around one transfer.
///
/// Nodes and edges live in an index-addressed arena; adjacency is kept as
/// indices rather than references, so flow bookkeeping can run in parallel
/// arrays keyed by [`EdgeIndex`] without ever mutating the graph. Parallel
/// edges between the same pair of nodes are permitted when they carry
/// different currencies, and are never merged.
///
/// Capacities are computed from live balances at build time and are only
/// valid for the duration of one routing attempt.
#[derive(Clone, Debug, Default)]
pub struct CapacityGraph<A: AccountId, Amt> {
    graph: DiGraph<A, EdgeData<A, Amt>>,
    nodes: BTreeMap<A, NodeIndex>,
}

impl<A, Amt> CapacityGraph<A, Amt>
where
    A: AccountId,
    Amt: Amount,
{
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Materializes the capacity graph for one routing request.
    ///
    /// The adapter is queried once around the sender and once around the
    /// receiver, so only nodes within `hop_bound` hops of either endpoint
    /// enter the snapshot; paths longer than `2 x hop_bound` are out of
    /// scope by construction. A sender and receiver that end up
    /// disconnected is a legitimate, representable graph, not an error.
    pub fn build<T, P>(
        adapter: &T,
        policy: &P,
        source: &A,
        sink: &A,
        hop_bound: u32,
    ) -> Result<Self, Error<Amt>>
    where
        T: TrustAdapter<AccountId = A, Amount = Amt>,
        P: CapacityPolicy<T>,
    {
        let raw = process_results(
            [source, sink].into_iter().map(|node| {
                adapter
                    .trust_edges(node, hop_bound)
                    .map_err(|e| Error::GraphBuild(format!("{e}")))
            }),
            |iter| iter.flatten().collect::<Vec<_>>(),
        )?;

        // validate and dedupe; the same record is typically reachable from
        // both endpoints
        let records = raw
            .into_iter()
            .map(|r| TrustRecord::try_from(r).map_err(|e| Error::GraphBuild(format!("{e}"))))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut graph = Self::new();
        for record in &records {
            let capacity = policy
                .edge_capacity(adapter, record)
                .map_err(|e| Error::GraphBuild(format!("{e}")))?;
            if capacity.is_zero() {
                log::trace!(
                    "no capacity on {:?} -> {:?}, skipping",
                    record.trustee(),
                    record.truster()
                );
                continue;
            }
            graph.add_edge(
                record.trustee().clone(),
                record.truster().clone(),
                capacity,
                record.trustee().clone(),
            );
        }

        log::debug!(
            "capacity graph for {source:?} -> {sink:?}: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(graph)
    }

    /// Adds a directed edge, interning both endpoints.
    ///
    /// Capacities of edges with identical endpoints and currency owner are
    /// summed onto a single edge; differing currency owners stay parallel.
    pub fn add_edge(&mut self, from: A, to: A, capacity: Amt, currency_owner: A) -> EdgeIndex {
        let from = self.intern(from);
        let to = self.intern(to);

        let existing = self
            .graph
            .edges_connecting(from, to)
            .find(|e| e.weight().currency_owner == currency_owner)
            .map(|e| e.id());
        match existing {
            Some(edge) => {
                self.graph[edge].capacity += capacity;
                edge
            }
            None => self.graph.add_edge(
                from,
                to,
                EdgeData {
                    capacity,
                    currency_owner,
                },
            ),
        }
    }

    fn intern(&mut self, account: A) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&account) {
            return index;
        }
        let index = self.graph.add_node(account.clone());
        self.nodes.insert(account, index);
        index
    }

    /// Index of `account`, if it appears on any edge.
    pub fn node(&self, account: &A) -> Option<NodeIndex> {
        self.nodes.get(account).copied()
    }

    pub fn account(&self, node: NodeIndex) -> &A {
        &self.graph[node]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        self.graph.edge_indices()
    }

    pub fn capacity(&self, edge: EdgeIndex) -> &Amt {
        &self.graph[edge].capacity
    }

    pub fn currency_owner(&self, edge: EdgeIndex) -> &A {
        &self.graph[edge].currency_owner
    }

    pub fn endpoints(&self, edge: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.graph
            .edge_endpoints(edge)
            .expect("edge index issued by this graph")
    }

    /// Outgoing edges of `node` as `(edge, target)` pairs.
    pub fn edges_from(&self, node: NodeIndex) -> impl Iterator<Item = (EdgeIndex, NodeIndex)> + '_ {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
    }

    /// Incoming edges of `node` as `(edge, source)` pairs.
    pub fn edges_into(&self, node: NodeIndex) -> impl Iterator<Item = (EdgeIndex, NodeIndex)> + '_ {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.id(), e.source()))
    }
}
