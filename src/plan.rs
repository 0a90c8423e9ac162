use std::collections::{BTreeMap, VecDeque};

use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::algo::FlowAssignment;
use crate::amount::Amount;
use crate::error::Error;
use crate::graph::{CapacityGraph, EdgeIndex, NodeIndex};

/// One elementary transfer: `from` hands `value` units of
/// `currency_owner`'s personal currency to `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction<A, Amt> {
    pub from: A,
    pub to: A,
    pub value: Amt,
    pub currency_owner: A,
}

/// An ordered list of elementary transfers.
///
/// Paths are emitted whole, sender first, so replaying the plan in order
/// never asks an intermediate node to pay out value it has not yet
/// received.
pub type TransferPlan<A, Amt> = Vec<Transaction<A, Amt>>;

/// Converts per-edge flows into an ordered transfer plan.
///
/// Repeatedly extracts one source-to-sink path of edges with positive
/// remaining flow, emits one transaction per edge at the path bottleneck
/// and subtracts it, until every edge is fully discharged. Zero-value
/// transactions are never emitted.
///
/// A conserving, circulation-free assignment always decomposes completely;
/// remaining flow with no path left means the assignment was corrupt, which
/// is a defect of the solver rather than a user error.
pub fn decompose<A, Amt>(
    graph: &CapacityGraph<A, Amt>,
    assignment: &FlowAssignment<Amt>,
    source: &A,
    sink: &A,
) -> Result<TransferPlan<A, Amt>, Error<Amt>>
where
    A: AccountId,
    Amt: Amount,
{
    let mut remaining = assignment.flows().to_vec();
    let mut plan = Vec::new();

    let (source, sink) = match (graph.node(source), graph.node(sink)) {
        (Some(source), Some(sink)) => (source, sink),
        _ if remaining.iter().all(Zero::is_zero) => return Ok(plan),
        _ => return Err(Error::Decomposition),
    };

    while remaining.iter().any(|flow| !flow.is_zero()) {
        let Some(path) = flow_path(graph, &remaining, source, sink) else {
            return Err(Error::Decomposition);
        };

        let amount = path
            .iter()
            .map(|edge| remaining[edge.index()].clone())
            .min()
            .expect("path has at least one edge");

        for edge in path {
            remaining[edge.index()] -= amount.clone();
            let (from, to) = graph.endpoints(edge);
            log::trace!(
                "{:?} -> {:?}: {} of {:?}",
                graph.account(from),
                graph.account(to),
                amount,
                graph.currency_owner(edge)
            );
            plan.push(Transaction {
                from: graph.account(from).clone(),
                to: graph.account(to).clone(),
                value: amount.clone(),
                currency_owner: graph.currency_owner(edge).clone(),
            });
        }
    }

    Ok(plan)
}

/// A source-to-sink path over edges with positive remaining flow.
fn flow_path<A, Amt>(
    graph: &CapacityGraph<A, Amt>,
    remaining: &[Amt],
    source: NodeIndex,
    sink: NodeIndex,
) -> Option<Vec<EdgeIndex>>
where
    A: AccountId,
    Amt: Amount,
{
    let mut parents: BTreeMap<NodeIndex, (NodeIndex, EdgeIndex)> = BTreeMap::new();
    let mut queue = VecDeque::from([source]);

    'search: while let Some(node) = queue.pop_front() {
        for (edge, next) in graph.edges_from(node) {
            if next != source && !parents.contains_key(&next) && !remaining[edge.index()].is_zero()
            {
                parents.insert(next, (node, edge));
                if next == sink {
                    break 'search;
                }
                queue.push_back(next);
            }
        }
    }

    parents.contains_key(&sink).then(|| {
        let mut path = Vec::new();
        let mut node = sink;
        while node != source {
            let (parent, edge) = parents[&node];
            path.push(edge);
            node = parent;
        }
        path.reverse();
        path
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::algo::max_flow::shortest_augmenting_max_flow;

    use super::*;

    fn route(
        graph: &CapacityGraph<&'static str, u64>,
        source: &'static str,
        sink: &'static str,
        requested: u64,
    ) -> TransferPlan<&'static str, u64> {
        let assignment = shortest_augmenting_max_flow(graph, &source, &sink, &requested).unwrap();
        assert_eq!(assignment.value(), &requested);
        decompose(graph, &assignment, &source, &sink).unwrap()
    }

    /// Replays the plan in order, crediting and debiting per-node value;
    /// the sender starts with exactly the transferred value and nobody may
    /// ever go negative.
    fn replay(
        plan: &TransferPlan<&'static str, u64>,
        source: &'static str,
        sink: &'static str,
        value: u64,
    ) {
        let mut balances: BTreeMap<&str, i128> = BTreeMap::new();
        balances.insert(source, i128::from(value));

        for tx in plan {
            assert!(tx.value > 0, "zero-value transaction emitted");
            *balances.entry(tx.from).or_default() -= i128::from(tx.value);
            assert!(
                *balances.get(tx.from).unwrap() >= 0,
                "{} paid out value it does not hold",
                tx.from
            );
            *balances.entry(tx.to).or_default() += i128::from(tx.value);
        }

        assert_eq!(balances.remove(sink), Some(i128::from(value)));
        assert!(balances.into_values().all(|balance| balance == 0));
    }

    #[test]
    fn single_edge_yields_a_single_transaction() {
        let mut graph = CapacityGraph::new();
        graph.add_edge("s", "t", 10, "s");

        let plan = route(&graph, "s", "t", 7);

        assert_eq!(
            plan,
            vec![Transaction {
                from: "s",
                to: "t",
                value: 7,
                currency_owner: "s",
            }]
        );
    }

    #[test]
    fn carries_the_currency_owner_of_each_hop() {
        let mut graph = CapacityGraph::new();
        graph.add_edge("s", "a", 10, "s");
        graph.add_edge("a", "t", 10, "a");

        let plan = route(&graph, "s", "t", 10);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].currency_owner, "s");
        assert_eq!(plan[1].currency_owner, "a");
        replay(&plan, "s", "t", 10);
    }

    #[test]
    fn split_flow_replays_solvently() {
        // the corridor splits at a and rejoins at t; the plan must not ask
        // a to forward value before it has arrived
        let mut graph = CapacityGraph::new();
        graph.add_edge("s", "a", 10, "s");
        graph.add_edge("a", "b", 6, "a");
        graph.add_edge("a", "t", 4, "a");
        graph.add_edge("b", "t", 6, "b");

        let plan = route(&graph, "s", "t", 10);

        replay(&plan, "s", "t", 10);
    }

    #[test]
    fn empty_assignment_decomposes_to_an_empty_plan() {
        let mut graph = CapacityGraph::<&str, u64>::new();
        graph.add_edge("s", "t", 10, "s");

        let assignment = shortest_augmenting_max_flow(&graph, &"s", &"t", &0).unwrap();
        let plan = decompose(&graph, &assignment, &"s", &"t").unwrap();

        assert!(plan.is_empty());
    }

    #[test]
    fn stranded_flow_is_an_invariant_violation() {
        let mut graph = CapacityGraph::<&str, u64>::new();
        let edge = graph.add_edge("a", "b", 10, "a");
        graph.add_edge("s", "t", 10, "s");

        // an assignment claiming flow on an edge unreachable from the
        // source cannot be discharged
        let mut assignment = FlowAssignment::zero(graph.edge_count());
        *assignment.flow_mut(edge) = 3;

        assert_eq!(
            decompose(&graph, &assignment, &"s", &"t"),
            Err(Error::Decomposition)
        );
    }
}
