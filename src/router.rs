use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::algo::MaxFlow;
use crate::error::Error;
use crate::graph::CapacityGraph;
use crate::plan::{decompose, TransferPlan};
use crate::trust::{CapacityPolicy, TrustAdapter};

/// A transfer request as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest<A, Amt> {
    pub from: A,
    pub to: A,
    pub value: Amt,
    /// Maximum hops explored around either endpoint when building the
    /// capacity graph; paths longer than twice this are never considered.
    pub hop_bound: u32,
}

/// Composes graph construction, flow solving and plan decomposition for a
/// single transfer request.
///
/// The router owns no state between calls; every request operates on a
/// fresh snapshot and independent requests may run in parallel.
#[derive(Clone, Debug)]
pub struct Router<T, P, S> {
    adapter: T,
    policy: P,
    solver: S,
}

impl<T, P, S> Router<T, P, S>
where
    T: TrustAdapter,
    P: CapacityPolicy<T>,
    S: MaxFlow<AccountId = T::AccountId, Amount = T::Amount>,
{
    pub fn new(adapter: T, policy: P, solver: S) -> Self {
        Self {
            adapter,
            policy,
            solver,
        }
    }

    /// Builds a capacity graph around the request and routes over it.
    ///
    /// By default a shortfall fails the whole request; callers wanting
    /// partial transfers must ask again with the achievable value reported
    /// in [`Error::InsufficientCapacity`].
    pub fn route(
        &self,
        request: &TransferRequest<T::AccountId, T::Amount>,
    ) -> Result<TransferPlan<T::AccountId, T::Amount>, Error<T::Amount>> {
        Self::validate(request)?;
        let graph = CapacityGraph::build(
            &self.adapter,
            &self.policy,
            &request.from,
            &request.to,
            request.hop_bound,
        )?;
        self.route_with_graph(&graph, request)
    }

    /// Routes over a pre-built snapshot, skipping retrieval.
    pub fn route_with_graph(
        &self,
        graph: &CapacityGraph<T::AccountId, T::Amount>,
        request: &TransferRequest<T::AccountId, T::Amount>,
    ) -> Result<TransferPlan<T::AccountId, T::Amount>, Error<T::Amount>> {
        Self::validate(request)?;

        let assignment = self
            .solver
            .max_flow(graph, &request.from, &request.to, &request.value)
            .map_err(|e| Error::Solver(format!("{e:?}")))?;

        let achieved = assignment.value();
        if achieved < &request.value {
            return Err(if achieved.is_zero() {
                Error::NoConnection
            } else {
                Error::InsufficientCapacity {
                    achievable: achieved.clone(),
                }
            });
        }

        let plan = decompose(graph, &assignment, &request.from, &request.to)?;

        log::info!("----------------------------------");
        log::info!("      requested = {}", request.value);
        log::info!("       achieved = {achieved}");
        log::info!("   transactions = {}", plan.len());

        Ok(plan)
    }

    fn validate(request: &TransferRequest<T::AccountId, T::Amount>) -> Result<(), Error<T::Amount>> {
        if request.from == request.to {
            Err(Error::TransferToSelf)
        } else if request.value.is_zero() {
            Err(Error::NonPositiveValue)
        } else if request.hop_bound == 0 {
            Err(Error::ZeroHopBound)
        } else {
            Ok(())
        }
    }
}
