use core::fmt::{Debug, Display};

use displaydoc::Display;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::amount::Amount;

/// Largest expressible trust limit, in percent.
pub const MAX_LIMIT_PERCENTAGE: u8 = 100;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum TrustRecordError {
    /// Invalid trust record where truster and trustee are the same
    TrustToSelf,
    /// Invalid trust limit, expected a percentage of at most 100
    LimitOutOfRange,
}

/// A trust relationship as retrieved from the registry, not yet validated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawTrustRecord<A> {
    pub truster: A,
    pub trustee: A,
    pub limit_percentage: u8,
}

/// A validated trust relationship: `truster` accepts `trustee`'s personal
/// currency up to `limit_percentage` percent of a policy-defined balance.
///
/// Trust is directional. A record `A trusts B` permits value to move from
/// `B` to `A` and says nothing about the reverse direction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(
    try_from = "RawTrustRecord<A>",
    bound(deserialize = "A: PartialEq + Deserialize<'de>")
)]
pub struct TrustRecord<A> {
    truster: A,
    trustee: A,
    limit_percentage: u8,
}

impl<A> TrustRecord<A>
where
    A: PartialEq,
{
    pub fn new(truster: A, trustee: A, limit_percentage: u8) -> Result<Self, TrustRecordError> {
        if truster == trustee {
            Err(TrustRecordError::TrustToSelf)
        } else if limit_percentage > MAX_LIMIT_PERCENTAGE {
            Err(TrustRecordError::LimitOutOfRange)
        } else {
            Ok(Self {
                truster,
                trustee,
                limit_percentage,
            })
        }
    }

    pub fn truster(&self) -> &A {
        &self.truster
    }

    pub fn trustee(&self) -> &A {
        &self.trustee
    }

    pub fn limit_percentage(&self) -> u8 {
        self.limit_percentage
    }
}

impl<A> TryFrom<RawTrustRecord<A>> for TrustRecord<A>
where
    A: PartialEq,
{
    type Error = TrustRecordError;

    fn try_from(r: RawTrustRecord<A>) -> Result<Self, Self::Error> {
        Self::new(r.truster, r.trustee, r.limit_percentage)
    }
}

impl<A> From<TrustRecord<A>> for RawTrustRecord<A> {
    fn from(r: TrustRecord<A>) -> Self {
        Self {
            truster: r.truster,
            trustee: r.trustee,
            limit_percentage: r.limit_percentage,
        }
    }
}

/// Capability interface over the external trust registry and balance source.
///
/// The registry is effectively global, shared state; the core only ever sees
/// it through this trait, which keeps routing deterministic under test and
/// free of ambient dependencies.
pub trait TrustAdapter {
    type AccountId: AccountId;
    type Amount: Amount;
    type Error: Debug + Display;

    /// All trust records involving nodes within `hop_bound` hops of `node`.
    ///
    /// The adapter owns the reachability cut: records whose endpoints lie
    /// outside the bound must not be returned.
    fn trust_edges(
        &self,
        node: &Self::AccountId,
        hop_bound: u32,
    ) -> Result<Vec<RawTrustRecord<Self::AccountId>>, Self::Error>;

    /// `holder`'s current balance of `currency_owner`'s personal currency.
    fn balance(
        &self,
        holder: &Self::AccountId,
        currency_owner: &Self::AccountId,
    ) -> Result<Self::Amount, Self::Error>;
}

/// Converts a validated trust record into a directed edge capacity.
///
/// The percentage-to-capacity rule differs between deployments, so it is a
/// policy rather than a constant of the system. Whatever the rule, the
/// resulting capacity is fixed for the duration of one solve; it is
/// recomputed from live balances on every graph build and never cached
/// across requests.
pub trait CapacityPolicy<T: TrustAdapter> {
    /// Capacity of the edge `trustee -> truster` carrying the trustee's
    /// personal currency.
    fn edge_capacity(
        &self,
        adapter: &T,
        record: &TrustRecord<T::AccountId>,
    ) -> Result<T::Amount, T::Error>;
}

/// Default policy: the trust limit is a percentage of the trustee's
/// currently held balance of their own currency, truncated to an integer.
#[derive(Clone, Copy, Debug, Default)]
pub struct BalanceFraction;

impl<T: TrustAdapter> CapacityPolicy<T> for BalanceFraction {
    fn edge_capacity(
        &self,
        adapter: &T,
        record: &TrustRecord<T::AccountId>,
    ) -> Result<T::Amount, T::Error> {
        let balance = adapter.balance(record.trustee(), record.trustee())?;
        let percentage = T::Amount::from(u32::from(record.limit_percentage()));
        Ok(balance * percentage / T::Amount::from(100))
    }
}
