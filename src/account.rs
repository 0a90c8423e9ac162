use core::fmt::Debug;
use core::hash::Hash;

/// A trait representing an account identifier.
///
/// Accounts carry identity only: they must be comparable and hashable but
/// have no mutable state of their own.
pub trait AccountId: Clone + Ord + Hash + Debug {}

impl<T> AccountId for T where T: Clone + Ord + Hash + Debug {}
