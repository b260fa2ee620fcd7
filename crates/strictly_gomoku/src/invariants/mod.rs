//! First-class invariants over [`MatchState`](crate::MatchState).
//!
//! Invariants are logical properties that must hold after every accepted
//! action. The engine checks them in debug builds before committing a
//! transition.

mod history_consistent;
mod ledger_bounds;
mod placement_order;
mod swap2_consistent;

pub use history_consistent::HistoryConsistentInvariant;
pub use ledger_bounds::LedgerBoundsInvariant;
pub use placement_order::PlacementOrderInvariant;
pub use swap2_consistent::Swap2ConsistentInvariant;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implemented for tuples of up to four invariants.
pub trait InvariantSet<S> {
    /// Checks every invariant, collecting all violations.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! impl_invariant_set {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>,)+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let mut violations = Vec::new();
                $(
                    if !$inv::holds(state) {
                        violations.push(InvariantViolation::new($inv::description()));
                    }
                )+
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

impl_invariant_set!(I1, I2);
impl_invariant_set!(I1, I2, I3);
impl_invariant_set!(I1, I2, I3, I4);

/// Every match invariant as one composable set.
pub type MatchInvariants = (
    PlacementOrderInvariant,
    HistoryConsistentInvariant,
    LedgerBoundsInvariant,
    Swap2ConsistentInvariant,
);
