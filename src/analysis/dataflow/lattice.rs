//! Lattice trait for data flow analysis.
//!
//! A lattice defines how abstract facts combine where control flow paths
//! meet. Every fact type of this crate is a meet semi-lattice whose top
//! element means "no path has reached this point yet".
//!
//! # Lattice Theory Background
//!
//! - **Partial Order**: Facts can be compared (≤)
//! - **Meet (∧)**: Greatest lower bound of two facts
//! - **Top (⊤)**: Identity of meet, the seed of every non-head position
//!
//! A solver terminates if every transfer function is monotone and the lattice
//! has finite height. The solver also enforces an iteration budget so that a
//! broken analysis fails with [`Error::NoFixedPoint`](crate::Error::NoFixedPoint)
//! rather than looping.

use std::fmt::Debug;

/// A meet semi-lattice with a meet (greatest lower bound) operation.
///
/// The meet operation combines information from multiple control flow paths.
/// It must satisfy:
///
/// - **Idempotent**: `x.meet(x) = x`
/// - **Commutative**: `x.meet(y) = y.meet(x)`
/// - **Associative**: `x.meet(y.meet(z)) = (x.meet(y)).meet(z)`
///
/// # Examples
///
/// ```rust,ignore
/// use shaderlift::analysis::MeetSemiLattice;
///
/// impl MeetSemiLattice for ConstantLattice {
///     fn meet(&self, other: &Self) -> Self {
///         match (self, other) {
///             (Self::Top, x) | (x, Self::Top) => x.clone(),
///             (Self::Const(a), Self::Const(b)) if a == b => Self::Const(*a),
///             _ => Self::Bottom,
///         }
///     }
/// }
/// ```
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Computes the meet (greatest lower bound) of two lattice elements.
    ///
    /// The meet represents combining information from two paths that merge.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum ConstLattice {
        Top,
        Value(i32),
        Bottom,
    }

    impl MeetSemiLattice for ConstLattice {
        fn meet(&self, other: &Self) -> Self {
            match (self, other) {
                (Self::Top, x) | (x, Self::Top) => x.clone(),
                (Self::Value(a), Self::Value(b)) if a == b => Self::Value(*a),
                _ => Self::Bottom,
            }
        }
    }

    #[test]
    fn test_meet_laws() {
        let values = [
            ConstLattice::Top,
            ConstLattice::Value(1),
            ConstLattice::Value(2),
            ConstLattice::Bottom,
        ];
        for a in &values {
            assert_eq!(a.meet(a), *a);
            assert_eq!(ConstLattice::Top.meet(a), *a);
            for b in &values {
                assert_eq!(a.meet(b), b.meet(a));
                for c in &values {
                    assert_eq!(a.meet(&b.meet(c)), a.meet(b).meet(c));
                }
            }
        }
    }
}
