//! Fractional order arithmetic.
//!
//! Tasks and columns carry a floating-point `order`. Moving an item assigns it
//! a value strictly between its new neighbors so no sibling has to be
//! rewritten. Repeated insertion into the same slot halves the gap each time;
//! after enough halvings the gap collapses to nothing and the arithmetic
//! starts returning one of the bounds. That is acceptable for human-driven
//! drags and is reported through [`gap_collapsed`] rather than repaired.

use crate::types::{Column, Task};
use std::cmp::Ordering;

/// Order assigned to the first item of an empty sequence
pub const FIRST_ORDER: f64 = 1.0;

/// Anything positioned by a fractional order
pub trait Ordered {
    fn order(&self) -> f64;

    /// Deterministic tie-break key
    fn tie_break(&self) -> &str;
}

impl<T: Ordered + ?Sized> Ordered for &T {
    fn order(&self) -> f64 {
        (**self).order()
    }

    fn tie_break(&self) -> &str {
        (**self).tie_break()
    }
}

impl Ordered for Task {
    fn order(&self) -> f64 {
        self.order
    }

    fn tie_break(&self) -> &str {
        self.id.as_str()
    }
}

impl Ordered for Column {
    fn order(&self) -> f64 {
        self.order
    }

    fn tie_break(&self) -> &str {
        self.id.as_str()
    }
}

/// Which side of the hovered item the dragged item currently sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSide {
    /// Dragged item is above the target; dropping places it below the target
    Before,
    /// Dragged item is below the target; dropping places it above the target
    After,
}

/// Order value for an item placed between `lower` and `upper`.
///
/// - both bounds: their mean
/// - head of the sequence: half of `upper`
/// - tail of the sequence: `lower + 1`
/// - empty sequence: [`FIRST_ORDER`]
pub fn midpoint(lower: Option<f64>, upper: Option<f64>) -> f64 {
    match (lower, upper) {
        (Some(lower), Some(upper)) => (lower + upper) / 2.0,
        // Halving only moves toward zero from above
        (None, Some(upper)) if upper > 0.0 => upper / 2.0,
        (None, Some(upper)) => upper - 1.0,
        (Some(lower), None) => lower + 1.0,
        (None, None) => FIRST_ORDER,
    }
}

/// Total ordering used for rendering: by order, then by id
pub fn compare<T: Ordered>(a: &T, b: &T) -> Ordering {
    a.order()
        .total_cmp(&b.order())
        .then_with(|| a.tie_break().cmp(b.tie_break()))
}

/// Sort ascending by order with the id as tie-break
pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by(compare);
}

/// `Before` when the dragged item's order is below the hovered item's.
///
/// Used once geometry has picked a candidate target but cannot say which half
/// of it the pointer is in.
pub fn compare_for_drop_position(dragged_order: f64, over_order: f64) -> DropSide {
    if dragged_order < over_order {
        DropSide::Before
    } else {
        DropSide::After
    }
}

/// Order for inserting into `siblings` (sorted, without the moved item) so the
/// item ends up at `index`.
pub fn order_at<T: Ordered>(siblings: &[T], index: usize) -> f64 {
    let index = index.min(siblings.len());
    let lower = index
        .checked_sub(1)
        .and_then(|i| siblings.get(i))
        .map(Ordered::order);
    let upper = siblings.get(index).map(Ordered::order);
    midpoint(lower, upper)
}

/// Order for appending after the last sibling
pub fn tail_order<T: Ordered>(siblings: &[T]) -> f64 {
    midpoint(siblings.last().map(Ordered::order), None)
}

/// True when `order` no longer sits clearly between its neighbors.
pub fn gap_collapsed(lower: Option<f64>, order: f64, upper: Option<f64>, min_gap: f64) -> bool {
    let below = lower.is_some_and(|l| order - l < min_gap);
    let above = upper.is_some_and(|u| u - order < min_gap);
    below || above
}
