//! Document, entry and exit ordering.
//!
//! The comparators follow the reference interpreter's convention: document
//! order sorts *later* declarations first, and entry order sorts deeper
//! nodes first. Exit order is the exact inverse of entry order.

use std::cmp::Ordering;

/// Position of a node in the declared document.
pub trait DocumentPosition {
    /// Depth-first declaration index, unique across the document.
    fn position(&self) -> usize;

    /// Number of ancestors, counting the document root.
    fn depth(&self) -> usize;
}

/// Descending by declaration index.
pub fn document_order<A, B>(a: &A, b: &B) -> Ordering
where
    A: DocumentPosition + ?Sized,
    B: DocumentPosition + ?Sized,
{
    b.position().cmp(&a.position())
}

/// Descending by depth, ties broken by [`document_order`].
pub fn entry_order<A, B>(a: &A, b: &B) -> Ordering
where
    A: DocumentPosition + ?Sized,
    B: DocumentPosition + ?Sized,
{
    b.depth()
        .cmp(&a.depth())
        .then_with(|| document_order(a, b))
}

/// Inverse of [`entry_order`].
pub fn exit_order<A, B>(a: &A, b: &B) -> Ordering
where
    A: DocumentPosition + ?Sized,
    B: DocumentPosition + ?Sized,
{
    entry_order(a, b).reverse()
}
