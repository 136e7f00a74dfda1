// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node invalidation and behavior flags.
//!
//! # Propagation semantics
//!
//! Cache flags travel in one direction and stop at the first node that
//! already carries them, which keeps repeated invalidation O(changed nodes):
//!
//! - **Downward**: [`NodeFlags::INVALID_CONCATENATED_MATRIX`],
//!   [`NodeFlags::INVALID_INVERTED_CONCATENATED_MATRIX`] and
//!   [`NodeFlags::INVALID_CONCATENATED_ALPHA`] are inherited values, so every
//!   descendant must recompute them.
//! - **Upward**: [`NodeFlags::INVALID_BOUNDS`] is an aggregate over the
//!   subtree, so every ancestor must re-measure.
//! - **Local**: [`NodeFlags::INVALID_MATRIX`] and
//!   [`NodeFlags::INVALID_CONTENT_BOUNDS`] only concern the node itself.
//!
//! The [`NodeFlags::DIRTY`] pair records that a node is already queued on
//! its enclosing surface; the validation pass clears it along the path to
//! the root.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// A typed bitset of node flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeFlags(u16);

impl NodeFlags {
    /// No flags.
    pub const EMPTY: Self = Self(0);

    /// Hit tests sample pixels instead of trusting content bounds.
    pub const PIXEL_HIT_TEST: Self = Self(0x1);
    /// Own content bounds must be re-measured.
    pub const INVALID_CONTENT_BOUNDS: Self = Self(0x2);
    /// Cumulative bounds (self + descendants) must be re-measured.
    pub const INVALID_BOUNDS: Self = Self(0x4);
    /// Local matrix must be rebuilt from scale/skew/rotation.
    pub const INVALID_MATRIX: Self = Self(0x8);
    /// Concatenated matrix must be recomputed from the parent.
    pub const INVALID_CONCATENATED_MATRIX: Self = Self(0x10);
    /// Inverse of the concatenated matrix must be recomputed.
    pub const INVALID_INVERTED_CONCATENATED_MATRIX: Self = Self(0x20);
    /// Concatenated alpha must be recomputed from the parent.
    pub const INVALID_CONCATENATED_ALPHA: Self = Self(0x40);
    /// The node renders its subtree through a retained surface.
    pub const CACHE_AS_BITMAP: Self = Self(0x80);
    /// The node's own pixels changed.
    pub const DIRTY_RENDER: Self = Self(0x100);
    /// The node's placement changed, affecting its subtree.
    pub const DIRTY_CHILDREN: Self = Self(0x200);
    /// The node itself can be returned by hit tests.
    pub const TOUCH_ENABLED: Self = Self(0x400);
    /// Hit tests may descend into the node's children.
    pub const TOUCH_CHILDREN: Self = Self(0x800);

    /// Queued for redraw for any reason.
    pub const DIRTY: Self = Self(Self::DIRTY_RENDER.0 | Self::DIRTY_CHILDREN.0);

    /// Set on a subtree whenever it is attached or detached.
    pub const DOWN_ON_ADDED_OR_REMOVED: Self = Self(
        Self::INVALID_CONCATENATED_MATRIX.0
            | Self::INVALID_INVERTED_CONCATENATED_MATRIX.0
            | Self::INVALID_CONCATENATED_ALPHA.0
            | Self::DIRTY_CHILDREN.0,
    );

    /// Initial state of a freshly created node: touchable, every cache
    /// invalid, and already considered dirty.
    pub const INIT: Self = Self(
        Self::TOUCH_ENABLED.0
            | Self::TOUCH_CHILDREN.0
            | Self::INVALID_CONTENT_BOUNDS.0
            | Self::INVALID_BOUNDS.0
            | Self::INVALID_CONCATENATED_MATRIX.0
            | Self::INVALID_INVERTED_CONCATENATED_MATRIX.0
            | Self::INVALID_CONCATENATED_ALPHA.0
            | Self::DIRTY.0,
    );

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` if every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Sets every flag in `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears every flag in `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Sets or clears every flag in `other`.
    #[inline]
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for NodeFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for NodeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeFlags({:#06x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_match_their_parts() {
        assert!(NodeFlags::DIRTY.contains(NodeFlags::DIRTY_RENDER));
        assert!(NodeFlags::DIRTY.contains(NodeFlags::DIRTY_CHILDREN));
        assert_eq!(NodeFlags::DOWN_ON_ADDED_OR_REMOVED.bits(), 0x270);
        assert!(NodeFlags::INIT.contains(NodeFlags::DIRTY));
        assert!(!NodeFlags::INIT.intersects(NodeFlags::PIXEL_HIT_TEST));
    }

    #[test]
    fn insert_and_remove_are_idempotent() {
        let mut f = NodeFlags::EMPTY;
        f.insert(NodeFlags::INVALID_BOUNDS);
        let once = f;
        f.insert(NodeFlags::INVALID_BOUNDS);
        assert_eq!(f, once);
        f.remove(NodeFlags::INVALID_BOUNDS);
        f.remove(NodeFlags::INVALID_BOUNDS);
        assert_eq!(f, NodeFlags::EMPTY);
    }
}
