// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned screen regions.
//!
//! A [`Region`] is the on-screen footprint of a node or a retained surface in
//! global (stage) pixels. Regions are snapped outward to whole pixels with a
//! one-pixel fringe so antialiased edges are always covered by the redraw.

use kurbo::{Affine, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Pixel fringe added around every transformed bounds rectangle.
const AA_FRINGE: f64 = 1.0;

/// An axis-aligned rectangle in global pixel space.
///
/// `moved` records that the owner's matrix or bounds changed since the region
/// was last recomputed; the validation pass consumes it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Region {
    /// Left edge.
    pub min_x: f64,
    /// Top edge.
    pub min_y: f64,
    /// Right edge.
    pub max_x: f64,
    /// Bottom edge.
    pub max_y: f64,
    /// Owner moved since the last `update_region`.
    pub moved: bool,
}

impl Region {
    /// The empty region at the origin.
    pub const EMPTY: Self = Self {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 0.0,
        max_y: 0.0,
        moved: false,
    };

    /// Creates a region from its edges.
    #[inline]
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            moved: false,
        }
    }

    /// Creates a region covering `rect`.
    #[inline]
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.x1, rect.y1)
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area in square pixels; zero for empty regions.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    /// Returns `true` if the region covers no pixels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }

    /// Returns the region as a `kurbo` rectangle.
    #[inline]
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Copies the edges of `other` into `self`.
    #[inline]
    pub fn set_to(&mut self, other: &Self) {
        self.min_x = other.min_x;
        self.min_y = other.min_y;
        self.max_x = other.max_x;
        self.max_y = other.max_y;
    }

    /// Collapses the region to [`Region::EMPTY`] edges.
    #[inline]
    pub fn set_empty(&mut self) {
        self.min_x = 0.0;
        self.min_y = 0.0;
        self.max_x = 0.0;
        self.max_y = 0.0;
    }

    /// Grows `self` to the bounding box of `self` and `other`.
    pub fn union(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Area of the bounding box of `self` and `other`, without mutating.
    #[must_use]
    pub fn union_area(&self, other: &Self) -> f64 {
        let width = self.max_x.max(other.max_x) - self.min_x.min(other.min_x);
        let height = self.max_y.max(other.max_y) - self.min_y.min(other.min_y);
        width * height
    }

    /// Shrinks `self` to its overlap with `other`, or to empty.
    pub fn intersect(&mut self, other: &Self) {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        if min_x >= max_x || min_y >= max_y {
            self.set_empty();
        } else {
            self.min_x = min_x;
            self.min_y = min_y;
            self.max_x = max_x;
            self.max_y = max_y;
        }
    }

    /// Returns `true` if the two regions overlap or share an edge.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min_x.max(other.min_x) <= self.max_x.min(other.max_x)
            && self.min_y.max(other.min_y) <= self.max_y.min(other.max_y)
    }

    /// Snaps the edges outward to whole pixels.
    pub fn snap_outward(&mut self) {
        self.min_x = self.min_x.floor();
        self.min_y = self.min_y.floor();
        self.max_x = self.max_x.ceil();
        self.max_y = self.max_y.ceil();
    }

    /// Recomputes the region as the pixel footprint of `bounds` under
    /// `matrix`.
    ///
    /// Degenerate bounds produce an empty region.
    pub fn update_region(&mut self, bounds: Rect, matrix: Affine) {
        if bounds.width() == 0.0 || bounds.height() == 0.0 {
            self.set_empty();
            return;
        }
        let bbox = matrix.transform_rect_bbox(bounds);
        self.min_x = bbox.x0 - AA_FRINGE;
        self.min_y = bbox.y0 - AA_FRINGE;
        self.max_x = bbox.x1 + AA_FRINGE;
        self.max_y = bbox.y1 + AA_FRINGE;
        self.snap_outward();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(outer: &Region, inner: &Region) -> bool {
        outer.min_x <= inner.min_x
            && outer.min_y <= inner.min_y
            && outer.max_x >= inner.max_x
            && outer.max_y >= inner.max_y
    }

    #[test]
    fn union_is_commutative_associative_and_covering() {
        let a = Region::new(0.0, 0.0, 10.0, 10.0);
        let b = Region::new(5.0, -3.0, 20.0, 4.0);
        let c = Region::new(-8.0, 12.0, -2.0, 30.0);

        let mut ab = a;
        ab.union(&b);
        let mut ba = b;
        ba.union(&a);
        assert_eq!(ab, ba, "commutative");
        assert!(contains(&ab, &a) && contains(&ab, &b), "covers operands");

        let mut ab_c = ab;
        ab_c.union(&c);
        let mut bc = b;
        bc.union(&c);
        let mut a_bc = a;
        a_bc.union(&bc);
        assert_eq!(ab_c, a_bc, "associative");
    }

    #[test]
    fn intersect_to_empty_clears_edges() {
        let mut a = Region::new(0.0, 0.0, 10.0, 10.0);
        a.intersect(&Region::new(20.0, 20.0, 30.0, 30.0));
        assert!(a.is_empty());
        assert_eq!(a.area(), 0.0);

        let mut b = Region::new(0.0, 0.0, 10.0, 10.0);
        b.intersect(&Region::new(5.0, 5.0, 30.0, 30.0));
        assert_eq!(b, Region::new(5.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn intersects_counts_shared_edges_but_not_empties() {
        let a = Region::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Region::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!a.intersects(&Region::new(10.5, 0.0, 20.0, 10.0)));
        assert!(!a.intersects(&Region::EMPTY));
    }

    #[test]
    fn update_region_snaps_with_fringe() {
        let mut r = Region::EMPTY;
        r.update_region(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Affine::translate((0.5, 0.25)),
        );
        assert_eq!(r, Region::new(-1.0, -1.0, 12.0, 12.0));

        r.update_region(Rect::new(0.0, 0.0, 0.0, 10.0), Affine::IDENTITY);
        assert!(r.is_empty(), "degenerate bounds");
    }

    #[test]
    fn update_region_covers_rotated_bounds() {
        let mut r = Region::EMPTY;
        r.update_region(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Affine::rotate(core::f64::consts::FRAC_PI_4),
        );
        let half_diag = 10.0 * core::f64::consts::FRAC_1_SQRT_2;
        assert!(r.min_x <= -half_diag && r.max_x >= half_diag);
        assert!(r.min_y <= 0.0 && r.max_y >= 2.0 * half_diag);
    }
}
