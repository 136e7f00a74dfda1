// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local transform setters.
//!
//! The local [`Affine`] is the source of truth. Scale, skew and rotation
//! setters edit the decomposed values and mark
//! [`INVALID_MATRIX`](NodeFlags::INVALID_MATRIX); the matrix is rebuilt the
//! next time it is read. Every setter is a no-op when the value is unchanged.

use core::f64::consts::PI;

use kurbo::Affine;

use super::flags::NodeFlags;
use super::id::NodeId;
use super::store::SceneGraph;
use crate::matrix::{Decomposed, base_height, base_width, clamp_rotation};

#[inline]
fn to_radians(degrees: f64) -> f64 {
    degrees / 180.0 * PI
}

#[inline]
fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / PI
}

/// Keeps a mirrored axis mirrored when its magnitude is re-solved.
#[inline]
fn with_sign_of(magnitude: f64, sign: f64) -> f64 {
    if sign < 0.0 { -magnitude } else { magnitude }
}

impl SceneGraph {
    /// Returns the local matrix, rebuilding it from scale/skew if needed.
    pub fn matrix(&mut self, id: NodeId) -> Affine {
        self.validate(id);
        self.local_matrix(id.idx)
    }

    pub(crate) fn local_matrix(&mut self, idx: u32) -> Affine {
        let i = idx as usize;
        if self.flags[i].contains(NodeFlags::INVALID_MATRIX) {
            let [_, _, _, _, tx, ty] = self.matrix[i].as_coeffs();
            self.matrix[i] = self.decomposed[i].to_affine(tx, ty);
            self.flags[i].remove(NodeFlags::INVALID_MATRIX);
        }
        self.matrix[i]
    }

    /// Replaces the local matrix and re-derives scale, skew and rotation.
    pub fn set_matrix(&mut self, id: NodeId, matrix: Affine) {
        self.validate(id);
        let idx = id.idx;
        if self.local_matrix(idx) == matrix {
            return;
        }
        let i = idx as usize;
        self.matrix[i] = matrix;
        self.decomposed[i] = Decomposed::from_affine(matrix);
        self.flags[i].remove(NodeFlags::INVALID_MATRIX);
        self.invalidate_position(idx);
    }

    /// Horizontal translation.
    #[must_use]
    pub fn x(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.matrix[id.idx as usize].as_coeffs()[4]
    }

    /// Vertical translation.
    #[must_use]
    pub fn y(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.matrix[id.idx as usize].as_coeffs()[5]
    }

    /// Sets the horizontal translation.
    pub fn set_x(&mut self, id: NodeId, x: f64) {
        self.validate(id);
        let i = id.idx as usize;
        let [a, b, c, d, tx, ty] = self.matrix[i].as_coeffs();
        if tx == x {
            return;
        }
        self.matrix[i] = Affine::new([a, b, c, d, x, ty]);
        self.invalidate_position(id.idx);
    }

    /// Sets the vertical translation.
    pub fn set_y(&mut self, id: NodeId, y: f64) {
        self.validate(id);
        let i = id.idx as usize;
        let [a, b, c, d, tx, ty] = self.matrix[i].as_coeffs();
        if ty == y {
            return;
        }
        self.matrix[i] = Affine::new([a, b, c, d, tx, y]);
        self.invalidate_position(id.idx);
    }

    /// Horizontal scale.
    #[must_use]
    pub fn scale_x(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.decomposed[id.idx as usize].scale_x
    }

    /// Vertical scale.
    #[must_use]
    pub fn scale_y(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.decomposed[id.idx as usize].scale_y
    }

    /// Sets the horizontal scale.
    pub fn set_scale_x(&mut self, id: NodeId, value: f64) {
        self.validate(id);
        if self.decomposed[id.idx as usize].scale_x == value {
            return;
        }
        self.decomposed[id.idx as usize].scale_x = value;
        self.invalidate_matrix(id.idx);
    }

    /// Sets the vertical scale.
    pub fn set_scale_y(&mut self, id: NodeId, value: f64) {
        self.validate(id);
        if self.decomposed[id.idx as usize].scale_y == value {
            return;
        }
        self.decomposed[id.idx as usize].scale_y = value;
        self.invalidate_matrix(id.idx);
    }

    /// Skew of the y axis, in degrees.
    #[must_use]
    pub fn skew_x(&self, id: NodeId) -> f64 {
        self.validate(id);
        to_degrees(self.decomposed[id.idx as usize].skew_x)
    }

    /// Skew of the x axis, in degrees.
    #[must_use]
    pub fn skew_y(&self, id: NodeId) -> f64 {
        self.validate(id);
        to_degrees(self.decomposed[id.idx as usize].skew_y)
    }

    /// Sets the skew of the y axis, in degrees.
    pub fn set_skew_x(&mut self, id: NodeId, degrees: f64) {
        self.validate(id);
        let value = to_radians(clamp_rotation(degrees));
        let d = &mut self.decomposed[id.idx as usize];
        if d.skew_x == value {
            return;
        }
        d.skew_x = value;
        self.invalidate_matrix(id.idx);
    }

    /// Sets the skew of the x axis, in degrees. Rotation follows it.
    pub fn set_skew_y(&mut self, id: NodeId, degrees: f64) {
        self.validate(id);
        let degrees = clamp_rotation(degrees);
        let value = to_radians(degrees);
        let d = &mut self.decomposed[id.idx as usize];
        if d.skew_y == value {
            return;
        }
        d.skew_y = value;
        d.rotation = degrees;
        self.invalidate_matrix(id.idx);
    }

    /// Rotation in degrees, in (-180, 180].
    #[must_use]
    pub fn rotation(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.decomposed[id.idx as usize].rotation
    }

    /// Sets the rotation in degrees. The change is applied to both skews so
    /// any existing shear is preserved.
    pub fn set_rotation(&mut self, id: NodeId, degrees: f64) {
        self.validate(id);
        let value = clamp_rotation(degrees);
        let d = &mut self.decomposed[id.idx as usize];
        if d.rotation == value {
            return;
        }
        let delta = to_radians(value - d.rotation);
        d.skew_x += delta;
        d.skew_y += delta;
        d.rotation = value;
        self.invalidate_matrix(id.idx);
    }

    /// Width of the node's cumulative bounds in its parent's space.
    pub fn width(&mut self, id: NodeId) -> f64 {
        self.validate(id);
        self.bounds_in_parent(id.idx).width()
    }

    /// Height of the node's cumulative bounds in its parent's space.
    pub fn height(&mut self, id: NodeId) -> f64 {
        self.validate(id);
        self.bounds_in_parent(id.idx).height()
    }

    /// Scales the node so its width in the parent's space becomes `value`,
    /// keeping the current pixel height.
    ///
    /// Negative values, and nodes whose rotated base width is zero, are
    /// ignored.
    pub fn set_width(&mut self, id: NodeId, value: f64) {
        self.validate(id);
        if value.is_nan() || value < 0.0 {
            return;
        }
        let idx = id.idx;
        let original = self.cumulative_bounds(idx);
        let current = self.bounds_in_parent(idx);
        let angle = to_radians(self.decomposed[idx as usize].rotation);
        let base_w = base_width(original, angle);
        if base_w == 0.0 {
            return;
        }
        let base_h = base_height(original, angle);
        let d = &mut self.decomposed[idx as usize];
        d.scale_x = value / base_w;
        if base_h != 0.0 {
            d.scale_y = with_sign_of(current.height() / base_h, d.scale_y);
        }
        self.invalidate_matrix(idx);
    }

    /// Scales the node so its height in the parent's space becomes `value`,
    /// keeping the current pixel width.
    ///
    /// Negative values, and nodes whose rotated base height is zero, are
    /// ignored.
    pub fn set_height(&mut self, id: NodeId, value: f64) {
        self.validate(id);
        if value.is_nan() || value < 0.0 {
            return;
        }
        let idx = id.idx;
        let original = self.cumulative_bounds(idx);
        let current = self.bounds_in_parent(idx);
        let angle = to_radians(self.decomposed[idx as usize].rotation);
        let base_h = base_height(original, angle);
        if base_h == 0.0 {
            return;
        }
        let base_w = base_width(original, angle);
        let d = &mut self.decomposed[idx as usize];
        d.scale_y = value / base_h;
        if base_w != 0.0 {
            d.scale_x = with_sign_of(current.width() / base_w, d.scale_x);
        }
        self.invalidate_matrix(idx);
    }

    fn invalidate_matrix(&mut self, idx: u32) {
        self.flags[idx as usize].insert(NodeFlags::INVALID_MATRIX);
        self.invalidate_position(idx);
    }
}
