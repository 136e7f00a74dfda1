// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Affine decomposition helpers.
//!
//! Nodes keep their local [`Affine`] as the source of truth and expose
//! scale, skew and rotation as derived values. [`Decomposed`] holds those
//! values; [`Decomposed::from_affine`] and [`Decomposed::to_affine`] convert
//! between the two representations.
//!
//! Coefficients follow `kurbo`'s `[a, b, c, d, e, f]` layout:
//! `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.

use core::f64::consts::PI;

use kurbo::{Affine, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Scale, skew (radians) and rotation (degrees) derived from a local matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale; negative when the matrix mirrors.
    pub scale_y: f64,
    /// Skew of the y axis, in radians.
    pub skew_x: f64,
    /// Skew of the x axis, in radians.
    pub skew_y: f64,
    /// Rotation in degrees, normalized into (-180, 180].
    pub rotation: f64,
}

impl Default for Decomposed {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Decomposed {
    /// Decomposition of the identity matrix.
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
        skew_x: 0.0,
        skew_y: 0.0,
        rotation: 0.0,
    };

    /// Splits the linear part of `m` into scale and skew.
    #[must_use]
    pub fn from_affine(m: Affine) -> Self {
        let [a, b, c, d, _, _] = m.as_coeffs();
        let scale_x = a.hypot(b);
        let det = a * d - b * c;
        let scale_y = if det < 0.0 { -c.hypot(d) } else { c.hypot(d) };
        let skew_y = b.atan2(a);
        let skew_x = if scale_y == 0.0 {
            skew_y
        } else {
            (-c / scale_y).atan2(d / scale_y)
        };
        Self {
            scale_x,
            scale_y,
            skew_x,
            skew_y,
            rotation: clamp_rotation(skew_y * 180.0 / PI),
        }
    }

    /// Rebuilds a matrix with translation `(tx, ty)`.
    #[must_use]
    pub fn to_affine(&self, tx: f64, ty: f64) -> Affine {
        if self.skew_x == 0.0 && self.skew_y == 0.0 {
            return Affine::new([self.scale_x, 0.0, 0.0, self.scale_y, tx, ty]);
        }
        let (sin_x, cos_x) = self.skew_x.sin_cos();
        let (sin_y, cos_y) = if self.skew_x == self.skew_y {
            (sin_x, cos_x)
        } else {
            self.skew_y.sin_cos()
        };
        Affine::new([
            cos_y * self.scale_x,
            sin_y * self.scale_x,
            -sin_x * self.scale_y,
            cos_x * self.scale_y,
            tx,
            ty,
        ])
    }
}

/// Normalizes an angle in degrees into (-180, 180].
#[must_use]
pub fn clamp_rotation(degrees: f64) -> f64 {
    let mut value = degrees % 360.0;
    if value > 180.0 {
        value -= 360.0;
    } else if value <= -180.0 {
        value += 360.0;
    }
    value
}

/// Width of `rect` projected onto the x axis after rotating by `angle`
/// radians.
#[must_use]
pub fn base_width(rect: Rect, angle: f64) -> f64 {
    let (sin, cos) = angle.sin_cos();
    cos.abs() * rect.width() + sin.abs() * rect.height()
}

/// Height of `rect` projected onto the y axis after rotating by `angle`
/// radians.
#[must_use]
pub fn base_height(rect: Rect, angle: f64) -> f64 {
    let (sin, cos) = angle.sin_cos();
    sin.abs() * rect.width() + cos.abs() * rect.height()
}

/// Inverts `m`, or returns `None` when it is singular.
#[must_use]
pub fn try_invert(m: Affine) -> Option<Affine> {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    Some(m.inverse())
}
