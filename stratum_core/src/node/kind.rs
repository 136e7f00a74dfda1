// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node kinds and their content.

use kurbo::Rect;

/// An 8-bit straight-alpha color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Creates an opaque color.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with explicit alpha.
    #[inline]
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// An opaque reference to decoded image pixels held by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

/// A filled rectangle with its origin at the node's local origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeContent {
    /// Width in local units.
    pub width: f64,
    /// Height in local units.
    pub height: f64,
    /// Fill color.
    pub color: Color,
}

/// An image stretched over `[0, 0, width, height]` in local units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BitmapContent {
    /// Pixels to draw.
    pub image: ImageId,
    /// Width in local units.
    pub width: f64,
    /// Height in local units.
    pub height: f64,
}

/// What a node is.
///
/// The set is closed: the engine matches on it for measurement, and the
/// renderer matches on it to emit content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    /// The root of the graph. Exactly one exists per graph.
    Stage,
    /// A container with no content of its own.
    Group,
    /// A container that also paints a filled rectangle beneath its children.
    Shape(ShapeContent),
    /// A leaf that paints an image.
    Bitmap(BitmapContent),
}

impl NodeKind {
    /// Returns `true` if the kind may hold children.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        !matches!(self, Self::Bitmap(_))
    }

    /// Returns `true` if the kind paints pixels of its own and therefore
    /// owns a render region.
    #[must_use]
    pub const fn has_content(&self) -> bool {
        matches!(self, Self::Shape(_) | Self::Bitmap(_))
    }

    /// Measures the kind's own content in local coordinates.
    #[must_use]
    pub fn measure_content_bounds(&self) -> Rect {
        match self {
            Self::Stage | Self::Group => Rect::ZERO,
            Self::Shape(s) => Rect::new(0.0, 0.0, s.width, s.height),
            Self::Bitmap(b) => Rect::new(0.0, 0.0, b.width, b.height),
        }
    }

    /// Folds one child's bounds, already in this node's space, into
    /// `bounds`. Empty rectangles never widen the result and leaves ignore
    /// children.
    #[must_use]
    pub fn measure_child_bounds(&self, bounds: Rect, child: Rect) -> Rect {
        if !self.is_container() || child.area() == 0.0 {
            bounds
        } else if bounds.area() == 0.0 {
            child
        } else {
            bounds.union(child)
        }
    }
}

/// How a subtree's pixels combine with what is already on the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// Additive ("lighter").
    Add,
    /// Punches the source's alpha out of the destination.
    Erase,
}

impl BlendMode {
    /// Parses a blend mode name. Unknown names fall back to
    /// [`BlendMode::Normal`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "add" => Self::Add,
            "erase" => Self::Erase,
            _ => Self::Normal,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Add => "add",
            Self::Erase => "erase",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_blend_names_are_normal() {
        assert_eq!(BlendMode::from_name("add"), BlendMode::Add);
        assert_eq!(BlendMode::from_name("erase"), BlendMode::Erase);
        assert_eq!(BlendMode::from_name("multiply"), BlendMode::Normal);
        assert_eq!(BlendMode::from_name(BlendMode::Add.name()), BlendMode::Add);
    }

    #[test]
    fn only_content_kinds_have_content() {
        assert!(!NodeKind::Group.has_content());
        assert!(NodeKind::Group.is_container());
        let bmp = NodeKind::Bitmap(BitmapContent {
            image: ImageId(0),
            width: 4.0,
            height: 2.0,
        });
        assert!(bmp.has_content());
        assert!(!bmp.is_container());
        assert_eq!(bmp.measure_content_bounds(), Rect::new(0.0, 0.0, 4.0, 2.0));
    }

    #[test]
    fn child_bounds_fold_into_containers_only() {
        let child = Rect::new(5.0, 5.0, 8.0, 9.0);
        assert_eq!(NodeKind::Group.measure_child_bounds(Rect::ZERO, child), child);
        let shape = NodeKind::Shape(ShapeContent {
            width: 4.0,
            height: 4.0,
            color: Color::BLACK,
        });
        let own = shape.measure_content_bounds();
        assert_eq!(
            shape.measure_child_bounds(own, child),
            Rect::new(0.0, 0.0, 8.0, 9.0)
        );
        assert_eq!(shape.measure_child_bounds(own, Rect::ZERO), own, "empty child");
        let bmp = NodeKind::Bitmap(BitmapContent {
            image: ImageId(0),
            width: 4.0,
            height: 2.0,
        });
        let own = bmp.measure_content_bounds();
        assert_eq!(bmp.measure_child_bounds(own, child), own, "leaf");
    }
}
