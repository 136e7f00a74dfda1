// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazily recomputed node caches.
//!
//! Each accessor checks its invalidation flag, recomputes from the parent or
//! the kind's measurement hook, stores the result and clears the flag. A
//! recomputed concatenated matrix or content extent marks the owner's render
//! region as moved so the next validation pass re-places it.

use kurbo::{Affine, Point, Rect};

use super::flags::NodeFlags;
use super::id::{INVALID, NodeId};
use super::store::SceneGraph;
use crate::matrix::try_invert;

impl SceneGraph {
    /// The node's transform in global (stage) space.
    pub fn concatenated_matrix(&mut self, id: NodeId) -> Affine {
        self.validate(id);
        self.concat_matrix(id.idx)
    }

    /// Inverse of [`concatenated_matrix`](Self::concatenated_matrix).
    ///
    /// When the concatenated matrix is singular the previously cached inverse
    /// is kept.
    pub fn inverted_concatenated_matrix(&mut self, id: NodeId) -> Affine {
        self.validate(id);
        self.inverted_concat_matrix(id.idx)
    }

    /// The node's alpha multiplied by every ancestor's.
    pub fn concatenated_alpha(&mut self, id: NodeId) -> f64 {
        self.validate(id);
        self.concat_alpha(id.idx)
    }

    /// The node's own content extent in local space.
    pub fn content_bounds(&mut self, id: NodeId) -> Rect {
        self.validate(id);
        self.own_content_bounds(id.idx)
    }

    /// The extent of the node and all its descendants in local space.
    pub fn bounds(&mut self, id: NodeId) -> Rect {
        self.validate(id);
        self.cumulative_bounds(id.idx)
    }

    /// The node's cumulative bounds expressed in `target`'s space, or in
    /// global space when `target` is `None`.
    pub fn transformed_bounds(&mut self, id: NodeId, target: Option<NodeId>) -> Rect {
        self.validate(id);
        if let Some(t) = target {
            self.validate(t);
        }
        let idx = id.idx;
        let bounds = self.cumulative_bounds(idx);
        if target == Some(id) || bounds.area() == 0.0 {
            return bounds;
        }
        let parent = self.parent[idx as usize];
        let m = match target {
            Some(t) if t.idx == parent => return self.bounds_in_parent(idx),
            Some(t) => self.inverted_concat_matrix(t.idx) * self.concat_matrix(idx),
            None => self.concat_matrix(idx),
        };
        m.transform_rect_bbox(bounds)
    }

    /// Maps a global point into the node's local space.
    pub fn global_to_local(&mut self, id: NodeId, point: Point) -> Point {
        self.validate(id);
        self.inverted_concat_matrix(id.idx) * point
    }

    /// Maps a local point into global space.
    pub fn local_to_global(&mut self, id: NodeId, point: Point) -> Point {
        self.validate(id);
        self.concat_matrix(id.idx) * point
    }

    /// Alpha the node was last validated with; what the draw pass paints
    /// with.
    #[must_use]
    pub fn render_alpha(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.render_alpha[id.idx as usize]
    }

    // -- Internal accessors on raw slots --

    pub(crate) fn concat_matrix(&mut self, idx: u32) -> Affine {
        let i = idx as usize;
        if self.flags[i].contains(NodeFlags::INVALID_CONCATENATED_MATRIX) {
            let local = self.local_matrix(idx);
            let p = self.parent[i];
            let m = if p == INVALID {
                local
            } else {
                let mut m = self.concat_matrix(p) * local;
                if let Some(rect) = self.scroll_rect[i] {
                    m *= Affine::translate((-rect.x0, -rect.y0));
                }
                m
            };
            self.concatenated_matrix[i] = m;
            self.flags[i].remove(NodeFlags::INVALID_CONCATENATED_MATRIX);
            if let Some(region) = &mut self.render_region[i] {
                region.moved = true;
            }
            if let Some(s) = self.surface[i] {
                self.surface_state_mut(s).region.moved = true;
            }
        }
        self.concatenated_matrix[i]
    }

    pub(crate) fn inverted_concat_matrix(&mut self, idx: u32) -> Affine {
        let i = idx as usize;
        if self.flags[i].contains(NodeFlags::INVALID_INVERTED_CONCATENATED_MATRIX) {
            let m = self.concat_matrix(idx);
            if let Some(inv) = try_invert(m) {
                self.inverted_matrix[i] = inv;
            }
            self.flags[i].remove(NodeFlags::INVALID_INVERTED_CONCATENATED_MATRIX);
        }
        self.inverted_matrix[i]
    }

    pub(crate) fn concat_alpha(&mut self, idx: u32) -> f64 {
        let i = idx as usize;
        if self.flags[i].contains(NodeFlags::INVALID_CONCATENATED_ALPHA) {
            let p = self.parent[i];
            let alpha = if p == INVALID {
                self.alpha[i]
            } else {
                self.concat_alpha(p) * self.alpha[i]
            };
            self.concatenated_alpha[i] = alpha;
            self.flags[i].remove(NodeFlags::INVALID_CONCATENATED_ALPHA);
        }
        self.concatenated_alpha[i]
    }

    pub(crate) fn own_content_bounds(&mut self, idx: u32) -> Rect {
        let i = idx as usize;
        if self.flags[i].contains(NodeFlags::INVALID_CONTENT_BOUNDS) {
            self.content_bounds[i] = self.kind[i].measure_content_bounds();
            self.flags[i].remove(NodeFlags::INVALID_CONTENT_BOUNDS);
            if let Some(region) = &mut self.render_region[i] {
                region.moved = true;
            }
        }
        self.content_bounds[i]
    }

    pub(crate) fn cumulative_bounds(&mut self, idx: u32) -> Rect {
        let i = idx as usize;
        if self.flags[i].contains(NodeFlags::INVALID_BOUNDS) {
            let own = self.own_content_bounds(idx);
            self.bounds[i] = self.fold_child_bounds(idx, own);
            self.flags[i].remove(NodeFlags::INVALID_BOUNDS);
            if let Some(s) = self.surface[i] {
                self.surface_state_mut(s).region.moved = true;
            }
        }
        self.bounds[i]
    }

    /// Runs the kind's child-bounds hook over every child.
    fn fold_child_bounds(&mut self, idx: u32, own: Rect) -> Rect {
        let kind = self.kind[idx as usize];
        let mut bounds = own;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            let child_bounds = self.bounds_in_parent(child);
            bounds = kind.measure_child_bounds(bounds, child_bounds);
            child = self.next_sibling[child as usize];
        }
        bounds
    }

    /// Cumulative bounds mapped through the local matrix (and scroll offset).
    pub(crate) fn bounds_in_parent(&mut self, idx: u32) -> Rect {
        let bounds = self.cumulative_bounds(idx);
        if bounds.area() == 0.0 {
            return bounds;
        }
        let mut m = self.local_matrix(idx);
        if self.parent[idx as usize] != INVALID {
            if let Some(rect) = self.scroll_rect[idx as usize] {
                m *= Affine::translate((-rect.x0, -rect.y0));
            }
        }
        m.transform_rect_bbox(bounds)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::{Affine, Point, Rect};

    use crate::node::{Color, NodeId, NodeKind, SceneGraph, ShapeContent};

    fn shape(graph: &mut SceneGraph, parent: NodeId, w: f64, h: f64) -> NodeId {
        let id = graph.create_node(NodeKind::Shape(ShapeContent {
            width: w,
            height: h,
            color: Color::BLACK,
        }));
        graph.add_child(parent, id);
        id
    }

    /// Tiny deterministic generator for mutation sequences.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            self.0 >> 33
        }

        fn unit(&mut self) -> f64 {
            (self.next() % 1000) as f64 / 1000.0
        }
    }

    fn from_scratch(graph: &mut SceneGraph, id: NodeId) -> (Affine, f64) {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            chain.push(n);
            cur = graph.parent(n);
        }
        let mut m = Affine::IDENTITY;
        let mut alpha = 1.0;
        for &n in chain.iter().rev() {
            m *= graph.matrix(n);
            alpha *= graph.alpha(n);
        }
        (m, alpha)
    }

    #[test]
    fn caches_match_a_from_scratch_walk() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let a = graph.create_node(NodeKind::Group);
        graph.add_child(stage, a);
        let b = shape(&mut graph, a, 10.0, 10.0);
        let c = shape(&mut graph, b, 5.0, 5.0);
        let nodes = [a, b, c];

        let mut rng = Lcg(7);
        for step in 0..200 {
            let target = nodes[(rng.next() % 3) as usize];
            match rng.next() % 5 {
                0 => graph.set_x(target, rng.unit() * 100.0),
                1 => graph.set_scale_y(target, 0.5 + rng.unit()),
                2 => graph.set_rotation(target, rng.unit() * 360.0),
                3 => graph.set_alpha(target, rng.unit()),
                _ => graph.set_skew_x(target, rng.unit() * 20.0),
            }
            // Read back only some of the time so stale flags pile up.
            if step % 3 == 0 {
                let probe = nodes[(rng.next() % 3) as usize];
                let _ = graph.concatenated_matrix(probe);
            }
        }
        for &n in &nodes {
            let (m, alpha) = from_scratch(&mut graph, n);
            let cached = graph.concatenated_matrix(n);
            for (x, y) in cached.as_coeffs().iter().zip(m.as_coeffs()) {
                assert!((x - y).abs() < 1e-9, "{cached:?} vs {m:?}");
            }
            assert!((graph.concatenated_alpha(n) - alpha).abs() < 1e-12);
        }
    }

    #[test]
    fn cumulative_bounds_include_transformed_children() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let parent = shape(&mut graph, stage, 10.0, 10.0);
        let child = shape(&mut graph, parent, 10.0, 10.0);
        graph.set_x(child, 20.0);
        graph.set_scale_y(child, 3.0);
        assert_eq!(graph.bounds(parent), Rect::new(0.0, 0.0, 30.0, 30.0));
        assert_eq!(graph.content_bounds(parent), Rect::new(0.0, 0.0, 10.0, 10.0));

        graph.set_x(child, 0.0);
        assert_eq!(
            graph.bounds(parent),
            Rect::new(0.0, 0.0, 10.0, 30.0),
            "child moves invalidate ancestor bounds"
        );
    }

    #[test]
    fn empty_children_do_not_stretch_bounds() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let parent = shape(&mut graph, stage, 10.0, 10.0);
        let empty = graph.create_node(NodeKind::Group);
        graph.add_child(parent, empty);
        graph.set_x(empty, 500.0);
        assert_eq!(graph.bounds(parent), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn scroll_rect_offsets_descendants() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let view = shape(&mut graph, stage, 100.0, 100.0);
        let item = shape(&mut graph, view, 10.0, 10.0);
        graph.set_x(item, 50.0);
        graph.set_scroll_rect(view, Some(Rect::new(40.0, 0.0, 90.0, 50.0)));
        let p = graph.local_to_global(item, Point::ZERO);
        assert_eq!(p, Point::new(10.0, 0.0));
        let back = graph.global_to_local(item, p);
        assert_eq!(back, Point::ZERO);
    }

    #[test]
    fn transformed_bounds_between_siblings() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let a = shape(&mut graph, stage, 10.0, 10.0);
        let b = shape(&mut graph, stage, 10.0, 10.0);
        graph.set_x(a, 30.0);
        graph.set_x(b, 10.0);
        assert_eq!(
            graph.transformed_bounds(a, Some(b)),
            Rect::new(20.0, 0.0, 30.0, 10.0)
        );
        assert_eq!(
            graph.transformed_bounds(a, None),
            Rect::new(30.0, 0.0, 40.0, 10.0)
        );
        assert_eq!(
            graph.transformed_bounds(a, Some(a)),
            Rect::new(0.0, 0.0, 10.0, 10.0)
        );
    }

    #[test]
    fn singular_matrix_keeps_previous_inverse() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let node = shape(&mut graph, stage, 10.0, 10.0);
        graph.set_x(node, 5.0);
        let before = graph.inverted_concatenated_matrix(node);
        graph.set_scale_x(node, 0.0);
        assert_eq!(graph.inverted_concatenated_matrix(node), before);
    }
}
