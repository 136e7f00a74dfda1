// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point hit-testing.

use kurbo::{Point, Rect};

use super::flags::NodeFlags;
use super::id::{INVALID, NodeId};
use super::store::SceneGraph;

/// Reads back rendered coverage for pixel-exact hit tests.
///
/// The renderer implements this by drawing the node's content around the
/// sample point, or by reading the node's retained surface when it has one.
pub trait PixelSampler {
    /// Returns the alpha of `node`'s own content at `local` (in the node's
    /// local space).
    fn sample_alpha(&mut self, graph: &SceneGraph, node: NodeId, local: Point) -> u8;
}

/// A sampler that treats every pixel inside the content bounds as opaque.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundsSampler;

impl PixelSampler for BoundsSampler {
    fn sample_alpha(&mut self, _graph: &SceneGraph, _node: NodeId, _local: Point) -> u8 {
        u8::MAX
    }
}

/// Edge-inclusive containment.
fn contains(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

impl SceneGraph {
    /// Finds the topmost node under the global point `(x, y)` within `id`'s
    /// subtree.
    ///
    /// Containers test children front to back (later siblings first) and
    /// honor `touch_children` and `touch_enabled`; a hit child that is not
    /// touch-enabled makes the container itself the target. Scroll rects and
    /// masks reject points outside them. With `exact`, or for nodes with
    /// `pixel_hit_test`, a hit also requires a non-transparent pixel from
    /// `sampler`.
    pub fn hit_test(
        &mut self,
        id: NodeId,
        x: f64,
        y: f64,
        exact: bool,
        sampler: &mut dyn PixelSampler,
    ) -> Option<NodeId> {
        self.validate(id);
        self.hit_test_node(id.idx, Point::new(x, y), exact, sampler)
            .map(|idx| self.id_at(idx))
    }

    fn hit_test_node(
        &mut self,
        idx: u32,
        global: Point,
        exact: bool,
        sampler: &mut dyn PixelSampler,
    ) -> Option<u32> {
        let i = idx as usize;
        if !self.kind[i].is_container() {
            return self.hit_test_content(idx, global, exact, sampler);
        }
        if !self.visible[i] {
            return None;
        }
        if !self.passes_clip(idx, global, sampler) {
            return None;
        }

        let mut last = INVALID;
        let mut child = self.first_child[i];
        while child != INVALID {
            last = child;
            child = self.next_sibling[child as usize];
        }

        let mut found = false;
        let mut target = None;
        let mut child = last;
        while child != INVALID {
            if self.masked_object[child as usize] == INVALID {
                if let Some(hit) = self.hit_test_node(child, global, exact, sampler) {
                    found = true;
                    if self.flags[hit as usize].contains(NodeFlags::TOUCH_ENABLED) {
                        target = Some(hit);
                        break;
                    }
                }
            }
            child = self.prev_sibling[child as usize];
        }

        if target.is_some() {
            if self.flags[i].contains(NodeFlags::TOUCH_CHILDREN) {
                return target;
            }
            return Some(idx);
        }
        if found {
            return Some(idx);
        }
        self.hit_test_content(idx, global, exact, sampler)
    }

    /// Scroll-rect and mask rejection.
    fn passes_clip(&mut self, idx: u32, global: Point, sampler: &mut dyn PixelSampler) -> bool {
        let i = idx as usize;
        if let Some(rect) = self.scroll_rect[i] {
            let local = self.inverted_concat_matrix(idx) * global;
            if !contains(rect, local) {
                return false;
            }
        }
        let mask = self.mask[i];
        if mask == INVALID {
            return true;
        }
        // Re-parenting can still route a mask back into its own target.
        if self.active_masks.contains(&mask) {
            return false;
        }
        self.active_masks.push(mask);
        let hit = self.hit_test_node(mask, global, true, sampler).is_some();
        self.active_masks.pop();
        hit
    }

    /// Tests the node's own content, ignoring children.
    fn hit_test_content(
        &mut self,
        idx: u32,
        global: Point,
        exact: bool,
        sampler: &mut dyn PixelSampler,
    ) -> Option<u32> {
        let i = idx as usize;
        if self.render_region[i].is_none() || !self.visible[i] {
            return None;
        }
        let local = self.inverted_concat_matrix(idx) * global;
        let bounds = self.own_content_bounds(idx);
        if !contains(bounds, local) {
            return None;
        }
        // Containers already checked their own clip.
        if !self.kind[i].is_container() && !self.passes_clip(idx, global, sampler) {
            return None;
        }
        if exact || self.flags[i].contains(NodeFlags::PIXEL_HIT_TEST) {
            if self.concat_alpha(idx) == 0.0 {
                return None;
            }
            let id = self.id_at(idx);
            if sampler.sample_alpha(self, id, local) == 0 {
                return None;
            }
        }
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use super::{BoundsSampler, PixelSampler};
    use crate::node::{
        BitmapContent, Color, ImageId, NodeId, NodeKind, SceneGraph, ShapeContent,
    };

    fn shape(graph: &mut SceneGraph, parent: NodeId, w: f64, h: f64) -> NodeId {
        let id = graph.create_node(NodeKind::Shape(ShapeContent {
            width: w,
            height: h,
            color: Color::BLACK,
        }));
        graph.add_child(parent, id);
        id
    }

    fn bitmap(graph: &mut SceneGraph, parent: NodeId, w: f64, h: f64) -> NodeId {
        let id = graph.create_node(NodeKind::Bitmap(BitmapContent {
            image: ImageId(0),
            width: w,
            height: h,
        }));
        graph.add_child(parent, id);
        id
    }

    /// Opaque only in the left half of every node.
    struct LeftHalf;

    impl PixelSampler for LeftHalf {
        fn sample_alpha(&mut self, graph: &SceneGraph, node: NodeId, local: Point) -> u8 {
            let half = match graph.kind(node) {
                NodeKind::Bitmap(b) => b.width / 2.0,
                NodeKind::Shape(s) => s.width / 2.0,
                _ => 0.0,
            };
            if local.x < half { 255 } else { 0 }
        }
    }

    #[test]
    fn topmost_sibling_wins() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let below = bitmap(&mut graph, stage, 20.0, 20.0);
        let above = bitmap(&mut graph, stage, 20.0, 20.0);
        graph.set_x(above, 10.0);
        let s = &mut BoundsSampler;
        assert_eq!(graph.hit_test(stage, 15.0, 5.0, false, s), Some(above));
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, false, s), Some(below));
        assert_eq!(graph.hit_test(stage, 50.0, 5.0, false, s), None);
    }

    #[test]
    fn touch_children_off_returns_the_container() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let group = graph.create_node(NodeKind::Group);
        graph.add_child(stage, group);
        let leaf = bitmap(&mut graph, group, 10.0, 10.0);
        let s = &mut BoundsSampler;
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, false, s), Some(leaf));
        graph.set_touch_children(group, false);
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, false, s), Some(group));
    }

    #[test]
    fn touch_disabled_child_yields_its_parent() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let group = graph.create_node(NodeKind::Group);
        graph.add_child(stage, group);
        let leaf = bitmap(&mut graph, group, 10.0, 10.0);
        graph.set_touch_enabled(leaf, false);
        let s = &mut BoundsSampler;
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, false, s), Some(group));
    }

    #[test]
    fn invisible_nodes_are_not_hit() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let leaf = bitmap(&mut graph, stage, 10.0, 10.0);
        graph.set_visible(leaf, false);
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, false, &mut BoundsSampler), None);
    }

    #[test]
    fn scroll_rect_rejects_outside_points() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let view = shape(&mut graph, stage, 100.0, 100.0);
        let item = bitmap(&mut graph, view, 100.0, 100.0);
        graph.set_scroll_rect(view, Some(Rect::new(0.0, 0.0, 30.0, 30.0)));
        let s = &mut BoundsSampler;
        assert_eq!(graph.hit_test(stage, 10.0, 10.0, false, s), Some(item));
        assert_eq!(graph.hit_test(stage, 60.0, 10.0, false, s), None);
    }

    #[test]
    fn mask_restricts_hits() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let target = bitmap(&mut graph, stage, 100.0, 100.0);
        let mask = bitmap(&mut graph, stage, 20.0, 20.0);
        graph.set_mask(target, Some(mask));
        let s = &mut BoundsSampler;
        assert_eq!(graph.hit_test(stage, 10.0, 10.0, false, s), Some(target));
        assert_eq!(graph.hit_test(stage, 50.0, 50.0, false, s), None);
    }

    #[test]
    fn mutual_masks_do_not_recurse() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let a = bitmap(&mut graph, stage, 10.0, 10.0);
        let b = bitmap(&mut graph, stage, 10.0, 10.0);
        graph.set_mask(a, Some(b));
        graph.set_mask(b, Some(a));
        let s = &mut BoundsSampler;
        assert_eq!(graph.hit_test(a, 5.0, 5.0, false, s), Some(a));
    }

    #[test]
    fn mask_moved_over_its_target_terminates() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let a = bitmap(&mut graph, stage, 10.0, 10.0);
        let m = graph.create_node(NodeKind::Group);
        graph.add_child(stage, m);
        bitmap(&mut graph, m, 20.0, 20.0);
        graph.set_mask(a, Some(m));
        graph.add_child(m, a);
        let s = &mut BoundsSampler;
        assert_eq!(graph.hit_test(a, 5.0, 5.0, false, s), Some(a));
    }

    #[test]
    fn exact_tests_consult_the_sampler() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let leaf = bitmap(&mut graph, stage, 20.0, 20.0);
        let s = &mut LeftHalf;
        assert_eq!(graph.hit_test(stage, 15.0, 5.0, false, s), Some(leaf));
        assert_eq!(graph.hit_test(stage, 15.0, 5.0, true, s), None);
        graph.set_pixel_hit_test(leaf, true);
        assert_eq!(graph.hit_test(stage, 15.0, 5.0, false, s), None);
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, false, s), Some(leaf));
    }

    #[test]
    fn transparent_nodes_fail_exact_tests() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let leaf = bitmap(&mut graph, stage, 20.0, 20.0);
        graph.set_alpha(leaf, 0.0);
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, true, &mut BoundsSampler), None);
    }
}
