// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::SceneGraph;

/// An iterator over the direct children of a node, in paint order.
///
/// Created by [`SceneGraph::children`].
#[derive(Debug)]
pub struct Children<'a> {
    graph: &'a SceneGraph,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(graph: &'a SceneGraph, first: u32) -> Self {
        Self {
            graph,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.graph.next_sibling[idx as usize];
        Some(self.graph.id_at(idx))
    }
}
