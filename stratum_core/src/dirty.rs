// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-region accumulation.
//!
//! During the validation pass every changed node contributes its old and new
//! screen regions. [`DirtyRegion`] clips each contribution to the surface,
//! then greedily merges rectangles so the draw pass only has to clear and clip
//! a few of them:
//!
//! - while at most [`DirtyRegionConfig::max_rects`] rectangles are held, a
//!   pair is merged only when its union wastes no area;
//! - beyond that, the pair whose union wastes the least area is merged;
//! - once the held area exceeds [`DirtyRegionConfig::full_redraw_ratio`] of
//!   the clip, the whole clip rectangle is reported instead.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::region::Region;

/// Merge thresholds for a [`DirtyRegion`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirtyRegionConfig {
    /// Rectangle count above which merges are forced.
    pub max_rects: usize,
    /// Fraction of the clip area above which the whole clip is redrawn.
    pub full_redraw_ratio: f64,
}

impl DirtyRegionConfig {
    /// Never report the whole clip and never force merges. Useful for
    /// inspecting raw contributions in tests and debug overlays.
    pub const UNMERGED: Self = Self {
        max_rects: usize::MAX,
        full_redraw_ratio: f64::INFINITY,
    };
}

impl Default for DirtyRegionConfig {
    fn default() -> Self {
        Self {
            max_rects: 3,
            full_redraw_ratio: 0.95,
        }
    }
}

/// Accumulates dirty rectangles for one surface over one frame.
#[derive(Clone, Debug, Default)]
pub struct DirtyRegion {
    config: DirtyRegionConfig,
    list: Vec<Region>,
    clip_width: f64,
    clip_height: f64,
    clip_area: f64,
    has_clip_rect: bool,
    clip_rect_changed: bool,
}

impl DirtyRegion {
    /// Creates an accumulator with the default thresholds and no clip.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an accumulator with explicit thresholds.
    #[must_use]
    pub fn with_config(config: DirtyRegionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the merge thresholds.
    #[must_use]
    pub fn config(&self) -> DirtyRegionConfig {
        self.config
    }

    /// Replaces the merge thresholds.
    pub fn set_config(&mut self, config: DirtyRegionConfig) {
        self.config = config;
    }

    /// Drops the rectangles and the clip, keeping the backing storage.
    pub fn reset(&mut self) {
        self.list.clear();
        self.clip_width = 0.0;
        self.clip_height = 0.0;
        self.clip_area = 0.0;
        self.has_clip_rect = false;
        self.clip_rect_changed = false;
    }

    /// Bounds tracking to `[0, 0, width, height]` and forces the next
    /// finalized list to cover the whole clip.
    pub fn set_clip_rect(&mut self, width: f64, height: f64) {
        self.has_clip_rect = true;
        self.clip_rect_changed = true;
        self.clip_width = width.ceil();
        self.clip_height = height.ceil();
        self.clip_area = self.clip_width * self.clip_height;
    }

    /// Returns `true` if a clip rectangle has been set.
    #[must_use]
    pub fn has_clip_rect(&self) -> bool {
        self.has_clip_rect
    }

    /// Clip rectangle size, or zero before [`set_clip_rect`](Self::set_clip_rect).
    #[must_use]
    pub fn clip_size(&self) -> (f64, f64) {
        (self.clip_width, self.clip_height)
    }

    /// Records `region`.
    ///
    /// Returns `false` if nothing was recorded because the region is empty or
    /// lies entirely outside the clip. While a full redraw is pending every
    /// non-empty contribution reports `true` without being stored.
    pub fn add_region(&mut self, region: &Region) -> bool {
        let mut r = Region::new(region.min_x, region.min_y, region.max_x, region.max_y);
        if self.has_clip_rect {
            r.min_x = r.min_x.max(0.0);
            r.min_y = r.min_y.max(0.0);
            r.max_x = r.max_x.min(self.clip_width);
            r.max_y = r.max_y.min(self.clip_height);
        }
        if r.is_empty() {
            return false;
        }
        if self.clip_rect_changed {
            return true;
        }
        self.list.push(r);
        self.merge_dirty_list();
        true
    }

    /// Finalizes the frame's dirty list: merges to a fixpoint and snaps the
    /// survivors outward to whole pixels.
    pub fn dirty_regions(&mut self) -> &[Region] {
        if self.clip_rect_changed {
            self.clip_rect_changed = false;
            self.list.clear();
            self.list
                .push(Region::new(0.0, 0.0, self.clip_width, self.clip_height));
        } else {
            while self.merge_dirty_list() {}
        }
        for r in &mut self.list {
            r.snap_outward();
        }
        &self.list
    }

    /// Drops the accumulated rectangles, keeping the backing storage.
    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// Merges the cheapest pair, if the policy allows one. Returns whether a
    /// merge happened.
    fn merge_dirty_list(&mut self) -> bool {
        let len = self.list.len();
        if len < 2 {
            return false;
        }
        let mut best_delta = if len > self.config.max_rects {
            f64::INFINITY
        } else {
            0.0
        };
        let mut pair = None;
        let mut total_area = 0.0;
        for i in 0..len {
            let a = self.list[i];
            let area_a = a.area();
            total_area += area_a;
            for j in i + 1..len {
                let b = &self.list[j];
                let delta = a.union_area(b) - area_a - b.area();
                if best_delta > delta {
                    best_delta = delta;
                    pair = Some((i, j));
                }
            }
        }
        if self.has_clip_rect
            && self.clip_area > 0.0
            && total_area / self.clip_area > self.config.full_redraw_ratio
        {
            self.clip_rect_changed = true;
        }
        match pair {
            Some((i, j)) => {
                let b = self.list.remove(j);
                self.list[i].union(&b);
                true
            }
            None => false,
        }
    }
}
