// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational handles into a [`SceneGraph`](super::SceneGraph).

use core::fmt;

/// Slot index meaning "none" in parent, child, and sibling links.
pub const INVALID: u32 = u32::MAX;

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            pub(crate) idx: u32,
            pub(crate) generation: u32,
        }

        impl $name {
            /// Slot index. Stable for the handle's lifetime, reused afterwards.
            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.idx
            }

            /// Bumped each time the slot is freed.
            #[inline]
            #[must_use]
            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({}v{})"), self.idx, self.generation)
            }
        }
    };
}

handle! {
    /// A scene node. Stale handles to destroyed nodes are rejected.
    NodeId
}

handle! {
    /// A retained surface: the stage's screen buffer, or the cache of a node
    /// with `cache_as_bitmap` set.
    ///
    /// Renderers key pixel buffers by index and compare generations to
    /// notice recycled slots.
    SurfaceId
}
