// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend failures.

/// An error reported by a [`Canvas`](crate::Canvas) or
/// [`SurfaceFactory`](crate::SurfaceFactory).
///
/// The compositor never propagates these out of a draw pass. It falls back
/// to drawing the affected subtree straight into the enclosing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The backend could not allocate a pixel buffer of the requested size.
    #[error("cannot allocate a {width}x{height} surface")]
    SurfaceUnavailable {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// A zero or overflowing dimension was requested.
    #[error("invalid surface size")]
    InvalidSize,
}
