//! Zoom transform calculation.
//!
//! DESIGN
//! ======
//! Two pure operations bridge the tracker's pose convention and the host's
//! scene geometry:
//! - [`derive_target`] maps a raw pose sample to a normalized
//!   [`ZoomTarget`] (zoom factor + focus point in [0,1]²).
//! - [`apply_target`] maps a target onto a concrete scene item, producing
//!   the absolute end geometry in whichever of the two mutually exclusive
//!   sizing modes the item is in. Bounds-mode is authoritative: an update
//!   never populates both scale and bounds.

use glam::DVec2;

use crate::geometry::clamp01;
use crate::scene::{BoundsMode, ItemTransform, TransformUpdate};
use crate::vts::protocol::PoseSample;

// =============================================================================
// TYPES
// =============================================================================

/// Where to center and how much to scale, resolution-independent.
///
/// `factor` is a uniform zoom multiplier (1.0 = no zoom); `x`/`y` are the
/// normalized focus point. The default is a centered no-op, used until the
/// first pose event arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTarget {
    pub factor: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ZoomTarget {
    fn default() -> Self {
        Self { factor: 1.0, x: 0.5, y: 0.5 }
    }
}

impl ZoomTarget {
    #[must_use]
    pub fn focus(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }
}

/// Operator-tuned calibration: target apparent model size plus focus
/// nudges in percent of model size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomOffsets {
    pub size: f64,
    pub xpos: f64,
    pub ypos: f64,
}

impl Default for ZoomOffsets {
    fn default() -> Self {
        Self { size: 50.0, xpos: 0.0, ypos: -2.0 }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Map a raw pose sample to a zoom target.
///
/// Calibrated against the tracker's coordinate convention: model size is
/// shifted out of its [-102, ~300] range and halved, position is remapped
/// from [-1, 1] (y inverted) into [0, 1]. The factor scales the model to
/// the configured target apparent size.
#[must_use]
pub fn derive_target(pose: PoseSample, offsets: ZoomOffsets) -> ZoomTarget {
    let size = (pose.size + 102.0) / 2.0;
    let xpos = (pose.position_x + 1.0) / 2.0;
    let ypos = (pose.position_y - 1.0) / -2.0;

    ZoomTarget {
        factor: offsets.size / size,
        x: clamp01(xpos + size * offsets.xpos / 100.0),
        y: clamp01(ypos + size * offsets.ypos / 100.0),
    }
}

/// Compute the absolute end geometry for a target on the given item.
///
/// Positions the focus point at the canvas center. When `clamp_to_canvas`
/// is set and the zoomed content covers a canvas axis, the position on
/// that axis is clamped so no empty canvas shows past the content edge;
/// content smaller than the canvas stays centered on purpose.
#[must_use]
pub fn apply_target(
    current: &ItemTransform,
    source_size: DVec2,
    canvas: DVec2,
    target: ZoomTarget,
    clamp_to_canvas: bool,
) -> TransformUpdate {
    let center = canvas / 2.0;
    let focus = target.focus();

    match current.bounds_mode {
        BoundsMode::None => {
            let scale = current.scale * target.factor;
            let effective = source_size * scale;
            let mut pos = center - focus * effective;
            if clamp_to_canvas {
                pos = clamp_into_canvas(pos, effective, canvas);
            }
            TransformUpdate { scale: Some(scale), pos: Some(pos), bounds: None }
        }
        BoundsMode::Bounded => {
            let bounds = current.bounds * target.factor;
            let mut pos = center - focus * bounds;
            if clamp_to_canvas {
                pos = clamp_into_canvas(pos, bounds, canvas);
            }
            TransformUpdate { scale: None, pos: Some(pos), bounds: Some(bounds) }
        }
    }
}

/// Per-axis: once the content covers the canvas, keep its edges outside
/// the frame by clamping position into `[canvas - effective, 0]`.
fn clamp_into_canvas(pos: DVec2, effective: DVec2, canvas: DVec2) -> DVec2 {
    DVec2::new(
        if effective.x >= canvas.x { pos.x.clamp(canvas.x - effective.x, 0.0) } else { pos.x },
        if effective.y >= canvas.y { pos.y.clamp(canvas.y - effective.y, 0.0) } else { pos.y },
    )
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
