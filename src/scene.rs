//! Scene-geometry boundary to the host compositing application.
//!
//! DESIGN
//! ======
//! The host scene graph is an external collaborator: everything the zoom
//! pipeline needs from it is a named-item lookup, the canvas resolution,
//! and read/write access to one item's scale/position/bounds. Those
//! concerns are the `SceneGraph` and `SceneItem` traits; the rest of the
//! crate never sees anything host-specific.
//!
//! `MemoryScene` is the in-process implementation backing tests and the
//! standalone harness binary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use glam::DVec2;
use tracing::trace;

// =============================================================================
// GEOMETRY TYPES
// =============================================================================

/// How the host sizes the item: free scaling or a bounding box.
///
/// The two are mutually exclusive on a real item; `Bounded` covers every
/// host bounds type other than "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsMode {
    None,
    Bounded,
}

/// A scene item's full transform as read from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemTransform {
    pub scale: DVec2,
    pub pos: DVec2,
    pub bounds: DVec2,
    pub bounds_mode: BoundsMode,
}

/// A partial transform write. Only the populated fields are applied, so a
/// scale-mode update never touches bounds and vice versa.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformUpdate {
    pub scale: Option<DVec2>,
    pub pos: Option<DVec2>,
    pub bounds: Option<DVec2>,
}

// =============================================================================
// BOUNDARY TRAITS
// =============================================================================

/// One scene item: transform read/write plus its intrinsic pixel size.
pub trait SceneItem: Send + Sync {
    fn transform(&self) -> ItemTransform;
    fn apply(&self, update: &TransformUpdate);
    fn source_size(&self) -> DVec2;
}

/// The active scene: named-item lookup and canvas resolution.
pub trait SceneGraph: Send + Sync {
    fn find_item(&self, name: &str) -> Option<Arc<dyn SceneItem>>;
    fn canvas_size(&self) -> DVec2;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION
// =============================================================================

/// An in-memory scene item. Transform writes are traced so the harness
/// binary can observe animation output.
pub struct MemoryItem {
    state: Mutex<ItemTransform>,
    source_size: DVec2,
}

impl MemoryItem {
    #[must_use]
    pub fn new(transform: ItemTransform, source_size: DVec2) -> Self {
        Self { state: Mutex::new(transform), source_size }
    }
}

impl SceneItem for MemoryItem {
    fn transform(&self) -> ItemTransform {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, update: &TransformUpdate) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(scale) = update.scale {
            state.scale = scale;
        }
        if let Some(pos) = update.pos {
            state.pos = pos;
        }
        if let Some(bounds) = update.bounds {
            state.bounds = bounds;
        }
        trace!(
            scale_x = state.scale.x,
            scale_y = state.scale.y,
            pos_x = state.pos.x,
            pos_y = state.pos.y,
            bounds_x = state.bounds.x,
            bounds_y = state.bounds.y,
            "scene item transform updated"
        );
    }

    fn source_size(&self) -> DVec2 {
        self.source_size
    }
}

/// An in-memory scene graph with a fixed canvas and named items.
pub struct MemoryScene {
    canvas: DVec2,
    items: HashMap<String, Arc<MemoryItem>>,
}

impl MemoryScene {
    #[must_use]
    pub fn new(canvas: DVec2) -> Self {
        Self { canvas, items: HashMap::new() }
    }

    #[must_use]
    pub fn with_item(mut self, name: impl Into<String>, item: MemoryItem) -> Self {
        self.items.insert(name.into(), Arc::new(item));
        self
    }
}

impl SceneGraph for MemoryScene {
    fn find_item(&self, name: &str) -> Option<Arc<dyn SceneItem>> {
        self.items
            .get(name)
            .map(|item| Arc::clone(item) as Arc<dyn SceneItem>)
    }

    fn canvas_size(&self) -> DVec2 {
        self.canvas
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transform() -> ItemTransform {
        ItemTransform {
            scale: DVec2::ONE,
            pos: DVec2::new(100.0, 50.0),
            bounds: DVec2::ZERO,
            bounds_mode: BoundsMode::None,
        }
    }

    #[test]
    fn partial_update_leaves_other_fields_untouched() {
        let item = MemoryItem::new(sample_transform(), DVec2::new(1280.0, 720.0));
        item.apply(&TransformUpdate {
            pos: Some(DVec2::new(10.0, 20.0)),
            ..TransformUpdate::default()
        });

        let state = item.transform();
        assert_eq!(state.pos, DVec2::new(10.0, 20.0));
        assert_eq!(state.scale, DVec2::ONE);
        assert_eq!(state.bounds, DVec2::ZERO);
    }

    #[test]
    fn lookup_is_exact_name_match() {
        let scene = MemoryScene::new(DVec2::new(1920.0, 1080.0))
            .with_item("Model", MemoryItem::new(sample_transform(), DVec2::ONE));

        assert!(scene.find_item("Model").is_some());
        assert!(scene.find_item("model").is_none());
        assert!(scene.find_item("ghost").is_none());
    }
}
