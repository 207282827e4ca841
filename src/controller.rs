//! Zoom controller — owns all process-wide zoom state.
//!
//! ARCHITECTURE
//! ============
//! Everything mutable lives here: the zoom state machine, the pre-zoom
//! snapshot, the latched zoom target, the cached auth token, and the
//! running task handles. The controller has an explicit lifecycle:
//! `start` restores the persisted token and spawns the tracking client,
//! `toggle` drives the state machine, `shutdown` stops both background
//! tasks with bounded waits and persists the token.
//!
//! CONCURRENCY
//! ===========
//! Toggle, settings updates, and shutdown are control-context calls; the
//! tracking task only writes the target slot and token slot, and the
//! animation task only writes per-frame geometry plus the completion
//! transition. The target is latched by value when a zoom-in starts —
//! pose events arriving mid-animation affect the next zoom-in only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use glam::DVec2;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::scene::{ItemTransform, SceneGraph, SceneItem};
use crate::settings::TokenStore;
use crate::vts::client::{ClientConfig, PoseHandler, TokenSlot, TrackingClient, token_slot};
use crate::vts::protocol::PoseSample;
use crate::zoom::animator::{self, Animation, Keyframe, ZoomState};
use crate::zoom::transform::{self, ZoomOffsets, ZoomTarget};

const ANIMATION_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

// =============================================================================
// TYPES
// =============================================================================

/// Operator-facing settings the controller consumes. Adjustable at
/// runtime via [`ZoomController::apply_settings`]; offset changes take
/// effect on the next pose event, the rest on the next toggle.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Name of the scene item to zoom. Empty means not configured.
    pub source_name: String,
    /// Animation length in frames at 60 fps.
    pub zoom_speed: u32,
    /// Keep the zoomed item's edges outside the canvas.
    pub clamp_to_canvas: bool,
    /// Calibration offsets for target derivation.
    pub offsets: ZoomOffsets,
}

/// Geometry saved right before zooming in; the zoom-out end state.
/// Fields are independently optional because bounds-mode and scale-mode
/// are mutually exclusive on the real item.
#[derive(Debug, Clone, Copy, Default)]
struct TransformSnapshot {
    scale: Option<DVec2>,
    pos: Option<DVec2>,
    bounds: Option<DVec2>,
}

impl TransformSnapshot {
    fn capture(t: &ItemTransform) -> Self {
        Self { scale: Some(t.scale), pos: Some(t.pos), bounds: Some(t.bounds) }
    }

    /// Snapshot as a keyframe, falling back per-field to live geometry.
    fn restore_keyframe(&self, live: Keyframe) -> Keyframe {
        Keyframe {
            scale: self.scale.unwrap_or(live.scale),
            pos: self.pos.unwrap_or(live.pos),
            bounds: self.bounds.unwrap_or(live.bounds),
        }
    }
}

/// Why a toggle was rejected. Operator errors only; both are surfaced as
/// warnings and leave every piece of state untouched.
#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error("no zoom source configured")]
    NoSourceConfigured,
    #[error("source \"{0}\" not found in the active scene")]
    ItemNotFound(String),
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct ZoomController {
    settings: Arc<RwLock<ControllerSettings>>,
    scene: Arc<dyn SceneGraph>,
    target: Arc<Mutex<ZoomTarget>>,
    token: TokenSlot,
    state: Arc<Mutex<ZoomState>>,
    saved: TransformSnapshot,
    animation_active: Arc<AtomicBool>,
    animation: Option<JoinHandle<()>>,
    client: Option<TrackingClient>,
    client_config: ClientConfig,
    store: TokenStore,
}

impl ZoomController {
    #[must_use]
    pub fn new(
        settings: ControllerSettings,
        client_config: ClientConfig,
        store: TokenStore,
        scene: Arc<dyn SceneGraph>,
    ) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            scene,
            target: Arc::new(Mutex::new(ZoomTarget::default())),
            token: token_slot(None),
            state: Arc::new(Mutex::new(ZoomState::Idle)),
            saved: TransformSnapshot::default(),
            animation_active: Arc::new(AtomicBool::new(false)),
            animation: None,
            client: None,
            client_config,
            store,
        }
    }

    /// Restore the persisted token and spawn the tracking client.
    pub fn start(&mut self) {
        if let Some(token) = self.store.load() {
            *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
            info!("restored persisted tracker token");
        }

        let handler = Self::pose_handler(&self.settings, &self.target);
        self.client = Some(TrackingClient::spawn(
            self.client_config.clone(),
            Arc::clone(&self.token),
            handler,
        ));
        info!("zoom controller started");
    }

    /// The handler installed into the tracking client: derive a target
    /// from each pose with the current offsets and replace the slot.
    fn pose_handler(
        settings: &Arc<RwLock<ControllerSettings>>,
        target: &Arc<Mutex<ZoomTarget>>,
    ) -> PoseHandler {
        let settings = Arc::clone(settings);
        let target = Arc::clone(target);
        Arc::new(move |pose: PoseSample| {
            let offsets = settings.read().unwrap_or_else(PoisonError::into_inner).offsets;
            let derived = transform::derive_target(pose, offsets);
            *target.lock().unwrap_or_else(PoisonError::into_inner) = derived;
        })
    }

    /// Feed one pose sample through the same path the tracking client
    /// uses. Lets callers without a live tracker drive the target.
    pub fn observe_pose(&self, pose: PoseSample) {
        let handler = Self::pose_handler(&self.settings, &self.target);
        let handler: &dyn Fn(PoseSample) = handler.as_ref();
        handler(pose);
    }

    /// Current state of the zoom state machine.
    #[must_use]
    pub fn state(&self) -> ZoomState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the operator settings.
    pub fn apply_settings(&self, settings: ControllerSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// Toggle the zoom.
    ///
    /// From Idle/ZoomingOut this starts a zoom-in toward the latched
    /// target; from ZoomingIn/Zoomed a zoom-out back to the saved
    /// snapshot. Both directions interpolate from the live geometry, so a
    /// reversal is smooth. A toggle while an animation is running is a
    /// logged no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`ToggleError`] when no source is configured or the
    /// named item is not in the active scene; state is untouched.
    pub fn toggle(&mut self) -> Result<(), ToggleError> {
        let (name, zoom_speed, clamp) = {
            let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
            (settings.source_name.clone(), settings.zoom_speed, settings.clamp_to_canvas)
        };
        if name.is_empty() {
            return Err(ToggleError::NoSourceConfigured);
        }

        if self.animation_active.load(Ordering::SeqCst) {
            info!("zoom animation already in progress");
            return Ok(());
        }

        let Some(item) = self.scene.find_item(&name) else {
            return Err(ToggleError::ItemNotFound(name));
        };

        let current = item.transform();
        let start = Keyframe::from(&current);

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (next_state, end) = match *state {
            ZoomState::Idle | ZoomState::ZoomingOut => {
                self.saved = TransformSnapshot::capture(&current);
                let latched = *self.target.lock().unwrap_or_else(PoisonError::into_inner);
                let update = transform::apply_target(
                    &current,
                    item.source_size(),
                    self.scene.canvas_size(),
                    latched,
                    clamp,
                );
                let end = Keyframe {
                    scale: update.scale.unwrap_or(start.scale),
                    pos: update.pos.unwrap_or(start.pos),
                    bounds: update.bounds.unwrap_or(start.bounds),
                };
                info!(factor = latched.factor, x = latched.x, y = latched.y, "zooming in");
                (ZoomState::ZoomingIn, end)
            }
            ZoomState::ZoomingIn | ZoomState::Zoomed => {
                info!("zooming out");
                (ZoomState::ZoomingOut, self.saved.restore_keyframe(start))
            }
        };
        *state = next_state;
        drop(state);

        self.animation_active.store(true, Ordering::SeqCst);
        let animation = Animation { start, end, frames: zoom_speed.max(1), mode: current.bounds_mode };
        self.animation = Some(animator::spawn(
            item,
            animation,
            Arc::clone(&self.animation_active),
            Arc::clone(&self.state),
        ));
        Ok(())
    }

    /// Wait for the in-flight animation, if any, to finish.
    pub async fn join_animation(&mut self) {
        if let Some(handle) = self.animation.take() {
            if tokio::time::timeout(ANIMATION_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("zoom animation did not finish within the join timeout");
            }
        }
    }

    /// Stop both background tasks and persist the token. Waits are
    /// bounded; teardown proceeds regardless.
    pub async fn shutdown(&mut self) {
        self.animation_active.store(false, Ordering::SeqCst);
        self.join_animation().await;

        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }

        let token = self.token.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(token) = token {
            if let Err(e) = self.store.save(&token) {
                warn!(error = %e, "tracker token save failed");
            }
        }
        info!("zoom controller stopped");
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
