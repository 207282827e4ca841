//! Zoom animation tick loop.
//!
//! DESIGN
//! ======
//! One task per animation drives the scene item through N eased frames at
//! 60 ticks/second. The caller computes both keyframes up front; the loop
//! only interpolates and writes, checking a stop flag every tick so it
//! can be aborted within one tick period. Scale/position/bounds are
//! written together per tick, with the item's sizing mode deciding which
//! of scale and bounds is animated.
//!
//! The zoom state advances (`ZoomingIn → Zoomed`, `ZoomingOut → Idle`)
//! when the loop exits, whether it ran to completion or was aborted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use glam::DVec2;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

use crate::geometry::ease_in_out_cubic;
use crate::scene::{BoundsMode, ItemTransform, SceneItem, TransformUpdate};

/// Animation tick rate in frames per second.
pub const TICK_RATE: f64 = 60.0;

// =============================================================================
// TYPES
// =============================================================================

/// Lifecycle of the zoom effect. One instance, owned by the controller;
/// the animation task is the only other writer (completion transitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomState {
    Idle,
    ZoomingIn,
    Zoomed,
    ZoomingOut,
}

/// One end of an interpolation: the full geometry tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub scale: DVec2,
    pub pos: DVec2,
    pub bounds: DVec2,
}

impl From<&ItemTransform> for Keyframe {
    fn from(t: &ItemTransform) -> Self {
        Self { scale: t.scale, pos: t.pos, bounds: t.bounds }
    }
}

/// A fully resolved animation: both keyframes, the frame count, and the
/// sizing mode that selects which geometry field is written.
#[derive(Debug, Clone, Copy)]
pub struct Animation {
    pub start: Keyframe,
    pub end: Keyframe,
    pub frames: u32,
    pub mode: BoundsMode,
}

// =============================================================================
// TICK LOOP
// =============================================================================

/// Spawn the tick loop for one animation.
///
/// `active` is the stop flag: cleared externally to abort, cleared by the
/// loop itself on exit. `state` receives the completion transition.
#[must_use]
pub fn spawn(
    item: Arc<dyn SceneItem>,
    animation: Animation,
    active: Arc<AtomicBool>,
    state: Arc<Mutex<ZoomState>>,
) -> JoinHandle<()> {
    tokio::spawn(run(item, animation, active, state))
}

async fn run(
    item: Arc<dyn SceneItem>,
    animation: Animation,
    active: Arc<AtomicBool>,
    state: Arc<Mutex<ZoomState>>,
) {
    let frames = animation.frames.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / TICK_RATE));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick resolves immediately

    for frame in 1..=frames {
        if !active.load(Ordering::SeqCst) {
            break;
        }
        let t = f64::from(frame) / f64::from(frames);
        let eased = ease_in_out_cubic(t);
        item.apply(&interpolate(&animation, eased));
        trace!(frame, t, "zoom animation tick");
        ticker.tick().await;
    }

    advance_state(&state);
    active.store(false, Ordering::SeqCst);
}

/// Eased interpolation between the keyframes, populating only the fields
/// the item's sizing mode owns.
fn interpolate(animation: &Animation, eased: f64) -> TransformUpdate {
    let pos = animation.start.pos.lerp(animation.end.pos, eased);
    match animation.mode {
        BoundsMode::None => TransformUpdate {
            scale: Some(animation.start.scale.lerp(animation.end.scale, eased)),
            pos: Some(pos),
            bounds: None,
        },
        BoundsMode::Bounded => TransformUpdate {
            scale: None,
            pos: Some(pos),
            bounds: Some(animation.start.bounds.lerp(animation.end.bounds, eased)),
        },
    }
}

fn advance_state(state: &Mutex<ZoomState>) {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    *state = match *state {
        ZoomState::ZoomingIn => ZoomState::Zoomed,
        ZoomState::ZoomingOut => ZoomState::Idle,
        other => other,
    };
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryItem;
    use tokio::time::timeout;

    const EPS: f64 = 1e-9;

    fn item(mode: BoundsMode) -> Arc<MemoryItem> {
        Arc::new(MemoryItem::new(
            ItemTransform {
                scale: DVec2::ONE,
                pos: DVec2::ZERO,
                bounds: DVec2::new(100.0, 100.0),
                bounds_mode: mode,
            },
            DVec2::new(640.0, 480.0),
        ))
    }

    fn sample_animation(mode: BoundsMode) -> Animation {
        Animation {
            start: Keyframe { scale: DVec2::ONE, pos: DVec2::ZERO, bounds: DVec2::new(100.0, 100.0) },
            end: Keyframe {
                scale: DVec2::splat(2.0),
                pos: DVec2::new(-320.0, -240.0),
                bounds: DVec2::new(200.0, 200.0),
            },
            frames: 4,
            mode,
        }
    }

    #[tokio::test]
    async fn completed_animation_lands_on_end_keyframe_and_advances_state() {
        let item = item(BoundsMode::None);
        let active = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(ZoomState::ZoomingIn));

        let handle = spawn(
            Arc::clone(&item) as Arc<dyn SceneItem>,
            sample_animation(BoundsMode::None),
            Arc::clone(&active),
            Arc::clone(&state),
        );
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("animation timed out")
            .expect("animation task panicked");

        let transform = item.transform();
        assert!((transform.scale.x - 2.0).abs() < EPS);
        assert!((transform.pos.x + 320.0).abs() < EPS);
        assert!((transform.pos.y + 240.0).abs() < EPS);
        assert_eq!(*state.lock().unwrap(), ZoomState::Zoomed);
        assert!(!active.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn zooming_out_completion_returns_to_idle() {
        let item = item(BoundsMode::None);
        let active = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(ZoomState::ZoomingOut));

        let handle = spawn(
            Arc::clone(&item) as Arc<dyn SceneItem>,
            sample_animation(BoundsMode::None),
            Arc::clone(&active),
            Arc::clone(&state),
        );
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("animation timed out")
            .expect("animation task panicked");

        assert_eq!(*state.lock().unwrap(), ZoomState::Idle);
    }

    #[tokio::test]
    async fn cleared_stop_flag_aborts_before_the_last_frame() {
        let item = item(BoundsMode::None);
        let active = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(ZoomState::ZoomingIn));

        let handle = spawn(
            Arc::clone(&item) as Arc<dyn SceneItem>,
            sample_animation(BoundsMode::None),
            Arc::clone(&active),
            Arc::clone(&state),
        );
        timeout(Duration::from_millis(500), handle)
            .await
            .expect("aborted animation should exit quickly")
            .expect("animation task panicked");

        // No frame was written; the state transition still happens.
        let transform = item.transform();
        assert!((transform.scale.x - 1.0).abs() < EPS);
        assert_eq!(*state.lock().unwrap(), ZoomState::Zoomed);
    }

    #[tokio::test]
    async fn bounds_mode_animates_bounds_and_leaves_scale_alone() {
        let item = item(BoundsMode::Bounded);
        let active = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(ZoomState::ZoomingIn));

        let handle = spawn(
            Arc::clone(&item) as Arc<dyn SceneItem>,
            sample_animation(BoundsMode::Bounded),
            Arc::clone(&active),
            Arc::clone(&state),
        );
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("animation timed out")
            .expect("animation task panicked");

        let transform = item.transform();
        assert!((transform.bounds.x - 200.0).abs() < EPS);
        assert!((transform.scale.x - 1.0).abs() < EPS, "scale must stay untouched in bounds mode");
    }

    #[test]
    fn interpolate_midpoint_is_halfway() {
        let animation = sample_animation(BoundsMode::None);
        let update = interpolate(&animation, 0.5);
        let scale = update.scale.unwrap();
        assert!((scale.x - 1.5).abs() < EPS);
        let pos = update.pos.unwrap();
        assert!((pos.x + 160.0).abs() < EPS);
        assert!(update.bounds.is_none());
    }
}
