//! Smart zoom for a compositor scene item, driven by VTube Studio model
//! tracking.
//!
//! ARCHITECTURE
//! ============
//! A background websocket client ([`vts::client`]) authenticates against
//! the tracking application and turns its model movement events into a
//! continuously updated zoom target. A toggle on [`controller::ZoomController`]
//! latches that target, computes end geometry ([`zoom::transform`]), and
//! runs an eased interpolation ([`zoom::animator`]) against the host's
//! scene-graph boundary ([`scene`]). A second toggle animates back to the
//! geometry saved before the zoom.

pub mod config;
pub mod controller;
pub mod geometry;
pub mod scene;
pub mod settings;
pub mod vts;
pub mod zoom;
