//! Magic Man TUI - Terminal front-end for the Magic Man voice agent
//!
//! This crate provides a full-screen terminal UI featuring an animated
//! pixel-art wizard who talks when the agent talks and may hang up on you.
//!
//! # Architecture
//!
//! - **SessionClient**: owns the core session controller and voice channel
//! - **Display**: render-ready state derived from controller snapshots
//! - **Compositor**: layered rendering with z-ordering
//! - **Avatar**: the core animator mapped to pixel-art frames
//! - **Widgets**: the orb control and the scrollable transcript

pub mod app;
pub mod avatar;
pub mod compositor;
pub mod display;
pub mod session_client;
pub mod theme;
pub mod widgets;

pub use app::{App, Command};
pub use session_client::SessionClient;
