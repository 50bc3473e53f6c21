//! Magic Core - Headless Session and Character Logic for Magic Man
//!
//! This crate holds everything behind the Magic Man voice-agent front-end
//! that is not drawing: the conversation lifecycle against a hosted agent,
//! the "he hung up on you" heuristics, and the character's presentation
//! state machine. It can drive the terminal surface or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Terminal Surface                         │
//! │     orb / badges / banners / transcript / character stage     │
//! └───────────────┬───────────────────────────────▲──────────────┘
//!                 │ start / end / tick            │ snapshot, frame
//! ┌───────────────▼───────────────────────────────┴──────────────┐
//! │                        MAGIC CORE                             │
//! │  ┌────────────────────┐   visible,   ┌──────────────────────┐ │
//! │  │ SessionController  │── speaking ─►│  CharacterAnimator   │ │
//! │  └───┬───────────▲────┘              └──────────────────────┘ │
//! │      │ open      │ ChannelEvent (per-session queue)           │
//! │  ┌───▼───────────┴────┐  ┌────────────┐                       │
//! │  │   VoiceChannel     │  │ Microphone │                       │
//! │  └────────────────────┘  └────────────┘                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SessionController`]: owns the session and handles channel events
//! - [`CharacterAnimator`]: picks the frame to show from `visible`/`speaking`
//! - [`VoiceChannel`]: the real-time connection to the hosted agent
//! - [`Microphone`]: audio capture permission
//! - [`MagicConfig`]: layered configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use magic_core::{
//!     channel::{Script, ScriptedChannel},
//!     microphone::FixedMicrophone,
//!     CharacterAnimator, MagicConfig, SessionController,
//! };
//! use std::time::{Duration, Instant};
//!
//! let config = MagicConfig::default();
//! let mut animator = CharacterAnimator::new(config.animation.clone());
//! let mut controller = SessionController::new(
//!     config,
//!     ScriptedChannel::new(Script::magic_man_demo()),
//!     FixedMicrophone::allow(),
//! );
//!
//! controller.start_session().await?;
//! loop {
//!     controller.tick(Instant::now());
//!     let snap = controller.snapshot();
//!     animator.set_visible(snap.visible);
//!     animator.set_speaking(snap.speaking);
//!     animator.update(Duration::from_millis(16));
//!     // draw animator.current_frame()
//! }
//! ```
//!
//! # No TUI Dependencies
//!
//! This crate has no dependency on ratatui, crossterm, or any other UI
//! framework.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animator;
pub mod channel;
pub mod config;
pub mod controller;
pub mod dismissal;
pub mod error;
pub mod events;
pub mod microphone;
pub mod session;

pub use animator::{
    AnimationKind, CharacterAnimator, ExitTransition, FrameId, Phase, PoofDirection,
};
pub use channel::{Script, ScriptedChannel, VoiceChannel};
#[cfg(feature = "websocket")]
pub use channel::WebSocketChannel;
pub use config::{ChannelKind, ConfigError, ConfigOverrides, MagicConfig, MicrophonePolicy};
pub use controller::SessionController;
pub use dismissal::{DismissalSignal, KeywordMatcher, DISMISSAL_TEXT};
pub use error::{CaptureError, ChannelError, ErrorKind, SessionError};
pub use events::{ChannelEvent, Source};
pub use microphone::{microphone_for, DeviceMicrophone, FixedMicrophone, Microphone};
pub use session::{ConnectionStatus, EndCause, Session, SessionSnapshot, TranscriptLine};
