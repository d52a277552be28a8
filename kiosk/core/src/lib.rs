//! Kiosk Core - Headless Queue Reconciliation for the Queue Kiosk
//!
//! This crate keeps a kiosk's on-screen player queue in step with the
//! backend, independent of how the queue is drawn. It can drive the terminal
//! surface, or run headless under test.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Display Surface                         │
//! │        (terminal UI, test harness, anything rendering)        │
//! │                             │                                 │
//! │                    KioskEvent (up)                            │
//! │                   KioskMessage (down)                         │
//! └─────────────────────────────┼─────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼─────────────────────────────────┐
//! │                        KIOSK CORE                             │
//! │  ┌──────────────────────────┴──────────────────────────────┐  │
//! │  │                        Kiosk                             │  │
//! │  │  ┌─────────────┐  ┌────────────┐  ┌──────┐  ┌─────────┐  │  │
//! │  │  │  Animation  │  │   Status   │  │ Scan │  │ Backend │  │  │
//! │  │  │ Coordinator │  │ Coordinator│  │Buffer│  │ (HTTP)  │  │  │
//! │  │  └─────────────┘  └────────────┘  └──────┘  └─────────┘  │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Kiosk`]: the event loop owning every piece of mutable state
//! - [`AnimationCoordinator`]: single-flight reconciliation of snapshots into
//!   the rendered queue
//! - [`StatusCoordinator`]: session status and start eligibility
//! - [`KioskMessage`] / [`KioskEvent`]: the surface protocol
//! - [`HttpBackend`]: the kiosk REST API client
//!
//! # Quick Start
//!
//! ```ignore
//! use kiosk_core::{load_config, HttpBackend, Kiosk};
//! use tokio::sync::mpsc;
//!
//! let config = load_config()?;
//! let backend = HttpBackend::from_config(&config.backend, config.queue.capacity)?;
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let (event_tx, event_rx) = mpsc::channel(64);
//!
//! let kiosk = Kiosk::new(backend, config, tx);
//! tokio::spawn(kiosk.run(event_rx, None, None));
//!
//! while let Some(msg) = rx.recv().await {
//!     // draw it; send KioskEvent::ArrivalFinished for every PlayArrival
//! }
//! ```
//!
//! # No TUI Dependencies
//!
//! This crate has no dependency on ratatui, crossterm, or any other UI
//! framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod coordinator;
pub mod events;
pub mod history;
pub mod kiosk;
pub mod messages;
pub mod model;
pub mod renderer;
pub mod scan;
pub mod source;
pub mod status;

pub use config::{
    load_config, load_config_from_path, ConfigError, ConfigOverrides, ConfigSource, KioskConfig,
    MalformedPayloadPolicy,
};
pub use coordinator::{
    AnimationCoordinator, ArrivalRequest, ArrivalTicket, CommittedView, CoordinatorEffect,
    CoordinatorError, Phase,
};
pub use events::KioskEvent;
pub use kiosk::{Completion, Kiosk};
pub use messages::{KioskMessage, NoticeLevel};
pub use model::{Player, PlayerId, QueueSnapshot, StatusReport};
pub use renderer::{QueueView, SlotVisual};
pub use scan::{ScanBuffer, ScanKey};
pub use source::{FetchError, HttpBackend, KioskActions, PushEvent, RemoteQueueSource};
pub use status::{StatusCoordinator, StatusEffect};
