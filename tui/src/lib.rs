//! Kiosk TUI - Terminal surface for the queue kiosk
//!
//! This crate draws the live player queue on a terminal. It owns no queue
//! logic: the kiosk core decides what is shown and when, and the surface plays
//! the arrival animation and hands each ticket back.
//!
//! # Architecture
//!
//! - **App**: event loop bridging terminal input and the kiosk core
//! - **Display**: state derived from core messages, plus arrival timing
//! - **Compositor**: layered rendering with z-ordering for overlays
//! - **Widgets**: queue slots and scrollable text blocks

pub mod app;
pub mod compositor;
pub mod display;
pub mod theme;
pub mod widgets;

pub use app::{App, InputMode};
pub use display::{ArrivalAnimator, DisplayState};
