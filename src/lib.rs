//! pygame-style display modes and event normalization over a native
//! video and input backend.
//!
//! A [`Context`] owns the backend, the tracked window and the event
//! pipeline. [`Context::set_mode`] reconciles a [`ModeRequest`] with the
//! current window; [`Context::get`] pumps raw input through the pipeline
//! and returns [`EventRecord`]s.

pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod event;
pub mod platform;

pub use context::Context;
pub use display::{ModeFlags, ModeRequest, Surface};
pub use error::{Error, NativeError, Result};
pub use event::{Event, EventKind, EventRecord, RawEvent, Value};
