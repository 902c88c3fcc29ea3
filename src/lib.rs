//! A headless responsive image selection engine inspired by jQuery Fetch Responsive.
//!
//! This crate focuses on the coordination logic needed to keep many images sized to the
//! current viewport: normalizing breakpoint configuration into candidate width lists,
//! picking the candidate for the current viewport, suppressing no-op updates, and
//! dispatching URL resolution either synchronously or through a host-performed fetch.
//!
//! It is UI-agnostic. A DOM/UI layer is expected to provide:
//! - viewport snapshots (width and, in media-query mode, the active breakpoint token)
//! - wall-clock time (`now_ms` arguments drive resize debouncing)
//! - the network transport for endpoint resolution ([`Engine::drain_fetch_requests`] /
//!   [`Engine::complete_fetch`])
//! - the actual DOM write (the `apply_src` callback, or per-element `update` callbacks)
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod engine;
mod error;
mod options;
mod parse;
mod protocol;
mod scheduler;
mod types;
mod widths;


pub use engine::Engine;
pub use error::{EngineError, OptionsError, ParseError};
pub use options::{
    ApplySrcCallback, EngineOptions, GetWidthCallback, HighResolution, HighResolutionCallback,
    ImageOptions, OnErrorCallback, UpdateCallback, UrlResolverCallback, UrlSource,
    DEFAULT_RESIZE_DELAY_MS, DEFAULT_STEP_SIZE,
};
pub use parse::RawValue;
pub use protocol::{FetchRequest, FetchToken};
pub use scheduler::DebounceScheduler;
pub use types::{ElementId, ResolvedImage, SendData, SizeData, SizeRange, Viewport};
pub use widths::{build_width_list, select_width};
