use thiserror::Error;

/// A coercion failure for a single raw configuration value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid integer `{0}`")]
    InvalidInteger(String),
    #[error("invalid number `{0}`")]
    InvalidFloat(String),
    #[error("malformed range `{0}`: expected `<min>-<max>`")]
    MalformedRange(String),
    #[error("invalid width list `{0}`: expected comma-separated integers")]
    InvalidWidthList(String),
}

/// A configuration rejected during normalization.
///
/// Returned by [`crate::Engine::register`]; a rejected element is never added to the
/// registry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("range is empty or inverted ({min}..{max})")]
    EmptyRange { min: u32, max: u32 },
    #[error("step size must be positive")]
    ZeroStepSize,
    #[error("no size selection mode: configure `widths`, `range`, or `media-query`")]
    NoSelectionMode,
}

/// A failure local to one element's pipeline run for one tick.
///
/// These are logged, forwarded to the engine's `on_error` callback, and never abort the
/// sweep for other elements. The element's displayed image is left untouched, and the
/// attempt is retried on the next sweep.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("media-query mode requires an active breakpoint token in the viewport")]
    MissingBreakpoint,
    #[error("no width candidates configured")]
    EmptyWidthList,
    #[error("could not encode resolution request: {0}")]
    Encode(String),
    #[error("image service error: {0}")]
    Server(String),
    #[error("malformed resolver response: {0}")]
    MalformedResponse(String),
    #[error("could not fetch url: {0}")]
    Transport(String),
}
