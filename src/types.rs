use serde::Serialize;

/// Pass-through fields attached to an element at registration and sent along with every
/// resolution request (the original plugin's "send data").
///
/// Configuration keys themselves are never part of this map; only caller-supplied
/// application data travels on the wire.
pub type SendData = serde_json::Map<String, serde_json::Value>;

/// Stable identifier of a registered element.
///
/// Allocated by the engine at registration (auto-increment); hosts typically mirror it
/// into element metadata (e.g. a data attribute) for reverse lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub(crate) u64);

impl ElementId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for ElementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inclusive width range used to derive a candidate width list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeRange {
    pub min: u32,
    pub max: u32,
}

impl SizeRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> u32 {
        self.max.saturating_sub(self.min)
    }
}

/// A snapshot of the current viewport state, provided by the host.
///
/// `breakpoint` is the opaque token of the active CSS breakpoint, read by the host via
/// its platform side-channel. It is only consulted for elements in media-query mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub breakpoint: Option<String>,
}

impl Viewport {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            breakpoint: None,
        }
    }

    pub fn with_breakpoint(mut self, breakpoint: impl Into<String>) -> Self {
        self.breakpoint = Some(breakpoint.into());
        self
    }
}

/// The resolved size for one pipeline run.
///
/// Newly allocated each run, never mutated in place from a prior run. Serialized
/// camelCase as the single `request` parameter of endpoint resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeData {
    /// Canonical identifier of the resolved size: the numeric width as a decimal string,
    /// or the breakpoint token in media-query mode. The unit of change detection.
    pub size_id: String,
    pub width: u32,
    /// Present iff `ratio` is configured: `width / ratio`, kept as a float (the wire
    /// format does not round).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Present iff `high-resolution` is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_resolution: Option<bool>,
    #[serde(flatten)]
    pub extra: SendData,
}

/// A resolved URL together with the size data that produced it, handed to `update`
/// callbacks.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedImage {
    pub url: String,
    pub data: SizeData,
}
