use std::sync::Arc;

use crate::error::{OptionsError, ParseError};
use crate::parse::{self, RawValue};
use crate::types::{ElementId, ResolvedImage, SendData, SizeData, SizeRange, Viewport};
use crate::widths::build_width_list;

/// Default spacing between derived width candidates, in pixels.
pub const DEFAULT_STEP_SIZE: u32 = 160;

/// Default quiet period before a resize sweep runs, in milliseconds.
pub const DEFAULT_RESIZE_DELAY_MS: u64 = 500;

/// A synchronous URL resolver, invoked with the resolved size data and the element
/// handle.
pub type UrlResolverCallback<H> = Arc<dyn Fn(&SizeData, &H) -> String + Send + Sync>;

/// A caller-supplied visual update. When configured, it replaces the engine-wide
/// `apply_src` write entirely.
pub type UpdateCallback<H> = Arc<dyn Fn(&H, &ResolvedImage) + Send + Sync>;

/// Reports an element's rendered width in media-query mode. Invoked with the element
/// handle and its pass-through send data.
pub type GetWidthCallback<H> = Arc<dyn Fn(&H, &SendData) -> u32 + Send + Sync>;

/// Decides density doubling per update, from the size data resolved so far and the
/// element handle.
pub type HighResolutionCallback<H> = Arc<dyn Fn(&SizeData, &H) -> bool + Send + Sync>;

/// The engine-wide default DOM write: set the resolved URL as the element's image
/// source (or the source of its first descendant image, for container handles).
pub type ApplySrcCallback<H> = Arc<dyn Fn(&H, &str) + Send + Sync>;

/// Optional diagnostic sink for per-element resolution failures.
pub type OnErrorCallback = Arc<dyn Fn(ElementId, &crate::error::EngineError) + Send + Sync>;

/// How an image URL is obtained for a resolved size.
pub enum UrlSource<H> {
    /// Invoke a caller-supplied function synchronously; its return value is the URL.
    Direct(UrlResolverCallback<H>),
    /// Issue a request to this endpoint carrying the JSON-serialized size data; the
    /// host performs the transport (see [`crate::Engine::drain_fetch_requests`]).
    Endpoint(String),
}

impl<H> UrlSource<H> {
    pub fn direct(f: impl Fn(&SizeData, &H) -> String + Send + Sync + 'static) -> Self {
        Self::Direct(Arc::new(f))
    }

    pub fn endpoint(url: impl Into<String>) -> Self {
        Self::Endpoint(url.into())
    }
}

impl<H> Clone for UrlSource<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct(f) => Self::Direct(Arc::clone(f)),
            Self::Endpoint(url) => Self::Endpoint(url.clone()),
        }
    }
}

impl<H> core::fmt::Debug for UrlSource<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Direct(_) => f.write_str("Direct(..)"),
            Self::Endpoint(url) => f.debug_tuple("Endpoint").field(url).finish(),
        }
    }
}

/// Density-doubling configuration.
pub enum HighResolution<H> {
    /// A fixed decision.
    Static(bool),
    /// Decide from the device pixel density probe (density > 1.5).
    Auto,
    /// Decide per update via a callback.
    Resolver(HighResolutionCallback<H>),
}

impl<H> HighResolution<H> {
    pub fn resolver(f: impl Fn(&SizeData, &H) -> bool + Send + Sync + 'static) -> Self {
        Self::Resolver(Arc::new(f))
    }
}

impl<H> Clone for HighResolution<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(v) => Self::Static(*v),
            Self::Auto => Self::Auto,
            Self::Resolver(f) => Self::Resolver(Arc::clone(f)),
        }
    }
}

impl<H> core::fmt::Debug for HighResolution<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Self::Auto => f.write_str("Auto"),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Per-element configuration.
///
/// Cheap to clone: callbacks are stored in `Arc`s. The engine normalizes the options at
/// registration ([`ImageOptions::normalize`]); after that they are immutable.
pub struct ImageOptions<H> {
    pub url_source: UrlSource<H>,
    /// Candidate breakpoints, strictly descending and unique after normalization.
    pub widths: Vec<u32>,
    /// Alternative to explicit `widths`; takes precedence during normalization.
    pub range: Option<SizeRange>,
    /// Spacing used to derive `widths` from `range`.
    pub step_size: u32,
    /// Width ÷ height aspect ratio used to derive a height per update.
    pub ratio: Option<f64>,
    /// When `true`, size identification uses the active breakpoint token instead of the
    /// width list.
    pub media_query: bool,
    pub high_resolution: Option<HighResolution<H>>,
    /// Replaces the engine-wide `apply_src` write for this element.
    pub update: Option<UpdateCallback<H>>,
    /// Width source in media-query mode. Falls back to the engine default, then to the
    /// viewport width.
    pub get_width: Option<GetWidthCallback<H>>,
    /// Pass-through fields copied into every [`SizeData`] for this element.
    pub send_data: SendData,
}

impl<H> ImageOptions<H> {
    pub fn new(url_source: UrlSource<H>) -> Self {
        Self {
            url_source,
            widths: Vec::new(),
            range: None,
            step_size: DEFAULT_STEP_SIZE,
            ratio: None,
            media_query: false,
            high_resolution: None,
            update: None,
            get_width: None,
            send_data: SendData::new(),
        }
    }

    /// Creates options with a synchronous URL resolver.
    pub fn direct(f: impl Fn(&SizeData, &H) -> String + Send + Sync + 'static) -> Self {
        Self::new(UrlSource::direct(f))
    }

    /// Creates options with an endpoint resolver.
    pub fn endpoint(url: impl Into<String>) -> Self {
        Self::new(UrlSource::endpoint(url))
    }

    pub fn with_widths(mut self, widths: impl IntoIterator<Item = u32>) -> Self {
        self.widths = widths.into_iter().collect();
        self
    }

    pub fn with_range(mut self, min: u32, max: u32) -> Self {
        self.range = Some(SizeRange { min, max });
        self
    }

    pub fn with_step_size(mut self, step_size: u32) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub fn with_media_query(mut self, media_query: bool) -> Self {
        self.media_query = media_query;
        self
    }

    pub fn with_high_resolution(mut self, high_resolution: HighResolution<H>) -> Self {
        self.high_resolution = Some(high_resolution);
        self
    }

    pub fn with_update(mut self, update: impl Fn(&H, &ResolvedImage) + Send + Sync + 'static) -> Self {
        self.update = Some(Arc::new(update));
        self
    }

    pub fn with_get_width(
        mut self,
        get_width: impl Fn(&H, &SendData) -> u32 + Send + Sync + 'static,
    ) -> Self {
        self.get_width = Some(Arc::new(get_width));
        self
    }

    /// Adds one pass-through field to the element's send data.
    pub fn with_send_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.send_data.insert(key.into(), value.into());
        self
    }

    pub fn with_send_data(mut self, send_data: SendData) -> Self {
        self.send_data = send_data;
        self
    }

    /// Applies one raw configuration value to a recognized key.
    ///
    /// Recognized keys: `widths`, `range`, `step-size`, `ratio`, `media-query`,
    /// `high-resolution` (which additionally accepts the literal token `"auto"`).
    /// Unrecognized keys and present-but-empty text values are left untouched.
    pub fn apply_raw(&mut self, key: &str, raw: RawValue) -> Result<(), ParseError> {
        if raw.is_absent() {
            return Ok(());
        }
        match key {
            "widths" => self.widths = parse::parse_width_list(&raw)?,
            "range" => self.range = Some(parse::parse_range(&raw)?),
            "step-size" => self.step_size = u32::try_from(parse::parse_integer(&raw)?).unwrap_or(0),
            "ratio" => self.ratio = Some(parse::parse_float(&raw)?),
            "media-query" => self.media_query = parse::parse_boolean(&raw),
            "high-resolution" => {
                self.high_resolution = Some(match &raw {
                    RawValue::Text(t) if t.trim() == "auto" => HighResolution::Auto,
                    _ => HighResolution::Static(parse::parse_boolean(&raw)),
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Canonicalizes the configuration: expands `range` into `widths` (replacing any
    /// explicit list), enforces the descending/unique/positive invariants, and validates
    /// that some selection mode is configured. Idempotent.
    pub fn normalize(&mut self) -> Result<(), OptionsError> {
        if let Some(range) = self.range {
            if range.min >= range.max {
                return Err(OptionsError::EmptyRange {
                    min: range.min,
                    max: range.max,
                });
            }
            if self.step_size == 0 {
                return Err(OptionsError::ZeroStepSize);
            }
            self.widths = build_width_list(range, self.step_size);
        } else {
            self.widths.retain(|&w| w > 0);
            self.widths.sort_unstable_by(|a, b| b.cmp(a));
            self.widths.dedup();
        }

        if !self.media_query && self.widths.is_empty() {
            return Err(OptionsError::NoSelectionMode);
        }
        Ok(())
    }
}

impl<H> Clone for ImageOptions<H> {
    fn clone(&self) -> Self {
        Self {
            url_source: self.url_source.clone(),
            widths: self.widths.clone(),
            range: self.range,
            step_size: self.step_size,
            ratio: self.ratio,
            media_query: self.media_query,
            high_resolution: self.high_resolution.clone(),
            update: self.update.clone(),
            get_width: self.get_width.clone(),
            send_data: self.send_data.clone(),
        }
    }
}

impl<H> core::fmt::Debug for ImageOptions<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageOptions")
            .field("url_source", &self.url_source)
            .field("widths", &self.widths)
            .field("range", &self.range)
            .field("step_size", &self.step_size)
            .field("ratio", &self.ratio)
            .field("media_query", &self.media_query)
            .field("high_resolution", &self.high_resolution)
            .finish_non_exhaustive()
    }
}

/// Engine-wide configuration.
pub struct EngineOptions<H> {
    /// The default DOM write for resolved URLs.
    pub apply_src: ApplySrcCallback<H>,
    /// Quiet period before a resize sweep runs.
    pub resize_delay_ms: u64,
    /// Device pixel density, used by [`HighResolution::Auto`] (doubling at > 1.5).
    pub device_pixel_ratio: f64,
    /// Viewport to use for registrations that happen before the first resize event.
    pub initial_viewport: Option<Viewport>,
    /// Fallback width source for media-query mode elements without their own
    /// `get_width`.
    pub default_get_width: Option<GetWidthCallback<H>>,
    /// Invoked for every per-element resolution failure, after it is logged.
    pub on_error: Option<OnErrorCallback>,
}

impl<H> EngineOptions<H> {
    pub fn new(apply_src: impl Fn(&H, &str) + Send + Sync + 'static) -> Self {
        Self {
            apply_src: Arc::new(apply_src),
            resize_delay_ms: DEFAULT_RESIZE_DELAY_MS,
            device_pixel_ratio: 1.0,
            initial_viewport: None,
            default_get_width: None,
            on_error: None,
        }
    }

    pub fn with_resize_delay_ms(mut self, resize_delay_ms: u64) -> Self {
        self.resize_delay_ms = resize_delay_ms;
        self
    }

    pub fn with_device_pixel_ratio(mut self, device_pixel_ratio: f64) -> Self {
        self.device_pixel_ratio = device_pixel_ratio;
        self
    }

    pub fn with_initial_viewport(mut self, viewport: Viewport) -> Self {
        self.initial_viewport = Some(viewport);
        self
    }

    pub fn with_default_get_width(
        mut self,
        get_width: impl Fn(&H, &SendData) -> u32 + Send + Sync + 'static,
    ) -> Self {
        self.default_get_width = Some(Arc::new(get_width));
        self
    }

    pub fn with_on_error(
        mut self,
        on_error: impl Fn(ElementId, &crate::error::EngineError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(on_error));
        self
    }
}

impl<H> Clone for EngineOptions<H> {
    fn clone(&self) -> Self {
        Self {
            apply_src: Arc::clone(&self.apply_src),
            resize_delay_ms: self.resize_delay_ms,
            device_pixel_ratio: self.device_pixel_ratio,
            initial_viewport: self.initial_viewport.clone(),
            default_get_width: self.default_get_width.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<H> core::fmt::Debug for EngineOptions<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("resize_delay_ms", &self.resize_delay_ms)
            .field("device_pixel_ratio", &self.device_pixel_ratio)
            .field("initial_viewport", &self.initial_viewport)
            .finish_non_exhaustive()
    }
}
