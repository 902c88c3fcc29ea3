use std::collections::BTreeMap;

use crate::error::{EngineError, OptionsError};
use crate::options::{EngineOptions, HighResolution, ImageOptions, UrlSource};
use crate::protocol::{self, FetchRequest, FetchToken};
use crate::scheduler::DebounceScheduler;
use crate::types::{ElementId, ResolvedImage, SizeData, Viewport};
use crate::widths::select_width;

/// Device pixel density above which `high-resolution: auto` selects doubling.
const HIGH_DENSITY_THRESHOLD: f64 = 1.5;

struct InFlight {
    seq: u64,
    data: SizeData,
}

struct Entry<H> {
    options: ImageOptions<H>,
    handle: H,
    /// Size of the last successfully applied update.
    last_size_id: Option<String>,
    /// Size of the last dispatched attempt, recorded before the (possibly asynchronous)
    /// resolution completes so overlapping sweeps do not dispatch it twice.
    attempted_size_id: Option<String>,
    last_attempt_failed: bool,
    in_flight: Option<InFlight>,
}

impl<H> Entry<H> {
    /// Update suppression gate: a failed attempt always retries; otherwise only a
    /// changed size id (first-time included) dispatches.
    fn needs_update(&self, size_id: &str) -> bool {
        if self.last_attempt_failed {
            return true;
        }
        self.attempted_size_id.as_deref() != Some(size_id)
    }
}

/// The size-resolution and update-coordination engine.
///
/// This type is intentionally UI-agnostic:
/// - It does not hold any UI objects; elements are opaque handles of type `H`.
/// - The host drives it with viewport snapshots, resize events, and clock ticks.
/// - Endpoint resolution is split into emitted [`FetchRequest`]s and host-reported
///   completions, so the engine never performs I/O.
///
/// All state mutation goes through `&mut self`; a single-threaded event loop needs no
/// further synchronization.
pub struct Engine<H> {
    options: EngineOptions<H>,
    viewport: Viewport,
    scheduler: DebounceScheduler,
    entries: BTreeMap<ElementId, Entry<H>>,
    next_id: u64,
    next_seq: u64,
    outbox: Vec<FetchRequest>,
}

impl<H> Engine<H> {
    pub fn new(options: EngineOptions<H>) -> Self {
        let viewport = options.initial_viewport.clone().unwrap_or_default();
        let scheduler = DebounceScheduler::new(options.resize_delay_ms);
        rdebug!(
            resize_delay_ms = options.resize_delay_ms,
            device_pixel_ratio = options.device_pixel_ratio,
            "Engine::new"
        );
        Self {
            viewport,
            scheduler,
            entries: BTreeMap::new(),
            next_id: 1,
            next_seq: 0,
            outbox: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions<H> {
        &self.options
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Replaces the viewport snapshot without scheduling a sweep.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn handle(&self, id: ElementId) -> Option<&H> {
        self.entries.get(&id).map(|e| &e.handle)
    }

    /// The size id of the last successfully applied update for an element.
    pub fn last_size_id(&self, id: ElementId) -> Option<&str> {
        self.entries.get(&id)?.last_size_id.as_deref()
    }

    /// Whether an endpoint resolution is currently outstanding for an element.
    pub fn has_in_flight(&self, id: ElementId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|e| e.in_flight.is_some())
    }

    /// Reverse lookup from a handle to its element id.
    pub fn find_element(&self, mut pred: impl FnMut(&H) -> bool) -> Option<ElementId> {
        self.entries
            .iter()
            .find(|(_, entry)| pred(&entry.handle))
            .map(|(&id, _)| id)
    }

    /// Registers an element and runs its pipeline once against the current viewport.
    ///
    /// The options are normalized first; a rejected configuration leaves the registry
    /// untouched.
    pub fn register(
        &mut self,
        handle: H,
        mut options: ImageOptions<H>,
    ) -> Result<ElementId, OptionsError> {
        options.normalize()?;
        let id = ElementId(self.next_id);
        self.next_id += 1;
        rdebug!(
            element = id.0,
            widths = ?options.widths,
            media_query = options.media_query,
            "register"
        );
        self.entries.insert(
            id,
            Entry {
                options,
                handle,
                last_size_id: None,
                attempted_size_id: None,
                last_attempt_failed: false,
                in_flight: None,
            },
        );
        self.evaluate(id);
        Ok(id)
    }

    /// Removes an element and returns its handle. A completion arriving for it later is
    /// dropped.
    pub fn unregister(&mut self, id: ElementId) -> Option<H> {
        let entry = self.entries.remove(&id)?;
        rdebug!(element = id.0, "unregister");
        Some(entry.handle)
    }

    /// Records a viewport resize event: stores the snapshot and (re)starts the debounce
    /// quiet period. The sweep itself runs from [`Engine::tick`].
    pub fn notify_resize_event(&mut self, viewport: Viewport, now_ms: u64) {
        rtrace!(width = viewport.width, now_ms, "resize event");
        self.viewport = viewport;
        self.scheduler.schedule(now_ms);
    }

    /// Advances the debounce clock; runs one sweep over all registered elements when
    /// the quiet period has elapsed. Returns whether a sweep ran.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if !self.scheduler.fire_due(now_ms) {
            return false;
        }
        self.update_all();
        true
    }

    /// Runs the pipeline for every registered element, in registration order. One
    /// element's failure does not block the others.
    pub fn update_all(&mut self) {
        rdebug!(
            elements = self.entries.len(),
            width = self.viewport.width,
            "sweep"
        );
        let ids: Vec<ElementId> = self.entries.keys().copied().collect();
        for id in ids {
            self.evaluate(id);
        }
    }

    /// Re-runs the pipeline for a single element immediately.
    pub fn refresh(&mut self, id: ElementId) {
        self.evaluate(id);
    }

    pub fn is_pending_resize(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Discards a pending debounce without running the sweep (the explicit stop
    /// operation; registration of further elements re-arms on the next resize event).
    pub fn cancel_pending_resize(&mut self) {
        self.scheduler.cancel_pending();
    }

    pub fn resize_delay_ms(&self) -> u64 {
        self.scheduler.delay_ms()
    }

    pub fn set_resize_delay_ms(&mut self, delay_ms: u64) {
        self.options.resize_delay_ms = delay_ms;
        self.scheduler.set_delay_ms(delay_ms);
    }

    /// Takes the resolution requests emitted since the last drain. The host performs
    /// each GET and reports the outcome via [`Engine::complete_fetch`].
    pub fn drain_fetch_requests(&mut self) -> Vec<FetchRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Reports the outcome of an emitted fetch: `Ok(body)` with the raw response text,
    /// or `Err(reason)` for a transport failure.
    ///
    /// Completions for unregistered elements, or superseded by a newer dispatch for the
    /// same element (latest-wins), are dropped silently.
    pub fn complete_fetch(&mut self, token: FetchToken, result: Result<&str, &str>) {
        let Some(entry) = self.entries.get_mut(&token.element) else {
            rtrace!(element = token.element.0, "completion for unknown element dropped");
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.seq) != Some(token.seq) {
            rtrace!(element = token.element.0, "stale completion dropped");
            return;
        }
        let Some(in_flight) = entry.in_flight.take() else {
            return;
        };
        match result {
            Ok(body) => match protocol::parse_response(body) {
                Ok(url) => self.apply(token.element, url, in_flight.data),
                Err(err) => self.fail(token.element, err),
            },
            Err(reason) => self.fail(token.element, EngineError::Transport(reason.to_owned())),
        }
    }

    /// One pipeline run for one element: resolve size, detect change, dispatch.
    fn evaluate(&mut self, id: ElementId) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };

        let data = match self.resolve_size(entry) {
            Ok(data) => data,
            Err(err) => {
                self.report_error(id, &err);
                return;
            }
        };

        if !entry.needs_update(&data.size_id) {
            rtrace!(element = id.0, size_id = %data.size_id, "size unchanged");
            return;
        }

        match entry.options.url_source.clone() {
            UrlSource::Direct(resolve) => {
                let url = {
                    let Some(entry) = self.entries.get(&id) else {
                        return;
                    };
                    resolve(&data, &entry.handle)
                };
                self.apply(id, url, data);
            }
            UrlSource::Endpoint(endpoint) => {
                let url = match protocol::request_url(&endpoint, &data) {
                    Ok(url) => url,
                    Err(err) => {
                        self.fail(id, err);
                        return;
                    }
                };
                let seq = self.next_seq;
                self.next_seq += 1;
                let Some(entry) = self.entries.get_mut(&id) else {
                    return;
                };
                entry.attempted_size_id = Some(data.size_id.clone());
                entry.in_flight = Some(InFlight { seq, data });
                rdebug!(element = id.0, seq, %url, "fetch dispatched");
                self.outbox.push(FetchRequest {
                    token: FetchToken { element: id, seq },
                    url,
                });
            }
        }
    }

    /// Determines the size id, width, height, and density flag for one element against
    /// the current viewport. Allocates fresh data each run.
    fn resolve_size(&self, entry: &Entry<H>) -> Result<SizeData, EngineError> {
        let opts = &entry.options;

        let (size_id, width) = if opts.media_query {
            let Some(token) = self.viewport.breakpoint.clone() else {
                return Err(EngineError::MissingBreakpoint);
            };
            let width = if let Some(get_width) = &opts.get_width {
                get_width(&entry.handle, &opts.send_data)
            } else if let Some(get_width) = &self.options.default_get_width {
                get_width(&entry.handle, &opts.send_data)
            } else {
                self.viewport.width
            };
            (token, width)
        } else {
            let width = select_width(&opts.widths, self.viewport.width)
                .ok_or(EngineError::EmptyWidthList)?;
            (width.to_string(), width)
        };

        let mut data = SizeData {
            size_id,
            width,
            height: opts.ratio.map(|ratio| width as f64 / ratio),
            high_resolution: None,
            extra: opts.send_data.clone(),
        };
        data.high_resolution = match &opts.high_resolution {
            None => None,
            Some(HighResolution::Static(v)) => Some(*v),
            Some(HighResolution::Auto) => {
                Some(self.options.device_pixel_ratio > HIGH_DENSITY_THRESHOLD)
            }
            Some(HighResolution::Resolver(f)) => Some(f(&data, &entry.handle)),
        };
        Ok(data)
    }

    /// Records the applied size and performs the visual update, via the element's
    /// `update` callback or the engine-wide `apply_src` write.
    fn apply(&mut self, id: ElementId, url: String, data: SizeData) {
        {
            let Some(entry) = self.entries.get_mut(&id) else {
                return;
            };
            entry.attempted_size_id = Some(data.size_id.clone());
            entry.last_size_id = Some(data.size_id.clone());
            entry.last_attempt_failed = false;
            entry.in_flight = None;
        }
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        rdebug!(element = id.0, size_id = %data.size_id, %url, "applying url");
        let resolved = ResolvedImage { url, data };
        if let Some(update) = &entry.options.update {
            update(&entry.handle, &resolved);
        } else {
            (self.options.apply_src)(&entry.handle, &resolved.url);
        }
    }

    /// Marks the attempt failed (so the next sweep retries even at a stable size id)
    /// and reports the error. The displayed image is left untouched.
    fn fail(&mut self, id: ElementId, err: EngineError) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.last_attempt_failed = true;
            entry.in_flight = None;
        }
        self.report_error(id, &err);
    }

    fn report_error(&self, id: ElementId, err: &EngineError) {
        rwarn!(element = id.0, error = %err, "resolution failed");
        if let Some(on_error) = &self.options.on_error {
            on_error(id, err);
        }
    }
}

impl<H> core::fmt::Debug for Engine<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("viewport", &self.viewport)
            .field("scheduler", &self.scheduler)
            .field("elements", &self.entries.len())
            .field("outbox", &self.outbox.len())
            .finish_non_exhaustive()
    }
}
