use std::fmt::Display;

use storyboard_core::{
    Completion, FetchError, FetchResponse, FrameTree, NavError, PresentationSink, Session,
    Storyboard, StoryboardConfig, Transition, VisiblePath,
};
use storyboard_core::views::time_axis;
use storyboard_protocol::{FetchRequest, FetchTicket, NavIntent};
use wasm_bindgen::prelude::*;

fn js_err(e: impl Display) -> JsError {
    JsError::new(&e.to_string())
}

fn transition_name(transition: &Transition) -> String {
    match transition {
        Transition::Unchanged => "unchanged",
        Transition::Changed => "changed",
        Transition::Deferred { .. } => "deferred",
    }
    .to_string()
}

/// Counts snapshots so the page knows when to redraw.
#[derive(Debug, Default)]
struct JsSink {
    version: u64,
    last_error: Option<String>,
}

impl PresentationSink for JsSink {
    fn path_changed(&mut self, _path: &VisiblePath, _tree: &FrameTree) {
        self.version += 1;
    }

    fn fetch_failed(&mut self, error: &NavError) {
        self.version += 1;
        self.last_error = Some(error.to_string());
    }
}

/// One storyboard instance owned by the page.
///
/// Child fetches are queued; the page takes them with
/// [`StoryboardHandle::take_fetch_requests`], performs the HTTP request, and
/// answers with [`StoryboardHandle::deliver_children`] or
/// [`StoryboardHandle::fail_fetch`] passing the ticket back unchanged.
#[wasm_bindgen]
pub struct StoryboardHandle {
    session: Session<Vec<FetchRequest>, JsSink>,
}

#[wasm_bindgen]
impl StoryboardHandle {
    /// Create an empty storyboard. `config_json` overrides the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<StoryboardHandle, JsError> {
        let config = match config_json {
            Some(json) => StoryboardConfig::from_json(json.as_bytes()).map_err(js_err)?,
            None => StoryboardConfig::default(),
        };
        Ok(Self {
            session: Session::new(
                Storyboard::new(Vec::new(), config),
                Vec::new(),
                JsSink::default(),
            ),
        })
    }

    /// Replace the dataset. Returns the number of root frames.
    pub fn load_dataset(&mut self, data: &[u8]) -> Result<usize, JsError> {
        let frames = storyboard_core::parsers::parse_auto(data).map_err(js_err)?;
        let roots = frames.len();
        self.session.load_dataset(frames);
        Ok(roots)
    }

    /// Apply a navigation intent such as `{"kind":"frame_click","depth":0,"frame":2}`.
    /// Returns `"unchanged"`, `"changed"` or `"deferred"`.
    pub fn apply_intent(&mut self, intent_json: &str) -> Result<String, JsError> {
        let intent: NavIntent = serde_json::from_str(intent_json).map_err(js_err)?;
        let transition = self.session.dispatch(intent).map_err(js_err)?;
        Ok(transition_name(&transition))
    }

    /// Scrubber click on row `depth` at time `t` (ms). The row pages to the
    /// frame covering `t`. Returns the same strings as [`Self::apply_intent`].
    pub fn scrub_at_time(&mut self, depth: usize, t: f64) -> Result<String, JsError> {
        let transition = self.session.scrub_to_time(depth, t).map_err(js_err)?;
        Ok(transition_name(&transition))
    }

    /// Fetch requests issued since the last call, as a JSON array.
    pub fn take_fetch_requests(&mut self) -> Result<String, JsError> {
        let requests = std::mem::take(self.session.fetcher_mut());
        serde_json::to_string(&requests).map_err(js_err)
    }

    /// Answer a fetch with the children JSON from the server. Returns whether
    /// the deferred zoom was applied.
    ///
    /// Unparseable children count as a failed fetch; see [`Self::last_error`].
    pub fn deliver_children(&mut self, ticket_json: &str, children: &[u8]) -> Result<bool, JsError> {
        let ticket: FetchTicket = serde_json::from_str(ticket_json).map_err(js_err)?;
        let result = storyboard_core::parsers::parse_auto(children)
            .map_err(|e| FetchError::Parse(e.to_string()));
        match self.session.complete_fetch(FetchResponse { ticket, result }) {
            Ok(Completion::Loaded { zoomed }) => Ok(zoomed),
            Ok(Completion::Discarded) | Err(NavError::FetchFailure { .. }) => Ok(false),
            Err(e) => Err(js_err(e)),
        }
    }

    /// Report that a fetch failed. The frame stays retryable.
    pub fn fail_fetch(&mut self, ticket_json: &str, message: &str) -> Result<(), JsError> {
        let ticket: FetchTicket = serde_json::from_str(ticket_json).map_err(js_err)?;
        match self.session.complete_fetch(FetchResponse {
            ticket,
            result: Err(FetchError::Transport(message.to_string())),
        }) {
            Ok(_) | Err(NavError::FetchFailure { .. }) => Ok(()),
            Err(e) => Err(js_err(e)),
        }
    }

    /// Recompute the page size from the canvas width. Returns whether the
    /// visible rows changed.
    pub fn set_viewport_width(&mut self, width_px: f64) -> bool {
        self.session.set_viewport_width(width_px).is_changed()
    }

    /// Visible page of every row, top to bottom, as JSON.
    pub fn visible_rows(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.session.storyboard().rows()).map_err(js_err)
    }

    /// The zoom levels of the visible path as JSON.
    pub fn visible_path(&self) -> Result<String, JsError> {
        serde_json::to_string(self.session.storyboard().path()).map_err(js_err)
    }

    /// Parent indicators between consecutive rows as JSON.
    pub fn hierarchy_links(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.session.storyboard().hierarchy_links()).map_err(js_err)
    }

    /// Scrubber ticks for the visible page of row `depth` as JSON.
    pub fn axis_ticks(&self, depth: usize, max_ticks: usize) -> Result<String, JsError> {
        let storyboard = self.session.storyboard();
        let frames = storyboard
            .tree()
            .row_at(storyboard.path(), depth)
            .map_err(js_err)?;
        let view = storyboard.row_view(depth).map_err(js_err)?;
        let end = (view.start + view.frames.len()).min(frames.len());
        let ticks = time_axis::row_span(&frames[view.start.min(end)..end])
            .map(|span| time_axis::ticks(span, max_ticks))
            .unwrap_or_default();
        serde_json::to_string(&ticks).map_err(js_err)
    }

    /// Incremented on every snapshot or failure.
    pub fn version(&self) -> u64 {
        self.session.sink().version
    }

    /// Message of the most recent failed fetch.
    pub fn last_error(&self) -> Option<String> {
        self.session.sink().last_error.clone()
    }

    /// Number of fetches not yet answered.
    pub fn in_flight(&self) -> usize {
        self.session.storyboard().gate().in_flight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &[u8] = br#"[
        {"phenomena": [{"timestamp": 0}, {"timestamp": 10}], "children": []},
        {"phenomena": [{"timestamp": 10}, {"timestamp": 20}]}
    ]"#;

    fn handle() -> StoryboardHandle {
        let mut handle = StoryboardHandle::new(None).expect("default config");
        assert!(matches!(handle.load_dataset(DATASET), Ok(2)));
        handle
    }

    fn take_requests(handle: &mut StoryboardHandle) -> Vec<FetchRequest> {
        let json = handle.take_fetch_requests().expect("serialize requests");
        serde_json::from_str(&json).expect("request list")
    }

    #[test]
    fn deferred_zoom_round_trip_through_json() {
        let mut handle = handle();
        let transition = handle.apply_intent(r#"{"kind":"frame_click","depth":0,"frame":1}"#);
        assert!(matches!(transition.as_deref(), Ok("deferred")));

        let requests = take_requests(&mut handle);
        assert_eq!(requests.len(), 1);
        assert_eq!(handle.in_flight(), 1);

        let ticket = serde_json::to_string(&requests[0].ticket).expect("serialize ticket");
        let zoomed = handle.deliver_children(
            &ticket,
            br#"[{"phenomena": [{"timestamp": 12}, {"timestamp": 15}]}]"#,
        );
        assert!(matches!(zoomed, Ok(true)));
        assert_eq!(handle.in_flight(), 0);
        assert!(handle.visible_path().is_ok_and(|json| json.contains("\"zoomed_from_frame\":1")));
    }

    #[test]
    fn failed_fetch_is_recorded() {
        let mut handle = handle();
        assert!(handle
            .apply_intent(r#"{"kind":"frame_click","depth":0,"frame":1}"#)
            .is_ok());
        let requests = take_requests(&mut handle);
        let ticket = serde_json::to_string(&requests[0].ticket).expect("serialize ticket");

        let before = handle.version();
        assert!(handle.fail_fetch(&ticket, "503").is_ok());
        assert!(handle.version() > before);
        assert!(handle.last_error().is_some_and(|e| e.contains("503")));
    }

    #[test]
    fn scrub_at_time_pages_to_covering_frame() {
        let mut handle = handle();
        assert_eq!(handle.scrub_at_time(0, 15.0).as_deref().ok(), Some("changed"));
        assert!(handle.visible_path().is_ok_and(|json| json.contains("\"start\":1")));
        assert_eq!(handle.scrub_at_time(0, 19.0).as_deref().ok(), Some("unchanged"));
    }

    #[test]
    fn viewport_width_changes_page_size() {
        let mut handle = handle();
        assert!(handle.set_viewport_width(1000.0));
        assert!(!handle.set_viewport_width(1000.0));
        assert!(handle.visible_rows().is_ok_and(|json| json.contains("\"total\":2")));
    }
}
