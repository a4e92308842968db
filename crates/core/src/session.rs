use std::sync::mpsc::{Receiver, Sender};

use storyboard_protocol::{FetchRequest, FetchTicket, NavIntent};
use tracing::{debug, warn};

use crate::error::{FetchError, NavError};
use crate::model::{Frame, FrameTree, VisiblePath};
use crate::navigation::{Completion, Storyboard, Transition};
use crate::views::time_axis;

/// Loads the children of one frame.
///
/// `fetch` only starts the work. The result comes back later as a
/// [`FetchResponse`] fed to [`Session::complete_fetch`] or sent over the
/// channel drained by [`Session::drain`]. An `Err` means the request could
/// not even be started.
pub trait DatasetFetcher {
    fn fetch(&mut self, request: FetchRequest) -> Result<(), FetchError>;
}

/// Queues requests for the caller to serve.
impl DatasetFetcher for Vec<FetchRequest> {
    fn fetch(&mut self, request: FetchRequest) -> Result<(), FetchError> {
        self.push(request);
        Ok(())
    }
}

/// Hands requests to a worker thread.
impl DatasetFetcher for Sender<FetchRequest> {
    fn fetch(&mut self, request: FetchRequest) -> Result<(), FetchError> {
        self.send(request)
            .map_err(|_| FetchError::Transport("fetch worker disconnected".into()))
    }
}

/// Receives a snapshot after every successful mutation.
pub trait PresentationSink {
    fn path_changed(&mut self, path: &VisiblePath, tree: &FrameTree);

    /// A child fetch failed. The frame stays unloaded and can be retried.
    fn fetch_failed(&mut self, _error: &NavError) {}
}

/// Result of a fetch, matched back to its request by ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub ticket: FetchTicket,
    pub result: Result<Vec<Frame>, FetchError>,
}

/// A [`Storyboard`] wired to its collaborators.
///
/// Forwards fetch requests to the fetcher and pushes snapshots to the sink.
/// Several sessions can coexist; nothing here is global.
pub struct Session<F, S> {
    storyboard: Storyboard,
    fetcher: F,
    sink: S,
}

impl<F: DatasetFetcher, S: PresentationSink> Session<F, S> {
    pub fn new(storyboard: Storyboard, fetcher: F, sink: S) -> Self {
        Self {
            storyboard,
            fetcher,
            sink,
        }
    }

    pub fn storyboard(&self) -> &Storyboard {
        &self.storyboard
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Push the current snapshot to the sink.
    pub fn present(&mut self) {
        self.sink
            .path_changed(self.storyboard.path(), self.storyboard.tree());
    }

    /// Apply a user intent.
    ///
    /// A fetcher that refuses the request settles it as failed right away:
    /// the sink hears about the failure and the intent still reports
    /// `Deferred`.
    pub fn dispatch(&mut self, intent: NavIntent) -> Result<Transition, NavError> {
        let transition = self.storyboard.apply(intent)?;
        match &transition {
            Transition::Changed => self.present(),
            Transition::Deferred {
                fetch: Some(request),
            } => self.issue(request.clone()),
            Transition::Deferred { fetch: None } | Transition::Unchanged => {}
        }
        Ok(transition)
    }

    fn issue(&mut self, request: FetchRequest) {
        let ticket = request.ticket.clone();
        if let Err(error) = self.fetcher.fetch(request) {
            warn!(address = %ticket.address, %error, "fetcher refused request");
            // Already reported to the sink.
            let _ = self.complete_fetch(FetchResponse {
                ticket,
                result: Err(error),
            });
        }
    }

    /// Scrub the row at `depth` to the frame covering time `t`, as a click on
    /// its time scrubber would. Times before the first frame land on it.
    pub fn scrub_to_time(&mut self, depth: usize, t: f64) -> Result<Transition, NavError> {
        let frames = self.storyboard.tree().row_at(self.storyboard.path(), depth)?;
        match time_axis::frame_index_at(frames, t) {
            Some(frame) => self.dispatch(NavIntent::ScrubClick { depth, frame }),
            None => Ok(Transition::Unchanged),
        }
    }

    /// Feed back one fetch result.
    ///
    /// A failure can still complete a deferred zoom into another frame; the
    /// sink then gets the new snapshot after the failure.
    pub fn complete_fetch(&mut self, response: FetchResponse) -> Result<Completion, NavError> {
        let before = self.storyboard.path().clone();
        let outcome = self
            .storyboard
            .complete_fetch(&response.ticket, response.result);
        match &outcome {
            Ok(Completion::Loaded { .. }) => self.present(),
            Ok(Completion::Discarded) => {}
            Err(error) => {
                self.sink.fetch_failed(error);
                if self.storyboard.path() != &before {
                    self.present();
                }
            }
        }
        outcome
    }

    /// Complete every response waiting on `responses` without blocking.
    /// Returns how many were handled.
    pub fn drain(&mut self, responses: &Receiver<FetchResponse>) -> usize {
        let mut handled = 0;
        while let Ok(response) = responses.try_recv() {
            // Failures reach the sink; the loop keeps going.
            let _ = self.complete_fetch(response);
            handled += 1;
        }
        if handled > 0 {
            debug!(handled, in_flight = self.storyboard.gate().in_flight(), "responses drained");
        }
        handled
    }

    /// Replace the dataset and present the reset path.
    pub fn load_dataset(&mut self, roots: Vec<Frame>) {
        self.storyboard.replace_dataset(roots);
        self.present();
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Transition {
        let transition = self.storyboard.set_page_size(page_size);
        if transition.is_changed() {
            self.present();
        }
        transition
    }

    pub fn set_viewport_width(&mut self, width_px: f64) -> Transition {
        let transition = self.storyboard.set_viewport_width(width_px);
        if transition.is_changed() {
            self.present();
        }
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoryboardConfig;
    use crate::model::{Children, FramePayload};
    use std::sync::mpsc;
    use storyboard_protocol::{FrameAddress, TimeRange, ZoomLevel};

    #[derive(Default)]
    struct Recorder {
        snapshots: Vec<VisiblePath>,
        failures: Vec<NavError>,
    }

    impl PresentationSink for Recorder {
        fn path_changed(&mut self, path: &VisiblePath, _tree: &FrameTree) {
            self.snapshots.push(path.clone());
        }

        fn fetch_failed(&mut self, error: &NavError) {
            self.failures.push(error.clone());
        }
    }

    struct Refusing;

    impl DatasetFetcher for Refusing {
        fn fetch(&mut self, _request: FetchRequest) -> Result<(), FetchError> {
            Err(FetchError::Transport("offline".into()))
        }
    }

    fn frame(id: u64) -> Frame {
        Frame::new(id, TimeRange::instant(id as f64), FramePayload::default())
    }

    fn storyboard() -> Storyboard {
        Storyboard::new(
            vec![
                frame(0).with_children(Children::from_vec(vec![frame(10)])),
                frame(1),
            ],
            StoryboardConfig::default(),
        )
    }

    #[test]
    fn changed_intents_reach_the_sink() {
        let mut session = Session::new(storyboard(), Vec::new(), Recorder::default());
        let _ = session.dispatch(NavIntent::PageRight { depth: 0 });
        let _ = session.dispatch(NavIntent::PageRight { depth: 0 });
        // Second page-right is already at the end.
        assert_eq!(session.sink().snapshots.len(), 1);
        assert_eq!(session.sink().snapshots[0].levels()[0].start, 1);
    }

    #[test]
    fn scrub_by_time_lands_on_covering_frame() {
        let roots = (0..6).map(|i| frame(i * 10)).collect();
        let config = StoryboardConfig {
            initial_page_size: 2,
            ..StoryboardConfig::default()
        };
        let mut session = Session::new(
            Storyboard::new(roots, config),
            Vec::new(),
            Recorder::default(),
        );
        assert_eq!(session.scrub_to_time(0, 25.0), Ok(Transition::Changed));
        assert_eq!(session.storyboard().path().levels()[0].start, 2);
        // Past the end the last page stays full.
        assert_eq!(session.scrub_to_time(0, 1_000.0), Ok(Transition::Changed));
        assert_eq!(session.storyboard().path().levels()[0].start, 4);
        assert_eq!(session.scrub_to_time(0, -5.0), Ok(Transition::Changed));
        assert_eq!(session.storyboard().path().levels()[0].start, 0);
        assert_eq!(session.sink().snapshots.len(), 3);
        assert!(matches!(
            session.scrub_to_time(1, 0.0),
            Err(NavError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn deferred_click_queues_request_then_zooms() {
        let mut session = Session::new(storyboard(), Vec::new(), Recorder::default());
        let _ = session.dispatch(NavIntent::FrameClick { depth: 0, frame: 1 });
        assert!(session.sink().snapshots.is_empty());
        let request = session.fetcher_mut().pop();
        let Some(request) = request else {
            panic!("no request queued");
        };
        assert_eq!(request.ticket.address, FrameAddress::root(1));

        let done = session.complete_fetch(FetchResponse {
            ticket: request.ticket,
            result: Ok(vec![frame(11)]),
        });
        assert_eq!(done, Ok(Completion::Loaded { zoomed: true }));
        assert_eq!(session.sink().snapshots.len(), 1);
        assert_eq!(session.storyboard().path().len(), 2);
    }

    #[test]
    fn refused_fetch_is_reported_and_retryable() {
        let mut session = Session::new(storyboard(), Refusing, Recorder::default());
        let transition = session.dispatch(NavIntent::FrameClick { depth: 0, frame: 1 });
        assert!(matches!(transition, Ok(Transition::Deferred { fetch: Some(_) })));
        assert_eq!(session.sink().failures.len(), 1);
        assert_eq!(session.storyboard().gate().in_flight(), 0);
        assert!(session.storyboard().tree().roots()[1].children.is_unloaded());
    }

    #[test]
    fn drain_completes_channel_responses() {
        let (tx, rx) = mpsc::channel();
        let (req_tx, req_rx) = mpsc::channel();
        let mut session = Session::new(storyboard(), req_tx, Recorder::default());
        let _ = session.dispatch(NavIntent::FrameClick { depth: 0, frame: 1 });

        let Ok(request) = req_rx.try_recv() else {
            panic!("no request sent");
        };
        let sent = tx.send(FetchResponse {
            ticket: request.ticket,
            result: Err(FetchError::Parse("bad payload".into())),
        });
        assert!(sent.is_ok());
        assert_eq!(session.drain(&rx), 1);
        assert_eq!(session.drain(&rx), 0);
        assert!(matches!(
            session.sink().failures.as_slice(),
            [NavError::FetchFailure { .. }]
        ));
    }

    #[test]
    fn failure_that_completes_a_deferred_zoom_presents_it() {
        let roots = vec![frame(0), frame(1), frame(2)];
        let storyboard = Storyboard::new(roots, StoryboardConfig::default());
        let mut session = Session::new(storyboard, Vec::new(), Recorder::default());
        let _ = session.dispatch(NavIntent::FrameClick { depth: 0, frame: 1 });
        let _ = session.dispatch(NavIntent::FrameClick { depth: 0, frame: 2 });
        let requests = std::mem::take(session.fetcher_mut());
        assert_eq!(requests.len(), 2);

        let loaded = session.complete_fetch(FetchResponse {
            ticket: requests[1].ticket.clone(),
            result: Ok(vec![frame(20)]),
        });
        assert_eq!(loaded, Ok(Completion::Loaded { zoomed: false }));
        let failed = session.complete_fetch(FetchResponse {
            ticket: requests[0].ticket.clone(),
            result: Err(FetchError::Transport("reset".into())),
        });
        assert!(failed.is_err());

        assert_eq!(session.sink().failures.len(), 1);
        let last = session.sink().snapshots.last().map(VisiblePath::levels);
        assert_eq!(
            last,
            Some(&[ZoomLevel::root(), ZoomLevel::zoomed_from(2)][..])
        );
    }

    #[test]
    fn loading_a_dataset_presents_reset_path() {
        let mut session = Session::new(storyboard(), Vec::new(), Recorder::default());
        let _ = session.dispatch(NavIntent::FrameClick { depth: 0, frame: 0 });
        session.load_dataset(vec![frame(5)]);
        let last = session.sink().snapshots.last().cloned();
        assert_eq!(last, Some(VisiblePath::new()));
    }
}
