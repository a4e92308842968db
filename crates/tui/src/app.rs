use crossterm::event::KeyCode;
use storyboard_core::views::time_axis;
use storyboard_core::{DatasetFetcher, FrameTree, NavError, PresentationSink, Session, VisiblePath};
use storyboard_protocol::NavIntent;
use tracing::debug;

/// Sink that only records what the next draw needs to know.
#[derive(Debug, Default)]
pub struct TuiSink {
    pub dirty: bool,
    pub status: Option<String>,
}

impl PresentationSink for TuiSink {
    fn path_changed(&mut self, _path: &VisiblePath, _tree: &FrameTree) {
        self.dirty = true;
        self.status = None;
    }

    fn fetch_failed(&mut self, error: &NavError) {
        self.dirty = true;
        self.status = Some(error.to_string());
    }
}

/// Whether the event loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Keyboard-driven navigation state on top of a session.
///
/// The cursor is a row plus a slot within that row's visible page.
pub struct App<F> {
    pub session: Session<F, TuiSink>,
    pub row: usize,
    pub slot: usize,
}

impl<F: DatasetFetcher> App<F> {
    pub fn new(session: Session<F, TuiSink>) -> Self {
        Self {
            session,
            row: 0,
            slot: 0,
        }
    }

    /// Absolute index of the frame under the cursor, if the row has one.
    pub fn selected_frame(&self) -> Option<usize> {
        let view = self.session.storyboard().row_view(self.row).ok()?;
        view.frames.get(self.slot).map(|frame| frame.index)
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Flow {
        let result = match code {
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Up => {
                self.row = self.row.saturating_sub(1);
                Ok(())
            }
            KeyCode::Down => {
                self.row = (self.row + 1).min(self.session.storyboard().path().deepest());
                Ok(())
            }
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Char('[') => self.intent(NavIntent::PageLeft { depth: self.row }),
            KeyCode::Char(']') => self.intent(NavIntent::PageRight { depth: self.row }),
            KeyCode::Home => self.intent(NavIntent::ScrubClick {
                depth: self.row,
                frame: 0,
            }),
            KeyCode::End => self.scrub_to_end(),
            KeyCode::Enter => match self.selected_frame() {
                Some(frame) => self.intent(NavIntent::FrameClick {
                    depth: self.row,
                    frame,
                }),
                None => Ok(()),
            },
            _ => Ok(()),
        };
        if let Err(error) = result {
            debug!(%error, "key ignored");
            self.session.sink_mut().status = Some(error.to_string());
        }
        self.clamp_cursor();
        self.session.sink_mut().dirty = true;
        Flow::Continue
    }

    fn intent(&mut self, intent: NavIntent) -> Result<(), NavError> {
        self.session.dispatch(intent).map(|_| ())
    }

    fn move_left(&mut self) -> Result<(), NavError> {
        if self.slot > 0 {
            self.slot -= 1;
            return Ok(());
        }
        self.intent(NavIntent::PageLeft { depth: self.row })
    }

    fn move_right(&mut self) -> Result<(), NavError> {
        let visible = self
            .session
            .storyboard()
            .row_view(self.row)
            .map_or(0, |view| view.frames.len());
        if self.slot + 1 < visible {
            self.slot += 1;
            return Ok(());
        }
        self.intent(NavIntent::PageRight { depth: self.row })
    }

    fn scrub_to_end(&mut self) -> Result<(), NavError> {
        let total = self.session.storyboard().row_view(self.row)?.total;
        self.intent(NavIntent::ScrubClick {
            depth: self.row,
            frame: total.saturating_sub(1),
        })?;
        self.slot = usize::MAX;
        Ok(())
    }

    /// Click on the time scrubber of the selected row. `fraction` is the
    /// click position across the scrubber, which spans the whole row.
    pub fn scrub_at(&mut self, fraction: f64) {
        let storyboard = self.session.storyboard();
        let span = storyboard
            .tree()
            .row_at(storyboard.path(), self.row)
            .ok()
            .and_then(time_axis::row_span);
        let Some(span) = span else {
            return;
        };
        let t = span.start + fraction.clamp(0.0, 1.0) * span.duration();
        match self.session.scrub_to_time(self.row, t) {
            Ok(_) => self.slot = 0,
            Err(error) => {
                debug!(%error, "scrub ignored");
                self.session.sink_mut().status = Some(error.to_string());
            }
        }
        self.clamp_cursor();
        self.session.sink_mut().dirty = true;
    }

    /// Keep the cursor on an existing row and a visible slot.
    pub fn clamp_cursor(&mut self) {
        let storyboard = self.session.storyboard();
        self.row = self.row.min(storyboard.path().deepest());
        let visible = storyboard
            .row_view(self.row)
            .map_or(0, |view| view.frames.len());
        self.slot = self.slot.min(visible.saturating_sub(1));
    }
}
