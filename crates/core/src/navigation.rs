use storyboard_protocol::{FetchRequest, FetchTicket, Generation, HierarchyLink, NavIntent, RowView};
use tracing::{debug, info, warn};

use crate::config::StoryboardConfig;
use crate::error::{FetchError, NavError};
use crate::loader::{LoaderGate, RequestOutcome, Settlement, ZoomIntent};
use crate::model::{Children, Frame, FrameTree, VisiblePath};
use crate::views::row;

/// Effect of a navigation intent on the visible path.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Unchanged,
    Changed,
    /// The zoom waits for children to load. `fetch` is the request to hand to
    /// the fetch collaborator, or `None` if one is already in flight.
    Deferred { fetch: Option<FetchRequest> },
}

impl Transition {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Effect of a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result belonged to a replaced dataset, or its ticket was unknown,
    /// and was dropped without touching any state.
    Discarded,
    /// Children were stored. `zoomed` is true if the deferred zoom was
    /// applied as a result.
    Loaded { zoomed: bool },
}

/// Navigation engine: the frame tree, the visible path over it, and the
/// loader gate for unloaded children.
///
/// All mutation goes through [`Storyboard::apply`], [`Storyboard::complete_fetch`],
/// [`Storyboard::replace_dataset`] and [`Storyboard::set_page_size`]. Each
/// validates before mutating, so a returned error means nothing changed.
#[derive(Debug)]
pub struct Storyboard {
    tree: FrameTree,
    path: VisiblePath,
    gate: LoaderGate,
    config: StoryboardConfig,
    page_size: usize,
}

impl Storyboard {
    pub fn new(roots: Vec<Frame>, config: StoryboardConfig) -> Self {
        let generation = Generation(1);
        let page_size = config.initial_page_size.max(1);
        Self {
            tree: FrameTree::new(roots, generation),
            path: VisiblePath::new(),
            gate: LoaderGate::new(generation),
            config,
            page_size,
        }
    }

    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    pub fn path(&self) -> &VisiblePath {
        &self.path
    }

    pub fn gate(&self) -> &LoaderGate {
        &self.gate
    }

    pub fn config(&self) -> &StoryboardConfig {
        &self.config
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn generation(&self) -> Generation {
        self.tree.generation()
    }

    /// Apply one user intent.
    pub fn apply(&mut self, intent: NavIntent) -> Result<Transition, NavError> {
        let transition = match intent {
            NavIntent::PageLeft { depth } => {
                self.tree.row_len(&self.path, depth)?;
                changed(self.path.page_left(depth, self.config.page_step))
            }
            NavIntent::PageRight { depth } => {
                let len = self.tree.row_len(&self.path, depth)?;
                changed(
                    self.path
                        .page_right(depth, self.config.page_step, self.page_size, len),
                )
            }
            NavIntent::ScrubClick { depth, frame } => {
                let len = self.tree.row_len(&self.path, depth)?;
                changed(self.path.scrub_to(depth, frame, self.page_size, len))
            }
            NavIntent::FrameClick { depth, frame } => self.frame_click(depth, frame)?,
        };
        debug!(?intent, ?transition, "intent applied");
        Ok(transition)
    }

    fn frame_click(&mut self, depth: usize, frame: usize) -> Result<Transition, NavError> {
        let target = self.tree.frame_at(&self.path, depth, frame)?;
        let resolved = target.children.is_resolved();
        let time_range = target.time_range;

        if self.path.zoomed_child(depth) == Some(frame) {
            self.gate.clear_pending_zoom();
            return Ok(Transition::Unchanged);
        }

        if resolved {
            self.gate.clear_pending_zoom();
            return Ok(changed(self.path.zoom_into(depth, frame)));
        }

        let address = self.tree.address_of(&self.path, depth, frame)?;
        let intent = ZoomIntent {
            depth,
            frame,
            address: address.clone(),
            lineage: self.path.lineage(depth),
        };
        let outcome = self.gate.request(address, time_range, depth + 1);
        self.gate.set_pending_zoom(intent);
        let fetch = match outcome {
            RequestOutcome::Requested(request) => Some(request),
            RequestOutcome::Coalesced(_) => None,
        };
        Ok(Transition::Deferred { fetch })
    }

    /// Feed back the result of a child fetch.
    ///
    /// A failed fetch leaves the frame unloaded so a later click retries it,
    /// and is reported as [`NavError::FetchFailure`]. A deferred zoom into the
    /// failed frame is dropped. One into another, already loaded frame is
    /// still applied once nothing remains in flight, so the final path does
    /// not depend on the order in which results arrive.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Frame>, FetchError>,
    ) -> Result<Completion, NavError> {
        let remaining = match self.gate.settle(ticket) {
            Settlement::Settled { remaining } => remaining,
            Settlement::Stale => {
                warn!(
                    address = %ticket.address,
                    ticket = ticket.id,
                    ticket_generation = %ticket.generation,
                    current_generation = %self.generation(),
                    "discarding fetch result for replaced dataset"
                );
                return Ok(Completion::Discarded);
            }
            Settlement::Unknown => {
                warn!(address = %ticket.address, ticket = ticket.id, "discarding unknown fetch result");
                return Ok(Completion::Discarded);
            }
        };

        match result {
            Ok(frames) => {
                self.tree
                    .set_children(&ticket.address, Children::from_vec(frames))?;
                let zoomed = remaining == 0 && self.apply_pending_zoom();
                Ok(Completion::Loaded { zoomed })
            }
            Err(source) => {
                let targets_failed = self
                    .gate
                    .pending_zoom()
                    .is_some_and(|intent| intent.address == ticket.address);
                if targets_failed {
                    self.gate.clear_pending_zoom();
                }
                warn!(address = %ticket.address, error = %source, "child fetch failed");
                // A zoom into another frame that already loaded was only
                // waiting for this fetch to finish.
                if remaining == 0 {
                    self.apply_pending_zoom();
                }
                Err(NavError::FetchFailure {
                    address: ticket.address.clone(),
                    source,
                })
            }
        }
    }

    fn apply_pending_zoom(&mut self) -> bool {
        let Some(intent) = self.gate.take_pending_zoom() else {
            return false;
        };
        if self.path.lineage(intent.depth) != intent.lineage {
            debug!(address = %intent.address, "deferred zoom superseded by navigation");
            return false;
        }
        let ready = self
            .tree
            .frame_at(&self.path, intent.depth, intent.frame)
            .is_ok_and(|frame| frame.children.is_resolved());
        if !ready {
            return false;
        }
        let zoomed = self.path.zoom_into(intent.depth, intent.frame);
        debug!(address = %intent.address, zoomed, "deferred zoom applied");
        zoomed
    }

    /// Swap in a new dataset. The path resets to the root row and every
    /// in-flight fetch becomes stale.
    pub fn replace_dataset(&mut self, roots: Vec<Frame>) -> Transition {
        let generation = self.tree.generation().next();
        let dropped = self.gate.reset(generation);
        self.tree = FrameTree::new(roots, generation);
        self.path.reset();
        info!(
            %generation,
            roots = self.tree.len(),
            dropped_fetches = dropped,
            "dataset replaced"
        );
        Transition::Changed
    }

    /// Adopt a new page size from the presentation layer and re-clamp every
    /// row's cursor so that the last page stays full.
    pub fn set_page_size(&mut self, page_size: usize) -> Transition {
        let page_size = page_size.max(1);
        if page_size == self.page_size {
            return Transition::Unchanged;
        }
        self.page_size = page_size;
        for depth in 0..self.path.len() {
            if let Ok(len) = self.tree.row_len(&self.path, depth) {
                self.path.clamp_start(depth, page_size, len);
            }
        }
        debug!(page_size, "page size changed");
        // The visible slice changes width even when no cursor moved.
        Transition::Changed
    }

    /// Page size derived from a viewport width.
    pub fn set_viewport_width(&mut self, width_px: f64) -> Transition {
        self.set_page_size(row::page_size_for_width(
            width_px,
            self.config.frame_width_px,
        ))
    }

    pub fn row_view(&self, depth: usize) -> Result<RowView, NavError> {
        row::row_view(&self.tree, &self.path, depth, self.page_size)
    }

    pub fn rows(&self) -> Vec<RowView> {
        row::row_views(&self.tree, &self.path, self.page_size)
    }

    pub fn hierarchy_links(&self) -> Vec<HierarchyLink> {
        row::hierarchy_links(&self.tree, &self.path, self.page_size)
    }
}

fn changed(did_change: bool) -> Transition {
    if did_change {
        Transition::Changed
    } else {
        Transition::Unchanged
    }
}
