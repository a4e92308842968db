use std::collections::HashMap;

use storyboard_protocol::{FetchRequest, FetchTicket, FrameAddress, Generation, TimeRange};
use tracing::{debug, info};

/// A frame click whose zoom is waiting for child fetches to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomIntent {
    /// Row the clicked frame lives in.
    pub depth: usize,
    /// Absolute index of the clicked frame in that row.
    pub frame: usize,
    pub address: FrameAddress,
    /// `zoomed_from_frame` chain of rows `0..=depth` when the click happened.
    pub lineage: Vec<Option<usize>>,
}

/// Result of asking the gate for a frame's children.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// First request for this frame: the caller must hand it to the fetcher.
    Requested(FetchRequest),
    /// A fetch for this frame is already in flight; nothing new to issue.
    Coalesced(FetchTicket),
}

/// What happened when a fetch result was matched against the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The ticket was in flight and is now settled. `remaining` fetches are
    /// still outstanding.
    Settled { remaining: usize },
    /// The ticket belongs to a dataset that has been replaced.
    Stale,
    /// The ticket was never issued by this gate or was already settled.
    Unknown,
}

/// Coordinates on-demand child fetches.
///
/// Tracks in-flight fetches per frame so each frame has at most one
/// outstanding request, and holds the latest deferred zoom. All tickets are
/// tagged with the dataset generation they were issued for.
#[derive(Debug, Default)]
pub struct LoaderGate {
    generation: Generation,
    next_ticket: u64,
    in_flight: HashMap<FrameAddress, FetchTicket>,
    pending_zoom: Option<ZoomIntent>,
}

impl LoaderGate {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Number of frames with a fetch outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Register interest in the children of the frame at `address`.
    ///
    /// `depth` is the depth the children will be shown at.
    pub fn request(
        &mut self,
        address: FrameAddress,
        time_range: TimeRange,
        depth: usize,
    ) -> RequestOutcome {
        if let Some(ticket) = self.in_flight.get(&address) {
            debug!(%address, ticket = ticket.id, "fetch already in flight");
            return RequestOutcome::Coalesced(ticket.clone());
        }

        let ticket = FetchTicket {
            id: self.next_ticket,
            generation: self.generation,
            address: address.clone(),
        };
        self.next_ticket += 1;
        self.in_flight.insert(address, ticket.clone());
        info!(
            address = %ticket.address,
            ticket = ticket.id,
            generation = %ticket.generation,
            in_flight = self.in_flight.len(),
            "child fetch issued"
        );
        RequestOutcome::Requested(FetchRequest {
            ticket,
            time_range,
            depth,
        })
    }

    /// Match a returning fetch against the outstanding set.
    pub fn settle(&mut self, ticket: &FetchTicket) -> Settlement {
        if ticket.generation != self.generation {
            return Settlement::Stale;
        }
        match self.in_flight.get(&ticket.address) {
            Some(current) if current.id == ticket.id => {
                self.in_flight.remove(&ticket.address);
                Settlement::Settled {
                    remaining: self.in_flight.len(),
                }
            }
            _ => Settlement::Unknown,
        }
    }

    /// Replace the deferred zoom. The most recent click always wins.
    pub fn set_pending_zoom(&mut self, intent: ZoomIntent) {
        self.pending_zoom = Some(intent);
    }

    pub fn pending_zoom(&self) -> Option<&ZoomIntent> {
        self.pending_zoom.as_ref()
    }

    pub fn take_pending_zoom(&mut self) -> Option<ZoomIntent> {
        self.pending_zoom.take()
    }

    pub fn clear_pending_zoom(&mut self) {
        self.pending_zoom = None;
    }

    /// Forget every outstanding fetch and adopt a new dataset generation.
    ///
    /// Results for the dropped tickets will be reported as
    /// [`Settlement::Stale`] when they arrive. Returns how many were dropped.
    pub fn reset(&mut self, generation: Generation) -> usize {
        let dropped = self.in_flight.len();
        self.in_flight.clear();
        self.pending_zoom = None;
        self.generation = generation;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> TimeRange {
        TimeRange::instant(0.0)
    }

    #[test]
    fn second_request_for_same_frame_is_coalesced() {
        let mut gate = LoaderGate::new(Generation(1));
        let first = gate.request(FrameAddress::root(2), range(), 1);
        let second = gate.request(FrameAddress::root(2), range(), 1);
        let RequestOutcome::Requested(request) = first else {
            panic!("expected a new request");
        };
        assert_eq!(second, RequestOutcome::Coalesced(request.ticket.clone()));
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn distinct_frames_get_distinct_tickets() {
        let mut gate = LoaderGate::new(Generation(1));
        let a = gate.request(FrameAddress::root(0), range(), 1);
        let b = gate.request(FrameAddress::root(1), range(), 1);
        match (a, b) {
            (RequestOutcome::Requested(a), RequestOutcome::Requested(b)) => {
                assert_ne!(a.ticket.id, b.ticket.id);
            }
            other => panic!("unexpected outcomes: {other:?}"),
        }
        assert_eq!(gate.in_flight(), 2);
    }

    #[test]
    fn settle_counts_down_and_rejects_repeats() {
        let mut gate = LoaderGate::new(Generation(1));
        let RequestOutcome::Requested(a) = gate.request(FrameAddress::root(0), range(), 1) else {
            panic!("expected a new request");
        };
        let RequestOutcome::Requested(b) = gate.request(FrameAddress::root(1), range(), 1) else {
            panic!("expected a new request");
        };
        assert_eq!(gate.settle(&a.ticket), Settlement::Settled { remaining: 1 });
        assert_eq!(gate.settle(&a.ticket), Settlement::Unknown);
        assert_eq!(gate.settle(&b.ticket), Settlement::Settled { remaining: 0 });
    }

    #[test]
    fn reset_makes_old_tickets_stale() {
        let mut gate = LoaderGate::new(Generation(1));
        let RequestOutcome::Requested(a) = gate.request(FrameAddress::root(0), range(), 1) else {
            panic!("expected a new request");
        };
        gate.set_pending_zoom(ZoomIntent {
            depth: 0,
            frame: 0,
            address: FrameAddress::root(0),
            lineage: vec![None],
        });
        assert_eq!(gate.reset(Generation(2)), 1);
        assert_eq!(gate.settle(&a.ticket), Settlement::Stale);
        assert!(gate.pending_zoom().is_none());

        // The same frame can be requested again under the new generation.
        let again = gate.request(FrameAddress::root(0), range(), 1);
        let RequestOutcome::Requested(again) = again else {
            panic!("expected a new request");
        };
        assert_eq!(again.ticket.generation, Generation(2));
        assert_ne!(again.ticket.id, a.ticket.id);
    }
}
