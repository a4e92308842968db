use serde::Deserialize;
use storyboard_protocol::{FrameAddress, TimeRange};
use thiserror::Error;

use crate::model::{Children, Frame, FramePayload, ObjectState, ObjectTrack, Transformation};

#[derive(Debug, Error)]
pub enum DatasetParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame {address} has no phenomena")]
    NoStates { address: FrameAddress },
    #[error("frame {address} ends before it starts")]
    InvertedRange { address: FrameAddress },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    phenomena: Vec<RawPhenomenon>,
    #[serde(default)]
    events: Vec<RawEvent>,
    /// Absent means "not fetched"; an empty list means "no children".
    #[serde(default)]
    children: Option<Vec<RawFrame>>,
}

#[derive(Debug, Deserialize)]
struct RawPhenomenon {
    timestamp: f64,
    #[serde(default)]
    representation: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    trigger_value: Option<TriggerValue>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum TriggerValue {
    Scalar(f64),
    Vector([f64; 2]),
}

impl TriggerValue {
    fn pair(self) -> (f64, f64) {
        match self {
            Self::Scalar(v) => (v, v),
            Self::Vector([x, y]) => (x, y),
        }
    }

    fn scalar(self) -> f64 {
        match self {
            Self::Scalar(v) => v,
            Self::Vector([x, _]) => x,
        }
    }
}

fn transformation_of(events: &[RawEvent]) -> Option<Transformation> {
    let mut parts: Vec<Transformation> = events
        .iter()
        .filter_map(|event| {
            let value = event.trigger_value?;
            match event.kind.as_str() {
                "TRANSLATION" => {
                    let (dx, dy) = value.pair();
                    Some(Transformation::Translation { dx, dy })
                }
                "UNIFORM_SCALE" | "SCALE" => {
                    let (sx, sy) = value.pair();
                    Some(Transformation::Scale { sx, sy })
                }
                "ROTATION" => Some(Transformation::Rotation {
                    angle: value.scalar(),
                }),
                _ => None,
            }
        })
        .collect();

    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Transformation::Multiple { parts }),
    }
}

struct Builder {
    next_id: u64,
}

impl Builder {
    fn frames(
        &mut self,
        raw: Vec<RawFrame>,
        parent: Option<&FrameAddress>,
    ) -> Result<Vec<Frame>, DatasetParseError> {
        raw.into_iter()
            .enumerate()
            .map(|(i, frame)| {
                let address = parent.map_or_else(|| FrameAddress::root(i), |p| p.child(i));
                self.frame(frame, address)
            })
            .collect()
    }

    fn frame(&mut self, raw: RawFrame, address: FrameAddress) -> Result<Frame, DatasetParseError> {
        let id = raw.id.unwrap_or(self.next_id);
        self.next_id += 1;

        let states: Vec<ObjectState> = raw
            .phenomena
            .into_iter()
            .map(|p| ObjectState {
                timestamp: p.timestamp,
                vertices: p.representation,
            })
            .collect();
        let (Some(first), Some(last)) = (states.first(), states.last()) else {
            return Err(DatasetParseError::NoStates { address });
        };
        let Some(time_range) = TimeRange::new(first.timestamp, last.timestamp) else {
            return Err(DatasetParseError::InvertedRange { address });
        };

        let payload = FramePayload {
            object: ObjectTrack { states },
            transformation: transformation_of(&raw.events),
        };
        let children = match raw.children {
            None => Children::Unloaded,
            Some(children) => Children::from_vec(self.frames(children, Some(&address))?),
        };
        Ok(Frame::new(id, time_range, payload).with_children(children))
    }
}

/// Parse a dataset in the phenomena/events format.
///
/// Each element describes one frame: the tracked object's timestamped
/// outlines (`phenomena`) and the transformation events observed over them
/// (`events`). A frame's time range spans its first to its last phenomenon.
/// Frames without an `id` are numbered in document order.
pub fn parse_dataset(data: &[u8]) -> Result<Vec<Frame>, DatasetParseError> {
    let raw: Vec<RawFrame> = serde_json::from_slice(data)?;
    Builder { next_id: 0 }.frames(raw, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame_with_events_and_states() {
        let input = br#"[
            {
                "phenomena": [
                    {"timestamp": 100, "representation": [[0, 0], [1, 0], [1, 1]]},
                    {"timestamp": 250, "representation": [[2, 0], [3, 0], [3, 1]]}
                ],
                "events": [{"type": "TRANSLATION", "triggerValue": 2.0}]
            }
        ]"#;
        let frames = parse_dataset(input).expect("valid dataset");
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.id, 0);
        assert_eq!(frame.time_range, TimeRange { start: 100.0, end: 250.0 });
        assert_eq!(frame.payload.object.states.len(), 2);
        assert_eq!(
            frame.payload.transformation,
            Some(Transformation::Translation { dx: 2.0, dy: 2.0 })
        );
        assert!(frame.children.is_unloaded());
    }

    #[test]
    fn several_events_become_multiple() {
        let input = br#"[{
            "phenomena": [{"timestamp": 0}],
            "events": [
                {"type": "ROTATION", "triggerValue": 0.5},
                {"type": "UNIFORM_SCALE", "triggerValue": [2, 3]},
                {"type": "COLOR_CHANGE", "triggerValue": 1}
            ]
        }]"#;
        let frames = parse_dataset(input).expect("valid dataset");
        assert_eq!(
            frames[0].payload.transformation,
            Some(Transformation::Multiple {
                parts: vec![
                    Transformation::Rotation { angle: 0.5 },
                    Transformation::Scale { sx: 2.0, sy: 3.0 },
                ]
            })
        );
    }

    #[test]
    fn children_key_controls_resolution() {
        let input = br#"[
            {"id": 10, "phenomena": [{"timestamp": 0}, {"timestamp": 9}], "children": []},
            {"id": 11, "phenomena": [{"timestamp": 10}, {"timestamp": 19}], "children": [
                {"phenomena": [{"timestamp": 10}, {"timestamp": 12}]}
            ]}
        ]"#;
        let frames = parse_dataset(input).expect("valid dataset");
        assert_eq!(frames[0].children, Children::Empty);
        let nested = frames[1].children.as_slice().expect("children listed");
        assert_eq!(nested.len(), 1);
        assert!(nested[0].children.is_unloaded());
        // Ids are assigned in document order, counting explicit ones too.
        assert_eq!(nested[0].id, 2);
    }

    #[test]
    fn frame_without_states_is_rejected() {
        let input = br#"[{"phenomena": [{"timestamp": 0}]}, {"phenomena": []}]"#;
        match parse_dataset(input) {
            Err(DatasetParseError::NoStates { address }) => {
                assert_eq!(address, FrameAddress::root(1));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn out_of_order_states_are_rejected() {
        let input = br#"[{"phenomena": [{"timestamp": 50}, {"timestamp": 10}]}]"#;
        assert!(matches!(
            parse_dataset(input),
            Err(DatasetParseError::InvertedRange { .. })
        ));
    }
}
