use serde_derive::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::detection::TrackId;
use crate::error::Error;

/// Which crossings are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    Both,
}

impl Direction {
    #[inline]
    pub fn allows(self, heading: Heading) -> bool {
        match (self, heading) {
            (Direction::Both, _) => true,
            (Direction::LeftToRight, Heading::LeftToRight) => true,
            (Direction::RightToLeft, Heading::RightToLeft) => true,
            (Direction::LeftToRight, Heading::RightToLeft) => false,
            (Direction::RightToLeft, Heading::LeftToRight) => false,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left_to_right" => Ok(Direction::LeftToRight),
            "right_to_left" => Ok(Direction::RightToLeft),
            "both" => Ok(Direction::Both),
            other => Err(Error::UnknownDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::LeftToRight => "left_to_right",
            Direction::RightToLeft => "right_to_left",
            Direction::Both => "both",
        })
    }
}

/// Side-to-side movement of one observed crossing.
/// Left to right counts as "in", right to left as "out".
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    LeftToRight,
    RightToLeft,
}

/// Classifies the move `prev_x -> x` against a vertical line at `line_x`.
///
/// The start side is strict and the end side inclusive, so landing exactly on
/// the line crosses it, while an object resting on the line never does.
#[inline]
pub fn crossing_heading(prev_x: f32, x: f32, line_x: f32) -> Option<Heading> {
    if prev_x < line_x && line_x <= x {
        Some(Heading::LeftToRight)
    } else if prev_x > line_x && line_x >= x {
        Some(Heading::RightToLeft)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackState {
    pub last_x: f32,
    /// Frames left before this track may count again, 0 when eligible
    pub cooldown_remaining: u32,
    /// Engine frame number of the last observation
    pub last_seen: u64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub track_id: TrackId,
    pub heading: Heading,
    pub from_x: f32,
    pub to_x: f32,
}

/// Counts produced by a single [`CrossingEngine::update`] call.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct CrossingEvent {
    pub count_in: u32,
    pub count_out: u32,
    pub crossings: Vec<Crossing>,
}

impl CrossingEvent {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count_in == 0 && self.count_out == 0
    }

    #[inline]
    pub fn counts(&self) -> (u32, u32) {
        (self.count_in, self.count_out)
    }

    fn record(&mut self, crossing: Crossing) {
        match crossing.heading {
            Heading::LeftToRight => self.count_in += 1,
            Heading::RightToLeft => self.count_out += 1,
        }
        self.crossings.push(crossing);
    }
}

/// Turns per-frame `(track_id, center_x)` observations into directional
/// crossing counts with a per-track cooldown.
#[derive(Debug, Clone)]
pub struct CrossingEngine {
    line_x: f32,
    direction: Direction,
    cooldown_frames: u32,
    max_idle_frames: Option<u64>,
    frame: u64,
    states: HashMap<TrackId, TrackState>,
}

impl CrossingEngine {
    pub fn new(line_x: f32, direction: Direction, cooldown_frames: u32) -> Self {
        Self {
            line_x,
            direction,
            cooldown_frames,
            max_idle_frames: None,
            frame: 0,
            states: HashMap::new(),
        }
    }

    /// Forget tracks that were not observed for more than `frames` updates.
    pub fn with_max_idle_frames(mut self, frames: Option<u64>) -> Self {
        self.max_idle_frames = frames;
        self
    }

    #[inline]
    pub fn line_x(&self) -> f32 {
        self.line_x
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn cooldown_frames(&self) -> u32 {
        self.cooldown_frames
    }

    #[inline]
    pub fn track(&self, id: TrackId) -> Option<&TrackState> {
        self.states.get(&id)
    }

    #[inline]
    pub fn cooldown_remaining(&self, id: TrackId) -> u32 {
        self.states
            .get(&id)
            .map(|s| s.cooldown_remaining)
            .unwrap_or(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn reset(&mut self) {
        self.states.clear();
        self.frame = 0;
    }

    /// Processes one frame. Returns the counts of this frame only.
    ///
    /// Observations are validated up front; on error nothing is changed.
    pub fn update(&mut self, observations: &[(TrackId, f32)]) -> Result<CrossingEvent, Error> {
        if let Some(&(track_id, x)) = observations.iter().find(|(_, x)| !x.is_finite()) {
            return Err(Error::InvalidObservation { track_id, x });
        }

        self.frame += 1;

        for state in self.states.values_mut() {
            state.cooldown_remaining = state.cooldown_remaining.saturating_sub(1);
        }

        let mut event = CrossingEvent::default();

        for &(id, x) in observations {
            let state = match self.states.entry(id) {
                Entry::Vacant(e) => {
                    e.insert(TrackState {
                        last_x: x,
                        cooldown_remaining: 0,
                        last_seen: self.frame,
                    });
                    continue;
                }
                Entry::Occupied(e) => e.into_mut(),
            };

            let prev_x = state.last_x;
            state.last_x = x;
            state.last_seen = self.frame;

            let heading = match crossing_heading(prev_x, x, self.line_x) {
                Some(h) => h,
                None => continue,
            };

            if !self.direction.allows(heading) {
                trace!(id, ?heading, "crossing ignored by direction filter");
                continue;
            }

            if state.cooldown_remaining > 0 {
                trace!(
                    id,
                    ?heading,
                    remaining = state.cooldown_remaining,
                    "crossing suppressed by cooldown"
                );
                continue;
            }

            state.cooldown_remaining = self.cooldown_frames;

            debug!(id, ?heading, prev_x, x, frame = self.frame, "line crossed");
            event.record(Crossing {
                track_id: id,
                heading,
                from_x: prev_x,
                to_x: x,
            });
        }

        if let Some(max_idle) = self.max_idle_frames {
            let frame = self.frame;
            self.states
                .retain(|_, s| frame.saturating_sub(s.last_seen) <= max_idle);
        }

        Ok(event)
    }
}
