use serde_derive::Serialize;
use std::collections::BTreeSet;
use std::ops::{Add, AddAssign};

use tracing::{debug, info};

use crate::association::associate;
use crate::config::{CounterConfig, SessionParams};
use crate::crossing::{CrossingEngine, CrossingEvent};
use crate::detection::TrackId;
use crate::error::Error;
use crate::frame::Frame;

/// Running crossing totals of one session.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    #[serde(rename = "in")]
    pub count_in: u64,
    #[serde(rename = "out")]
    pub count_out: u64,
}

impl Totals {
    #[inline]
    pub fn new(count_in: u64, count_out: u64) -> Self {
        Self {
            count_in,
            count_out,
        }
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.count_in + self.count_out
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals::new(self.count_in + rhs.count_in, self.count_out + rhs.count_out)
    }
}

impl AddAssign<&CrossingEvent> for Totals {
    fn add_assign(&mut self, event: &CrossingEvent) {
        self.count_in += u64::from(event.count_in);
        self.count_out += u64::from(event.count_out);
    }
}

/// Result of feeding one frame to a [`CounterSession`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// Counts of this frame only
    pub delta: CrossingEvent,
    /// Carriers with a payload nearby in this frame
    pub carrying: BTreeSet<TrackId>,
}

/// Counting state for one continuous video or stream.
///
/// Sessions share nothing; run one per stream.
#[derive(Debug, Clone)]
pub struct CounterSession {
    params: SessionParams,
    engine: CrossingEngine,
    totals: Totals,
    last_frame: Option<u64>,
}

impl CounterSession {
    pub fn new(params: SessionParams) -> Self {
        let engine = CrossingEngine::new(params.line_x, params.direction, params.cooldown_frames)
            .with_max_idle_frames(params.max_idle_frames);

        Self {
            params,
            engine,
            totals: Totals::default(),
            last_frame: None,
        }
    }

    pub fn from_config(config: &CounterConfig, dims: (u32, u32)) -> Result<Self, Error> {
        let params = config.resolve(dims)?;
        info!(
            width = params.dims.0,
            height = params.dims.1,
            line_x = params.line_x,
            direction = %params.direction,
            cooldown = params.cooldown_frames,
            roi_y_min = params.roi.y_min,
            roi_y_max = params.roi.y_max,
            "counter session created"
        );

        Ok(Self::new(params))
    }

    #[inline]
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    #[inline]
    pub fn engine(&self) -> &CrossingEngine {
        &self.engine
    }

    #[inline]
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Runs association, ROI filtering and crossing detection for one frame
    /// and adds the frame's counts to the totals.
    ///
    /// The frame is checked as a whole first; a rejected frame changes nothing.
    /// Frames must keep the dimensions the session was built for.
    pub fn update(&mut self, frame: &Frame) -> Result<FrameOutcome, Error> {
        if let Some(last) = self.last_frame {
            if frame.index < last {
                return Err(Error::OutOfOrderFrame {
                    last,
                    got: frame.index,
                });
            }
        }

        if frame.dims != self.params.dims {
            return Err(Error::FrameDimsChanged {
                expected: self.params.dims,
                got: frame.dims,
            });
        }

        for det in frame.iter() {
            det.validate()?;
        }

        let (carriers, payloads) = self.params.roles.split(&frame.detections);
        let carrying = associate(&carriers, &payloads, self.params.association_factor);

        let observations = self.params.roi.observations(carriers.iter().copied());
        let delta = self.engine.update(&observations)?;

        self.totals += &delta;
        self.last_frame = Some(frame.index);

        if !delta.is_empty() {
            debug!(
                frame = frame.index,
                count_in = self.totals.count_in,
                count_out = self.totals.count_out,
                "totals updated"
            );
        }

        Ok(FrameOutcome { delta, carrying })
    }

    /// Zeroes the totals and forgets every track, ready for a new video.
    pub fn reset(&mut self) {
        info!(
            count_in = self.totals.count_in,
            count_out = self.totals.count_out,
            "counter session reset"
        );

        self.totals = Totals::default();
        self.engine.reset();
        self.last_frame = None;
    }
}
