pub mod association;
pub mod bbox;
pub mod config;
pub mod crossing;
pub mod detection;
pub mod error;
pub mod frame;
pub mod roi;
pub mod session;
pub mod stream;

pub use config::CounterConfig;
pub use crossing::{CrossingEngine, CrossingEvent, Direction};
pub use detection::{Detection, TrackId};
pub use frame::Frame;
pub use session::{CounterSession, FrameOutcome, Totals};

use error::Error;
use std::collections::HashMap;
use tracing::warn;

/// Counting over many independent sources, each one a separate session.
pub trait Counting {
    fn update(&mut self, frame: &Frame, src: &str) -> Result<FrameOutcome, Error>;
    fn totals(&self, src: &str) -> Totals;
    fn reset(&mut self, src: &str);
}

/// Session registry keyed by source id.
///
/// A session is created from the shared config on the first frame of a
/// source, using that frame's dimensions. Later frames of the source with
/// other dimensions are rejected. No state is shared between sources.
pub struct LineCounter {
    config: CounterConfig,
    sessions: HashMap<String, CounterSession>,
}

impl LineCounter {
    pub fn new(config: CounterConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    #[inline]
    pub fn session(&self, src: &str) -> Option<&CounterSession> {
        self.sessions.get(src)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    /// Drops the session of `src`, returning its final totals.
    pub fn remove(&mut self, src: &str) -> Option<Totals> {
        self.sessions.remove(src).map(|s| s.totals())
    }
}

impl Default for LineCounter {
    fn default() -> Self {
        Self::new(CounterConfig::default())
    }
}

impl crate::Counting for LineCounter {
    fn update(&mut self, frame: &Frame, src: &str) -> Result<FrameOutcome, Error> {
        let session = if let Some(session) = self.sessions.get_mut(src) {
            session
        } else {
            let session = CounterSession::from_config(&self.config, frame.dims)?;

            self.sessions
                .entry(src.to_string())
                .or_insert(session)
        };

        session.update(frame).map_err(|err| {
            warn!(src, frame = frame.index, "frame rejected: {}", err);
            err
        })
    }

    #[inline]
    fn totals(&self, src: &str) -> Totals {
        self.sessions
            .get(src)
            .map(|s| s.totals())
            .unwrap_or_default()
    }

    fn reset(&mut self, src: &str) {
        if let Some(session) = self.sessions.get_mut(src) {
            session.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: TrackId, cx: f32) -> Detection {
        Detection::new(id, 0, cx - 10.0, 100.0, cx + 10.0, 140.0)
    }

    #[test]
    fn sources_are_counted_independently() {
        let config = CounterConfig {
            cooldown_frames: 0,
            ..Default::default()
        };
        let mut counter = LineCounter::new(config);

        // same track id in both sources, different line positions
        counter
            .update(&Frame::new(1, (200, 200), vec![person(1, 90.0)]), "a")
            .unwrap();
        counter
            .update(&Frame::new(1, (400, 200), vec![person(1, 90.0)]), "b")
            .unwrap();
        counter
            .update(&Frame::new(2, (200, 200), vec![person(1, 110.0)]), "a")
            .unwrap();
        counter
            .update(&Frame::new(2, (400, 200), vec![person(1, 110.0)]), "b")
            .unwrap();

        assert_eq!(counter.totals("a"), Totals::new(1, 0));
        assert_eq!(counter.totals("b"), Totals::default());
        assert_eq!(counter.sources().count(), 2);
    }

    #[test]
    fn unknown_source_reports_zero() {
        let counter = LineCounter::default();

        assert_eq!(counter.totals("nowhere"), Totals::default());
        assert!(counter.session("nowhere").is_none());
    }

    #[test]
    fn reset_and_remove_touch_one_source() {
        let config = CounterConfig {
            cooldown_frames: 0,
            ..Default::default()
        };
        let mut counter = LineCounter::new(config);

        for src in ["a", "b"] {
            counter
                .update(&Frame::new(1, (200, 200), vec![person(1, 90.0)]), src)
                .unwrap();
            counter
                .update(&Frame::new(2, (200, 200), vec![person(1, 110.0)]), src)
                .unwrap();
        }

        counter.reset("a");
        assert_eq!(counter.totals("a"), Totals::default());
        assert_eq!(counter.totals("b"), Totals::new(1, 0));

        assert_eq!(counter.remove("b"), Some(Totals::new(1, 0)));
        assert!(counter.session("b").is_none());
    }

    #[test]
    fn source_keeps_its_first_dimensions() {
        let config = CounterConfig {
            cooldown_frames: 0,
            ..Default::default()
        };
        let mut counter = LineCounter::new(config);

        counter
            .update(&Frame::new(1, (200, 200), vec![person(1, 90.0)]), "a")
            .unwrap();
        let res = counter.update(&Frame::new(2, (400, 200), vec![person(1, 110.0)]), "a");

        assert!(matches!(res, Err(Error::FrameDimsChanged { .. })));
        assert_eq!(counter.totals("a"), Totals::default());
        assert_eq!(counter.session("a").unwrap().params().dims, (200, 200));
    }

    #[test]
    fn bad_config_surfaces_on_first_frame() {
        let config = CounterConfig {
            count_direction: "up".into(),
            ..Default::default()
        };
        let mut counter = LineCounter::new(config);

        let res = counter.update(&Frame::new(1, (200, 200), vec![]), "a");

        assert!(matches!(res, Err(Error::UnknownDirection(_))));
        assert!(counter.session("a").is_none());
    }
}
