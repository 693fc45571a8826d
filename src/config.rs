use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::crossing::Direction;
use crate::detection::ClassRoles;
use crate::error::Error;
use crate::roi::RoiBand;

pub const DEFAULT_COOLDOWN_FRAMES: i64 = 30;
pub const DEFAULT_ASSOCIATION_FACTOR: f32 = 0.8;

/// Counting settings as written in a YAML scenario file.
///
/// Positions are fractions of the frame size; they turn into pixels only
/// once the frame dimensions are known, see [`CounterConfig::resolve`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CounterConfig {
    /// Counting line position as a fraction of frame width
    pub line_position: f32,
    pub count_direction: String,
    pub cooldown_frames: i64,
    /// Detector confidence threshold, forwarded to the tracker
    pub confidence: f32,
    /// Classes the tracker is asked for, forwarded to the tracker
    pub track_classes: Vec<i32>,
    pub carrier_classes: Vec<i32>,
    pub payload_classes: Vec<i32>,
    pub roi_y_min: f32,
    pub roi_y_max: f32,
    pub association_distance_factor: f32,
    /// Drop track state unseen for this many frames, never when unset
    pub max_idle_frames: Option<u64>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            line_position: 0.5,
            count_direction: Direction::Both.to_string(),
            cooldown_frames: DEFAULT_COOLDOWN_FRAMES,
            confidence: 0.4,
            track_classes: vec![0, 24, 26, 28],
            carrier_classes: vec![0],
            payload_classes: vec![24, 26, 28],
            roi_y_min: 0.0,
            roi_y_max: 1.0,
            association_distance_factor: DEFAULT_ASSOCIATION_FACTOR,
            max_idle_frames: None,
        }
    }
}

/// Pixel-space parameters for one session, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    /// Frame size the pixel positions were computed for
    pub dims: (u32, u32),
    pub line_x: f32,
    pub direction: Direction,
    pub cooldown_frames: u32,
    pub roi: RoiBand,
    pub association_factor: f32,
    pub roles: ClassRoles,
    pub max_idle_frames: Option<u64>,
}

impl CounterConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn direction(&self) -> Result<Direction, Error> {
        self.count_direction.parse()
    }

    pub fn resolve(&self, dims: (u32, u32)) -> Result<SessionParams, Error> {
        let (width, height) = dims;
        if width == 0 || height == 0 {
            return Err(Error::InvalidFrameDims { width, height });
        }

        let direction = self.direction()?;

        if self.cooldown_frames < 0 {
            return Err(Error::NegativeCooldown(self.cooldown_frames));
        }
        let cooldown_frames = self.cooldown_frames.min(i64::from(u32::MAX)) as u32;

        let line_position = fraction("line_position", self.line_position)?;
        let roi_y_min = fraction("roi_y_min", self.roi_y_min)?;
        let roi_y_max = fraction("roi_y_max", self.roi_y_max)?;
        if roi_y_min > roi_y_max {
            return Err(Error::InvalidRoi {
                min: roi_y_min,
                max: roi_y_max,
            });
        }

        let factor = self.association_distance_factor;
        if !factor.is_finite() || factor < 0.0 {
            return Err(Error::InvalidAssociationFactor(factor));
        }

        Ok(SessionParams {
            dims,
            line_x: (width as f32 * line_position).floor(),
            direction,
            cooldown_frames,
            roi: RoiBand::new(
                (height as f32 * roi_y_min).floor(),
                (height as f32 * roi_y_max).floor(),
            ),
            association_factor: factor,
            roles: ClassRoles::new(self.carrier_classes.clone(), self.payload_classes.clone()),
            max_idle_frames: self.max_idle_frames,
        })
    }
}

fn fraction(name: &'static str, value: f32) -> Result<f32, Error> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidFraction { name, value })
    }
}
