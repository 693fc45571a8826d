use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;

pub type TrackId = u32;

/// One tracked entity in one frame, as delivered by the external tracker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(from = "DetectionRecord", into = "DetectionRecord")]
pub struct Detection {
    pub track_id: TrackId,
    pub class: i32,
    pub bbox: BBox<Ltrb>,
}

/// Compact wire form: `{"id": 7, "c": 0, "b": [x1, y1, x2, y2]}`
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
struct DetectionRecord {
    id: TrackId,
    c: i32,
    b: [f32; 4],
}

impl From<DetectionRecord> for Detection {
    fn from(r: DetectionRecord) -> Self {
        Self {
            track_id: r.id,
            class: r.c,
            bbox: BBox::assigned(&r.b),
        }
    }
}

impl From<Detection> for DetectionRecord {
    fn from(d: Detection) -> Self {
        Self {
            id: d.track_id,
            c: d.class,
            b: d.bbox.into(),
        }
    }
}

impl Detection {
    #[inline]
    pub fn new(track_id: TrackId, class: i32, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            track_id,
            class,
            bbox: BBox::ltrb(x1, y1, x2, y2),
        }
    }

    #[inline(always)]
    pub fn center(&self) -> na::Point2<f32> {
        self.bbox.center()
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.bbox.width()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.bbox.is_well_formed() {
            return Ok(());
        }

        let reason = if !self.bbox.is_finite() {
            "non-finite coordinate"
        } else if self.bbox.left() > self.bbox.right() {
            "x1 > x2"
        } else {
            "y1 > y2"
        };

        Err(Error::InvalidDetection {
            track_id: self.track_id,
            reason,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Carrier,
    Payload,
    Other,
}

/// Class ids that make a detection a carrier or a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRoles {
    carriers: Vec<i32>,
    payloads: Vec<i32>,
}

impl ClassRoles {
    pub fn new(carriers: Vec<i32>, payloads: Vec<i32>) -> Self {
        Self { carriers, payloads }
    }

    /// Carrier membership wins when a class is listed in both sets.
    #[inline]
    pub fn role(&self, class: i32) -> Role {
        if self.carriers.contains(&class) {
            Role::Carrier
        } else if self.payloads.contains(&class) {
            Role::Payload
        } else {
            Role::Other
        }
    }

    /// Splits detections into (carriers, payloads); other classes are dropped.
    pub fn split<'a>(&self, dets: &'a [Detection]) -> (Vec<&'a Detection>, Vec<&'a Detection>) {
        let mut carriers = Vec::new();
        let mut payloads = Vec::new();

        for det in dets {
            match self.role(det.class) {
                Role::Carrier => carriers.push(det),
                Role::Payload => payloads.push(det),
                Role::Other => {}
            }
        }

        (carriers, payloads)
    }
}

impl Default for ClassRoles {
    fn default() -> Self {
        // COCO: person carries backpack, handbag, suitcase
        Self::new(vec![0], vec![24, 26, 28])
    }
}
