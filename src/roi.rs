use crate::detection::{Detection, TrackId};

/// Horizontal band of the frame, `[y_min, y_max]` in pixels, bounds included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiBand {
    pub y_min: f32,
    pub y_max: f32,
}

impl RoiBand {
    #[inline]
    pub fn new(y_min: f32, y_max: f32) -> Self {
        Self { y_min, y_max }
    }

    #[inline]
    pub fn contains(&self, y: f32) -> bool {
        self.y_min <= y && y <= self.y_max
    }

    /// `(track_id, center_x)` of every detection whose center lies in the band,
    /// in input order.
    pub fn observations<'a, I>(&self, dets: I) -> Vec<(TrackId, f32)>
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        dets.into_iter()
            .filter_map(|d| {
                let c = d.center();
                self.contains(c.y).then(|| (d.track_id, c.x))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let band = RoiBand::new(100.0, 200.0);

        assert!(band.contains(100.0));
        assert!(band.contains(200.0));
        assert!(!band.contains(99.9));
        assert!(!band.contains(200.1));
    }

    #[test]
    fn keeps_only_centers_inside_band() {
        let band = RoiBand::new(100.0, 200.0);
        let dets = [
            // center y = 50
            Detection::new(1, 0, 0.0, 0.0, 20.0, 100.0),
            // center y = 150
            Detection::new(2, 0, 30.0, 100.0, 50.0, 200.0),
            // center y = 200
            Detection::new(3, 0, 60.0, 150.0, 80.0, 250.0),
        ];

        assert_eq!(band.observations(&dets), vec![(2, 40.0), (3, 70.0)]);
    }
}
