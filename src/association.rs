use nalgebra as na;
use std::collections::BTreeSet;

use crate::detection::{Detection, TrackId};

/// Ids of the carriers that have a payload nearby in the current frame.
///
/// A carrier is carrying when some payload center lies closer to its own
/// center than `factor * carrier_width`. Only the current boxes are used.
pub fn associate(carriers: &[&Detection], payloads: &[&Detection], factor: f32) -> BTreeSet<TrackId> {
    let payload_centers: Vec<na::Point2<f32>> = payloads.iter().map(|p| p.center()).collect();

    carriers
        .iter()
        .filter(|c| {
            let center = c.center();
            let reach = factor * c.width();

            payload_centers
                .iter()
                .any(|p| na::distance(&center, p) < reach)
        })
        .map(|c| c.track_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier(id: TrackId, x1: f32) -> Detection {
        // 100 px wide, 200 px tall
        Detection::new(id, 0, x1, 0.0, x1 + 100.0, 200.0)
    }

    fn payload(id: TrackId, cx: f32, cy: f32) -> Detection {
        Detection::new(id, 24, cx - 10.0, cy - 10.0, cx + 10.0, cy + 10.0)
    }

    #[test]
    fn payload_inside_reach_marks_carrier() {
        let c = carrier(1, 0.0);
        let p = payload(10, 50.0, 170.0);

        let set = associate(&[&c], &[&p], 0.8);

        assert!(set.contains(&1));
    }

    #[test]
    fn reach_is_strict() {
        let c = carrier(1, 0.0);
        // center (50, 100), reach 80
        let at_edge = payload(10, 130.0, 100.0);
        let inside = payload(11, 129.0, 100.0);

        assert!(associate(&[&c], &[&at_edge], 0.8).is_empty());
        assert_eq!(associate(&[&c], &[&inside], 0.8).len(), 1);
    }

    #[test]
    fn each_carrier_is_judged_independently() {
        let near = carrier(1, 0.0);
        let far = carrier(2, 1000.0);
        let p = payload(10, 60.0, 100.0);

        let set = associate(&[&near, &far], &[&p], 0.8);

        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn no_payloads_means_no_association() {
        let c = carrier(1, 0.0);

        assert!(associate(&[&c], &[], 0.8).is_empty());
        assert!(associate(&[], &[], 0.8).is_empty());
    }

    #[test]
    fn factor_scales_reach() {
        let c = carrier(1, 0.0);
        let p = payload(10, 50.0, 250.0);

        assert!(associate(&[&c], &[&p], 0.8).is_empty());
        assert!(!associate(&[&c], &[&p], 2.0).is_empty());
    }
}
