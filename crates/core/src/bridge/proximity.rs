use std::sync::atomic::{AtomicU8, Ordering};

use crate::shared::constants::{CAUTION_DISTANCE_M, DANGER_DISTANCE_M};
use crate::shared::detection::{Detection, Rect};

/// Farthest estimate, for objects in the top of the frame.
const MAX_DISTANCE_M: f32 = 8.0;
/// Nearest estimate, for objects at the bottom edge.
const MIN_DISTANCE_M: f32 = 0.5;
const FAR_BAND: f32 = 0.3;
const NEAR_BAND: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProximityZone {
    Safe = 0,
    Caution = 1,
    Danger = 2,
}

impl ProximityZone {
    pub fn for_distance(distance_m: f32) -> Self {
        if distance_m >= CAUTION_DISTANCE_M {
            ProximityZone::Safe
        } else if distance_m >= DANGER_DISTANCE_M {
            ProximityZone::Caution
        } else {
            ProximityZone::Danger
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ProximityZone::Caution,
            2 => ProximityZone::Danger,
            _ => ProximityZone::Safe,
        }
    }
}

/// Ground-plane distance guess for a rear-facing camera: the lower an
/// object's centre sits in the frame, the closer it is.
pub fn estimate_distance(rect: &Rect, frame_height: f32) -> f32 {
    if frame_height <= 0.0 {
        return MAX_DISTANCE_M;
    }
    let (_, cy) = rect.center();
    let normalized_y = cy / frame_height;
    if normalized_y < FAR_BAND {
        MAX_DISTANCE_M
    } else if normalized_y > NEAR_BAND {
        MIN_DISTANCE_M
    } else {
        let ratio = (normalized_y - FAR_BAND) / (NEAR_BAND - FAR_BAND);
        MAX_DISTANCE_M - ratio * (MAX_DISTANCE_M - MIN_DISTANCE_M)
    }
}

/// Zone of the most recently dispatched frame, readable without locking.
pub struct ProximityMonitor {
    zone: AtomicU8,
    enabled: bool,
}

impl ProximityMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            zone: AtomicU8::new(ProximityZone::Safe as u8),
            enabled,
        }
    }

    /// Records the zone of the nearest detection. No detections means `Safe`.
    pub fn update<'d>(
        &self,
        detections: impl IntoIterator<Item = &'d Detection>,
        frame_height: f32,
    ) -> ProximityZone {
        let nearest = detections
            .into_iter()
            .map(|d| estimate_distance(&d.rect, frame_height))
            .fold(f32::INFINITY, f32::min);
        let zone = if nearest.is_finite() {
            ProximityZone::for_distance(nearest)
        } else {
            ProximityZone::Safe
        };
        let previous = ProximityZone::from_u8(self.zone.swap(zone as u8, Ordering::Relaxed));
        if previous != zone {
            log::debug!("Proximity zone {previous:?} -> {zone:?} (nearest {nearest:.2} m)");
        }
        zone
    }

    pub fn zone(&self) -> ProximityZone {
        ProximityZone::from_u8(self.zone.load(Ordering::Relaxed))
    }

    pub fn is_warn(&self) -> bool {
        self.enabled && self.zone() != ProximityZone::Safe
    }

    pub fn reset(&self) {
        self.zone.store(ProximityZone::Safe as u8, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn at_height(cy: f32) -> Detection {
        Detection {
            rect: Rect::new(0.0, cy - 5.0, 10.0, 10.0),
            label: 15,
            score: 0.9,
        }
    }

    #[rstest]
    #[case(10.0, 8.0)]
    #[case(30.0, 8.0)]
    #[case(60.0, 4.25)]
    #[case(90.0, 0.5)]
    #[case(95.0, 0.5)]
    fn test_estimate_distance(#[case] cy: f32, #[case] expected: f32) {
        let d = estimate_distance(&at_height(cy).rect, 100.0);
        assert_relative_eq!(d, expected, epsilon = 1e-4);
    }

    #[rstest]
    #[case(8.0, ProximityZone::Safe)]
    #[case(2.0, ProximityZone::Safe)]
    #[case(1.5, ProximityZone::Caution)]
    #[case(1.0, ProximityZone::Caution)]
    #[case(0.5, ProximityZone::Danger)]
    fn test_zone_for_distance(#[case] distance: f32, #[case] expected: ProximityZone) {
        assert_eq!(ProximityZone::for_distance(distance), expected);
    }

    #[test]
    fn test_nearest_detection_wins() {
        let monitor = ProximityMonitor::new(true);
        let dets = [at_height(20.0), at_height(95.0)];
        assert_eq!(monitor.update(&dets, 100.0), ProximityZone::Danger);
        assert!(monitor.is_warn());
    }

    #[test]
    fn test_no_detections_resets_to_safe() {
        let monitor = ProximityMonitor::new(true);
        monitor.update(&[at_height(95.0)], 100.0);
        assert!(monitor.is_warn());
        monitor.update(std::iter::empty(), 100.0);
        assert_eq!(monitor.zone(), ProximityZone::Safe);
        assert!(!monitor.is_warn());
    }

    #[test]
    fn test_disabled_monitor_never_warns() {
        let monitor = ProximityMonitor::new(false);
        monitor.update(&[at_height(95.0)], 100.0);
        assert_eq!(monitor.zone(), ProximityZone::Danger);
        assert!(!monitor.is_warn());
    }

    #[test]
    fn test_reset() {
        let monitor = ProximityMonitor::new(true);
        monitor.update(&[at_height(80.0)], 100.0);
        monitor.reset();
        assert_eq!(monitor.zone(), ProximityZone::Safe);
    }
}
