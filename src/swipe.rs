//! Straight-line swipe detection on mapped screen points.

use std::fmt;

use crate::mapper::ScreenPoint;

pub const DEFAULT_SWIPE_THRESHOLD: i32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwipeDirection::Left => write!(f, "left"),
            SwipeDirection::Right => write!(f, "right"),
            SwipeDirection::Up => write!(f, "up"),
            SwipeDirection::Down => write!(f, "down"),
        }
    }
}

/// Emits one direction each time a touch travels `threshold` pixels from
/// its anchor, then re-anchors on the next point.
#[derive(Debug, Clone)]
pub struct SwipeDetector {
    threshold: i32,
    anchor: Option<ScreenPoint>,
}

impl Default for SwipeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD)
    }
}

impl SwipeDetector {
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold: threshold.max(1),
            anchor: None,
        }
    }

    /// Feed the current point, or `None` when the finger is up.
    pub fn update(&mut self, point: Option<ScreenPoint>) -> Option<SwipeDirection> {
        let Some(p) = point else {
            self.anchor = None;
            return None;
        };
        let Some(start) = self.anchor else {
            self.anchor = Some(p);
            return None;
        };

        let dx = p.x - start.x;
        let dy = p.y - start.y;
        if dx.abs() < self.threshold && dy.abs() < self.threshold {
            return None;
        }
        self.anchor = None;
        // ties go to the horizontal axis
        let dir = if dx.abs() >= dy.abs() {
            if dx > 0 {
                SwipeDirection::Right
            } else {
                SwipeDirection::Left
            }
        } else if dy > 0 {
            SwipeDirection::Down
        } else {
            SwipeDirection::Up
        };
        Some(dir)
    }

    pub fn is_armed(&self) -> bool {
        self.anchor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(d: &mut SwipeDetector, pts: &[(i32, i32)]) -> Vec<SwipeDirection> {
        pts.iter()
            .filter_map(|&(x, y)| d.update(Some(ScreenPoint::new(x, y))))
            .collect()
    }

    #[test]
    fn detects_each_direction() {
        let cases = [
            ((100, 100), (130, 105), SwipeDirection::Right),
            ((100, 100), (70, 95), SwipeDirection::Left),
            ((100, 100), (105, 140), SwipeDirection::Down),
            ((100, 100), (90, 60), SwipeDirection::Up),
        ];
        for (start, end, want) in cases {
            let mut d = SwipeDetector::default();
            assert_eq!(feed(&mut d, &[start, end]), vec![want]);
        }
    }

    #[test]
    fn small_moves_do_not_fire() {
        let mut d = SwipeDetector::default();
        assert!(feed(&mut d, &[(100, 100), (110, 110), (123, 77)]).is_empty());
        assert!(d.is_armed());
    }

    #[test]
    fn rearms_after_firing() {
        let mut d = SwipeDetector::new(20);
        let got = feed(&mut d, &[(0, 0), (25, 0), (30, 0), (55, 0)]);
        assert_eq!(got, vec![SwipeDirection::Right, SwipeDirection::Right]);
    }

    #[test]
    fn release_resets_anchor() {
        let mut d = SwipeDetector::default();
        d.update(Some(ScreenPoint::new(0, 0)));
        assert_eq!(d.update(None), None);
        assert!(!d.is_armed());
        // new touch far away becomes the anchor, not a swipe
        assert_eq!(d.update(Some(ScreenPoint::new(200, 200))), None);
    }
}
