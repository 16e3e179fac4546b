//! Axis orientation of the touch panel relative to the display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How raw touch channels line up with screen axes.
///
/// `swap_xy` is applied first, then each screen axis may be mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub swap_xy: bool,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Orientation {
    /// Every combination, identity first.
    pub const ALL: [Orientation; 8] = [
        Orientation::new(false, false, false),
        Orientation::new(false, true, false),
        Orientation::new(false, false, true),
        Orientation::new(false, true, true),
        Orientation::new(true, false, false),
        Orientation::new(true, true, false),
        Orientation::new(true, false, true),
        Orientation::new(true, true, true),
    ];

    pub const IDENTITY: Orientation = Orientation::new(false, false, false);

    pub const fn new(swap_xy: bool, invert_x: bool, invert_y: bool) -> Self {
        Self {
            swap_xy,
            invert_x,
            invert_y,
        }
    }

    /// Route raw channel values to (screen x, screen y) order.
    pub fn route<T>(&self, rx: T, ry: T) -> (T, T) {
        if self.swap_xy {
            (ry, rx)
        } else {
            (rx, ry)
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.swap_xy {
            parts.push("swap");
        }
        if self.invert_x {
            parts.push("invert-x");
        }
        if self.invert_y {
            parts.push("invert-y");
        }
        if parts.is_empty() {
            write!(f, "identity")
        } else {
            write!(f, "{}", parts.join(","))
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut o = Orientation::IDENTITY;
        for part in s.split(',').map(|p| p.trim().to_lowercase()) {
            match part.as_str() {
                "" | "identity" | "none" => {}
                "swap" | "swap-xy" | "swap_xy" => o.swap_xy = true,
                "invert-x" | "invert_x" | "flip-x" => o.invert_x = true,
                "invert-y" | "invert_y" | "flip-y" => o.invert_y = true,
                other => {
                    return Err(format!(
                        "Invalid orientation part '{}'. Use a comma list of: swap, invert-x, invert-y (or identity)",
                        other
                    ))
                }
            }
        }
        Ok(o)
    }
}
