/// Fixed description of a display + touch chip combination.
#[derive(Debug, Clone, Copy)]
pub struct PanelProfile {
    pub name: &'static str,

    // Display resolution in pixels
    pub width: u32,
    pub height: u32,

    // Touch controller on I2C
    pub touch_address: u8,
    pub candidate_buses: &'static [u32],
}

impl PanelProfile {
    pub fn screen(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Look up a built-in panel by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<&'static Self> {
        PANELS
            .iter()
            .copied()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Waveshare 1.69" round-corner LCD (ST7789V2) with a CST816S touch layer.
pub const WAVESHARE_1IN69: PanelProfile = PanelProfile {
    name: "waveshare-1.69",
    width: 240,
    height: 280,
    touch_address: 0x15,
    candidate_buses: &[1, 13, 14],
};

/// Waveshare 1.28" round LCD (GC9A01) with the same CST816S controller.
pub const WAVESHARE_1IN28: PanelProfile = PanelProfile {
    name: "waveshare-1.28",
    width: 240,
    height: 240,
    touch_address: 0x15,
    candidate_buses: &[1, 13, 14],
};

pub const PANELS: &[&PanelProfile] = &[&WAVESHARE_1IN69, &WAVESHARE_1IN28];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let p = PanelProfile::by_name("Waveshare-1.69").unwrap();
        assert_eq!(p.screen(), (240, 280));
        assert!(PanelProfile::by_name("nope").is_none());
    }
}
