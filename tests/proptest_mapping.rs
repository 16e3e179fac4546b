//! Property-based tests for mapping bounds, smoothing and range expansion.

#[cfg(test)]
mod proptest_mapping {
    use proptest::prelude::*;
    use touchcal::adaptive::AdaptiveRangeExpander;
    use touchcal::mapper::{self, CoordinateMapper};
    use touchcal::orientation::Orientation;
    use touchcal::profile::CalibrationProfile;
    use touchcal::sample::RawSample;

    fn any_f64() -> impl Strategy<Value = f64> {
        prop_oneof![
            any::<f64>(),
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            -10.0f64..10.0,
        ]
    }

    prop_compose! {
        /// Any profile at all, including inverted ranges and garbage coefficients.
        fn any_profile()(
            swap in any::<bool>(),
            ix in any::<bool>(),
            iy in any::<bool>(),
            ranges in any::<[u16; 4]>(),
            affine in proptest::option::of(proptest::array::uniform6(any_f64())),
            alpha in any_f64(),
            calibrated in any::<bool>(),
        ) -> CalibrationProfile {
            CalibrationProfile {
                swap_xy: swap,
                invert_x: ix,
                invert_y: iy,
                raw_x_min: ranges[0],
                raw_x_max: ranges[1],
                raw_y_min: ranges[2],
                raw_y_max: ranges[3],
                affine,
                smoothing_alpha: alpha,
                calibrated,
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        // --- Every sample lands on screen, whatever the profile says ---

        #[test]
        fn map_always_on_screen(
            profile in any_profile(),
            rx in 0u16..=4095,
            ry in 0u16..=4095,
            w in 1u32..1024,
            h in 1u32..1024,
        ) {
            let p = mapper::map(RawSample::touching(rx, ry), &profile, (w, h));
            prop_assert!(p.x >= 0 && (p.x as u32) < w, "x {} outside 0..{}", p.x, w);
            prop_assert!(p.y >= 0 && (p.y as u32) < h, "y {} outside 0..{}", p.y, h);
        }

        #[test]
        fn smoothed_map_always_on_screen(
            profile in any_profile(),
            samples in proptest::collection::vec((0u16..=4095, 0u16..=4095, any::<bool>()), 1..40),
        ) {
            let screen = (240, 280);
            let mut m = CoordinateMapper::new(screen);
            for (rx, ry, touching) in samples {
                let raw = RawSample { rx, ry, touching };
                let p = m.map(raw, &profile);
                prop_assert!(p.x >= 0 && p.x < 240 && p.y >= 0 && p.y < 280, "{:?}", p);
            }
        }

        // --- Same sample, same profile, same point ---

        #[test]
        fn map_is_idempotent(profile in any_profile(), rx in 0u16..=4095, ry in 0u16..=4095) {
            let raw = RawSample::touching(rx, ry);
            prop_assert_eq!(
                mapper::map(raw, &profile, (240, 280)),
                mapper::map(raw, &profile, (240, 280))
            );
        }

        // --- Identity orientation is monotonic along each axis ---

        #[test]
        fn identity_map_is_monotonic(a in 0u16..=4095, b in 0u16..=4095, fixed in 0u16..=4095) {
            let mut profile = CalibrationProfile::default();
            profile.set_orientation(Orientation::IDENTITY);
            let (lo, hi) = (a.min(b), a.max(b));
            let p_lo = mapper::map(RawSample::touching(lo, fixed), &profile, (240, 280));
            let p_hi = mapper::map(RawSample::touching(hi, fixed), &profile, (240, 280));
            prop_assert!(p_lo.x <= p_hi.x);
            prop_assert_eq!(p_lo.y, p_hi.y);
        }

        // --- Expansion never shrinks a bound ---

        #[test]
        fn expansion_is_monotonic(
            start in (0u16..=4095, 0u16..=4095, 0u16..=4095, 0u16..=4095),
            samples in proptest::collection::vec((0u16..=4095, 0u16..=4095), 1..100),
            margin in 0u16..64,
            pad in 0u16..128,
        ) {
            let mut profile = CalibrationProfile::default();
            profile.raw_x_min = start.0.min(start.1);
            profile.raw_x_max = start.0.max(start.1);
            profile.raw_y_min = start.2.min(start.3);
            profile.raw_y_max = start.2.max(start.3);
            let mut expander = AdaptiveRangeExpander::new(margin, pad);

            for (rx, ry) in samples {
                let before = profile.clone();
                expander.observe(RawSample::touching(rx, ry), &mut profile);
                prop_assert!(profile.raw_x_min <= before.raw_x_min);
                prop_assert!(profile.raw_x_max >= before.raw_x_max);
                prop_assert!(profile.raw_y_min <= before.raw_y_min);
                prop_assert!(profile.raw_y_max >= before.raw_y_max);
                prop_assert!(profile.raw_x_max <= 4095 && profile.raw_y_max <= 4095);
            }
        }

        #[test]
        fn increasing_extremes_widen_max(steps in proptest::collection::vec(1u16..200, 1..30)) {
            let mut profile = CalibrationProfile::default();
            profile.raw_x_min = 1800;
            profile.raw_x_max = 2200;
            let mut expander = AdaptiveRangeExpander::default();
            let mut v = 2200u16;
            let mut last_max = profile.raw_x_max;
            for s in steps {
                v = v.saturating_add(s).min(4095);
                expander.observe(RawSample::touching(v, 2000), &mut profile);
                prop_assert!(profile.raw_x_max >= last_max);
                prop_assert!(profile.raw_x_max >= v);
                last_max = profile.raw_x_max;
            }
        }
    }
}
