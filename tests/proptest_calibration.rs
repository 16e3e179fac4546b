//! Property-based tests for the calibration solvers.

#[cfg(test)]
mod proptest_calibration {
    use proptest::prelude::*;
    use touchcal::calibration::{corner_targets, fit_affine, linalg::solve3};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        // --- Exact correspondences from a well-conditioned transform are reproduced ---

        #[test]
        fn affine_fit_reproduces_targets(
            a in 0.04f64..0.12,
            e in 0.04f64..0.12,
            b in -0.02f64..0.02,
            d in -0.02f64..0.02,
            c in -60.0f64..60.0,
            f in -60.0f64..60.0,
            margin in 5u32..60,
        ) {
            let screen = (240, 280);
            let targets = corner_targets(screen, margin).map(|t| (t.x as f64, t.y as f64));
            let det = a * e - b * d;
            let raw = targets.map(|(x, y)| {
                let (u, v) = (x - c, y - f);
                ((e * u - b * v) / det, (a * v - d * u) / det)
            });

            let fit = fit_affine(&raw, &targets).unwrap();
            prop_assert!(!fit.regularized);
            prop_assert!(fit.residual < 1e-6, "residual {}", fit.residual);
            for (got, want) in fit.coeffs.iter().zip([a, b, c, d, e, f]) {
                prop_assert!((got - want).abs() < 1e-6 * want.abs().max(1.0), "{:?}", fit.coeffs);
            }
        }

        // --- The 3x3 solve never yields NaN or infinity ---

        #[test]
        fn solve3_is_always_finite(
            m in proptest::array::uniform3(proptest::array::uniform3(-1e6f64..1e6)),
            rhs in proptest::array::uniform3(-1e6f64..1e6),
        ) {
            let s = solve3(&m, &rhs);
            prop_assert!(s.x.iter().all(|v| v.is_finite()), "{:?}", s);
            prop_assert!(s.det != 0.0);
        }
    }
}
