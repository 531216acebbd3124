//! Property tests for the static and dynamic occupancy layers.
//!
//! These tests use `proptest` to generate random rectangles and masks and
//! verify the region, translation, and counter invariants of `Bitmask` and
//! `SolidMask`.

use proptest::prelude::*;
use windrose_core::prelude::*;

fn dims() -> impl Strategy<Value = (u32, u32)> {
    (1..=40u32, 1..=40u32)
}

/// A random bitmask of the given size, built from a flat list of cells.
fn bitmask_strategy() -> impl Strategy<Value = Bitmask> {
    dims().prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<bool>(), (w * h) as usize).prop_map(move |cells| {
            let mut mask = Bitmask::new(w, h, false).unwrap();
            for (i, &cell) in cells.iter().enumerate() {
                mask.set(i as u32 % w, i as u32 / w, cell);
            }
            mask
        })
    })
}

proptest! {
    /// Writing a rectangle makes every check over it agree with the value,
    /// no matter the corner order, and leaves the outside alone.
    #[test]
    fn set_square_then_get_square(
        (w, h) in dims(),
        corners in (0..60u32, 0..60u32, 0..60u32, 0..60u32),
        value in any::<bool>(),
    ) {
        let (xi, yi, xf, yf) = corners;
        let mut mask = Bitmask::new(w, h, !value).unwrap();
        mask.set_square(xi, yi, xf, yf, value);

        let (all, any_other) = if value {
            (Check::AllBlocked, Check::AnyFree)
        } else {
            (Check::AllFree, Check::AnyBlocked)
        };
        prop_assert!(mask.get_square(xi, yi, xf, yf, all));
        prop_assert!(mask.get_square(xf, yf, xi, yi, all));
        prop_assert!(!mask.get_square(xi, yi, xf, yf, any_other));

        let clamp_x = |v: u32| v.min(w - 1);
        let clamp_y = |v: u32| v.min(h - 1);
        let (x0, x1) = (clamp_x(xi).min(clamp_x(xf)), clamp_x(xi).max(clamp_x(xf)));
        let (y0, y1) = (clamp_y(yi).min(clamp_y(yf)), clamp_y(yi).max(clamp_y(yf)));
        let area = (x1 - x0 + 1) * (y1 - y0 + 1);
        let expected_ones = if value { area } else { w * h - area };
        prop_assert_eq!(mask.count_ones(), expected_ones);
    }

    /// Translating to the same size at offset zero is the identity.
    #[test]
    fn translated_identity(mask in bitmask_strategy(), fill in any::<bool>()) {
        let copy = mask.translated(mask.width(), mask.height(), 0, 0, fill).unwrap();
        prop_assert_eq!(copy, mask);
    }

    /// Translating away and back only loses what fell off the edge.
    #[test]
    fn translated_round_trip_keeps_overlap(
        mask in bitmask_strategy(),
        dx in -10..10i32,
        dy in -10..10i32,
    ) {
        let (w, h) = (mask.width(), mask.height());
        let there = mask.translated(w, h, dx, dy, false).unwrap();
        let back = there.translated(w, h, -dx, -dy, false).unwrap();
        for y in 0..h {
            for x in 0..w {
                let survived = (x as i32 + dx) >= 0
                    && (x as i32 + dx) < w as i32
                    && (y as i32 + dy) >= 0
                    && (y as i32 + dy) < h as i32;
                let expected = survived && mask.get(x, y);
                prop_assert_eq!(back.get(x, y), expected, "cell ({}, {})", x, y);
            }
        }
    }

    /// De Morgan holds across the operator set, and inversion is an
    /// involution.
    #[test]
    fn boolean_algebra_laws(a in bitmask_strategy(), seed in any::<u64>()) {
        let mut b = a.clone();
        for y in 0..b.height() {
            for x in 0..b.width() {
                let bit = (seed.rotate_left(x + y * 7) & 1) == 1;
                b.set(x, y, bit);
            }
        }
        let lhs = !&(&a | &b).unwrap();
        let rhs = (&!&a & &!&b).unwrap();
        prop_assert_eq!(lhs, rhs);

        let mut twice = a.clone();
        twice.invert();
        twice.invert();
        prop_assert_eq!(&twice, &a);

        let xor = (&a ^ &b).unwrap();
        let union_minus_both = (&(&a | &b).unwrap() - &(&a & &b).unwrap()).unwrap();
        prop_assert_eq!(xor, union_minus_both);
    }

    /// Any sequence of increments undone in reverse restores the mask.
    #[test]
    fn inc_dec_restore(
        (w, h) in dims(),
        rects in prop::collection::vec((0..40u32, 0..40u32, 1..10u32, 1..10u32), 1..20),
    ) {
        let mut mask = SolidMask::new(w, h);
        let pristine = mask.clone();
        let mut applied = Vec::new();
        for (x, y, rw, rh) in rects {
            match mask.inc_square(x, y, rw, rh) {
                Ok(()) => applied.push((x, y, rw, rh)),
                Err(GridError::InvalidSpatialSpec { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
        let expected: i64 = applied.iter().map(|&(_, _, rw, rh)| (rw * rh) as i64).sum();
        prop_assert_eq!(mask.total(), expected);

        for &(x, y, rw, rh) in applied.iter().rev() {
            mask.dec_square(x, y, rw, rh).unwrap();
        }
        prop_assert_eq!(mask, pristine);
    }
}
