//! Property-based invariant tests for viewport geometry and root margins.
//!
//! ## Invariants
//!
//! 1. `visible_ratio` is always in `[0, 1]`.
//! 2. A target fully inside the root has ratio 1.
//! 3. A target entirely outside the root has ratio 0.
//! 4. Root margins survive CSS serialization.
//! 5. Element id parsing inverts `element_id` for every stage.

use proptest::prelude::*;
use scrollstage_core::{
    MarginLength, ObserverOptions, RootMargin, StageId, ViewportRect, theme_for_element_id,
};

// ── Strategies ────────────────────────────────────────────────────────────

fn arb_coord() -> impl Strategy<Value = f64> {
    (-5_000i32..5_000).prop_map(f64::from)
}

fn arb_extent() -> impl Strategy<Value = f64> {
    (0i32..3_000).prop_map(f64::from)
}

fn arb_rect() -> impl Strategy<Value = ViewportRect> {
    (arb_coord(), arb_coord(), arb_extent(), arb_extent())
        .prop_map(|(x, y, w, h)| ViewportRect::new(x, y, w, h))
}

fn arb_length() -> impl Strategy<Value = MarginLength> {
    prop_oneof![
        (-200i32..200).prop_map(|v| MarginLength::Px(f64::from(v))),
        (-50i32..50).prop_map(|v| MarginLength::Percent(f64::from(v))),
    ]
}

fn arb_margin() -> impl Strategy<Value = RootMargin> {
    (arb_length(), arb_length(), arb_length(), arb_length()).prop_map(
        |(top, right, bottom, left)| RootMargin {
            top,
            right,
            bottom,
            left,
        },
    )
}

// ── 1–3. Visibility ratio ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn ratio_is_bounded(target in arb_rect(), root in arb_rect(), margin in arb_margin()) {
        let options = ObserverOptions { root_margin: margin, ..ObserverOptions::default() };
        let ratio = target.visible_ratio(&options.effective_root(&root));
        prop_assert!((0.0..=1.0).contains(&ratio), "ratio={ratio}");
    }

    #[test]
    fn contained_target_is_fully_visible(
        root in arb_rect(),
        fx in 0u8..=50,
        fy in 0u8..=50,
    ) {
        prop_assume!(!root.is_empty());
        let target = ViewportRect::new(
            root.x + root.width * f64::from(fx) / 100.0,
            root.y + root.height * f64::from(fy) / 100.0,
            root.width / 2.0,
            root.height / 2.0,
        );
        prop_assume!(!target.is_empty());
        let ratio = target.visible_ratio(&root);
        prop_assert!((ratio - 1.0).abs() < 1e-9, "ratio={ratio}");
    }

    #[test]
    fn disjoint_target_is_invisible(root in arb_rect(), gap in 0i32..1_000, h in 1i32..1_000) {
        let target = ViewportRect::new(root.x, root.bottom() + f64::from(gap), root.width, f64::from(h));
        prop_assert_eq!(target.visible_ratio(&root), 0.0);
    }
}

// ── 4–5. Serialization ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn root_margin_css_round_trip(margin in arb_margin()) {
        let parsed: RootMargin = margin.to_css().parse().expect("own output parses");
        prop_assert_eq!(parsed, margin);
    }

    #[test]
    fn element_id_round_trip(i in 0usize..StageId::ALL.len()) {
        let stage = StageId::ALL[i];
        prop_assert_eq!(StageId::from_element_id(stage.element_id()), Some(stage));
        prop_assert_eq!(theme_for_element_id(stage.element_id()), stage.theme());
    }

    #[test]
    fn unknown_ids_fall_back_to_default_theme(id in "[a-z]{1,12}-x") {
        prop_assert_eq!(StageId::from_element_id(&id), None);
        prop_assert_eq!(theme_for_element_id(&id).as_str(), "theme-hero");
    }
}
