#![no_main]

use libfuzzer_sys::fuzz_target;
use scrollstage_core::{RootMargin, ViewportRect};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 256 {
        return;
    }

    let Ok(margin) = text.parse::<RootMargin>() else {
        return;
    };

    // Anything that parses must survive a CSS round trip.
    let reparsed: RootMargin = margin
        .to_css()
        .parse()
        .expect("serialized margin must parse");
    assert_eq!(margin, reparsed);

    // Applying a margin never yields a negative-size root.
    let root = margin.apply(&ViewportRect::from_size(1280.0, 800.0));
    assert!(root.width >= 0.0 && root.height >= 0.0);
});
