#![no_main]

use libfuzzer_sys::fuzz_target;
use scrollstage_core::HostEvent;
use scrollstage_web::input_parser::parse_encoded_host_event;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    if json.len() > 8192 {
        return;
    }

    // Parsing must never panic.
    let Ok(Some(HostEvent::Intersections(batch))) = parse_encoded_host_event(json) else {
        return;
    };

    for obs in &batch {
        assert!(
            (0.0..=1.0).contains(&obs.intersection_ratio),
            "ratio escaped [0, 1]: {}",
            obs.intersection_ratio
        );
    }
});
