#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scrollstage_core::{SectionObservation, StageId};
use scrollstage_runtime::{StageMachine, TieBreak, Transition};

#[derive(Debug, Arbitrary)]
struct Entry {
    stage: u8,
    ratio: u8,
    intersecting: bool,
}

#[derive(Debug, Arbitrary)]
struct Input {
    most_visible: bool,
    batches: Vec<Vec<Entry>>,
}

fuzz_target!(|input: Input| {
    let tie_break = if input.most_visible {
        TieBreak::MostVisible
    } else {
        TieBreak::LastReported
    };
    let mut machine = StageMachine::new(tie_break);
    let mut moves = 0u64;

    for raw in input.batches.iter().take(256) {
        let batch: Vec<SectionObservation> = raw
            .iter()
            .take(64)
            .map(|e| {
                let stage = StageId::ALL[usize::from(e.stage) % StageId::ALL.len()];
                SectionObservation::new(stage, f64::from(e.ratio) / 255.0, e.intersecting)
            })
            .collect();
        let before = machine.active();
        match machine.apply(&batch) {
            Transition::Stay(stage) => {
                assert_eq!(stage, before);
                assert_eq!(machine.active(), before);
            }
            Transition::Moved { from, to } => {
                moves += 1;
                assert_eq!(from, before);
                assert_ne!(from, to);
                assert_eq!(machine.active(), to);
                assert!(batch.iter().any(|o| o.id == to && o.is_intersecting));
            }
        }
        // No intersecting entry, no movement.
        if batch.iter().all(|o| !o.is_intersecting) {
            assert_eq!(machine.active(), before);
        }
    }
    assert_eq!(machine.transitions(), moves);
});
