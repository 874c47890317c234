#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use steplog::aggregator::Aggregator;
use steplog::clock::ManualClock;
use steplog::context::ExecutionContext;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fuzz_target!(|data: &[u8]| {
    let agg = Arc::new(Aggregator::new(3));
    let clock = Arc::new(ManualClock::new(0));
    let mut ctx = ExecutionContext::new(agg.clone(), clock.clone());

    // Each byte is one recording call; arbitrary sequences must never panic
    for byte in data {
        let name = NAMES[(byte & 0x03) as usize];
        match byte >> 5 {
            0 => ctx.start_session(name),
            1 => ctx.end_session(name),
            2 | 3 => ctx.begin_step(name),
            4 | 5 => {
                let _ = ctx.finish_step(name);
            }
            _ => clock.advance(u64::from(byte & 0x1f)),
        }
    }

    // Whatever was accumulated must satisfy the statistics invariants
    let drained = agg.drain();
    for (_, steps) in drained.statistics.iter() {
        for stats in steps.values() {
            assert!(stats.count > 0);
            assert!(stats.max_ms <= stats.total_ms);
            assert!(stats.total_self_ms <= stats.total_ms);
        }
    }
    for (_, samples) in drained.samples.iter() {
        assert!(samples.len() <= 3);
    }
});
