#![no_main]
use libfuzzer_sys::fuzz_target;
use rover_core::{Command, LineBuffer};

fuzz_target!(|data: &[u8]| {
    let mut buf = LineBuffer::default();
    for &byte in data {
        let Some(line) = buf.feed(byte) else {
            continue;
        };
        assert!(line.as_str().chars().count() < buf.capacity());
        assert!(!line.as_str().contains(['\n', '\r']));
        if let Ok(Command::Drive { speed, steer }) = line.parse() {
            assert!((-100..=100).contains(&speed));
            assert!((0..=180).contains(&steer));
        }
    }
});
