#![no_main]

use eformat::mapping::{parse_amount, parse_date};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_amount(s);
        let _ = parse_date(s);
    }
});
