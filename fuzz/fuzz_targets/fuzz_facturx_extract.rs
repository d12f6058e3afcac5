#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as PDF input: errors are fine, panics are bugs.
    let _ = eformat::facturx::extract_from_pdf(data);
});
