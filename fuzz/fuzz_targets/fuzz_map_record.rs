#![no_main]

use eformat::generate::GeneratorFactory;
use eformat::mapping::{RawExtraction, compute_missing_fields, to_canonical_invoice};
use eformat::validate::{Validator, validator_for};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    // Any JSON object must map, validate and serialize without panicking.
    let Ok(raw) = RawExtraction::from_value(value) else {
        return;
    };
    for format in GeneratorFactory::supported_formats() {
        let invoice = to_canonical_invoice(&raw, format);
        let _ = compute_missing_fields(&raw, format);
        let _ = validator_for(format).validate(&invoice);
        if let Ok(generator) = GeneratorFactory::for_format(format) {
            let _ = generator.to_xml(&invoice);
        }
    }
});
