use std::collections::HashSet;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

/// Result of [`Generator::validate`](super::Generator::validate).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Parse `xml` and confirm every element in `required` occurs at least
/// once, compared by local name (namespace prefixes ignored).
pub(crate) fn check(xml: &str, required: &[&str]) -> StructuralCheck {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut seen: HashSet<String> = HashSet::new();
    let mut errors = Vec::new();
    let mut root_found = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                root_found = true;
                let name = e.local_name();
                seen.insert(String::from_utf8_lossy(name.as_ref()).into_owned());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                errors.push(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                ));
                break;
            }
        }
    }

    if errors.is_empty() {
        if !root_found {
            errors.push("document has no root element".to_string());
        }
        for name in required {
            if !seen.contains(*name) {
                errors.push(format!("missing mandatory element <{name}>"));
            }
        }
    }

    StructuralCheck {
        valid: errors.is_empty(),
        errors,
    }
}
