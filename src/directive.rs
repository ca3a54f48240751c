//! Location directives embedded in assistant replies.
//!
//! The completion service is asked to append a block such as
//! `<<<LOCATIONS: [{"lat": 59.91, "lng": 10.75}]>>>` when its answer refers to places
//! on the map. [`extract`] pulls the block out of the reply so the user only sees
//! the prose, and hands the coordinates to the map.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::geo::{Coordinate, LocationHint};

pub const OPEN_MARKER: &str = "<<<";
pub const CLOSE_MARKER: &str = ">>>";
pub const DIRECTIVE_TOKEN: &str = "LOCATIONS:";

static DIRECTIVE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<<<\s*LOCATIONS:\s*(\[.*?\])\s*>>>").expect("directive pattern is valid")
});

/// Appended to the assistant's system instruction.
pub const ASSISTANT_DIRECTIVE_INSTRUCTIONS: &str = "\
When your answer mentions one or more places where this person worked or ran a project, \
end the answer with exactly one block of the form \
<<<LOCATIONS: [{\"lat\": <latitude>, \"lng\": <longitude>}]>>> \
listing the coordinates taken from the resume data. \
Use the coordinates exactly as they appear in the data. \
Do not mention the block in the prose, and omit it entirely when no place is relevant.";

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Text to show to the user.
    pub cleaned_text: String,
    /// `None` when there was no block or its payload was not a JSON array.
    pub locations: Option<Vec<LocationHint>>,
}

impl Extraction {
    fn untouched(text: &str) -> Self {
        Self {
            cleaned_text: text.to_string(),
            locations: None,
        }
    }

    /// The directive's complete, valid coordinates.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.locations
            .iter()
            .flatten()
            .filter_map(LocationHint::to_coordinate)
            .collect()
    }
}

/// Splits a reply into visible text and the locations of its first directive block.
///
/// Every well-formed block is removed from the text; only the first one supplies
/// `locations`. A block whose payload fails to parse is left in place, and when no
/// block parses the text is returned unchanged with `locations` set to `None`.
/// Items of a valid array are kept even when they lack `lat` or `lng`.
pub fn extract(text: &str) -> Extraction {
    let mut locations: Option<Vec<LocationHint>> = None;
    let mut cleaned = String::with_capacity(text.len());
    let mut cursor = 0;

    for captures in DIRECTIVE_PATTERN.captures_iter(text) {
        let (Some(block), Some(payload)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let items = match serde_json::from_str::<serde_json::Value>(payload.as_str()) {
            Ok(serde_json::Value::Array(items)) => items,
            Ok(other) => {
                warn!("Location directive is not an array: {}", other);
                continue;
            }
            Err(err) => {
                warn!("Discarding malformed location directive: {}", err);
                continue;
            }
        };

        if locations.is_none() {
            let hints: Vec<LocationHint> = items.iter().map(LocationHint::from_value).collect();
            debug!("Extracted {} locations from reply", hints.len());
            locations = Some(hints);
        } else {
            debug!("Dropping extra location directive with {} items", items.len());
        }

        cleaned.push_str(&text[cursor..block.start()]);
        cursor = block.end();
    }

    if locations.is_none() {
        return Extraction::untouched(text);
    }
    cleaned.push_str(&text[cursor..]);

    Extraction {
        cleaned_text: cleaned.trim().to_string(),
        locations,
    }
}

/// Renders coordinates as a directive block that [`extract`] accepts.
pub fn encode(coordinates: &[Coordinate]) -> String {
    let payload = serde_json::to_string(coordinates).unwrap_or_else(|_| "[]".to_string());
    format!("{OPEN_MARKER}{DIRECTIVE_TOKEN} {payload}{CLOSE_MARKER}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn strips_a_trailing_block() {
        let extraction = extract(r#"Here is info. <<<LOCATIONS: [{"lat":60.1,"lng":11.2}]>>>"#);
        assert_eq!(extraction.cleaned_text, "Here is info.");
        assert_eq!(
            extraction.locations,
            Some(vec![LocationHint::from(Coordinate::new(60.1, 11.2))])
        );
    }

    #[test]
    fn text_without_a_block_is_unchanged() {
        let text = "  She led the Oslo team for five years.\n";
        let extraction = extract(text);
        assert_eq!(extraction.cleaned_text, text);
        assert_eq!(extraction.locations, None);
    }

    #[test]
    fn block_may_span_lines_and_sit_mid_text() {
        let text = "Worked in two cities.\n<<<LOCATIONS: [\n  {\"lat\": 59.9139, \"lng\": 10.7522},\n  {\"lat\": 55.6761, \"lng\": 12.5683}\n]>>>\nAsk me more!";
        let extraction = extract(text);
        assert_eq!(extraction.cleaned_text, "Worked in two cities.\n\nAsk me more!");
        assert_eq!(
            extraction.coordinates(),
            vec![Coordinate::new(59.9139, 10.7522), Coordinate::new(55.6761, 12.5683)]
        );
    }

    #[test]
    fn malformed_payload_leaves_text_visible() {
        let text = "Oops <<<LOCATIONS: [{\"lat\": 60.1, \"lng\": }]>>>";
        let extraction = extract(text);
        assert_eq!(extraction.cleaned_text, text);
        assert_eq!(extraction.locations, None);
    }

    #[test]
    fn partial_items_are_passed_through() {
        let extraction = extract(r#"Mixed <<<LOCATIONS: [{"lat": 60.1}, {"lat": 1, "lng": 2}, "x"]>>>"#);
        let locations = extraction.locations.clone().unwrap();
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0], LocationHint { lat: Some(60.1), lng: None });
        assert_eq!(extraction.coordinates(), vec![Coordinate::new(1.0, 2.0)]);
    }

    #[test]
    fn every_block_is_stripped_and_the_first_supplies_locations() {
        let text = r#"A <<<LOCATIONS: [{"lat":1,"lng":2}]>>> B <<<LOCATIONS: [{"lat":3,"lng":4}]>>>"#;
        let extraction = extract(text);
        assert_eq!(extraction.coordinates(), vec![Coordinate::new(1.0, 2.0)]);
        assert_eq!(extraction.cleaned_text, "A  B");

        let again = extract(&extraction.cleaned_text);
        assert_eq!(again.cleaned_text, extraction.cleaned_text);
        assert_eq!(again.locations, None);
    }

    #[test]
    fn malformed_block_stays_while_a_later_one_is_used() {
        let text = r#"Oops <<<LOCATIONS: [nope]>>> then <<<LOCATIONS: [{"lat":1,"lng":2}]>>>"#;
        let extraction = extract(text);
        assert_eq!(extraction.coordinates(), vec![Coordinate::new(1.0, 2.0)]);
        assert_eq!(extraction.cleaned_text, "Oops <<<LOCATIONS: [nope]>>> then");

        let again = extract(&extraction.cleaned_text);
        assert_eq!(again.cleaned_text, extraction.cleaned_text);
        assert_eq!(again.locations, None);
    }

    #[test]
    fn extraction_is_idempotent_on_cleaned_text() {
        let first = extract(r#"Bergen and Oslo. <<<LOCATIONS: [{"lat":60.39,"lng":5.32}]>>>"#);
        let second = extract(&first.cleaned_text);
        assert_eq!(second.cleaned_text, first.cleaned_text);
        assert_eq!(second.locations, None);
    }

    #[test]
    fn encoded_blocks_extract_to_the_same_coordinates() {
        let coordinates = vec![
            Coordinate::new(59.9139, 10.7522),
            Coordinate::new(-33.8688, 151.2093),
            Coordinate::new(22.5431, 114.0579),
        ];
        let reply = format!("Three offices.\n{}", encode(&coordinates));
        let extraction = extract(&reply);
        assert_eq!(extraction.cleaned_text, "Three offices.");
        assert_eq!(extraction.coordinates(), coordinates);
    }

    #[test]
    fn empty_array_is_a_successful_parse() {
        let extraction = extract("Nothing to show <<<LOCATIONS: []>>>");
        assert_eq!(extraction.cleaned_text, "Nothing to show");
        assert_eq!(extraction.locations, Some(Vec::new()));
    }

    fn coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coordinate::new(lat, lng))
    }

    proptest! {
        #[test]
        fn proptest_extraction_is_idempotent(
            before in "[A-Za-z0-9 .,!?\\n]{0,40}",
            between in "[A-Za-z0-9 .,!?\\n]{0,40}",
            after in "[A-Za-z0-9 .,!?\\n]{0,40}",
            first in prop::collection::vec(coordinate(), 0..4),
            second in prop::collection::vec(coordinate(), 0..4),
            blocks in 0usize..3,
        ) {
            let text = match blocks {
                0 => format!("{before}{between}{after}"),
                1 => format!("{before}{}{after}", encode(&first)),
                _ => format!("{before}{}{between}{}{after}", encode(&first), encode(&second)),
            };
            let once = extract(&text);
            let twice = extract(&once.cleaned_text);
            prop_assert_eq!(&twice.cleaned_text, &once.cleaned_text);
            prop_assert_eq!(twice.locations, None);
        }

        #[test]
        fn proptest_encoded_coordinates_survive_extraction(
            prose in "[A-Za-z0-9 .,]{0,60}",
            coordinates in prop::collection::vec(coordinate(), 0..8),
        ) {
            let extraction = extract(&format!("{prose}\n{}", encode(&coordinates)));
            prop_assert_eq!(extraction.cleaned_text.as_str(), prose.trim());
            let decoded = extraction.coordinates();
            prop_assert_eq!(decoded.len(), coordinates.len());
            for (decoded, original) in decoded.iter().zip(&coordinates) {
                prop_assert!(decoded.approx_eq(original));
            }
        }
    }
}
