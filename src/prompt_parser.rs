//! Prompt Parsing Module
//!
//! Turns a free-text restaurant request into a [`ParsedQuery`]. The language
//! model is asked for a JSON object; when it answers with something else the
//! parser falls back to `field[value]` patterns in the model output and then
//! to heuristics over the user's own words. Parsing never fails: the worst
//! case is an empty query.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::llm::CompletionProvider;
use crate::models::ParsedQuery;

const EXTRACTION_INSTRUCTIONS: &str = "Extract the following fields from the user request and return ONLY a valid JSON object with these keys: \
dish, max_budget, people, time, location, max_distance_km. \
If the user names several places to meet between, make location a JSON list of those places. \
If a field is missing, use null. Do not include any explanation, only output the JSON object. \
Example: {\"dish\": \"pizza\", \"max_budget\": 15, \"people\": 2, \"time\": \"8pm\", \"location\": \"Central Park\", \"max_distance_km\": null}";

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object pattern"));

/// Per-field fallback patterns, first match wins
static FIELD_PATTERNS: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    let compile = |patterns: &[&str]| {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("valid field pattern"))
            .collect::<Vec<_>>()
    };
    vec![
        (
            "dish",
            compile(&[r"dish\[(.*?)\]", r"food\[(.*?)\]", r#""dish":\s*"(.*?)""#]),
        ),
        (
            "max_budget",
            compile(&[
                r"max_budget\[(.*?)\]",
                r"price\[(.*?)\]",
                r"budget\[(.*?)\]",
                r#""max_budget":\s*(\d+)"#,
            ]),
        ),
        (
            "people",
            compile(&[r"people\[(.*?)\]", r"persons\[(.*?)\]", r#""people":\s*(\d+)"#]),
        ),
        ("time", compile(&[r"time\[(.*?)\]", r#""time":\s*"(.*?)""#])),
        (
            "location",
            compile(&[
                r"location\[(.*?)\]",
                r"place\[(.*?)\]",
                r#""location":\s*"(.*?)""#,
            ]),
        ),
        (
            "max_distance_km",
            compile(&[
                r"max_distance_km\[(.*?)\]",
                r"distance\[(.*?)\]",
                r#""max_distance_km":\s*(\d+)"#,
            ]),
        ),
    ]
});

static DISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(pizza|sushi|burgers?|biryani|tacos?|burritos?|ramen|pasta|dosa|noodles|dim sum|dumplings|bbq|barbecue|steak|seafood|curry|pho|kebabs?|falafel|shawarma|sandwich(?:es)?|salad|coffee|brunch|desserts?|ice cream|italian|chinese|indian|japanese|mexican|thai|korean|french|mediterranean|vietnamese|vegan|vegetarian)\b",
    )
    .expect("valid dish pattern")
});

/// A run of capitalised words, e.g. "MG Road" or "Central Park"
const PROPER_NOUN: &str = r"[A-Z][\w'.&-]*(?:\s+[A-Z][\w'.&-]*)*";

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\bbetween\s+({PROPER_NOUN})\s+and\s+({PROPER_NOUN})"
    ))
    .expect("valid between pattern")
});

static PLACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:in|near|at|around|from)\s+({PROPER_NOUN})"))
        .expect("valid place pattern")
});

/// Capitalised words that end a place name ("Soho Under $20")
const PLACE_STOP_WORDS: &[&str] = &[
    "under", "below", "for", "at", "with", "within", "tonight", "today", "tomorrow", "and",
    "near", "by", "on", "before", "after", "around", "in", "from", "less", "max", "budget",
    "please", "cheap",
];

static BUDGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:under|below|less than|max(?:imum)?|budget(?: of)?)\s*(\$|₹|€|£|rs\.?\s*)?(\d+(?:\.\d+)?)\s*([a-z]*)",
    )
    .expect("valid budget pattern")
});

static PEOPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+)\s*(?:people|persons|guests|pax)\b|\b(?:party|table) of\s+(\d+)\b")
        .expect("valid people pattern")
});

static FOR_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfor\s+(\d+)\s*([a-z:]*)").expect("valid count pattern")
});

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}(?::[0-5]\d)?\s*(?:am|pm))\b|\b((?:[01]?\d|2[0-3]):[0-5]\d)\b")
        .expect("valid time pattern")
});

static DISTANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"within\s+(\d+(?:\.\d+)?)\s*(?:km|kms|kilomet)").expect("valid distance pattern")
});

/// Build the instruction sent to the language model
pub fn build_extraction_prompt(prompt: &str) -> String {
    format!("{EXTRACTION_INSTRUCTIONS}\nUser request: {prompt}")
}

/// The JSON object embedded in model output, if any
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let candidate = JSON_OBJECT.find(raw)?.as_str();
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            debug!("Model output looked like JSON but did not parse: {}", e);
            None
        }
    }
}

/// Fallback: `field[value]` style annotations in model output
pub fn extract_bracketed_fields(raw: &str) -> ParsedQuery {
    let mut fields = Map::new();
    for (key, patterns) in FIELD_PATTERNS.iter() {
        let hit = patterns
            .iter()
            .find_map(|p| p.captures(raw).and_then(|c| c.get(1)));
        if let Some(value) = hit {
            fields.insert((*key).to_string(), Value::String(value.as_str().to_string()));
        }
    }
    ParsedQuery::from_value(&Value::Object(fields))
}

/// Last resort: read the user's own words
pub fn extract_from_prompt(prompt: &str) -> ParsedQuery {
    let lower = prompt.to_lowercase();
    let mut parsed = ParsedQuery::default();

    parsed.dish = DISH.captures(&lower).map(|c| c[1].to_string());

    let between = BETWEEN
        .captures(prompt)
        .and_then(|c| Some(vec![place_name(&c[1])?, place_name(&c[2])?]));
    parsed.locations = match between {
        Some(both) => both,
        None => PLACE
            .captures_iter(prompt)
            .find_map(|c| place_name(&c[1]))
            .into_iter()
            .collect(),
    };

    parsed.max_budget = budget_from(&lower);

    parsed.people = PEOPLE
        .captures(&lower)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .and_then(|m| m.as_str().parse().ok())
        .or_else(|| party_size_after_for(&lower))
        .filter(|p| *p > 0);

    parsed.time = TIME
        .captures(&lower)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().replace(' ', ""));

    parsed.max_distance_km = DISTANCE
        .captures(&lower)
        .and_then(|c| c[1].parse().ok())
        .filter(|d: &f64| *d > 0.0);

    parsed
}

/// Leading words of a capitalised run, up to the first stop word
fn place_name(run: &str) -> Option<String> {
    let words: Vec<&str> = run
        .split_whitespace()
        .take_while(|w| !PLACE_STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// "under $20" or "max 30 dollars" is a budget, "less than 20 minutes" is not
fn budget_from(lower: &str) -> Option<f64> {
    const NOT_MONEY: &[&str] = &[
        "min", "mins", "minute", "minutes", "hour", "hours", "hr", "hrs", "sec", "secs",
        "seconds", "km", "kms", "kilometers", "kilometres", "m", "mi", "miles", "meters",
        "metres", "people", "persons", "guests", "pax", "am", "pm", "stars", "star",
    ];
    BUDGET.captures_iter(lower).find_map(|c| {
        let has_currency = c.get(1).is_some();
        let unit = c.get(3).map_or("", |m| m.as_str());
        if !has_currency && NOT_MONEY.contains(&unit) {
            return None;
        }
        c[2].parse::<f64>().ok().filter(|b| *b > 0.0)
    })
}

/// "for 4" counts people, "for 8pm" or "for 20 mins" does not
fn party_size_after_for(lower: &str) -> Option<u32> {
    const NOT_PEOPLE: &[&str] = &[
        "am", "pm", "km", "kms", "min", "mins", "minutes", "hour", "hours", "bucks", "dollars",
        "rupees",
    ];
    FOR_COUNT.captures_iter(lower).find_map(|c| {
        let unit = &c[2];
        if unit.starts_with(':') || NOT_PEOPLE.contains(&unit) {
            None
        } else {
            c[1].parse().ok()
        }
    })
}

/// Interpret raw model output for the given user prompt
pub fn parse_model_output(raw: &str, prompt: &str) -> ParsedQuery {
    if let Some(value) = extract_json_object(raw) {
        return ParsedQuery::from_value(&value);
    }
    debug!("No JSON object in model output, trying field patterns");
    let mut parsed = extract_bracketed_fields(raw);
    parsed.merge_missing(extract_from_prompt(prompt));
    parsed
}

/// LLM-backed prompt parser with heuristic fallbacks
#[derive(Clone)]
pub struct PromptParser {
    llm: Arc<dyn CompletionProvider>,
}

impl PromptParser {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// Extract structured parameters; never fails
    pub async fn parse(&self, prompt: &str) -> ParsedQuery {
        let parsed = match self.llm.complete(&build_extraction_prompt(prompt)).await {
            Ok(raw) => parse_model_output(&raw, prompt),
            Err(e) => {
                warn!("LLM extraction failed, using prompt heuristics: {:#}", e);
                extract_from_prompt(prompt)
            }
        };
        info!(
            "Parsed prompt: dish={:?} locations={:?} budget={:?} people={:?}",
            parsed.dish, parsed.locations, parsed.max_budget, parsed.people
        );
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use rstest::rstest;

    struct CannedLlm(Option<&'static str>);

    #[async_trait]
    impl CompletionProvider for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow!("model unavailable"))
        }
    }

    #[test]
    fn test_extraction_prompt_contains_request() {
        let prompt = build_extraction_prompt("sushi near Shibuya");
        assert!(prompt.contains("max_distance_km"));
        assert!(prompt.ends_with("User request: sushi near Shibuya"));
    }

    #[test]
    fn test_json_object_inside_prose_and_fences() {
        let raw = "Sure! ```json\n{\"dish\": \"ramen\",\n \"people\": 3}\n```";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["dish"], "ramen");
        assert_eq!(value["people"], 3);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(extract_json_object("{dish: pizza}").is_none());
        assert!(extract_json_object("no braces at all").is_none());
    }

    #[test]
    fn test_bracketed_fields() {
        let parsed = extract_bracketed_fields(
            "food[tacos] budget[$12] persons[3] time[7pm] place[Mission District] distance[4]",
        );
        assert_eq!(parsed.dish.as_deref(), Some("tacos"));
        assert_eq!(parsed.max_budget, Some(12.0));
        assert_eq!(parsed.people, Some(3));
        assert_eq!(parsed.time.as_deref(), Some("7pm"));
        assert_eq!(parsed.locations, vec!["Mission District"]);
        assert_eq!(parsed.max_distance_km, Some(4.0));
    }

    #[test]
    fn test_prompt_heuristics_full_sentence() {
        let parsed = extract_from_prompt("Find pizza for 2 people under $15 in MG Road at 8pm");
        assert_eq!(parsed.dish.as_deref(), Some("pizza"));
        assert_eq!(parsed.people, Some(2));
        assert_eq!(parsed.max_budget, Some(15.0));
        assert_eq!(parsed.locations, vec!["MG Road"]);
        assert_eq!(parsed.time.as_deref(), Some("8pm"));
        assert_eq!(parsed.max_distance_km, None);
    }

    #[test]
    fn test_prompt_heuristics_between_two_places() {
        let parsed = extract_from_prompt(
            "Somewhere for sushi between Koramangala and Indiranagar within 3 km",
        );
        assert_eq!(parsed.dish.as_deref(), Some("sushi"));
        assert_eq!(parsed.locations, vec!["Koramangala", "Indiranagar"]);
        assert_eq!(parsed.max_distance_km, Some(3.0));
    }

    #[rstest]
    #[case("Sushi near Soho Under $20", vec!["Soho"])]
    #[case("Tacos in Mission District Tonight", vec!["Mission District"])]
    #[case("ramen near Tonight", vec![])]
    #[case("dinner for 2 less than 20 minutes from Soho", vec!["Soho"])]
    #[case("pizza between Soho Tonight and Camden", vec!["Soho", "Camden"])]
    fn test_place_names_stop_at_keywords(#[case] prompt: &str, #[case] expected: Vec<&str>) {
        assert_eq!(extract_from_prompt(prompt).locations, expected);
    }

    #[rstest]
    #[case("sushi under $20", Some(20.0))]
    #[case("pizza under 15", Some(15.0))]
    #[case("max 30 dollars for dinner", Some(30.0))]
    #[case("dinner for 2 less than 20 minutes from Soho", None)]
    #[case("something within walking distance, under 10 min", None)]
    #[case("less than 5 km away but below £12", Some(12.0))]
    fn test_budget_needs_money_context(#[case] prompt: &str, #[case] expected: Option<f64>) {
        assert_eq!(extract_from_prompt(prompt).max_budget, expected);
    }

    #[rstest]
    #[case("dinner for 4 tonight", Some(4))]
    #[case("table of 6 please", Some(6))]
    #[case("book for 8pm", None)]
    #[case("for 20 mins only", None)]
    #[case("3 guests", Some(3))]
    fn test_party_size(#[case] prompt: &str, #[case] expected: Option<u32>) {
        assert_eq!(extract_from_prompt(prompt).people, expected);
    }

    #[rstest]
    #[case("around 7:30 pm", Some("7:30pm"))]
    #[case("at 19:45", Some("19:45"))]
    #[case("lunch", None)]
    fn test_time(#[case] prompt: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_from_prompt(prompt).time.as_deref(), expected);
    }

    #[test]
    fn test_lowercase_places_are_not_locations() {
        let parsed = extract_from_prompt("i am in the mood for pasta");
        assert!(parsed.locations.is_empty());
        assert_eq!(parsed.dish.as_deref(), Some("pasta"));
    }

    #[test]
    fn test_model_json_wins_over_prompt() {
        let parsed = parse_model_output(
            r#"{"dish": "biryani", "location": null}"#,
            "pizza in MG Road",
        );
        assert_eq!(parsed.dish.as_deref(), Some("biryani"));
        assert!(parsed.locations.is_empty());
    }

    #[test]
    fn test_non_json_output_merges_prompt() {
        let parsed = parse_model_output("dish[dumplings]", "dumplings near Chinatown for 5 people");
        assert_eq!(parsed.dish.as_deref(), Some("dumplings"));
        assert_eq!(parsed.locations, vec!["Chinatown"]);
        assert_eq!(parsed.people, Some(5));
    }

    #[tokio::test]
    async fn test_parser_uses_model_json() {
        let parser = PromptParser::new(Arc::new(CannedLlm(Some(
            r#"{"dish": "pizza", "max_budget": 15, "people": 2, "time": "8pm", "location": ["Soho", "Camden"], "max_distance_km": null}"#,
        ))));
        let parsed = parser.parse("pizza between Soho and Camden").await;
        assert_eq!(parsed.locations, vec!["Soho", "Camden"]);
        assert_eq!(parsed.max_budget, Some(15.0));
    }

    #[tokio::test]
    async fn test_parser_survives_model_failure() {
        let parser = PromptParser::new(Arc::new(CannedLlm(None)));
        let parsed = parser.parse("burgers near Union Square").await;
        assert_eq!(parsed.dish.as_deref(), Some("burgers"));
        assert_eq!(parsed.locations, vec!["Union Square"]);
    }
}
