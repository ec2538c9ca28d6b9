//! Structured search parameters extracted from a natural-language prompt

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number pattern"));

/// What the user asked for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Dish or cuisine, e.g. "pizza"
    pub dish: Option<String>,
    /// Upper spending limit in the user's currency
    pub max_budget: Option<f64>,
    /// Party size
    pub people: Option<u32>,
    /// Requested time, kept as written ("8pm")
    pub time: Option<String>,
    /// Named places; two or more means a meeting point is wanted
    pub locations: Vec<String>,
    /// Hard distance limit from the search centre
    pub max_distance_km: Option<f64>,
}

impl ParsedQuery {
    /// Build from a loosely-typed JSON object.
    ///
    /// Numbers may be strings (`"$15"`), locations may be a string or a list,
    /// and blank or `"null"` strings count as missing.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let field = |key: &str| object.get(key).unwrap_or(&Value::Null);

        let mut locations = location_list(field("location"));
        if locations.is_empty() {
            locations = location_list(field("locations"));
        }

        Self {
            dish: text(field("dish")),
            max_budget: number(field("max_budget")).filter(|b| *b > 0.0),
            people: number(field("people"))
                .filter(|p| *p >= 1.0 && *p <= f64::from(u32::MAX))
                .map(|p| p.round() as u32),
            time: text(field("time")),
            locations,
            max_distance_km: number(field("max_distance_km")).filter(|d| *d > 0.0),
        }
    }

    /// Fill fields that are still missing from `other`
    pub fn merge_missing(&mut self, other: ParsedQuery) {
        if self.dish.is_none() {
            self.dish = other.dish;
        }
        if self.max_budget.is_none() {
            self.max_budget = other.max_budget;
        }
        if self.people.is_none() {
            self.people = other.people;
        }
        if self.time.is_none() {
            self.time = other.time;
        }
        if self.locations.is_empty() {
            self.locations = other.locations;
        }
        if self.max_distance_km.is_none() {
            self.max_distance_km = other.max_distance_km;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let missing = s.is_empty()
                || ["null", "none", "n/a", "unknown"]
                    .iter()
                    .any(|m| s.eq_ignore_ascii_case(m));
            (!missing).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    let parsed: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => NUMBER.find(s).and_then(|m| m.as_str().parse().ok()),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn location_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        other => text(other).into_iter().collect(),
    }
}
