//! Restaurant records returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider tags that say nothing about the cuisine
const GENERIC_TYPES: &[&str] = &[
    "restaurant",
    "food",
    "point_of_interest",
    "establishment",
    "store",
];

/// Coordinates of a venue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One venue, merged from text search and place details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub location: Option<LatLng>,
    pub rating: Option<f64>,
    pub total_ratings: Option<u64>,
    /// 0 (free) to 4 (very expensive)
    pub price_level: Option<u8>,
    pub open_now: Option<bool>,
    pub cuisine_types: Vec<String>,
    /// Relative URLs served by the photo proxy
    pub photos: Vec<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub maps_link: Option<String>,
    /// Human-readable weekly hours, one line per day
    pub opening_hours: Vec<String>,
    pub reviews: Vec<Review>,
    /// Distance from the search centre
    pub distance_km: Option<f64>,
}

/// A single customer review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub author_name: String,
    pub rating: Option<f64>,
    pub text: String,
    /// Relative description such as "a month ago"
    pub time: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Convert a provider UNIX timestamp into a UTC instant
    #[must_use]
    pub fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(seconds, 0)
    }
}

/// Human-readable cuisine labels from provider type tags.
///
/// `meal_takeaway` becomes `Meal Takeaway`; generic tags are dropped.
pub fn cuisine_types_from(types: &[String]) -> Vec<String> {
    types
        .iter()
        .filter(|t| !GENERIC_TYPES.contains(&t.as_str()))
        .map(|t| {
            t.split('_')
                .filter(|w| !w.is_empty())
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|label| !label.is_empty())
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuisine_types_drop_generic_tags() {
        let types = vec![
            "restaurant".to_string(),
            "meal_takeaway".to_string(),
            "food".to_string(),
            "point_of_interest".to_string(),
            "bar".to_string(),
        ];
        assert_eq!(cuisine_types_from(&types), vec!["Meal Takeaway", "Bar"]);
    }

    #[test]
    fn test_cuisine_types_empty() {
        assert!(cuisine_types_from(&[]).is_empty());
    }

    #[test]
    fn test_review_timestamp() {
        let at = Review::timestamp(1_700_000_000).unwrap();
        assert_eq!(at.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }
}
