//! Request and response shapes for the search endpoint

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Location, ParsedQuery, Restaurant};
use crate::DineScoutError;

/// Body of `POST /search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub prompt: String,
    pub sort_by: Option<String>,
    /// The caller's own position, used when the prompt names no place
    pub location: Option<DevicePosition>,
    pub filters: Option<SearchFilters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePosition {
    pub lat: f64,
    pub lng: f64,
}

/// Optional narrowing applied after enrichment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Allowed price levels; index 0 is "$", index 3 is "$$$$"
    pub price: Option<Vec<bool>>,
    pub min_rating: Option<f64>,
    pub cuisines: Option<Vec<String>>,
}

impl SearchFilters {
    /// Whether a restaurant passes every configured filter
    #[must_use]
    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        if let (Some(allowed), Some(level)) = (&self.price, restaurant.price_level) {
            // Level 0 (free) has no toggle.
            if level > 0 && !allowed.get(usize::from(level) - 1).copied().unwrap_or(true) {
                return false;
            }
        }

        if let (Some(min), Some(rating)) = (self.min_rating, restaurant.rating) {
            if rating < min {
                return false;
            }
        }

        if let Some(wanted) = self.cuisines.as_ref().filter(|c| !c.is_empty()) {
            let hit = restaurant.cuisine_types.iter().any(|have| {
                let have = have.to_lowercase();
                wanted.iter().any(|w| have.contains(&w.to_lowercase()))
            });
            if !hit {
                return false;
            }
        }

        true
    }
}

/// Body returned by `POST /search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub parsed_prompt: ParsedQuery,
    pub midpoint: Option<Location>,
    pub original_locations: Vec<Location>,
    pub restaurants: Vec<Restaurant>,
}

/// Field the result list is ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Rating,
    TotalRatings,
    PriceLevel,
    Distance,
}

impl SortKey {
    /// Parse a client-supplied key, falling back to rating
    #[must_use]
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e: DineScoutError| {
                tracing::warn!("{e}; sorting by rating");
                Self::default()
            }),
        }
    }

    /// Rank restaurants in place.
    ///
    /// Provider fields sort descending and distance ascending. Missing values
    /// go last and ties keep their existing order.
    pub fn sort(self, restaurants: &mut [Restaurant]) {
        match self {
            SortKey::Rating => restaurants.sort_by(|a, b| descending(a.rating, b.rating)),
            SortKey::TotalRatings => restaurants.sort_by(|a, b| {
                descending(
                    a.total_ratings.map(|n| n as f64),
                    b.total_ratings.map(|n| n as f64),
                )
            }),
            SortKey::PriceLevel => restaurants.sort_by(|a, b| {
                descending(a.price_level.map(f64::from), b.price_level.map(f64::from))
            }),
            SortKey::Distance => {
                restaurants.sort_by(|a, b| ascending(a.distance_km, b.distance_km))
            }
        }
    }
}

impl FromStr for SortKey {
    type Err = DineScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rating" => Ok(SortKey::Rating),
            "total_ratings" | "popularity" | "reviews" => Ok(SortKey::TotalRatings),
            "price_level" | "price" => Ok(SortKey::PriceLevel),
            "distance" => Ok(SortKey::Distance),
            other => Err(DineScoutError::validation(format!(
                "unknown sort key '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Rating => "rating",
            SortKey::TotalRatings => "total_ratings",
            SortKey::PriceLevel => "price_level",
            SortKey::Distance => "distance",
        };
        f.write_str(name)
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn ascending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn restaurant(name: &str, rating: Option<f64>, total: Option<u64>) -> Restaurant {
        Restaurant {
            place_id: name.to_lowercase(),
            name: name.to_string(),
            rating,
            total_ratings: total,
            ..Default::default()
        }
    }

    fn names(restaurants: &[Restaurant]) -> Vec<&str> {
        restaurants.iter().map(|r| r.name.as_str()).collect()
    }

    #[rstest]
    #[case(None, SortKey::Rating)]
    #[case(Some(""), SortKey::Rating)]
    #[case(Some("rating"), SortKey::Rating)]
    #[case(Some("popularity"), SortKey::TotalRatings)]
    #[case(Some("TOTAL_RATINGS"), SortKey::TotalRatings)]
    #[case(Some("price"), SortKey::PriceLevel)]
    #[case(Some("distance"), SortKey::Distance)]
    #[case(Some("vibes"), SortKey::Rating)]
    fn test_parse_or_default(#[case] raw: Option<&str>, #[case] expected: SortKey) {
        assert_eq!(SortKey::parse_or_default(raw), expected);
    }

    #[test]
    fn test_sort_by_rating_missing_last_and_stable() {
        let mut list = vec![
            restaurant("A", None, Some(10)),
            restaurant("B", Some(4.1), Some(5)),
            restaurant("C", Some(4.7), None),
            restaurant("D", Some(4.1), Some(50)),
        ];
        SortKey::Rating.sort(&mut list);
        assert_eq!(names(&list), vec!["C", "B", "D", "A"]);
    }

    #[test]
    fn test_sort_by_total_ratings() {
        let mut list = vec![
            restaurant("A", Some(5.0), Some(3)),
            restaurant("B", Some(3.0), Some(900)),
            restaurant("C", Some(4.0), None),
        ];
        SortKey::TotalRatings.sort(&mut list);
        assert_eq!(names(&list), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_sort_by_distance_ascending() {
        let mut list = vec![
            Restaurant {
                name: "far".to_string(),
                distance_km: Some(3.2),
                ..Default::default()
            },
            Restaurant {
                name: "unknown".to_string(),
                ..Default::default()
            },
            Restaurant {
                name: "near".to_string(),
                distance_km: Some(0.4),
                ..Default::default()
            },
        ];
        SortKey::Distance.sort(&mut list);
        assert_eq!(names(&list), vec!["near", "far", "unknown"]);
    }

    #[test]
    fn test_filters_price_and_rating() {
        let filters = SearchFilters {
            price: Some(vec![true, true, false, false]),
            min_rating: Some(4.0),
            cuisines: None,
        };
        let mut cheap_good = restaurant("cheap", Some(4.5), None);
        cheap_good.price_level = Some(1);
        let mut pricey = restaurant("pricey", Some(4.8), None);
        pricey.price_level = Some(3);
        let mediocre = restaurant("meh", Some(3.2), None);
        let unrated = restaurant("new", None, None);

        assert!(filters.matches(&cheap_good));
        assert!(!filters.matches(&pricey));
        assert!(!filters.matches(&mediocre));
        assert!(filters.matches(&unrated));
    }

    #[test]
    fn test_filters_cuisines_case_insensitive() {
        let filters = SearchFilters {
            cuisines: Some(vec!["italian".to_string()]),
            ..Default::default()
        };
        let mut trattoria = restaurant("trattoria", None, None);
        trattoria.cuisine_types = vec!["Italian Restaurant".to_string()];
        let mut diner = restaurant("diner", None, None);
        diner.cuisine_types = vec!["Meal Takeaway".to_string()];

        assert!(filters.matches(&trattoria));
        assert!(!filters.matches(&diner));
        assert!(SearchFilters::default().matches(&diner));
    }

    #[test]
    fn test_filters_deserialize_camel_case() {
        let filters: SearchFilters =
            serde_json::from_str(r#"{"price":[true,false,true,true],"minRating":3.5}"#).unwrap();
        assert_eq!(filters.min_rating, Some(3.5));
        assert_eq!(filters.price.unwrap().len(), 4);
    }
}
