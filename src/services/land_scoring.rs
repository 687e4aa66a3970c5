//! Multi-criteria land suitability scoring.
//!
//! Six linear sub-scores (size fit, price fit, connectivity, infrastructure,
//! location match, type match) are combined with fixed weights into an overall
//! score in [0, 100]. Batch ranking and cosine-similarity search build on top.

use serde::{Deserialize, Serialize};

use crate::models::{format_quantity, format_rupees, round2, Land, LandStatus, LandType};

/// Weight of each sub-score in the overall score.
///
/// A fixed table; the weights are not renormalised.
pub const SIZE_WEIGHT: f64 = 0.25;
pub const PRICE_WEIGHT: f64 = 0.20;
pub const CONNECTIVITY_WEIGHT: f64 = 0.20;
pub const INFRASTRUCTURE_WEIGHT: f64 = 0.15;
pub const LOCATION_WEIGHT: f64 = 0.10;
pub const LAND_TYPE_WEIGHT: f64 = 0.10;

/// Default number of ranked results
pub const DEFAULT_LIMIT: usize = 10;
/// Default number of similar listings
pub const DEFAULT_SIMILAR_LIMIT: usize = 5;

/// What a buyer is looking for.
///
/// Every field is optional on the wire; defaults are documented per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandRequirements {
    /// Intended use; listings of another type get a partial type score. Default: none.
    pub purpose: Option<LandType>,
    /// Default: 0 acres.
    pub min_size: f64,
    /// Default: unbounded.
    pub max_size: Option<f64>,
    /// Default: ₹0.
    pub min_price: f64,
    /// Default: unbounded.
    pub max_price: Option<f64>,
    /// Matched case-insensitively against city, then state. Default: none.
    pub location_preference: Option<String>,
    /// 0 ignores connectivity entirely, 1 uses it at full strength. Default: 0.5.
    pub connectivity_importance: f64,
    /// Same scale as `connectivity_importance`. Default: 0.5.
    pub infrastructure_importance: f64,
}

impl Default for LandRequirements {
    fn default() -> Self {
        Self {
            purpose: None,
            min_size: 0.0,
            max_size: None,
            min_price: 0.0,
            max_price: None,
            location_preference: None,
            connectivity_importance: 0.5,
            infrastructure_importance: 0.5,
        }
    }
}

impl LandRequirements {
    /// Location preference with blank strings treated as absent
    fn location(&self) -> Option<&str> {
        self.location_preference
            .as_deref()
            .map(str::trim)
            .filter(|loc| !loc.is_empty())
    }
}

/// Four-tier label derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationLevel {
    #[serde(rename = "Highly Recommended")]
    HighlyRecommended,
    #[serde(rename = "Recommended")]
    Recommended,
    #[serde(rename = "Consider")]
    Consider,
    #[serde(rename = "Not Recommended")]
    NotRecommended,
}

impl RecommendationLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            RecommendationLevel::HighlyRecommended
        } else if score >= 70.0 {
            RecommendationLevel::Recommended
        } else if score >= 55.0 {
            RecommendationLevel::Consider
        } else {
            RecommendationLevel::NotRecommended
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub size_match: f64,
    pub price_match: f64,
    pub connectivity: f64,
    pub infrastructure: f64,
    pub location_match: f64,
    pub land_type_match: f64,
}

impl Subscores {
    fn weighted_total(&self) -> f64 {
        self.size_match * SIZE_WEIGHT
            + self.price_match * PRICE_WEIGHT
            + self.connectivity * CONNECTIVITY_WEIGHT
            + self.infrastructure * INFRASTRUCTURE_WEIGHT
            + self.location_match * LOCATION_WEIGHT
            + self.land_type_match * LAND_TYPE_WEIGHT
    }

    fn rounded(&self) -> Self {
        Self {
            size_match: round2(self.size_match),
            price_match: round2(self.price_match),
            connectivity: round2(self.connectivity),
            infrastructure: round2(self.infrastructure),
            location_match: round2(self.location_match),
            land_type_match: round2(self.land_type_match),
        }
    }
}

/// Result of scoring one listing against one set of requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityScore {
    pub overall_score: f64,
    pub subscores: Subscores,
    pub matching_features: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation_level: RecommendationLevel,
}

/// Scores how well `land` matches `requirements`.
///
/// Pure and deterministic: the same inputs always produce the same output.
pub fn score_land(land: &Land, requirements: &LandRequirements) -> SuitabilityScore {
    let mut features = Vec::new();
    let mut concerns = Vec::new();

    let size_match = size_score(land, requirements, &mut features, &mut concerns);
    let price_match = price_score(land, requirements, &mut features, &mut concerns);

    // Connectivity, blended towards 100 as importance drops
    let ci = requirements.connectivity_importance;
    let avg_connectivity = land.avg_connectivity();
    let connectivity = avg_connectivity * ci + 100.0 * (1.0 - ci);
    if avg_connectivity > 70.0 {
        features.push("Excellent connectivity".to_string());
    } else if avg_connectivity < 30.0 {
        concerns.push("Limited connectivity to major transport".to_string());
    }

    let ii = requirements.infrastructure_importance;
    let available = land.infrastructure_count();
    let infra = f64::from(available) / 3.0 * 100.0;
    let infrastructure = infra * ii + 100.0 * (1.0 - ii);
    match available {
        3 => features.push("All basic infrastructure available".to_string()),
        0 => concerns.push("No basic infrastructure available".to_string()),
        _ => {}
    }

    let location_match = match requirements.location() {
        Some(pref) if contains_ignore_case(&land.city, pref) => {
            features.push(format!("Located in preferred area: {}", land.city));
            100.0
        }
        Some(pref) if contains_ignore_case(&land.state, pref) => 70.0,
        _ => 50.0,
    };

    let land_type_match = match requirements.purpose {
        Some(purpose) if purpose == land.land_type => {
            features.push(format!("Perfect match: {} land", land.land_type));
            100.0
        }
        _ => 60.0,
    };

    let subscores = Subscores {
        size_match,
        price_match,
        connectivity,
        infrastructure,
        location_match,
        land_type_match,
    };
    let overall = subscores.weighted_total().clamp(0.0, 100.0);

    SuitabilityScore {
        overall_score: round2(overall),
        subscores: subscores.rounded(),
        matching_features: features,
        concerns,
        recommendation_level: RecommendationLevel::from_score(overall),
    }
}

fn size_score(
    land: &Land,
    requirements: &LandRequirements,
    features: &mut Vec<String>,
    concerns: &mut Vec<String>,
) -> f64 {
    let size = land.size_in_acres;
    let min = requirements.min_size;
    let above_max = requirements.max_size.is_some_and(|max| size > max);

    if size < min {
        concerns.push(format!(
            "Land is smaller than required ({} < {} acres)",
            format_quantity(size),
            format_quantity(min)
        ));
        (size / min * 100.0).max(0.0)
    } else if above_max {
        features.push(format!("Spacious land: {} acres", format_quantity(size)));
        80.0
    } else {
        features.push(format!("Perfect size match: {} acres", format_quantity(size)));
        100.0
    }
}

fn price_score(
    land: &Land,
    requirements: &LandRequirements,
    features: &mut Vec<String>,
    concerns: &mut Vec<String>,
) -> f64 {
    let price = land.total_price;
    let min = requirements.min_price;
    let max = requirements.max_price;
    let within_max = max.map_or(true, |max| price <= max);

    if price >= min && within_max {
        // Cheaper end of the budget scores higher, 80-100
        let ratio = match max {
            Some(max) if max > min => (price - min) / (max - min),
            Some(_) => 0.5,
            None => 0.0,
        };
        features.push(format!("Within budget: {}", format_rupees(price)));
        return 100.0 - ratio * 20.0;
    }

    match max {
        Some(max) if price > max => {
            concerns.push(format!(
                "Price exceeds budget ({} > {})",
                format_rupees(price),
                format_rupees(max)
            ));
            let overshoot = if max > 0.0 { price / max * 100.0 } else { f64::INFINITY };
            (100.0 - overshoot).max(0.0)
        }
        // Below the minimum: overshoot counts as the full 100
        _ => 0.0,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One listing in a ranked recommendation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLand {
    pub land_id: i64,
    pub name: String,
    pub city: String,
    pub size_in_acres: f64,
    pub total_price: f64,
    pub price_per_acre: f64,
    pub score: f64,
    pub subscores: Subscores,
    pub matching_features: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation_level: RecommendationLevel,
    pub latitude: f64,
    pub longitude: f64,
}

impl RankedLand {
    fn new(land: &Land, score: SuitabilityScore) -> Self {
        Self {
            land_id: land.id,
            name: land.name.clone(),
            city: land.city.clone(),
            size_in_acres: land.size_in_acres,
            total_price: land.total_price,
            price_per_acre: land.price_per_acre,
            score: score.overall_score,
            subscores: score.subscores,
            matching_features: score.matching_features,
            concerns: score.concerns,
            recommendation_level: score.recommendation_level,
            latitude: land.latitude,
            longitude: land.longitude,
        }
    }
}

/// Whether a listing passes the hard filters of a recommendation search
pub fn passes_hard_filters(land: &Land, requirements: &LandRequirements) -> bool {
    if land.status != LandStatus::Available {
        return false;
    }
    if requirements.purpose.is_some_and(|purpose| purpose != land.land_type) {
        return false;
    }
    match requirements.location() {
        Some(loc) => contains_ignore_case(&land.city, loc) || contains_ignore_case(&land.state, loc),
        None => true,
    }
}

/// Filters `candidates` by the hard criteria, scores the rest and returns the best `limit`.
///
/// Ties keep candidate order.
pub fn recommend_lands(
    candidates: &[Land],
    requirements: &LandRequirements,
    limit: usize,
) -> Vec<RankedLand> {
    let mut ranked: Vec<RankedLand> = candidates
        .iter()
        .filter(|land| passes_hard_filters(land, requirements))
        .map(|land| RankedLand::new(land, score_land(land, requirements)))
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

/// Number of entries in [`feature_vector`]
pub const FEATURE_COUNT: usize = 17;

fn size_category(size: f64) -> f64 {
    if size < 5.0 {
        0.0
    } else if size < 20.0 {
        1.0
    } else if size < 50.0 {
        2.0
    } else {
        3.0
    }
}

fn price_category(price: f64) -> f64 {
    if price < 500_000.0 {
        0.0
    } else if price < 2_000_000.0 {
        1.0
    } else if price < 5_000_000.0 {
        2.0
    } else {
        3.0
    }
}

/// Fixed-order numeric description of a listing used for similarity search
pub fn feature_vector(land: &Land) -> [f64; FEATURE_COUNT] {
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    let value_per_acre = if land.size_in_acres > 0.0 {
        land.total_price / land.size_in_acres
    } else {
        0.0
    };

    [
        land.size_in_acres,
        size_category(land.size_in_acres),
        land.price_per_acre,
        land.total_price,
        price_category(land.total_price),
        f64::from(land.highway_proximity_score),
        f64::from(land.metro_proximity_score),
        f64::from(land.airport_proximity_score),
        land.avg_connectivity(),
        flag(land.has_water_supply),
        flag(land.has_electricity),
        flag(land.has_road_access),
        f64::from(land.infrastructure_count()) / 3.0 * 100.0,
        f64::from(land.land_type.code()),
        land.latitude,
        land.longitude,
        value_per_acre,
    ]
}

/// Cosine similarity between two vectors; 0 when either has zero magnitude
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarLand {
    pub land_id: i64,
    pub name: String,
    pub city: String,
    /// Cosine similarity scaled to percent
    pub similarity_score: f64,
    pub size_in_acres: f64,
    pub total_price: f64,
}

/// Ranks available `candidates` (other than `target`) by similarity to `target`
pub fn similar_lands(target: &Land, candidates: &[Land], limit: usize) -> Vec<SimilarLand> {
    let reference = feature_vector(target);

    let mut similar: Vec<SimilarLand> = candidates
        .iter()
        .filter(|land| land.id != target.id && land.status == LandStatus::Available)
        .map(|land| SimilarLand {
            land_id: land.id,
            name: land.name.clone(),
            city: land.city.clone(),
            similarity_score: round2(cosine_similarity(&reference, &feature_vector(land)) * 100.0),
            size_in_acres: land.size_in_acres,
            total_price: land.total_price,
        })
        .collect();

    similar.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    similar.truncate(limit);
    similar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::land::fixtures::land;

    fn pune_requirements() -> LandRequirements {
        LandRequirements {
            purpose: Some(LandType::Agricultural),
            min_size: 10.0,
            max_size: Some(30.0),
            min_price: 2_000_000.0,
            max_price: Some(5_000_000.0),
            location_preference: Some("Pune".to_string()),
            ..LandRequirements::default()
        }
    }

    #[test]
    fn test_pune_agricultural_listing_is_recommended() {
        let listing = land(1);
        let score = score_land(&listing, &pune_requirements());

        assert_eq!(score.subscores.size_match, 100.0);
        assert!((80.0..=100.0).contains(&score.subscores.price_match));
        assert!(matches!(
            score.recommendation_level,
            RecommendationLevel::Recommended | RecommendationLevel::HighlyRecommended
        ));
        assert!(score
            .matching_features
            .contains(&"Located in preferred area: Pune".to_string()));
        assert!(score
            .matching_features
            .contains(&"Perfect match: agricultural land".to_string()));
    }

    #[test]
    fn test_price_ratio_rewards_cheaper_end_of_budget() {
        let listing = land(1);
        let score = score_land(&listing, &pune_requirements());
        // (3.0M - 2.0M) / (5.0M - 2.0M) = 1/3 -> 100 - 6.67
        assert_eq!(score.subscores.price_match, 93.33);
        assert!(score
            .matching_features
            .contains(&"Within budget: ₹3,000,000".to_string()));
    }

    #[test]
    fn test_full_connectivity_and_infrastructure_score_100() {
        let mut listing = land(1);
        listing.highway_proximity_score = 100;
        listing.metro_proximity_score = 100;
        listing.airport_proximity_score = 100;

        for importance in [0.0, 0.3, 0.5, 1.0] {
            let requirements = LandRequirements {
                connectivity_importance: importance,
                infrastructure_importance: importance,
                ..LandRequirements::default()
            };
            let score = score_land(&listing, &requirements);
            assert_eq!(score.subscores.connectivity, 100.0);
            assert_eq!(score.subscores.infrastructure, 100.0);
        }
    }

    #[test]
    fn test_size_below_minimum_is_proportional() {
        let mut listing = land(1);
        listing.size_in_acres = 5.0;
        let score = score_land(&listing, &pune_requirements());

        assert_eq!(score.subscores.size_match, 50.0);
        assert!(score.subscores.size_match < 100.0);
        assert_eq!(
            score.concerns[0],
            "Land is smaller than required (5.0 < 10.0 acres)"
        );
    }

    #[test]
    fn test_size_above_maximum_is_flat_80() {
        let mut listing = land(1);
        listing.size_in_acres = 75.0;
        let score = score_land(&listing, &pune_requirements());

        assert_eq!(score.subscores.size_match, 80.0);
        assert!(score
            .matching_features
            .contains(&"Spacious land: 75.0 acres".to_string()));
    }

    #[test]
    fn test_size_at_bounds_is_exact_match() {
        let requirements = pune_requirements();
        for size in [10.0, 20.0, 30.0] {
            let mut listing = land(1);
            listing.size_in_acres = size;
            assert_eq!(score_land(&listing, &requirements).subscores.size_match, 100.0);
        }
    }

    #[test]
    fn test_price_outside_budget_scores_zero() {
        let mut over = land(1);
        over.total_price = 6_000_000.0;
        let score = score_land(&over, &pune_requirements());
        assert_eq!(score.subscores.price_match, 0.0);
        assert_eq!(
            score.concerns,
            vec!["Price exceeds budget (₹6,000,000 > ₹5,000,000)".to_string()]
        );

        let mut under = land(2);
        under.total_price = 1_000_000.0;
        let score = score_land(&under, &pune_requirements());
        assert_eq!(score.subscores.price_match, 0.0);
        assert!(score.concerns.is_empty());
    }

    #[test]
    fn test_unbounded_budget_scores_full_price_match() {
        let score = score_land(&land(1), &LandRequirements::default());
        assert_eq!(score.subscores.price_match, 100.0);
    }

    #[test]
    fn test_equal_price_bounds_use_midpoint_ratio() {
        let requirements = LandRequirements {
            min_price: 3_000_000.0,
            max_price: Some(3_000_000.0),
            ..LandRequirements::default()
        };
        assert_eq!(score_land(&land(1), &requirements).subscores.price_match, 90.0);
    }

    #[test]
    fn test_location_falls_back_to_state_then_neutral() {
        let listing = land(1);
        let by_state = LandRequirements {
            location_preference: Some("maharashtra".to_string()),
            ..LandRequirements::default()
        };
        let nowhere = LandRequirements {
            location_preference: Some("Kerala".to_string()),
            ..LandRequirements::default()
        };
        let blank = LandRequirements {
            location_preference: Some("  ".to_string()),
            ..LandRequirements::default()
        };

        assert_eq!(score_land(&listing, &by_state).subscores.location_match, 70.0);
        assert_eq!(score_land(&listing, &nowhere).subscores.location_match, 50.0);
        assert_eq!(score_land(&listing, &blank).subscores.location_match, 50.0);
    }

    #[test]
    fn test_type_mismatch_is_partial() {
        let requirements = LandRequirements {
            purpose: Some(LandType::Commercial),
            ..LandRequirements::default()
        };
        assert_eq!(score_land(&land(1), &requirements).subscores.land_type_match, 60.0);
    }

    #[test]
    fn test_connectivity_and_infrastructure_concerns() {
        let mut listing = land(1);
        listing.highway_proximity_score = 10;
        listing.metro_proximity_score = 10;
        listing.airport_proximity_score = 10;
        listing.has_water_supply = false;
        listing.has_electricity = false;
        listing.has_road_access = false;

        let score = score_land(&listing, &LandRequirements::default());
        assert!(score
            .concerns
            .contains(&"Limited connectivity to major transport".to_string()));
        assert!(score
            .concerns
            .contains(&"No basic infrastructure available".to_string()));
        // 10 * 0.5 + 50
        assert_eq!(score.subscores.connectivity, 55.0);
        assert_eq!(score.subscores.infrastructure, 50.0);
    }

    #[test]
    fn test_score_is_bounded_and_deterministic() {
        let requirements = pune_requirements();
        let mut listing = land(3);
        for size in [0.0, 1.0, 12.0, 500.0] {
            for price in [0.0, 2_500_000.0, 90_000_000.0] {
                listing.size_in_acres = size;
                listing.total_price = price;
                let first = score_land(&listing, &requirements);
                let second = score_land(&listing, &requirements);
                assert_eq!(first, second);
                assert!((0.0..=100.0).contains(&first.overall_score));
            }
        }
    }

    #[test]
    fn test_recommendation_level_thresholds() {
        assert_eq!(RecommendationLevel::from_score(85.0), RecommendationLevel::HighlyRecommended);
        assert_eq!(RecommendationLevel::from_score(84.99), RecommendationLevel::Recommended);
        assert_eq!(RecommendationLevel::from_score(70.0), RecommendationLevel::Recommended);
        assert_eq!(RecommendationLevel::from_score(55.0), RecommendationLevel::Consider);
        assert_eq!(RecommendationLevel::from_score(54.9), RecommendationLevel::NotRecommended);
        assert_eq!(
            serde_json::to_value(RecommendationLevel::HighlyRecommended).unwrap(),
            serde_json::json!("Highly Recommended")
        );
    }

    #[test]
    fn test_recommend_lands_filters_and_ranks() {
        let mut best = land(1);
        best.highway_proximity_score = 95;
        best.metro_proximity_score = 95;
        best.airport_proximity_score = 95;

        let ok = land(2);

        let mut sold = land(3);
        sold.status = LandStatus::Sold;

        let mut wrong_type = land(4);
        wrong_type.land_type = LandType::Industrial;

        let mut elsewhere = land(5);
        elsewhere.city = "Nagpur".to_string();
        elsewhere.state = "Vidarbha".to_string();

        let candidates = vec![ok, sold, best, wrong_type, elsewhere];
        let ranked = recommend_lands(&candidates, &pune_requirements(), 10);

        let ids: Vec<i64> = ranked.iter().map(|r| r.land_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn test_recommend_lands_respects_limit() {
        let candidates: Vec<Land> = (1..=8).map(land).collect();
        let ranked = recommend_lands(&candidates, &LandRequirements::default(), 3);
        assert_eq!(ranked.len(), 3);
        // identical listings keep candidate order
        assert_eq!(ranked[0].land_id, 1);
    }

    #[test]
    fn test_feature_vector_layout() {
        let listing = land(1);
        let features = feature_vector(&listing);

        assert_eq!(features[0], 15.0);
        assert_eq!(features[1], 1.0);
        assert_eq!(features[4], 2.0);
        assert_eq!(features[12], 100.0);
        assert_eq!(features[13], 0.0);
        assert_eq!(features[16], 200_000.0);
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        let v = [1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_similar_lands_excludes_target_and_unavailable() {
        let target = land(1);
        let twin = land(2);
        let mut different = land(3);
        different.size_in_acres = 100.0;
        different.total_price = 200_000_000.0;
        different.price_per_acre = 2_000_000.0;
        let mut reserved = land(4);
        reserved.status = LandStatus::Reserved;

        let candidates = vec![target.clone(), different, twin, reserved];
        let similar = similar_lands(&target, &candidates, 5);

        let ids: Vec<i64> = similar.iter().map(|s| s.land_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(similar[0].similarity_score, 100.0);
        assert!(similar[1].similarity_score < 100.0);
    }
}
