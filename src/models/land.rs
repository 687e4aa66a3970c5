use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::round2;

text_enum! {
    /// Zoning category of a listing
    pub enum LandType {
        Agricultural => "agricultural",
        Residential => "residential",
        Commercial => "commercial",
        Industrial => "industrial",
        Mixed => "mixed",
    }
}

impl LandType {
    /// Stable numeric code used in similarity feature vectors
    pub fn code(&self) -> u8 {
        match self {
            LandType::Agricultural => 0,
            LandType::Residential => 1,
            LandType::Commercial => 2,
            LandType::Industrial => 3,
            LandType::Mixed => 4,
        }
    }
}

text_enum! {
    /// Sale status of a listing
    pub enum LandStatus {
        Available => "available",
        Sold => "sold",
        Pending => "pending",
        Reserved => "reserved",
    }
}

impl Default for LandStatus {
    fn default() -> Self {
        LandStatus::Available
    }
}

/// A land listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Land {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub land_type: LandType,
    #[sqlx(try_from = "String")]
    pub status: LandStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub size_in_acres: f64,
    pub price_per_acre: f64,
    pub total_price: f64,
    pub highway_proximity_score: i32,
    pub metro_proximity_score: i32,
    pub airport_proximity_score: i32,
    pub has_water_supply: bool,
    pub has_electricity: bool,
    pub has_road_access: bool,
    pub owner_id: i64,
    pub slug: String,
    pub is_featured: bool,
    pub views_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Land {
    /// Mean of the three proximity scores
    pub fn avg_connectivity(&self) -> f64 {
        (self.highway_proximity_score + self.metro_proximity_score + self.airport_proximity_score)
            as f64
            / 3.0
    }

    /// Number of basic infrastructure flags set (0-3)
    pub fn infrastructure_count(&self) -> u8 {
        [
            self.has_water_supply,
            self.has_electricity,
            self.has_road_access,
        ]
        .iter()
        .filter(|available| **available)
        .count() as u8
    }

    /// Human-readable names of available infrastructure
    pub fn infrastructure_available(&self) -> Vec<&'static str> {
        let mut available = Vec::new();
        if self.has_water_supply {
            available.push("Water Supply");
        }
        if self.has_electricity {
            available.push("Electricity");
        }
        if self.has_road_access {
            available.push("Road Access");
        }
        available
    }

    /// Whether `total_price` is within 1% of `size × price_per_acre`.
    ///
    /// Listings may carry a negotiated total, so this is only ever reported, never enforced.
    pub fn total_price_consistent(&self) -> bool {
        price_consistent(self.size_in_acres, self.price_per_acre, self.total_price)
    }

    /// Rounded average connectivity for API responses
    pub fn avg_connectivity_rounded(&self) -> f64 {
        round2(self.avg_connectivity())
    }
}

pub(crate) fn price_consistent(size: f64, price_per_acre: f64, total_price: f64) -> bool {
    let expected = size * price_per_acre;
    if expected == 0.0 {
        return total_price == 0.0;
    }
    ((total_price - expected) / expected).abs() <= 0.01
}

/// Payload for a new listing; the owner comes from the caller
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewLand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub land_type: LandType,
    #[serde(default)]
    pub status: LandStatus,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    pub size_in_acres: f64,
    pub price_per_acre: f64,
    /// Defaults to `size_in_acres × price_per_acre` when omitted
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub highway_proximity_score: i32,
    #[serde(default)]
    pub metro_proximity_score: i32,
    #[serde(default)]
    pub airport_proximity_score: i32,
    #[serde(default)]
    pub has_water_supply: bool,
    #[serde(default)]
    pub has_electricity: bool,
    #[serde(default = "default_true")]
    pub has_road_access: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

impl NewLand {
    pub fn resolved_total_price(&self) -> f64 {
        self.total_price
            .unwrap_or(self.size_in_acres * self.price_per_acre)
    }
}

/// Partial update of a listing; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LandUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub land_type: Option<LandType>,
    pub status: Option<LandStatus>,
    pub size_in_acres: Option<f64>,
    pub price_per_acre: Option<f64>,
    pub total_price: Option<f64>,
    pub highway_proximity_score: Option<i32>,
    pub metro_proximity_score: Option<i32>,
    pub airport_proximity_score: Option<i32>,
    pub has_water_supply: Option<bool>,
    pub has_electricity: Option<bool>,
    pub has_road_access: Option<bool>,
    pub is_featured: Option<bool>,
}

impl LandUpdate {
    /// Applies the update in place, bumping `updated_at`
    pub fn apply(&self, land: &mut Land) {
        if let Some(name) = &self.name {
            land.name = name.clone();
        }
        if let Some(description) = &self.description {
            land.description = description.clone();
        }
        if let Some(land_type) = self.land_type {
            land.land_type = land_type;
        }
        if let Some(status) = self.status {
            land.status = status;
        }
        if let Some(size) = self.size_in_acres {
            land.size_in_acres = size;
        }
        if let Some(price) = self.price_per_acre {
            land.price_per_acre = price;
        }
        if let Some(total) = self.total_price {
            land.total_price = total;
        }
        if let Some(score) = self.highway_proximity_score {
            land.highway_proximity_score = score;
        }
        if let Some(score) = self.metro_proximity_score {
            land.metro_proximity_score = score;
        }
        if let Some(score) = self.airport_proximity_score {
            land.airport_proximity_score = score;
        }
        if let Some(flag) = self.has_water_supply {
            land.has_water_supply = flag;
        }
        if let Some(flag) = self.has_electricity {
            land.has_electricity = flag;
        }
        if let Some(flag) = self.has_road_access {
            land.has_road_access = flag;
        }
        if let Some(flag) = self.is_featured {
            land.is_featured = flag;
        }
        land.updated_at = Utc::now();
    }
}

/// Listing query used by both the CRUD list and recommendation candidate selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandFilter {
    pub status: Option<LandStatus>,
    pub land_type: Option<LandType>,
    /// Case-insensitive substring of city OR state
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub featured: Option<bool>,
    pub exclude_id: Option<i64>,
}

impl LandFilter {
    pub fn available() -> Self {
        Self {
            status: Some(LandStatus::Available),
            ..Self::default()
        }
    }

    /// In-process evaluation, mirrors the SQL built by the Postgres store
    pub fn matches(&self, land: &Land) -> bool {
        if self.status.is_some_and(|s| s != land.status) {
            return false;
        }
        if self.land_type.is_some_and(|t| t != land.land_type) {
            return false;
        }
        if let Some(location) = &self.location {
            let needle = location.to_lowercase();
            if !land.city.to_lowercase().contains(&needle)
                && !land.state.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !land.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(state) = &self.state {
            if !land.state.eq_ignore_ascii_case(state) {
                return false;
            }
        }
        if self.featured.is_some_and(|f| f != land.is_featured) {
            return false;
        }
        if self.exclude_id == Some(land.id) {
            return false;
        }
        true
    }
}

/// Lower-cases and hyphenates a name into a URL slug
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("land");
    }
    slug
}

/// Appends `-1`, `-2`, … to `base` until `taken` reports a free slug
pub fn unique_slug(base: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    let mut slug = base.to_string();
    let mut counter = 1;
    while taken(&slug) {
        slug = format!("{}-{}", base, counter);
        counter += 1;
    }
    slug
}


#[cfg(test)]
mod tests {
    use super::fixtures::land;
    use super::*;

    #[test]
    fn test_avg_connectivity_and_infrastructure() {
        let mut l = land(1);
        l.highway_proximity_score = 90;
        l.metro_proximity_score = 60;
        l.airport_proximity_score = 30;
        l.has_electricity = false;

        assert_eq!(l.avg_connectivity(), 60.0);
        assert_eq!(l.infrastructure_count(), 2);
        assert_eq!(l.infrastructure_available(), vec!["Water Supply", "Road Access"]);
    }

    #[test]
    fn test_total_price_consistency_is_reported_not_enforced() {
        let mut l = land(1);
        assert!(l.total_price_consistent());

        l.total_price = 2_500_000.0;
        assert!(!l.total_price_consistent());
    }

    #[test]
    fn test_filter_location_matches_city_or_state() {
        let l = land(1);
        let by_city = LandFilter {
            location: Some("pun".to_string()),
            ..LandFilter::default()
        };
        let by_state = LandFilter {
            location: Some("MAHA".to_string()),
            ..LandFilter::default()
        };
        let elsewhere = LandFilter {
            location: Some("Goa".to_string()),
            ..LandFilter::default()
        };

        assert!(by_city.matches(&l));
        assert!(by_state.matches(&l));
        assert!(!elsewhere.matches(&l));
    }

    #[test]
    fn test_filter_status_type_and_exclusion() {
        let mut l = land(7);
        assert!(LandFilter::available().matches(&l));

        l.status = LandStatus::Sold;
        assert!(!LandFilter::available().matches(&l));

        let typed = LandFilter {
            land_type: Some(LandType::Industrial),
            ..LandFilter::default()
        };
        assert!(!typed.matches(&l));

        let excluding = LandFilter {
            exclude_id: Some(7),
            ..LandFilter::default()
        };
        assert!(!excluding.matches(&l));
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut l = land(1);
        let update = LandUpdate {
            status: Some(LandStatus::Reserved),
            metro_proximity_score: Some(99),
            ..LandUpdate::default()
        };
        update.apply(&mut l);

        assert_eq!(l.status, LandStatus::Reserved);
        assert_eq!(l.metro_proximity_score, 99);
        assert_eq!(l.name, "Green Valley Farm 1");
    }

    #[test]
    fn test_new_land_defaults() {
        let new_land: NewLand = serde_json::from_value(serde_json::json!({
            "name": "River View Plots",
            "land_type": "residential",
            "latitude": 19.07,
            "longitude": 72.87,
            "city": "Mumbai",
            "state": "Maharashtra",
            "size_in_acres": 4.0,
            "price_per_acre": 500000.0
        }))
        .unwrap();

        assert_eq!(new_land.status, LandStatus::Available);
        assert!(new_land.has_road_access);
        assert!(!new_land.has_water_supply);
        assert_eq!(new_land.resolved_total_price(), 2_000_000.0);
    }

    #[test]
    fn test_slugify_and_unique_slug() {
        assert_eq!(slugify("Green Valley Farm 12"), "green-valley-farm-12");
        assert_eq!(slugify("  Sunset -- Hills! "), "sunset-hills");
        assert_eq!(slugify("!!!"), "land");

        let taken = ["plot", "plot-1"];
        assert_eq!(unique_slug("plot", |s| taken.contains(&s)), "plot-2");
        assert_eq!(unique_slug("field", |s| taken.contains(&s)), "field");
    }
}
