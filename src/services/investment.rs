//! Rule-based development recommendations for investors.
//!
//! Each development use case is scored out of 100 from five capped
//! components: size (20), connectivity (30), nearby infrastructure (25),
//! government projects (15) and market conditions (10).

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::{
    format_quantity, round2, DevelopmentUseCase, GovernmentProject, InfraType, Infrastructure,
    Land, LandRecommendation, NewLandRecommendation, ProjectType,
};
use crate::store::Store;

/// Use cases scoring below this are not recommended
pub const MIN_SCORE: f64 = 30.0;
/// Recommendations kept per land
pub const MAX_RECOMMENDATIONS: usize = 5;
/// Radius for the nearby infrastructure count
pub const NEARBY_RADIUS_KM: f64 = 5.0;

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two coordinates in kilometres
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Per-type points for infrastructure near a land, by use case
fn infrastructure_points(use_case: &str, infra_type: InfraType) -> f64 {
    use InfraType::*;
    let points = match (use_case, infra_type) {
        ("residential", School) => 3,
        ("residential", College) => 2,
        ("residential", Hospital) => 4,
        ("residential", Mall) => 3,
        ("residential", Metro) => 5,
        ("commercial", Metro) => 5,
        ("commercial", Mall) => 4,
        ("commercial", ItPark) => 3,
        ("commercial", Highway) => 4,
        ("industrial", Highway) => 5,
        ("industrial", Railway) => 4,
        ("industrial", Sez) => 3,
        ("industrial", Industrial) => 3,
        ("it_park", Metro) => 5,
        ("it_park", Airport) => 4,
        ("it_park", Residential) => 3,
        ("it_park", College) => 3,
        ("education", Residential) => 4,
        ("education", Metro) => 3,
        ("education", College) => 2,
        ("education", Hospital) => 2,
        ("hospitality", Airport) => 5,
        ("hospitality", Metro) => 4,
        ("hospitality", Mall) => 3,
        ("hospitality", Highway) => 3,
        ("logistics", Highway) => 5,
        ("logistics", Railway) => 5,
        ("logistics", Airport) => 4,
        ("logistics", Industrial) => 3,
        _ => 1,
    };
    f64::from(points)
}

/// Whether a government project type directly benefits a use case
fn project_matches(use_case: &str, project_type: ProjectType) -> bool {
    matches!(
        (use_case, project_type),
        ("residential", ProjectType::Metro | ProjectType::SmartCity)
            | ("industrial", ProjectType::Sez | ProjectType::IndustrialPark)
            | ("logistics", ProjectType::Highway | ProjectType::Port)
    )
}

fn city_growth_multiplier(city: &str) -> f64 {
    match city.trim().to_lowercase().as_str() {
        "mumbai" | "delhi" => 1.2,
        "bangalore" => 1.3,
        "pune" | "chennai" => 1.1,
        "hyderabad" => 1.15,
        _ => 1.0,
    }
}

/// Component scores of one use case
#[derive(Debug, Clone, PartialEq)]
pub struct UseCaseScore {
    pub size: f64,
    pub connectivity: f64,
    pub infrastructure: f64,
    pub government: f64,
    pub market: f64,
    pub reasoning: Vec<String>,
}

impl UseCaseScore {
    pub fn total(&self) -> f64 {
        self.size + self.connectivity + self.infrastructure + self.government + self.market
    }
}

/// Scores every use case for one land against the reference data of its city
pub struct InvestmentAnalyzer<'a> {
    land: &'a Land,
    /// Infrastructure in the land's city
    infrastructure: &'a [Infrastructure],
    /// Not-yet-completed projects in the land's city
    active_projects: Vec<&'a GovernmentProject>,
    nearby: HashMap<InfraType, usize>,
}

impl<'a> InvestmentAnalyzer<'a> {
    pub fn new(
        land: &'a Land,
        infrastructure: &'a [Infrastructure],
        projects: &'a [GovernmentProject],
    ) -> Self {
        let mut nearby = HashMap::new();
        for infra in infrastructure {
            if haversine_km(land.latitude, land.longitude, infra.latitude, infra.longitude)
                <= NEARBY_RADIUS_KM
            {
                *nearby.entry(infra.infra_type).or_insert(0) += 1;
            }
        }

        Self {
            land,
            infrastructure,
            active_projects: projects.iter().filter(|p| p.status.is_active()).collect(),
            nearby,
        }
    }

    pub fn score(&self, use_case: &DevelopmentUseCase) -> UseCaseScore {
        let land = self.land;
        let name = use_case.name.as_str();
        let mut reasoning = Vec::new();

        let size = if land.size_in_acres >= use_case.min_size_acres {
            reasoning.push(format!(
                "Land size ({} acres) is suitable",
                format_quantity(land.size_in_acres)
            ));
            if use_case.min_size_acres > 0.0 {
                (land.size_in_acres / use_case.min_size_acres * 10.0).min(20.0)
            } else {
                20.0
            }
        } else {
            reasoning.push(format!(
                "Land size too small (needs {} acres)",
                format_quantity(use_case.min_size_acres)
            ));
            0.0
        };

        let highway = f64::from(land.highway_proximity_score);
        let metro = f64::from(land.metro_proximity_score);
        let airport = f64::from(land.airport_proximity_score);
        let connectivity = match name {
            "logistics" | "industrial" => highway * 0.3,
            "residential" | "commercial" | "it_park" => metro * 0.15 + airport * 0.1 + highway * 0.05,
            "hospitality" | "mixed" => (metro + airport + highway) * 0.1,
            _ => 0.0,
        }
        .min(30.0);
        if connectivity > 20.0 {
            reasoning.push("Excellent connectivity".to_string());
        }

        let infrastructure = self
            .nearby
            .iter()
            .map(|(&infra_type, &count)| count.min(3) as f64 * infrastructure_points(name, infra_type))
            .sum::<f64>()
            .min(25.0);
        if infrastructure > 15.0 {
            reasoning.push("Strong infrastructure nearby".to_string());
        }

        let government = self
            .active_projects
            .iter()
            .filter(|p| {
                haversine_km(land.latitude, land.longitude, p.latitude, p.longitude) <= p.radius_km
            })
            .map(|p| if project_matches(name, p.project_type) { 5.0 } else { 2.0 })
            .sum::<f64>()
            .min(15.0);
        if government > 10.0 {
            reasoning.push("Upcoming government projects will boost value".to_string());
        }

        let market = (8.0 * city_growth_multiplier(&land.city)).min(10.0);

        UseCaseScore {
            size,
            connectivity,
            infrastructure,
            government,
            market,
            reasoning,
        }
    }

    fn pros(&self, use_case: &DevelopmentUseCase) -> Vec<String> {
        let land = self.land;
        let mut pros = Vec::new();
        if land.highway_proximity_score > 70 {
            pros.push("Excellent highway connectivity".to_string());
        }
        if land.metro_proximity_score > 70 {
            pros.push("Near metro station".to_string());
        }
        if land.has_water_supply {
            pros.push("Water supply available".to_string());
        }
        if land.has_electricity {
            pros.push("Electricity connection available".to_string());
        }
        if use_case.name == "residential" {
            let schools = self
                .infrastructure
                .iter()
                .filter(|i| i.infra_type == InfraType::School)
                .count();
            if schools > 5 {
                pros.push("Multiple schools in vicinity".to_string());
            }
        }
        pros
    }

    fn cons(&self, use_case: &DevelopmentUseCase) -> Vec<String> {
        let land = self.land;
        let mut cons = Vec::new();
        if !land.has_water_supply {
            cons.push("Water supply not available".to_string());
        }
        if land.size_in_acres < use_case.min_size_acres * 1.5 {
            cons.push("Limited space for expansion".to_string());
        }
        if land.highway_proximity_score < 30 {
            cons.push("Far from major highways".to_string());
        }
        cons
    }

    /// `{within_5km: {type: count}, total_count}`
    pub fn nearby_summary(&self) -> Value {
        let within: BTreeMap<&str, usize> = self
            .nearby
            .iter()
            .map(|(infra_type, &count)| (infra_type.as_str(), count))
            .collect();
        json!({
            "within_5km": within,
            "total_count": self.nearby.values().sum::<usize>(),
        })
    }

    /// Up to five active city projects
    pub fn projects_impact(&self) -> Value {
        let projects: Vec<Value> = self
            .active_projects
            .iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|p| {
                json!({
                    "name": p.name,
                    "type": p.project_type.display_name(),
                    "status": p.status.display_name(),
                    "expected_appreciation": p.expected_land_appreciation.unwrap_or(0.0),
                })
            })
            .collect();
        Value::Array(projects)
    }

    /// Ranked recommendations for the use cases scoring at least [`MIN_SCORE`]
    pub fn recommend(&self, use_cases: &[DevelopmentUseCase]) -> Vec<NewLandRecommendation> {
        let mut scored: Vec<(&DevelopmentUseCase, UseCaseScore)> = use_cases
            .iter()
            .map(|uc| (uc, self.score(uc)))
            .filter(|(_, score)| score.total() >= MIN_SCORE)
            .collect();
        scored.sort_by(|a, b| b.1.total().total_cmp(&a.1.total()));
        scored.truncate(MAX_RECOMMENDATIONS);

        let nearby = self.nearby_summary();
        let impact = self.projects_impact();

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (use_case, score))| {
                let total = score.total();
                let base_roi = (use_case.typical_roi_min + use_case.typical_roi_max) / 2.0;
                NewLandRecommendation {
                    use_case_id: use_case.id,
                    use_case_name: use_case.display_name.clone(),
                    confidence_score: round2(total),
                    predicted_roi: round2(base_roi * (total / 100.0) * 1.2),
                    predicted_appreciation_5yr: round2(30.0 + total / 100.0 * 20.0),
                    reasoning: score.reasoning.join(" | "),
                    pros: self.pros(use_case),
                    cons: self.cons(use_case),
                    nearby_infrastructure: nearby.clone(),
                    govt_projects_impact: impact.clone(),
                    rank: i as i32 + 1,
                }
            })
            .collect()
    }
}

/// Recomputes and stores the investor recommendations for `land`
pub async fn refresh_recommendations(
    store: &dyn Store,
    land: &Land,
) -> AppResult<Vec<LandRecommendation>> {
    let use_cases = store.list_use_cases().await?;
    let infrastructure = store.list_infrastructure(Some(land.city.clone())).await?;
    let projects = store.list_government_projects(Some(land.city.clone())).await?;

    let recommendations =
        InvestmentAnalyzer::new(land, &infrastructure, &projects).recommend(&use_cases);

    tracing::info!(
        land_id = land.id,
        use_cases = use_cases.len(),
        recommended = recommendations.len(),
        "Investment recommendations generated"
    );

    store
        .replace_land_recommendations(land.id, recommendations)
        .await
}
