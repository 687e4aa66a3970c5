use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

text_enum! {
    /// Category of a point of interest near listings
    pub enum InfraType {
        School => "school",
        College => "college",
        Hospital => "hospital",
        Mall => "mall",
        Metro => "metro",
        Highway => "highway",
        Railway => "railway",
        Airport => "airport",
        Sez => "sez",
        Industrial => "industrial",
        ItPark => "it_park",
        Residential => "residential",
    }
}

text_enum! {
    pub enum ProjectType {
        Metro => "metro",
        SmartCity => "smart_city",
        Sez => "sez",
        IndustrialPark => "industrial_park",
        Highway => "highway",
        Port => "port",
        Airport => "airport",
        Other => "other",
    }
}

impl ProjectType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectType::Metro => "Metro Line",
            ProjectType::SmartCity => "Smart City",
            ProjectType::Sez => "Special Economic Zone",
            ProjectType::IndustrialPark => "Industrial Park",
            ProjectType::Highway => "Highway",
            ProjectType::Port => "Port",
            ProjectType::Airport => "Airport",
            ProjectType::Other => "Other",
        }
    }
}

text_enum! {
    pub enum ProjectStatus {
        Announced => "announced",
        Planned => "planned",
        UnderConstruction => "under_construction",
        Completed => "completed",
    }
}

impl ProjectStatus {
    /// Projects that have not yet delivered their uplift
    pub fn is_active(&self) -> bool {
        !matches!(self, ProjectStatus::Completed)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectStatus::Announced => "Announced",
            ProjectStatus::Planned => "Planned",
            ProjectStatus::UnderConstruction => "Under Construction",
            ProjectStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Infrastructure {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub infra_type: InfraType,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub is_operational: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewInfrastructure {
    pub name: String,
    pub infra_type: InfraType,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    #[serde(default = "default_operational")]
    pub is_operational: bool,
}

fn default_operational() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct GovernmentProject {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub project_type: ProjectType,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub city: String,
    /// Expected land appreciation in percent
    pub expected_land_appreciation: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewGovernmentProject {
    pub name: String,
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub city: String,
    #[serde(default)]
    pub expected_land_appreciation: Option<f64>,
}

/// A development category with its size and return parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct DevelopmentUseCase {
    pub id: i64,
    /// Slug such as `residential` or `it_park`; the scoring tables key on it
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub min_size_acres: f64,
    pub typical_roi_min: f64,
    pub typical_roi_max: f64,
    pub typical_payback_years: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewDevelopmentUseCase {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub min_size_acres: f64,
    pub typical_roi_min: f64,
    pub typical_roi_max: f64,
    pub typical_payback_years: f64,
}

/// A persisted investor recommendation for one use case on one land
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LandRecommendation {
    pub id: i64,
    pub land_id: i64,
    pub use_case_id: i64,
    pub use_case_name: String,
    pub confidence_score: f64,
    pub predicted_roi: f64,
    pub predicted_appreciation_5yr: f64,
    pub reasoning: String,
    #[sqlx(json)]
    pub pros: Vec<String>,
    #[sqlx(json)]
    pub cons: Vec<String>,
    #[sqlx(json)]
    pub nearby_infrastructure: Value,
    #[sqlx(json)]
    pub govt_projects_impact: Value,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewLandRecommendation {
    pub use_case_id: i64,
    pub use_case_name: String,
    pub confidence_score: f64,
    pub predicted_roi: f64,
    pub predicted_appreciation_5yr: f64,
    pub reasoning: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub nearby_infrastructure: Value,
    pub govt_projects_impact: Value,
    pub rank: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_status_activity() {
        assert!(ProjectStatus::Announced.is_active());
        assert!(ProjectStatus::UnderConstruction.is_active());
        assert!(!ProjectStatus::Completed.is_active());
    }

    #[test]
    fn test_infra_type_wire_names() {
        assert_eq!(InfraType::ItPark.as_str(), "it_park");
        let parsed: InfraType = serde_json::from_str(r#""sez""#).unwrap();
        assert_eq!(parsed, InfraType::Sez);
    }
}
