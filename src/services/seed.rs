//! Sample data for local runs and demos.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{AppError, AppResult};
use crate::models::{
    InfraType, LandStatus, LandType, NewDevelopmentUseCase, NewGovernmentProject,
    NewInfrastructure, NewLand, NewUser, ProjectStatus, ProjectType, UserType,
};
use crate::store::Store;

pub const SAMPLE_LAND_COUNT: usize = 30;
const SEED: u64 = 42;

struct City {
    name: &'static str,
    latitude: f64,
    longitude: f64,
}

const CITIES: [City; 5] = [
    City { name: "Pune", latitude: 18.5204, longitude: 73.8567 },
    City { name: "Mumbai", latitude: 19.0760, longitude: 72.8777 },
    City { name: "Nashik", latitude: 19.9975, longitude: 73.7898 },
    City { name: "Aurangabad", latitude: 19.8762, longitude: 75.3433 },
    City { name: "Nagpur", latitude: 21.1458, longitude: 79.0882 },
];

const STATE: &str = "Maharashtra";

const LAND_NAMES: [&str; 24] = [
    "Green Valley Farm",
    "Sunrise Orchards",
    "Golden Fields Estate",
    "River View Plots",
    "Hilltop Paradise",
    "Meadow Gardens",
    "Royal Farms",
    "Paradise Valley",
    "Emerald Lands",
    "Crystal Waters Estate",
    "Sunset Hills",
    "Peaceful Acres",
    "Silver Oak Farm",
    "Diamond Plains",
    "Nature Bounty",
    "Heritage Lands",
    "Prosperity Fields",
    "Rainbow Meadows",
    "Dream Valley",
    "Fortune Farms",
    "Blissful Acres",
    "Harmony Gardens",
    "Victory Fields",
    "Serenity Estate",
];

const SIZES: [u32; 11] = [2, 5, 10, 15, 20, 25, 30, 40, 50, 75, 100];
const PRICES_PER_ACRE: [u32; 7] = [200_000, 300_000, 500_000, 800_000, 1_000_000, 1_500_000, 2_000_000];

/// Counts of what a seeding run inserted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub use_cases: usize,
    pub infrastructure: usize,
    pub government_projects: usize,
    pub lands: usize,
}

/// Seeds an empty store; returns `None` when listings already exist
pub async fn seed_if_empty(store: &dyn Store) -> AppResult<Option<SeedSummary>> {
    let existing = store.count_lands().await?;
    if existing > 0 {
        tracing::info!(lands = existing, "Store already populated, skipping seed");
        return Ok(None);
    }

    let summary = seed(store).await?;
    tracing::info!(
        use_cases = summary.use_cases,
        infrastructure = summary.infrastructure,
        government_projects = summary.government_projects,
        lands = summary.lands,
        "Seeded sample data"
    );
    Ok(Some(summary))
}

async fn seed(store: &dyn Store) -> AppResult<SeedSummary> {
    let admin = match store.get_user_by_username("admin".to_string()).await? {
        Some(user) => user,
        None => {
            store
                .create_user(NewUser {
                    username: "admin".to_string(),
                    email: "admin@agriwise.com".to_string(),
                    user_type: UserType::Admin,
                    ..NewUser::default()
                })
                .await?
        }
    };

    let mut summary = SeedSummary::default();

    for use_case in default_use_cases() {
        match store.create_use_case(use_case).await {
            Ok(_) => summary.use_cases += 1,
            // already present from an earlier run
            Err(AppError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if store.list_infrastructure(None).await?.is_empty() {
        for infra in sample_infrastructure() {
            store.create_infrastructure(infra).await?;
            summary.infrastructure += 1;
        }
    }

    if store.list_government_projects(None).await?.is_empty() {
        for project in sample_government_projects() {
            store.create_government_project(project).await?;
            summary.government_projects += 1;
        }
    }

    for land in sample_lands() {
        store.create_land(admin.id, land).await?;
        summary.lands += 1;
    }

    Ok(summary)
}

fn use_case(
    name: &str,
    display_name: &str,
    description: &str,
    min_size_acres: f64,
    roi: (f64, f64),
    payback_years: f64,
) -> NewDevelopmentUseCase {
    NewDevelopmentUseCase {
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        min_size_acres,
        typical_roi_min: roi.0,
        typical_roi_max: roi.1,
        typical_payback_years: payback_years,
    }
}

pub fn default_use_cases() -> Vec<NewDevelopmentUseCase> {
    vec![
        use_case("residential", "Residential Township", "Housing societies and gated communities", 2.0, (12.0, 18.0), 6.0),
        use_case("commercial", "Commercial Complex", "Retail, offices and mixed commercial space", 1.0, (15.0, 22.0), 5.0),
        use_case("industrial", "Industrial Unit", "Manufacturing and processing facilities", 10.0, (10.0, 16.0), 8.0),
        use_case("it_park", "IT Park", "Technology campus and office parks", 5.0, (18.0, 25.0), 7.0),
        use_case("education", "Educational Institution", "Schools, colleges and training centres", 3.0, (8.0, 12.0), 10.0),
        use_case("hospitality", "Hotel & Resort", "Hotels, resorts and convention venues", 2.0, (14.0, 20.0), 7.0),
        use_case("logistics", "Logistics Hub", "Warehousing and distribution centres", 5.0, (12.0, 18.0), 6.0),
        use_case("mixed", "Mixed-Use Development", "Combined residential and commercial development", 5.0, (14.0, 20.0), 7.0),
    ]
}

fn infra(name: &str, infra_type: InfraType, latitude: f64, longitude: f64, city: &str) -> NewInfrastructure {
    NewInfrastructure {
        name: name.to_string(),
        infra_type,
        latitude,
        longitude,
        city: city.to_string(),
        is_operational: true,
    }
}

pub fn sample_infrastructure() -> Vec<NewInfrastructure> {
    vec![
        infra("Pune Railway Station", InfraType::Railway, 18.5289, 73.8744, "Pune"),
        infra("Pune International Airport", InfraType::Airport, 18.5822, 73.9197, "Pune"),
        infra("Civil Court Metro Station", InfraType::Metro, 18.5286, 73.8553, "Pune"),
        infra("Ruby Hall Clinic", InfraType::Hospital, 18.5335, 73.8773, "Pune"),
        infra("Phoenix Marketcity Pune", InfraType::Mall, 18.5623, 73.9167, "Pune"),
        infra("Fergusson College", InfraType::College, 18.5236, 73.8404, "Pune"),
        infra("Hinjewadi IT Park", InfraType::ItPark, 18.5913, 73.7389, "Pune"),
        infra("Mumbai-Pune Expressway", InfraType::Highway, 18.6298, 73.7997, "Pune"),
        infra("Chhatrapati Shivaji Terminus", InfraType::Railway, 18.9398, 72.8355, "Mumbai"),
        infra("Mumbai International Airport", InfraType::Airport, 19.0896, 72.8656, "Mumbai"),
        infra("Andheri Metro Station", InfraType::Metro, 19.1197, 72.8468, "Mumbai"),
        infra("SEEPZ SEZ", InfraType::Sez, 19.1273, 72.8731, "Mumbai"),
        infra("Nashik Road Station", InfraType::Railway, 19.9473, 73.8418, "Nashik"),
        infra("Satpur MIDC", InfraType::Industrial, 20.0036, 73.7434, "Nashik"),
        infra("Aurangabad Airport", InfraType::Airport, 19.8627, 75.3981, "Aurangabad"),
        infra("Waluj MIDC", InfraType::Industrial, 19.8441, 75.2356, "Aurangabad"),
        infra("Nagpur Airport", InfraType::Airport, 21.0922, 79.0472, "Nagpur"),
        infra("MIHAN SEZ", InfraType::Sez, 21.0561, 79.0575, "Nagpur"),
    ]
}

pub fn sample_government_projects() -> Vec<NewGovernmentProject> {
    let project = |name: &str, project_type, status, latitude, longitude, radius_km, city: &str, appreciation| {
        NewGovernmentProject {
            name: String::from(name),
            project_type,
            status,
            latitude,
            longitude,
            radius_km,
            city: city.to_string(),
            expected_land_appreciation: Some(appreciation),
        }
    };
    vec![
        project("Pune Metro Line 3", ProjectType::Metro, ProjectStatus::UnderConstruction, 18.5679, 73.7708, 15.0, "Pune", 25.0),
        project("Pune Ring Road", ProjectType::Highway, ProjectStatus::Planned, 18.5204, 73.8567, 30.0, "Pune", 20.0),
        project("Navi Mumbai Airport", ProjectType::Airport, ProjectStatus::UnderConstruction, 18.9912, 73.0702, 25.0, "Mumbai", 30.0),
        project("Nashik Smart City", ProjectType::SmartCity, ProjectStatus::Announced, 19.9975, 73.7898, 20.0, "Nashik", 15.0),
        project("Aurangabad Industrial City", ProjectType::IndustrialPark, ProjectStatus::UnderConstruction, 19.8420, 75.4700, 25.0, "Aurangabad", 22.0),
        project("Samruddhi Expressway", ProjectType::Highway, ProjectStatus::Completed, 21.1000, 79.1500, 20.0, "Nagpur", 18.0),
    ]
}

/// Connectivity score ranges (highway, metro, airport) by land type
fn connectivity_ranges(land_type: LandType) -> [(i32, i32); 3] {
    match land_type {
        LandType::Commercial | LandType::Residential => [(60, 95), (50, 90), (40, 85)],
        LandType::Agricultural => [(30, 70), (20, 60), (10, 50)],
        LandType::Industrial | LandType::Mixed => [(50, 85), (40, 75), (30, 70)],
    }
}

/// Thirty listings; identical on every call
pub fn sample_lands() -> Vec<NewLand> {
    let mut rng = StdRng::seed_from_u64(SEED);

    (0..SAMPLE_LAND_COUNT)
        .map(|i| {
            let city = &CITIES[rng.gen_range(0..CITIES.len())];
            let land_type = LandType::ALL[i % LandType::ALL.len()];

            let latitude = round6(city.latitude + rng.gen_range(-0.5..=0.5));
            let longitude = round6(city.longitude + rng.gen_range(-0.5..=0.5));

            let size = f64::from(*SIZES.choose(&mut rng).unwrap_or(&SIZES[0]));
            let price_per_acre =
                f64::from(*PRICES_PER_ACRE.choose(&mut rng).unwrap_or(&PRICES_PER_ACRE[0]));

            let [highway, metro, airport] =
                connectivity_ranges(land_type).map(|(lo, hi)| rng.gen_range(lo..=hi));

            let name = format!(
                "{} {}",
                LAND_NAMES.choose(&mut rng).unwrap_or(&LAND_NAMES[0]),
                i + 1
            );

            NewLand {
                description: format!(
                    "Beautiful {} land with great potential. Located in {}, this {} acre property offers excellent opportunities for development.",
                    land_type, city.name, size
                ),
                name,
                land_type,
                status: LandStatus::Available,
                latitude,
                longitude,
                address: format!("Survey No. {}, {}", rng.gen_range(100..1000), city.name),
                city: city.name.to_string(),
                state: STATE.to_string(),
                pincode: rng.gen_range(400_000..500_000).to_string(),
                size_in_acres: size,
                price_per_acre,
                total_price: Some(size * price_per_acre),
                highway_proximity_score: highway,
                metro_proximity_score: metro,
                airport_proximity_score: airport,
                has_water_supply: rng.gen_bool(0.75),
                has_electricity: rng.gen_bool(0.75),
                has_road_access: rng.gen_bool(0.8),
                is_featured: rng.gen_bool(1.0 / 3.0),
            }
        })
        .collect()
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
