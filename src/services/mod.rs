pub mod crops;
pub mod investment;
pub mod land_scoring;
pub mod land_search;
pub mod seed;

pub use crops::CropRecommender;
pub use land_scoring::{LandRequirements, RankedLand, SimilarLand, SuitabilityScore};
