//! Persistence boundary.
//!
//! Handlers and services talk to a `dyn Store`. [`PgStore`] backs the running
//! server; [`MemoryStore`] keeps everything in process for tests and local demos.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    CropRecommendationRecord, CropStats, DevelopmentUseCase, GovernmentProject, Infrastructure,
    Land, LandFilter, LandRecommendation, LandUpdate, NewCropRecommendation,
    NewDevelopmentUseCase, NewGovernmentProject, NewInfrastructure, NewLand,
    NewLandRecommendation, NewSoilData, NewUser, NewUserQuery, SavedLand, SavedLandEntry,
    SoilData, User, UserUpdate,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Number of most-recommended crops reported in statistics
pub const TOP_CROPS: usize = 5;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: String) -> AppResult<Option<User>>;
    async fn update_user(&self, id: i64, update: UserUpdate) -> AppResult<User>;

    // Lands
    /// Inserts a listing owned by `owner_id`, deriving a unique slug from its name
    async fn create_land(&self, owner_id: i64, land: NewLand) -> AppResult<Land>;
    async fn get_land(&self, id: i64) -> AppResult<Option<Land>>;
    /// Matching listings, newest first
    async fn list_lands(&self, filter: LandFilter) -> AppResult<Vec<Land>>;
    async fn update_land(&self, id: i64, update: LandUpdate) -> AppResult<Land>;
    async fn increment_land_views(&self, id: i64) -> AppResult<()>;
    async fn count_lands(&self) -> AppResult<i64>;

    // Soil tests and classifier history
    async fn create_soil_data(&self, user_id: i64, soil: NewSoilData) -> AppResult<SoilData>;
    async fn list_soil_data(&self, user_id: i64) -> AppResult<Vec<SoilData>>;
    async fn create_crop_recommendation(
        &self,
        recommendation: NewCropRecommendation,
    ) -> AppResult<CropRecommendationRecord>;
    /// Most recent first
    async fn list_crop_recommendations(
        &self,
        user_id: i64,
        limit: i64,
    ) -> AppResult<Vec<CropRecommendationRecord>>;
    async fn crop_recommendation_stats(&self, user_id: i64) -> AppResult<CropStats>;

    // Audit
    async fn log_query(&self, query: NewUserQuery) -> AppResult<()>;

    // Bookmarks
    /// Fails with `Conflict` when the pair is already saved
    async fn save_land(&self, user_id: i64, land_id: i64, notes: String) -> AppResult<SavedLand>;
    async fn list_saved_lands(&self, user_id: i64) -> AppResult<Vec<SavedLandEntry>>;
    /// Returns whether a bookmark was removed
    async fn remove_saved_land(&self, user_id: i64, land_id: i64) -> AppResult<bool>;

    // Investor reference data
    async fn list_use_cases(&self) -> AppResult<Vec<DevelopmentUseCase>>;
    async fn create_use_case(&self, use_case: NewDevelopmentUseCase)
        -> AppResult<DevelopmentUseCase>;
    async fn list_infrastructure(&self, city: Option<String>) -> AppResult<Vec<Infrastructure>>;
    async fn create_infrastructure(&self, infra: NewInfrastructure) -> AppResult<Infrastructure>;
    async fn list_government_projects(
        &self,
        city: Option<String>,
    ) -> AppResult<Vec<GovernmentProject>>;
    async fn create_government_project(
        &self,
        project: NewGovernmentProject,
    ) -> AppResult<GovernmentProject>;

    // Investor recommendations
    /// Atomically swaps the stored recommendations of a land for `recommendations`
    async fn replace_land_recommendations(
        &self,
        land_id: i64,
        recommendations: Vec<NewLandRecommendation>,
    ) -> AppResult<Vec<LandRecommendation>>;
    /// Ordered by rank
    async fn list_land_recommendations(&self, land_id: i64) -> AppResult<Vec<LandRecommendation>>;
}

/// Case-insensitive city comparison shared by both stores
pub(crate) fn same_city(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
