use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{same_city, Store, TOP_CROPS};
use crate::error::{AppError, AppResult};
use crate::models::land::{slugify, unique_slug};
use crate::models::{
    round2, CropCount, CropRecommendationRecord, CropStats, DevelopmentUseCase, GovernmentProject,
    Infrastructure, Land, LandFilter, LandRecommendation, LandUpdate, NewCropRecommendation,
    NewDevelopmentUseCase, NewGovernmentProject, NewInfrastructure, NewLand,
    NewLandRecommendation, NewSoilData, NewUser, NewUserQuery, SavedLand, SavedLandEntry,
    SoilData, User, UserQuery, UserUpdate,
};

/// In-process store used by tests and local runs without Postgres
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, User>,
    lands: HashMap<i64, Land>,
    soil_data: Vec<SoilData>,
    crop_recommendations: Vec<CropRecommendationRecord>,
    queries: Vec<UserQuery>,
    saved_lands: Vec<SavedLand>,
    use_cases: Vec<DevelopmentUseCase>,
    infrastructure: Vec<Infrastructure>,
    government_projects: Vec<GovernmentProject>,
    land_recommendations: Vec<LandRecommendation>,
}

impl Tables {
    /// One sequence for every table keeps ids unique and creation-ordered
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audit rows recorded so far
    pub async fn query_log_len(&self) -> usize {
        self.inner.read().await.queries.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.inner.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }

        let id = tables.next_id();
        let created = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            user_type: user.user_type,
            phone_number: user.phone_number,
            address: user.address,
            bio: user.bio,
            is_verified: false,
            date_joined: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: String) -> AppResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> AppResult<User> {
        let mut tables = self.inner.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        update.apply(user);
        Ok(user.clone())
    }

    async fn create_land(&self, owner_id: i64, land: NewLand) -> AppResult<Land> {
        let mut tables = self.inner.write().await;
        let slug = unique_slug(&slugify(&land.name), |candidate| {
            tables.lands.values().any(|l| l.slug == candidate)
        });

        let id = tables.next_id();
        let now = Utc::now();
        let total_price = land.resolved_total_price();
        let created = Land {
            id,
            name: land.name,
            description: land.description,
            land_type: land.land_type,
            status: land.status,
            latitude: land.latitude,
            longitude: land.longitude,
            address: land.address,
            city: land.city,
            state: land.state,
            pincode: land.pincode,
            size_in_acres: land.size_in_acres,
            price_per_acre: land.price_per_acre,
            total_price,
            highway_proximity_score: land.highway_proximity_score,
            metro_proximity_score: land.metro_proximity_score,
            airport_proximity_score: land.airport_proximity_score,
            has_water_supply: land.has_water_supply,
            has_electricity: land.has_electricity,
            has_road_access: land.has_road_access,
            owner_id,
            slug,
            is_featured: land.is_featured,
            views_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.lands.insert(id, created.clone());
        Ok(created)
    }

    async fn get_land(&self, id: i64) -> AppResult<Option<Land>> {
        Ok(self.inner.read().await.lands.get(&id).cloned())
    }

    async fn list_lands(&self, filter: LandFilter) -> AppResult<Vec<Land>> {
        let tables = self.inner.read().await;
        let mut lands: Vec<Land> = tables
            .lands
            .values()
            .filter(|land| filter.matches(land))
            .cloned()
            .collect();
        lands.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(lands)
    }

    async fn update_land(&self, id: i64, update: LandUpdate) -> AppResult<Land> {
        let mut tables = self.inner.write().await;
        let land = tables
            .lands
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Land {} not found", id)))?;
        update.apply(land);
        Ok(land.clone())
    }

    async fn increment_land_views(&self, id: i64) -> AppResult<()> {
        if let Some(land) = self.inner.write().await.lands.get_mut(&id) {
            land.views_count += 1;
        }
        Ok(())
    }

    async fn count_lands(&self) -> AppResult<i64> {
        Ok(self.inner.read().await.lands.len() as i64)
    }

    async fn create_soil_data(&self, user_id: i64, soil: NewSoilData) -> AppResult<SoilData> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let created = SoilData {
            id,
            land_id: soil.land_id,
            user_id,
            nitrogen: soil.nitrogen,
            phosphorous: soil.phosphorous,
            potassium: soil.potassium,
            ph: soil.ph,
            temperature: soil.temperature,
            humidity: soil.humidity,
            rainfall: soil.rainfall,
            location: soil.location,
            test_date: now.date_naive(),
            notes: soil.notes,
            created_at: now,
            updated_at: now,
        };
        tables.soil_data.push(created.clone());
        Ok(created)
    }

    async fn list_soil_data(&self, user_id: i64) -> AppResult<Vec<SoilData>> {
        let tables = self.inner.read().await;
        Ok(tables
            .soil_data
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_crop_recommendation(
        &self,
        recommendation: NewCropRecommendation,
    ) -> AppResult<CropRecommendationRecord> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let created = CropRecommendationRecord {
            id,
            user_id: recommendation.user_id,
            soil_data_id: recommendation.soil_data_id,
            recommended_crop: recommendation.recommended_crop,
            confidence_score: recommendation.confidence_score,
            top_recommendations: recommendation.top_recommendations,
            soil_suitability: recommendation.soil_suitability,
            model_version: recommendation.model_version,
            created_at: Utc::now(),
        };
        tables.crop_recommendations.push(created.clone());
        Ok(created)
    }

    async fn list_crop_recommendations(
        &self,
        user_id: i64,
        limit: i64,
    ) -> AppResult<Vec<CropRecommendationRecord>> {
        let tables = self.inner.read().await;
        Ok(tables
            .crop_recommendations
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn crop_recommendation_stats(&self, user_id: i64) -> AppResult<CropStats> {
        let tables = self.inner.read().await;
        let records: Vec<&CropRecommendationRecord> = tables
            .crop_recommendations
            .iter()
            .filter(|r| r.user_id == user_id)
            .collect();

        let total = records.len() as i64;
        let avg_confidence = if records.is_empty() {
            0.0
        } else {
            let sum: f64 = records.iter().map(|r| r.confidence_score).sum();
            round2(sum / records.len() as f64 * 100.0)
        };

        let mut counts: HashMap<&str, i64> = HashMap::new();
        for record in &records {
            *counts.entry(record.recommended_crop.as_str()).or_default() += 1;
        }
        let mut most_recommended: Vec<CropCount> = counts
            .into_iter()
            .map(|(crop, count)| CropCount {
                recommended_crop: crop.to_string(),
                count,
            })
            .collect();
        most_recommended.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.recommended_crop.cmp(&b.recommended_crop))
        });
        most_recommended.truncate(TOP_CROPS);

        Ok(CropStats {
            total_recommendations: total,
            avg_confidence,
            most_recommended_crops: most_recommended,
            last_recommendation: records.iter().map(|r| r.created_at).max(),
        })
    }

    async fn log_query(&self, query: NewUserQuery) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        tables.queries.push(UserQuery {
            id,
            user_id: query.user_id,
            query_text: query.query_text,
            query_type: query.query_type,
            results_count: query.results_count,
            top_result_id: query.top_result_id,
            response_time_ms: query.response_time_ms,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn save_land(&self, user_id: i64, land_id: i64, notes: String) -> AppResult<SavedLand> {
        let mut tables = self.inner.write().await;
        if !tables.lands.contains_key(&land_id) {
            return Err(AppError::NotFound(format!("Land {} not found", land_id)));
        }
        if tables
            .saved_lands
            .iter()
            .any(|s| s.user_id == user_id && s.land_id == land_id)
        {
            return Err(AppError::Conflict("Land already saved".to_string()));
        }

        let id = tables.next_id();
        let saved = SavedLand {
            id,
            user_id,
            land_id,
            notes,
            saved_at: Utc::now(),
        };
        tables.saved_lands.push(saved.clone());
        Ok(saved)
    }

    async fn list_saved_lands(&self, user_id: i64) -> AppResult<Vec<SavedLandEntry>> {
        let tables = self.inner.read().await;
        Ok(tables
            .saved_lands
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .filter_map(|saved| {
                tables.lands.get(&saved.land_id).map(|land| SavedLandEntry {
                    saved: saved.clone(),
                    land: land.clone(),
                })
            })
            .collect())
    }

    async fn remove_saved_land(&self, user_id: i64, land_id: i64) -> AppResult<bool> {
        let mut tables = self.inner.write().await;
        let before = tables.saved_lands.len();
        tables
            .saved_lands
            .retain(|s| !(s.user_id == user_id && s.land_id == land_id));
        Ok(tables.saved_lands.len() < before)
    }

    async fn list_use_cases(&self) -> AppResult<Vec<DevelopmentUseCase>> {
        let mut use_cases = self.inner.read().await.use_cases.clone();
        use_cases.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(use_cases)
    }

    async fn create_use_case(
        &self,
        use_case: NewDevelopmentUseCase,
    ) -> AppResult<DevelopmentUseCase> {
        let mut tables = self.inner.write().await;
        if tables.use_cases.iter().any(|u| u.name == use_case.name) {
            return Err(AppError::Conflict(format!(
                "Use case '{}' already exists",
                use_case.name
            )));
        }

        let id = tables.next_id();
        let created = DevelopmentUseCase {
            id,
            name: use_case.name,
            display_name: use_case.display_name,
            description: use_case.description,
            min_size_acres: use_case.min_size_acres,
            typical_roi_min: use_case.typical_roi_min,
            typical_roi_max: use_case.typical_roi_max,
            typical_payback_years: use_case.typical_payback_years,
        };
        tables.use_cases.push(created.clone());
        Ok(created)
    }

    async fn list_infrastructure(&self, city: Option<String>) -> AppResult<Vec<Infrastructure>> {
        let tables = self.inner.read().await;
        Ok(tables
            .infrastructure
            .iter()
            .filter(|i| city.as_deref().map_or(true, |c| same_city(&i.city, c)))
            .cloned()
            .collect())
    }

    async fn create_infrastructure(&self, infra: NewInfrastructure) -> AppResult<Infrastructure> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let created = Infrastructure {
            id,
            name: infra.name,
            infra_type: infra.infra_type,
            latitude: infra.latitude,
            longitude: infra.longitude,
            city: infra.city,
            is_operational: infra.is_operational,
        };
        tables.infrastructure.push(created.clone());
        Ok(created)
    }

    async fn list_government_projects(
        &self,
        city: Option<String>,
    ) -> AppResult<Vec<GovernmentProject>> {
        let tables = self.inner.read().await;
        Ok(tables
            .government_projects
            .iter()
            .filter(|p| city.as_deref().map_or(true, |c| same_city(&p.city, c)))
            .cloned()
            .collect())
    }

    async fn create_government_project(
        &self,
        project: NewGovernmentProject,
    ) -> AppResult<GovernmentProject> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let created = GovernmentProject {
            id,
            name: project.name,
            project_type: project.project_type,
            status: project.status,
            latitude: project.latitude,
            longitude: project.longitude,
            radius_km: project.radius_km,
            city: project.city,
            expected_land_appreciation: project.expected_land_appreciation,
        };
        tables.government_projects.push(created.clone());
        Ok(created)
    }

    async fn replace_land_recommendations(
        &self,
        land_id: i64,
        recommendations: Vec<NewLandRecommendation>,
    ) -> AppResult<Vec<LandRecommendation>> {
        let mut tables = self.inner.write().await;
        tables.land_recommendations.retain(|r| r.land_id != land_id);

        let now = Utc::now();
        let mut created = Vec::with_capacity(recommendations.len());
        for rec in recommendations {
            let id = tables.next_id();
            let row = LandRecommendation {
                id,
                land_id,
                use_case_id: rec.use_case_id,
                use_case_name: rec.use_case_name,
                confidence_score: rec.confidence_score,
                predicted_roi: rec.predicted_roi,
                predicted_appreciation_5yr: rec.predicted_appreciation_5yr,
                reasoning: rec.reasoning,
                pros: rec.pros,
                cons: rec.cons,
                nearby_infrastructure: rec.nearby_infrastructure,
                govt_projects_impact: rec.govt_projects_impact,
                rank: rec.rank,
                created_at: now,
            };
            tables.land_recommendations.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn list_land_recommendations(&self, land_id: i64) -> AppResult<Vec<LandRecommendation>> {
        let tables = self.inner.read().await;
        let mut recommendations: Vec<LandRecommendation> = tables
            .land_recommendations
            .iter()
            .filter(|r| r.land_id == land_id)
            .cloned()
            .collect();
        recommendations.sort_by_key(|r| r.rank);
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CropScore, LandType, SoilSuitability, UserType};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: String::new(),
            last_name: String::new(),
            user_type: UserType::Farmer,
            phone_number: String::new(),
            address: String::new(),
            bio: String::new(),
        }
    }

    fn new_land(name: &str, city: &str) -> NewLand {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "land_type": "agricultural",
            "latitude": 18.52,
            "longitude": 73.85,
            "city": city,
            "state": "Maharashtra",
            "size_in_acres": 10.0,
            "price_per_acre": 100000.0
        }))
        .unwrap()
    }

    fn crop(user_id: i64, name: &str, confidence: f64) -> NewCropRecommendation {
        NewCropRecommendation {
            user_id,
            soil_data_id: 1,
            recommended_crop: name.to_string(),
            confidence_score: confidence,
            top_recommendations: vec![CropScore {
                crop: name.to_string(),
                confidence,
            }],
            soil_suitability: SoilSuitability::from_confidence(confidence),
            model_version: "v1.0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("asha")).await.unwrap();
        let err = store.create_user(new_user("asha")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_land_slugs_are_unique() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("owner")).await.unwrap();

        let first = store.create_land(owner.id, new_land("Green Acres", "Pune")).await.unwrap();
        let second = store.create_land(owner.id, new_land("Green Acres", "Pune")).await.unwrap();

        assert_eq!(first.slug, "green-acres");
        assert_eq!(second.slug, "green-acres-1");
        assert_eq!(first.total_price, 1_000_000.0);
        assert_eq!(first.land_type, LandType::Agricultural);
    }

    #[tokio::test]
    async fn test_list_lands_newest_first_with_filter() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("owner")).await.unwrap();
        let pune = store.create_land(owner.id, new_land("A", "Pune")).await.unwrap();
        store.create_land(owner.id, new_land("B", "Nagpur")).await.unwrap();
        let pune_again = store.create_land(owner.id, new_land("C", "Pune")).await.unwrap();

        let filter = LandFilter {
            city: Some("pune".to_string()),
            ..LandFilter::default()
        };
        let ids: Vec<i64> = store
            .list_lands(filter)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![pune_again.id, pune.id]);
    }

    #[tokio::test]
    async fn test_saved_land_lifecycle() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("buyer")).await.unwrap();
        let land = store.create_land(user.id, new_land("Plot", "Pune")).await.unwrap();

        store.save_land(user.id, land.id, String::new()).await.unwrap();
        let err = store.save_land(user.id, land.id, String::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let saved = store.list_saved_lands(user.id).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].land.id, land.id);

        assert!(store.remove_saved_land(user.id, land.id).await.unwrap());
        assert!(!store.remove_saved_land(user.id, land.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_crop_stats_aggregate() {
        let store = MemoryStore::new();
        store.create_crop_recommendation(crop(1, "rice", 0.9)).await.unwrap();
        store.create_crop_recommendation(crop(1, "rice", 0.7)).await.unwrap();
        store.create_crop_recommendation(crop(1, "maize", 0.5)).await.unwrap();
        store.create_crop_recommendation(crop(2, "cotton", 0.99)).await.unwrap();

        let stats = store.crop_recommendation_stats(1).await.unwrap();
        assert_eq!(stats.total_recommendations, 3);
        assert_eq!(stats.avg_confidence, 70.0);
        assert_eq!(stats.most_recommended_crops[0].recommended_crop, "rice");
        assert_eq!(stats.most_recommended_crops[0].count, 2);
        assert!(stats.last_recommendation.is_some());

        let empty = store.crop_recommendation_stats(42).await.unwrap();
        assert_eq!(empty.total_recommendations, 0);
        assert_eq!(empty.avg_confidence, 0.0);
        assert!(empty.last_recommendation.is_none());
    }

    #[tokio::test]
    async fn test_crop_history_is_limited_and_recent_first() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store
                .create_crop_recommendation(crop(1, &format!("crop{}", i), 0.5))
                .await
                .unwrap();
        }
        let history = store.list_crop_recommendations(1, 20).await.unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].recommended_crop, "crop24");
    }
}
