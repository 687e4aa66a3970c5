use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};

use super::{Store, TOP_CROPS};
use crate::error::{AppError, AppResult};
use crate::models::land::{slugify, unique_slug};
use crate::models::{
    round2, CropCount, CropRecommendationRecord, CropStats, DevelopmentUseCase, GovernmentProject,
    Infrastructure, Land, LandFilter, LandRecommendation, LandUpdate, NewCropRecommendation,
    NewDevelopmentUseCase, NewGovernmentProject, NewInfrastructure, NewLand,
    NewLandRecommendation, NewSoilData, NewUser, NewUserQuery, SavedLand, SavedLandEntry,
    SoilData, User, UserUpdate,
};

const LAND_RECOMMENDATION_COLUMNS: &str = "lr.id, lr.land_id, lr.use_case_id, \
     uc.display_name AS use_case_name, lr.confidence_score, lr.predicted_roi, \
     lr.predicted_appreciation_5yr, lr.reasoning, lr.pros, lr.cons, \
     lr.nearby_infrastructure, lr.govt_projects_impact, lr.rank, lr.created_at";

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn slug_taken(&self, slug: &str) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lands WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    /// Picks a free slug; slugs already used with this base are loaded in one query
    async fn free_slug(&self, name: &str) -> AppResult<String> {
        let base = slugify(name);
        if !self.slug_taken(&base).await? {
            return Ok(base);
        }

        let existing: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM lands WHERE slug = $1 OR slug LIKE $1 || '-%'")
                .bind(&base)
                .fetch_all(&self.pool)
                .await?;
        Ok(unique_slug(&base, |candidate| {
            existing.iter().any(|slug| slug == candidate)
        }))
    }
}

/// Maps unique-constraint violations to `Conflict`, everything else to `Database`
fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message())
        }
        _ => AppError::Database(err),
    }
}

fn push_land_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: LandFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(land_type) = filter.land_type {
        builder.push(" AND land_type = ").push_bind(land_type.as_str());
    }
    if let Some(location) = filter.location {
        let pattern = format!("%{}%", location);
        builder
            .push(" AND (city ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR state ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(city) = filter.city {
        builder.push(" AND LOWER(city) = LOWER(").push_bind(city).push(")");
    }
    if let Some(state) = filter.state {
        builder.push(" AND LOWER(state) = LOWER(").push_bind(state).push(")");
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND is_featured = ").push_bind(featured);
    }
    if let Some(exclude_id) = filter.exclude_id {
        builder.push(" AND id <> ").push_bind(exclude_id);
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let username = user.username.clone();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name, user_type,
                               phone_number, address, bio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.user_type.as_str())
        .bind(user.phone_number)
        .bind(user.address)
        .bind(user.bio)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Username '{}' is already taken", username)))
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: String) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> AppResult<User> {
        let mut user = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        update.apply(&mut user);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, first_name = $3, last_name = $4,
                phone_number = $5, address = $6, bio = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.phone_number)
        .bind(user.address)
        .bind(user.bio)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_land(&self, owner_id: i64, land: NewLand) -> AppResult<Land> {
        let slug = self.free_slug(&land.name).await?;
        let total_price = land.resolved_total_price();

        let created = sqlx::query_as::<_, Land>(
            r#"
            INSERT INTO lands (name, description, land_type, status, latitude, longitude,
                               address, city, state, pincode, size_in_acres, price_per_acre,
                               total_price, highway_proximity_score, metro_proximity_score,
                               airport_proximity_score, has_water_supply, has_electricity,
                               has_road_access, owner_id, slug, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22)
            RETURNING *
            "#,
        )
        .bind(land.name)
        .bind(land.description)
        .bind(land.land_type.as_str())
        .bind(land.status.as_str())
        .bind(land.latitude)
        .bind(land.longitude)
        .bind(land.address)
        .bind(land.city)
        .bind(land.state)
        .bind(land.pincode)
        .bind(land.size_in_acres)
        .bind(land.price_per_acre)
        .bind(total_price)
        .bind(land.highway_proximity_score)
        .bind(land.metro_proximity_score)
        .bind(land.airport_proximity_score)
        .bind(land.has_water_supply)
        .bind(land.has_electricity)
        .bind(land.has_road_access)
        .bind(owner_id)
        .bind(&slug)
        .bind(land.is_featured)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Slug '{}' is already in use", slug)))?;

        Ok(created)
    }

    async fn get_land(&self, id: i64) -> AppResult<Option<Land>> {
        let land = sqlx::query_as::<_, Land>("SELECT * FROM lands WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(land)
    }

    async fn list_lands(&self, filter: LandFilter) -> AppResult<Vec<Land>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM lands");
        push_land_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id DESC");

        let lands = builder
            .build_query_as::<Land>()
            .fetch_all(&self.pool)
            .await?;
        Ok(lands)
    }

    async fn update_land(&self, id: i64, update: LandUpdate) -> AppResult<Land> {
        let mut land = self
            .get_land(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Land {} not found", id)))?;
        update.apply(&mut land);

        let land = sqlx::query_as::<_, Land>(
            r#"
            UPDATE lands
            SET name = $2, description = $3, land_type = $4, status = $5,
                size_in_acres = $6, price_per_acre = $7, total_price = $8,
                highway_proximity_score = $9, metro_proximity_score = $10,
                airport_proximity_score = $11, has_water_supply = $12,
                has_electricity = $13, has_road_access = $14, is_featured = $15,
                updated_at = $16
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(land.name)
        .bind(land.description)
        .bind(land.land_type.as_str())
        .bind(land.status.as_str())
        .bind(land.size_in_acres)
        .bind(land.price_per_acre)
        .bind(land.total_price)
        .bind(land.highway_proximity_score)
        .bind(land.metro_proximity_score)
        .bind(land.airport_proximity_score)
        .bind(land.has_water_supply)
        .bind(land.has_electricity)
        .bind(land.has_road_access)
        .bind(land.is_featured)
        .bind(land.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(land)
    }

    async fn increment_land_views(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE lands SET views_count = views_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_lands(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lands")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_soil_data(&self, user_id: i64, soil: NewSoilData) -> AppResult<SoilData> {
        let created = sqlx::query_as::<_, SoilData>(
            r#"
            INSERT INTO soil_data (land_id, user_id, nitrogen, phosphorous, potassium, ph,
                                   temperature, humidity, rainfall, location, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(soil.land_id)
        .bind(user_id)
        .bind(soil.nitrogen)
        .bind(soil.phosphorous)
        .bind(soil.potassium)
        .bind(soil.ph)
        .bind(soil.temperature)
        .bind(soil.humidity)
        .bind(soil.rainfall)
        .bind(soil.location)
        .bind(soil.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_soil_data(&self, user_id: i64) -> AppResult<Vec<SoilData>> {
        let rows = sqlx::query_as::<_, SoilData>(
            "SELECT * FROM soil_data WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_crop_recommendation(
        &self,
        recommendation: NewCropRecommendation,
    ) -> AppResult<CropRecommendationRecord> {
        let created = sqlx::query_as::<_, CropRecommendationRecord>(
            r#"
            INSERT INTO crop_recommendations (user_id, soil_data_id, recommended_crop,
                                              confidence_score, top_recommendations,
                                              soil_suitability, model_version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(recommendation.user_id)
        .bind(recommendation.soil_data_id)
        .bind(recommendation.recommended_crop)
        .bind(recommendation.confidence_score)
        .bind(Json(recommendation.top_recommendations))
        .bind(recommendation.soil_suitability.as_str())
        .bind(recommendation.model_version)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_crop_recommendations(
        &self,
        user_id: i64,
        limit: i64,
    ) -> AppResult<Vec<CropRecommendationRecord>> {
        let rows = sqlx::query_as::<_, CropRecommendationRecord>(
            r#"
            SELECT * FROM crop_recommendations
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn crop_recommendation_stats(&self, user_id: i64) -> AppResult<CropStats> {
        let (total, avg, last): (i64, Option<f64>, Option<chrono::DateTime<chrono::Utc>>) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*), AVG(confidence_score), MAX(created_at)
                FROM crop_recommendations
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let most_recommended = sqlx::query_as::<_, CropCount>(
            r#"
            SELECT recommended_crop, COUNT(*) AS count
            FROM crop_recommendations
            WHERE user_id = $1
            GROUP BY recommended_crop
            ORDER BY count DESC, recommended_crop ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(TOP_CROPS as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(CropStats {
            total_recommendations: total,
            avg_confidence: avg.map(|a| round2(a * 100.0)).unwrap_or(0.0),
            most_recommended_crops: most_recommended,
            last_recommendation: last,
        })
    }

    async fn log_query(&self, query: NewUserQuery) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_queries (user_id, query_text, query_type, results_count,
                                      top_result_id, response_time_ms)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(query.user_id)
        .bind(query.query_text)
        .bind(query.query_type)
        .bind(query.results_count)
        .bind(query.top_result_id)
        .bind(query.response_time_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_land(&self, user_id: i64, land_id: i64, notes: String) -> AppResult<SavedLand> {
        if self.get_land(land_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Land {} not found", land_id)));
        }

        sqlx::query_as::<_, SavedLand>(
            r#"
            INSERT INTO saved_lands (user_id, land_id, notes)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(land_id)
        .bind(notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || "Land already saved".to_string()))
    }

    async fn list_saved_lands(&self, user_id: i64) -> AppResult<Vec<SavedLandEntry>> {
        let saved = sqlx::query_as::<_, SavedLand>(
            "SELECT * FROM saved_lands WHERE user_id = $1 ORDER BY saved_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let land_ids: Vec<i64> = saved.iter().map(|s| s.land_id).collect();
        let lands = sqlx::query_as::<_, Land>("SELECT * FROM lands WHERE id = ANY($1)")
            .bind(&land_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(saved
            .into_iter()
            .filter_map(|saved| {
                lands
                    .iter()
                    .find(|land| land.id == saved.land_id)
                    .cloned()
                    .map(|land| SavedLandEntry { saved, land })
            })
            .collect())
    }

    async fn remove_saved_land(&self, user_id: i64, land_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM saved_lands WHERE user_id = $1 AND land_id = $2")
            .bind(user_id)
            .bind(land_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_use_cases(&self) -> AppResult<Vec<DevelopmentUseCase>> {
        let rows = sqlx::query_as::<_, DevelopmentUseCase>(
            "SELECT * FROM development_use_cases ORDER BY display_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_use_case(
        &self,
        use_case: NewDevelopmentUseCase,
    ) -> AppResult<DevelopmentUseCase> {
        let name = use_case.name.clone();
        sqlx::query_as::<_, DevelopmentUseCase>(
            r#"
            INSERT INTO development_use_cases (name, display_name, description, min_size_acres,
                                               typical_roi_min, typical_roi_max,
                                               typical_payback_years)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(use_case.name)
        .bind(use_case.display_name)
        .bind(use_case.description)
        .bind(use_case.min_size_acres)
        .bind(use_case.typical_roi_min)
        .bind(use_case.typical_roi_max)
        .bind(use_case.typical_payback_years)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Use case '{}' already exists", name)))
    }

    async fn list_infrastructure(&self, city: Option<String>) -> AppResult<Vec<Infrastructure>> {
        let rows = sqlx::query_as::<_, Infrastructure>(
            r#"
            SELECT * FROM infrastructure
            WHERE $1::TEXT IS NULL OR LOWER(city) = LOWER(TRIM($1))
            ORDER BY id
            "#,
        )
        .bind(city)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_infrastructure(&self, infra: NewInfrastructure) -> AppResult<Infrastructure> {
        let created = sqlx::query_as::<_, Infrastructure>(
            r#"
            INSERT INTO infrastructure (name, infra_type, latitude, longitude, city, is_operational)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(infra.name)
        .bind(infra.infra_type.as_str())
        .bind(infra.latitude)
        .bind(infra.longitude)
        .bind(infra.city)
        .bind(infra.is_operational)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_government_projects(
        &self,
        city: Option<String>,
    ) -> AppResult<Vec<GovernmentProject>> {
        let rows = sqlx::query_as::<_, GovernmentProject>(
            r#"
            SELECT * FROM government_projects
            WHERE $1::TEXT IS NULL OR LOWER(city) = LOWER(TRIM($1))
            ORDER BY id
            "#,
        )
        .bind(city)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_government_project(
        &self,
        project: NewGovernmentProject,
    ) -> AppResult<GovernmentProject> {
        let created = sqlx::query_as::<_, GovernmentProject>(
            r#"
            INSERT INTO government_projects (name, project_type, status, latitude, longitude,
                                             radius_km, city, expected_land_appreciation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(project.name)
        .bind(project.project_type.as_str())
        .bind(project.status.as_str())
        .bind(project.latitude)
        .bind(project.longitude)
        .bind(project.radius_km)
        .bind(project.city)
        .bind(project.expected_land_appreciation)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn replace_land_recommendations(
        &self,
        land_id: i64,
        recommendations: Vec<NewLandRecommendation>,
    ) -> AppResult<Vec<LandRecommendation>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM land_recommendations WHERE land_id = $1")
            .bind(land_id)
            .execute(&mut *tx)
            .await?;

        for rec in recommendations {
            sqlx::query(
                r#"
                INSERT INTO land_recommendations (land_id, use_case_id, confidence_score,
                                                  predicted_roi, predicted_appreciation_5yr,
                                                  reasoning, pros, cons, nearby_infrastructure,
                                                  govt_projects_impact, rank)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(land_id)
            .bind(rec.use_case_id)
            .bind(rec.confidence_score)
            .bind(rec.predicted_roi)
            .bind(rec.predicted_appreciation_5yr)
            .bind(rec.reasoning)
            .bind(Json(rec.pros))
            .bind(Json(rec.cons))
            .bind(Json(rec.nearby_infrastructure))
            .bind(Json(rec.govt_projects_impact))
            .bind(rec.rank)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_land_recommendations(land_id).await
    }

    async fn list_land_recommendations(&self, land_id: i64) -> AppResult<Vec<LandRecommendation>> {
        let sql = format!(
            "SELECT {} FROM land_recommendations lr \
             JOIN development_use_cases uc ON uc.id = lr.use_case_id \
             WHERE lr.land_id = $1 ORDER BY lr.rank",
            LAND_RECOMMENDATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, LandRecommendation>(&sql)
            .bind(land_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
