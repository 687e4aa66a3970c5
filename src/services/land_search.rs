//! Store-backed land searches with a best-effort audit trail.

use std::time::Instant;

use crate::error::{AppError, AppResult};
use crate::models::{Land, LandFilter, LandStatus, NewUserQuery};
use crate::services::land_scoring::{
    recommend_lands, similar_lands, LandRequirements, RankedLand, SimilarLand,
};
use crate::store::Store;

/// How a search was issued, recorded with the audit row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Recommend,
    QuickMatch,
    Similar,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Recommend => "recommend",
            SearchKind::QuickMatch => "quick_match",
            SearchKind::Similar => "similar",
        }
    }
}

/// Candidate listings for a requirements search, narrowed in the store
fn candidate_filter(requirements: &LandRequirements) -> LandFilter {
    LandFilter {
        status: Some(LandStatus::Available),
        land_type: requirements.purpose,
        location: requirements
            .location_preference
            .as_deref()
            .map(str::trim)
            .filter(|loc| !loc.is_empty())
            .map(str::to_string),
        ..LandFilter::default()
    }
}

/// Ranks available listings against `requirements` and records the search
pub async fn recommend(
    store: &dyn Store,
    user_id: Option<i64>,
    requirements: &LandRequirements,
    limit: usize,
    kind: SearchKind,
) -> AppResult<Vec<RankedLand>> {
    let started = Instant::now();

    let candidates = store.list_lands(candidate_filter(requirements)).await?;
    let ranked = recommend_lands(&candidates, requirements, limit);

    tracing::info!(
        kind = kind.as_str(),
        candidates = candidates.len(),
        results = ranked.len(),
        "Land search completed"
    );

    record_query(
        store,
        NewUserQuery {
            user_id,
            query_text: serde_json::to_string(requirements).unwrap_or_default(),
            query_type: kind.as_str().to_string(),
            results_count: ranked.len() as i32,
            top_result_id: ranked.first().map(|r| r.land_id),
            response_time_ms: Some(elapsed_ms(started)),
        },
    )
    .await;

    Ok(ranked)
}

/// Listings most similar to `land_id`; unknown ids are not found
pub async fn similar(
    store: &dyn Store,
    user_id: Option<i64>,
    land_id: i64,
    limit: usize,
) -> AppResult<(Land, Vec<SimilarLand>)> {
    let started = Instant::now();

    let target = store
        .get_land(land_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Land {} not found", land_id)))?;

    let candidates = store
        .list_lands(LandFilter {
            exclude_id: Some(land_id),
            ..LandFilter::available()
        })
        .await?;
    let similar = similar_lands(&target, &candidates, limit);

    record_query(
        store,
        NewUserQuery {
            user_id,
            query_text: format!("similar_to:{}", land_id),
            query_type: SearchKind::Similar.as_str().to_string(),
            results_count: similar.len() as i32,
            top_result_id: similar.first().map(|s| s.land_id),
            response_time_ms: Some(elapsed_ms(started)),
        },
    )
    .await;

    Ok((target, similar))
}

/// Writes an audit row; failures are logged and never surface to the caller
pub async fn record_query(store: &dyn Store, query: NewUserQuery) {
    let query_type = query.query_type.clone();
    if let Err(e) = store.log_query(query).await {
        tracing::warn!(error = %e, query_type = %query_type, "Failed to record search query");
    }
}

fn elapsed_ms(started: Instant) -> i32 {
    i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::land::fixtures::land;
    use crate::models::LandType;
    use crate::store::{MemoryStore, MockStore};
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_search() {
        let mut store = MockStore::new();
        store
            .expect_list_lands()
            .times(1)
            .returning(|_| Ok(vec![land(1), land(2)]));
        store
            .expect_log_query()
            .times(1)
            .returning(|_| Err(AppError::Internal("audit table offline".to_string())));

        let ranked = assert_ok!(
            recommend(
                &store,
                None,
                &LandRequirements::default(),
                10,
                SearchKind::Recommend,
            )
            .await
        );
        assert_eq!(ranked.len(), 2);
    }

    #[tokio::test]
    async fn test_candidate_filter_pushes_purpose_and_location() {
        let mut store = MockStore::new();
        store
            .expect_list_lands()
            .withf(|filter| {
                filter.status == Some(LandStatus::Available)
                    && filter.land_type == Some(LandType::Agricultural)
                    && filter.location.as_deref() == Some("Pune")
            })
            .returning(|_| Ok(vec![land(7)]));
        store
            .expect_log_query()
            .withf(|q| q.query_type == "quick_match" && q.top_result_id == Some(7))
            .returning(|_| Ok(()));

        let requirements = LandRequirements {
            purpose: Some(LandType::Agricultural),
            location_preference: Some(" Pune ".to_string()),
            ..LandRequirements::default()
        };
        let ranked = recommend(&store, Some(3), &requirements, 5, SearchKind::QuickMatch)
            .await
            .unwrap();
        assert_eq!(ranked[0].land_id, 7);
    }

    #[tokio::test]
    async fn test_similar_unknown_land_is_not_found() {
        let store = MemoryStore::new();
        let err = assert_err!(similar(&store, None, 404, 5).await);
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.query_log_len().await, 0);
    }
}
