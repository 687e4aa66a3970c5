use std::sync::Arc;

use crate::services::CropRecommender;
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub crops: Arc<CropRecommender>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, crops: Arc<CropRecommender>) -> Self {
        Self { store, crops }
    }
}
