//! Shared application state for all routes.

use crate::repository::PetStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PetStore>,
    /// Cap applied to the `max` query parameter on list.
    pub max_page_size: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn PetStore>, max_page_size: u32) -> Self {
        AppState {
            store,
            max_page_size,
        }
    }
}
