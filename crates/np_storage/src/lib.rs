use np_core::{Error, FoodLog, Result};
use std::sync::Arc;
use tracing::info;

pub mod backends;
pub mod meals;

pub use backends::*;
pub use meals::MealStore;

/// Build the food log backend named by `kind`.
pub fn create_storage(kind: &str) -> Result<Arc<dyn FoodLog>> {
    match kind {
        "memory" => {
            info!("💾 Using in-memory food log");
            Ok(Arc::new(InMemoryLog::new()))
        }
        other => Err(Error::Storage(format!("Unsupported storage backend: {}", other))),
    }
}
