use std::sync::Arc;
use std::time::Duration;

use np_core::{FoodLog, Result, UpdateNotifier};
use np_storage::MealStore;

use crate::ServerConfig;

pub struct AppState {
    pub notifier: Arc<UpdateNotifier>,
    pub log: Arc<dyn FoodLog>,
    pub meals: Arc<MealStore>,
    pub poll_timeout: Duration,
}

impl AppState {
    pub fn new(config: &ServerConfig, log: Arc<dyn FoodLog>) -> Result<Self> {
        Ok(Self {
            notifier: Arc::new(UpdateNotifier::new(config.initial_amount)?),
            log,
            meals: Arc::new(MealStore::new()),
            poll_timeout: config.poll_timeout,
        })
    }
}
