pub mod error;
pub mod notifier;
pub mod storage;
pub mod types;

pub use error::Error;
pub use notifier::{UpdateNotifier, MAX_AMOUNT, MIN_AMOUNT};
pub use storage::FoodLog;
pub use types::{DailyTotals, FoodEntry, Meal, NewFoodEntry, Snapshot, Timestamp};

pub type Result<T> = std::result::Result<T, Error>;
