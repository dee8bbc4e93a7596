use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use crate::types::{DailyTotals, FoodEntry, NewFoodEntry};
use crate::Result;

/// Data layer the long-poll handlers read daily totals from.
///
/// Implementations are called while pollers wait, so they must answer from
/// memory or a cache rather than doing slow IO.
#[async_trait]
pub trait FoodLog: Send + Sync {
    /// Append entries in one step; readers see all of them or none
    async fn insert(&self, entries: Vec<FoodEntry>) -> Result<()>;

    /// Entries whose local date matches `date`, oldest first
    async fn entries_for(&self, date: NaiveDate) -> Result<Vec<FoodEntry>>;

    /// Remove an entry, returning it
    async fn delete(&self, id: &str) -> Result<FoodEntry>;

    async fn record(&self, item: NewFoodEntry, at: DateTime<Utc>) -> Result<FoodEntry> {
        let entry = FoodEntry::new(item, at);
        self.insert(vec![entry.clone()]).await?;
        Ok(entry)
    }

    async fn today(&self) -> Result<Vec<FoodEntry>> {
        self.entries_for(Local::now().date_naive()).await
    }

    /// Count and protein for today, taken from a single read. Meal headers
    /// are markers, not foods, and are not counted.
    async fn daily_totals(&self) -> Result<DailyTotals> {
        let today = self.today().await?;
        Ok(DailyTotals {
            item_count: today.iter().filter(|e| !e.is_meal_header).count(),
            total_protein: today.iter().map(|e| e.protein).sum(),
        })
    }
}
