use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use np_core::{Error, FoodEntry, FoodLog, Result};
use tokio::sync::RwLock;

/// Food log kept for the lifetime of the process.
pub struct InMemoryLog {
    entries: RwLock<Vec<FoodEntry>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FoodLog for InMemoryLog {
    async fn insert(&self, entries: Vec<FoodEntry>) -> Result<()> {
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn entries_for(&self, date: NaiveDate) -> Result<Vec<FoodEntry>> {
        let entries = self.entries.read().await;
        let mut found: Vec<FoodEntry> = entries
            .iter()
            .filter(|e| e.logged_at.with_timezone(&Local).date_naive() == date)
            .cloned()
            .collect();
        // Backdated entries are appended late but belong in time order
        found.sort_by_key(|e| e.logged_at);
        Ok(found)
    }

    async fn delete(&self, id: &str) -> Result<FoodEntry> {
        let mut entries = self.entries.write().await;
        let index = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("Entry {} not found", id)))?;
        Ok(entries.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use np_core::NewFoodEntry;

    fn chicken(protein: f64) -> NewFoodEntry {
        NewFoodEntry {
            name: "Chicken".to_string(),
            amount: 150.0,
            protein,
            calories: 247.54,
            fiber: 0.0,
        }
    }

    #[tokio::test]
    async fn test_record_and_totals() {
        let log = InMemoryLog::new();
        let first = log.record(chicken(46.51), Utc::now()).await.unwrap();
        log.record(chicken(10.0), Utc::now()).await.unwrap();

        assert_eq!(first.protein, 46.5);
        assert_eq!(first.calories, 247.5);
        let totals = log.daily_totals().await.unwrap();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.total_protein, 56.5);

        let today = log.today().await.unwrap();
        assert_eq!(today[0].id, first.id);
    }

    #[tokio::test]
    async fn test_backdated_entry_lands_on_its_day() {
        let log = InMemoryLog::new();
        log.record(chicken(1.0), Utc::now()).await.unwrap();
        let yesterday = Utc::now() - Duration::days(1);
        let old = log.record(chicken(2.0), yesterday).await.unwrap();

        let date = yesterday.with_timezone(&Local).date_naive();
        let entries = log.entries_for(date).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, old.id);
        assert_eq!(log.daily_totals().await.unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_entries_sorted_by_time() {
        let log = InMemoryLog::new();
        let noon = Local.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap().with_timezone(&Utc);
        let late = log.record(chicken(1.0), noon).await.unwrap();
        let early = log.record(chicken(1.0), noon - Duration::hours(2)).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let entries = log.entries_for(date).await.unwrap();
        assert_eq!(entries, vec![early, late]);
        assert_eq!(entries[0].time, "10:00");
    }

    #[tokio::test]
    async fn test_delete() {
        let log = InMemoryLog::new();
        let entry = log.record(chicken(5.0), Utc::now()).await.unwrap();

        let removed = log.delete(&entry.id).await.unwrap();
        assert_eq!(removed, entry);
        assert_eq!(log.daily_totals().await.unwrap().item_count, 0);

        let err = log.delete(&entry.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
