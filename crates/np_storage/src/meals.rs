use chrono::Utc;
use np_core::{Error, Meal, NewFoodEntry, Result};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Saved meal templates, kept for the lifetime of the process.
#[derive(Default)]
pub struct MealStore {
    meals: RwLock<Vec<Meal>>,
}

impl MealStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, name: &str, items: Vec<NewFoodEntry>) -> Result<Meal> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::MalformedRequest("Meal name is required".to_string()));
        }
        if items.is_empty() {
            return Err(Error::MalformedRequest("At least one item is required".to_string()));
        }

        let meal = Meal {
            id: format!("meal_{}", Uuid::new_v4().simple()),
            name: name.to_string(),
            created: Utc::now(),
            items,
        };
        self.meals.write().await.push(meal.clone());
        Ok(meal)
    }

    pub async fn list(&self) -> Vec<Meal> {
        self.meals.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Meal> {
        self.meals
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Meal not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> NewFoodEntry {
        NewFoodEntry {
            name: name.to_string(),
            amount: 100.0,
            protein: 3.0,
            calories: 60.0,
            fiber: 1.0,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MealStore::new();
        let meal = store.create(" Lunch ", vec![item("Rice"), item("Beans")]).await.unwrap();
        assert_eq!(meal.name, "Lunch");
        assert!(meal.id.starts_with("meal_"));

        let found = store.get(&meal.id).await.unwrap();
        assert_eq!(found.items.len(), 2);
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let store = MealStore::new();
        let err = store.create("  ", vec![item("Rice")]).await.unwrap_err();
        assert_eq!(err.to_string(), "Meal name is required");
        let err = store.create("Lunch", vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "At least one item is required");
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_meal() {
        let store = MealStore::new();
        assert!(matches!(store.get("meal_missing").await, Err(Error::NotFound(_))));
    }
}
