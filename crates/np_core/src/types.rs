use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Seconds since the Unix epoch, with sub-second precision.
pub type Timestamp = f64;

pub fn timestamp_now() -> Timestamp {
    to_timestamp(Utc::now())
}

pub fn to_timestamp(at: DateTime<Utc>) -> Timestamp {
    at.timestamp_micros() as f64 / 1_000_000.0
}

/// Rounds a nutrition value to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parses the `at` field used to backdate an entry.
///
/// RFC 3339 strings keep their offset. Bare `YYYY-MM-DDTHH:MM[:SS]` values
/// are read as server local time.
pub fn parse_logged_at(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| Error::MalformedRequest(format!("Invalid 'at' timestamp: {}", value)))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodEntry {
    pub id: String,
    /// Local wall-clock time of day, `HH:MM`
    pub time: String,
    pub name: String,
    pub amount: f64,
    pub protein: f64,
    pub calories: f64,
    pub fiber: f64,
    pub logged_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_uid: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_meal_header: bool,
}

impl FoodEntry {
    pub fn new(item: NewFoodEntry, logged_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            time: logged_at.with_timezone(&Local).format("%H:%M").to_string(),
            name: item.name,
            amount: item.amount,
            protein: round1(item.protein),
            calories: round1(item.calories),
            fiber: round1(item.fiber),
            logged_at,
            meal_uid: None,
            is_meal_header: false,
        }
    }

    /// Zero-nutrition marker that opens a logged meal.
    pub fn meal_header(name: &str, meal_uid: &str, logged_at: DateTime<Utc>) -> Self {
        let mut header = Self::new(
            NewFoodEntry {
                name: name.to_string(),
                amount: 0.0,
                protein: 0.0,
                calories: 0.0,
                fiber: 0.0,
            },
            logged_at,
        );
        header.meal_uid = Some(meal_uid.to_string());
        header.is_meal_header = true;
        header
    }

    pub fn in_meal(mut self, meal_uid: &str) -> Self {
        self.meal_uid = Some(meal_uid.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFoodEntry {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub fiber: f64,
}

/// Saved meal template that can be logged in one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub created: DateTime<Utc>,
    pub items: Vec<NewFoodEntry>,
}

impl Meal {
    pub fn total_calories(&self) -> f64 {
        self.items.iter().map(|i| i.calories).sum::<f64>().round()
    }

    pub fn total_protein(&self) -> f64 {
        round1(self.items.iter().map(|i| i.protein).sum())
    }

    /// Header plus one entry per item, all sharing a fresh `meal_uid`.
    pub fn log_entries(&self, logged_at: DateTime<Utc>) -> Vec<FoodEntry> {
        let meal_uid = format!("meallog_{}", Uuid::new_v4().simple());
        let mut entries = vec![FoodEntry::meal_header(&self.name, &meal_uid, logged_at)];
        entries.extend(
            self.items
                .iter()
                .cloned()
                .map(|item| FoodEntry::new(item, logged_at).in_meal(&meal_uid)),
        );
        entries
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DailyTotals {
    pub item_count: usize,
    pub total_protein: f64,
}

/// State observed by a long-poll request when it resolves.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    pub updated: bool,
    pub timestamp: Timestamp,
    pub nonce: Option<String>,
    pub amount_changed: bool,
    pub current_amount: f64,
    #[serde(rename = "meal_mode")]
    pub meal_mode_active: bool,
    pub server_timestamp: Timestamp,
}
