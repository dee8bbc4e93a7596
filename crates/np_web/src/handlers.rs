use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{Duration, Local, Utc};
use np_core::notifier::parse_amount;
use np_core::types::{parse_logged_at, round1, Timestamp};
use np_core::{Error, FoodEntry, NewFoodEntry, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Upper bound for `/api/entries?days=`
const MAX_DAYS: u32 = 366;

#[derive(Debug, Default, Deserialize)]
pub struct PollParams {
    #[serde(default)]
    pub since: Timestamp,
    #[serde(default)]
    pub amount_since: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub item_count: usize,
    pub total_protein: f64,
}

pub async fn poll_updates(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PollParams>, QueryRejection>,
) -> ApiResult<PollResponse> {
    let Query(params) = params?;
    let snapshot = state
        .notifier
        .poll(params.since, params.amount_since, state.poll_timeout)
        .await;
    let totals = state.log.daily_totals().await?;

    Ok(Json(PollResponse {
        snapshot,
        item_count: totals.item_count,
        total_protein: round1(totals.total_protein),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetAmountRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub nonce: Option<String>,
}

pub async fn set_amount(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SetAmountRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let amount = parse_amount(request.amount.as_ref())?;
    let amount = state.notifier.set_amount(amount, request.nonce).await?;
    Ok(Json(json!({ "status": "success", "amount": amount })))
}

pub async fn get_amount(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "amount": state.notifier.current_amount().await }))
}

#[derive(Debug, Deserialize)]
pub struct SetMealModeRequest {
    pub active: bool,
}

pub async fn set_meal_mode(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SetMealModeRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    state.notifier.set_meal_mode(request.active).await;
    Ok(Json(json!({ "status": "success", "meal_mode": request.active })))
}

pub async fn get_meal_mode(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "meal_mode": state.notifier.meal_mode().await }))
}

#[derive(Debug, Deserialize)]
pub struct LogRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub nonce: Option<String>,
    /// Backdate the entry, e.g. `2024-03-05T14:30:00`
    #[serde(default)]
    pub at: Option<String>,
}

pub async fn log_food(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(Error::MalformedRequest("No food name provided".to_string()).into());
    }

    let logged_at = request.at.as_deref().map(parse_logged_at).transpose()?;
    let amount = match request.amount {
        Some(ref value) => parse_amount(Some(value))?,
        None => state.notifier.current_amount().await,
    };
    let item = NewFoodEntry {
        name: name.to_string(),
        amount,
        protein: request.protein,
        calories: request.calories,
        fiber: request.fiber,
    };

    if let Some(pending) = state
        .notifier
        .queue_meal_item(item.clone(), request.nonce.clone())
        .await
    {
        info!(food = name, pending, "Queued food for meal");
        return Ok(Json(json!({ "status": "queued", "meal_items": pending })));
    }

    let entry = state.log.record(item, logged_at.unwrap_or_else(Utc::now)).await?;
    info!(food = %entry.name, amount = entry.amount, time = %entry.time, "Logged food");
    state.notifier.mark_updated(request.nonce).await;
    Ok(Json(json!({ "status": "success", "entry": entry })))
}

#[derive(Debug, Deserialize)]
pub struct EntriesParams {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct DayEntries {
    pub date: String,
    pub entries: Vec<FoodEntry>,
}

/// Entries for today and the `days - 1` days before it, newest day first.
/// Days without entries are left out.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    params: Result<Query<EntriesParams>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(params) = params?;
    if !(1..=MAX_DAYS).contains(&params.days) {
        return Err(Error::MalformedRequest(format!("days must be between 1 and {}", MAX_DAYS)).into());
    }

    let today = Local::now().date_naive();
    let mut dates = Vec::new();
    for offset in 0..params.days {
        let date = today - Duration::days(i64::from(offset));
        let entries = state.log.entries_for(date).await?;
        if !entries.is_empty() {
            dates.push(DayEntries {
                date: date.format("%Y-%m-%d").to_string(),
                entries,
            });
        }
    }
    Ok(Json(json!({ "dates": dates })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteEntryRequest {
    pub id: String,
}

pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteEntryRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let entry = state.log.delete(&request.id).await?;
    info!(food = %entry.name, id = %entry.id, "Deleted entry");
    state.notifier.mark_updated(None).await;
    Ok(Json(json!({ "status": "success", "deleted": entry.id })))
}

pub async fn get_meal_items(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (meal_mode, meal_items) = state.notifier.meal_draft().await;
    Json(json!({ "meal_items": meal_items, "meal_mode": meal_mode }))
}

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<NewFoodEntry>,
}

pub async fn create_meal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateMealRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let meal = state.meals.create(&request.name, request.items).await?;
    info!(meal = %meal.name, items = meal.items.len(), "Saved meal");
    Ok(Json(json!({ "success": true, "meal_id": meal.id, "name": meal.name })))
}

pub async fn list_meals(State(state): State<Arc<AppState>>) -> Json<Value> {
    let meals: Vec<Value> = state
        .meals
        .list()
        .await
        .iter()
        .map(|meal| {
            json!({
                "id": meal.id,
                "name": meal.name,
                "item_count": meal.items.len(),
                "total_calories": meal.total_calories(),
                "total_protein": meal.total_protein(),
                "created": meal.created,
            })
        })
        .collect();
    Json(json!({ "meals": meals }))
}

#[derive(Debug, Deserialize)]
pub struct LogMealRequest {
    #[serde(default)]
    pub meal_id: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

pub async fn log_meal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogMealRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let meal_id = request
        .meal_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MalformedRequest("No meal_id provided".to_string()))?;
    let meal = state.meals.get(&meal_id).await?;

    state.log.insert(meal.log_entries(Utc::now())).await?;
    info!(meal = %meal.name, items = meal.items.len(), "Logged meal");
    state.notifier.mark_updated(request.nonce).await;

    Ok(Json(json!({
        "status": "success",
        "meal_name": meal.name,
        "items_logged": meal.items.len(),
        "total_calories": meal.total_calories(),
    })))
}
