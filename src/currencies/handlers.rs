use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::dto::{
    ConvertRequest, ConvertResponse, CreateCurrencyRequest, HistoryQuery, HistoryResponse,
    LatestRate, PreferenceRequest, TrendPoint, TrendsQuery, TrendsResponse,
    UpdateCurrencyRequest, UpdateRatesResponse,
};
use super::repo::{self, Currency};
use super::services;
use crate::{
    auth::{repo::User, AdminUser, AuthUser},
    error::{AppError, AppResult},
    params::day_range,
    state::AppState,
};

const HISTORY_DEFAULT_DAYS: i64 = 30;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/currencies", get(list_currencies).post(create_currency))
        .route("/currencies/default", get(default_currency))
        .route("/currencies/rates", get(latest_rates))
        .route("/currencies/convert", post(convert))
        .route("/currencies/update-rates", post(update_rates))
        .route(
            "/currencies/user/preference",
            get(get_preference).post(set_preference),
        )
        .route(
            "/currencies/:code",
            get(get_currency).put(update_currency).delete(delete_currency),
        )
        .route("/currencies/:code/history", get(rate_history))
        .route("/currencies/:code/trends", get(rate_trends))
        .route("/currencies/:code/set-default", post(set_default))
}

/// Looks up an active currency by a case-insensitive code.
async fn active(state: &AppState, code: &str) -> AppResult<Currency> {
    let code = code.trim().to_ascii_uppercase();
    repo::find_active(&state.db, &code)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Currency {code} not found")))
}

#[instrument(skip(state))]
pub async fn list_currencies(State(state): State<AppState>) -> AppResult<Json<Vec<Currency>>> {
    Ok(Json(repo::list_active(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn default_currency(State(state): State<AppState>) -> AppResult<Json<Currency>> {
    repo::find_default(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("No default currency configured"))
}

#[instrument(skip(state))]
pub async fn get_currency(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Currency>> {
    Ok(Json(active(&state, &code).await?))
}

#[instrument(skip(state))]
pub async fn latest_rates(State(state): State<AppState>) -> AppResult<Json<Vec<LatestRate>>> {
    let rates = repo::list_active(&state.db)
        .await?
        .into_iter()
        .map(LatestRate::from)
        .collect();
    Ok(Json(rates))
}

#[instrument(skip(state))]
pub async fn convert(
    State(state): State<AppState>,
    Json(payload): Json<ConvertRequest>,
) -> AppResult<Json<ConvertResponse>> {
    if payload.amount < Decimal::ZERO {
        return Err(AppError::bad_request("Amount must not be negative"));
    }
    let from = active(&state, &payload.from_currency).await?;
    let to = active(&state, &payload.to_currency).await?;
    let converted_amount = services::convert(payload.amount, from.exchange_rate, to.exchange_rate)?;
    Ok(Json(ConvertResponse {
        amount: payload.amount,
        rate: services::cross_rate(from.exchange_rate, to.exchange_rate),
        from_currency: from.code,
        to_currency: to.code,
        converted_amount,
    }))
}

#[instrument(skip(state))]
pub async fn rate_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let (start, end) = day_range(
        q.start_date.as_deref(),
        q.end_date.as_deref(),
        HISTORY_DEFAULT_DAYS,
    )?;
    let currency = active(&state, &code).await?;
    let rates = repo::history(&state.db, currency.id, start, end).await?;
    Ok(Json(HistoryResponse {
        code: currency.code,
        rates,
    }))
}

#[instrument(skip(state))]
pub async fn rate_trends(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(q): Query<TrendsQuery>,
) -> AppResult<Json<TrendsResponse>> {
    let (period, window) = services::period_window(q.period.as_deref());
    let currency = active(&state, &code).await?;
    let now = OffsetDateTime::now_utc();
    let history = repo::history(&state.db, currency.id, now - window, now).await?;

    let rates: Vec<_> = history.iter().map(|p| p.rate).collect();
    let points = history
        .into_iter()
        .zip(services::running_averages(&rates))
        .map(|(p, average)| TrendPoint {
            timestamp: p.recorded_at,
            rate: p.rate,
            average,
        })
        .collect();

    Ok(Json(TrendsResponse {
        code: currency.code,
        period,
        points,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_currency(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<CreateCurrencyRequest>,
) -> AppResult<(StatusCode, Json<Currency>)> {
    let (code, fields) = payload.into_fields()?;
    let currency = repo::insert(&state.db, &code, &fields)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("Currency {code} already exists")),
            other => other,
        })?;
    info!(code = %currency.code, by = %admin_id, "currency added");
    Ok((StatusCode::CREATED, Json(currency)))
}

#[instrument(skip(state, payload))]
pub async fn update_currency(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(code): Path<String>,
    Json(payload): Json<UpdateCurrencyRequest>,
) -> AppResult<Json<Currency>> {
    let code = code.trim().to_ascii_uppercase();
    let mut tx = state.db.begin().await?;
    let current = repo::lock_tx(&mut tx, &code)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Currency {code} not found")))?;
    let fields = payload.apply(&current)?;
    let currency = repo::update_tx(&mut tx, &current, &fields).await?;
    tx.commit().await?;
    info!(%code, by = %admin_id, rate = %currency.exchange_rate, "currency updated");
    Ok(Json(currency))
}

#[instrument(skip(state))]
pub async fn delete_currency(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(code): Path<String>,
) -> AppResult<StatusCode> {
    let code = code.trim().to_ascii_uppercase();
    let mut tx = state.db.begin().await?;
    let current = repo::lock_tx(&mut tx, &code)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::not_found(format!("Currency {code} not found")))?;
    if current.is_default {
        return Err(AppError::bad_request("Cannot delete the default currency"));
    }
    let fields = repo::CurrencyFields {
        name: current.name.clone(),
        symbol: current.symbol.clone(),
        exchange_rate: current.exchange_rate,
        is_active: false,
    };
    repo::update_tx(&mut tx, &current, &fields).await?;
    tx.commit().await?;
    info!(%code, by = %admin_id, "currency deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn set_default(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(code): Path<String>,
) -> AppResult<Json<Currency>> {
    let code = code.trim().to_ascii_uppercase();
    let mut tx = state.db.begin().await?;
    let currency = repo::set_default_tx(&mut tx, &code)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Currency {code} not found")))?;
    tx.commit().await?;
    info!(%code, by = %admin_id, "default currency changed");
    Ok(Json(currency))
}

#[instrument(skip(state))]
pub async fn update_rates(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
) -> AppResult<Json<UpdateRatesResponse>> {
    let rates = state.rates.latest().await?;
    let updated = repo::apply_rates(&state.db, &rates).await?;
    info!(by = %admin_id, fetched = rates.len(), updated, "exchange rates refreshed");
    Ok(Json(UpdateRatesResponse {
        message: "Exchange rates updated successfully",
        updated,
    }))
}

#[instrument(skip(state))]
pub async fn get_preference(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Currency>> {
    let account = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    match repo::find_active(&state.db, &account.preferred_currency).await? {
        Some(c) => Ok(Json(c)),
        None => default_currency(State(state)).await,
    }
}

#[instrument(skip(state, payload))]
pub async fn set_preference(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PreferenceRequest>,
) -> AppResult<Json<Currency>> {
    let currency = active(&state, &payload.currency_code).await?;
    if !User::set_preferred_currency(&state.db, user.id, &currency.code).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id = %user.id, code = %currency.code, "preferred currency set");
    Ok(Json(currency))
}
