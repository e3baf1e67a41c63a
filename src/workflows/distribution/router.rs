use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::export;

use super::dashboard::{self, DashboardSummary};
use super::domain::{BlockPeriod, FamilyId, InstitutionId};
use super::eligibility::{filter_families, StatusFilter};
use super::repository::{
    DeliveryRepository, FamilyRepository, InstitutionRepository, RepositoryError, UserRepository,
};
use super::service::{
    CreateInstitutionRequest, DeliveryRequest, DistributionError, DistributionService,
    InstitutionUpdate, RegisterFamilyRequest,
};
use super::session::{AuthError, Session, SessionManager};

/// Shared state behind the distribution endpoints.
pub struct DistributionState<F, I, D, U> {
    pub service: DistributionService<F, I, D>,
    pub sessions: SessionManager<U>,
}

/// Router builder exposing the distribution HTTP surface.
pub fn distribution_router<F, I, D, U>(state: Arc<DistributionState<F, I, D, U>>) -> Router
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    Router::new()
        .route("/api/v1/login", post(login_handler::<F, I, D, U>))
        .route("/api/v1/logout", post(logout_handler::<F, I, D, U>))
        .route(
            "/api/v1/families",
            get(list_families_handler::<F, I, D, U>)
                .post(register_family_handler::<F, I, D, U>),
        )
        .route(
            "/api/v1/families/:family_id/unblock",
            post(unblock_handler::<F, I, D, U>),
        )
        .route(
            "/api/v1/institutions",
            get(list_institutions_handler::<F, I, D, U>)
                .post(create_institution_handler::<F, I, D, U>),
        )
        .route(
            "/api/v1/institutions/:institution_id",
            put(update_institution_handler::<F, I, D, U>),
        )
        .route(
            "/api/v1/deliveries",
            get(list_deliveries_handler::<F, I, D, U>)
                .post(record_delivery_handler::<F, I, D, U>),
        )
        .route("/api/v1/inventory", post(add_stock_handler::<F, I, D, U>))
        .route("/api/v1/dashboard", get(dashboard_handler::<F, I, D, U>))
        .route(
            "/api/v1/reports/:report",
            get(report_handler::<F, I, D, U>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FamilyListParams {
    #[serde(default)]
    status: StatusFilter,
    #[serde(default)]
    search: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordDeliveryRequest {
    family_id: String,
    basket_count: u32,
    #[serde(default)]
    other_items: String,
    block_period: BlockPeriod,
    #[serde(default)]
    institution_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddStockRequest {
    item: String,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewFamilyRequest {
    name: String,
    address: String,
    phone: String,
    members: u32,
    income: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewInstitutionRequest {
    name: String,
    address: String,
    phone: String,
    baskets: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditInstitutionRequest {
    name: String,
    address: String,
    phone: String,
}

fn error_body(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(json!({ "error": message.into() }))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, error_body("authentication required")).into_response()
}

/// Resolve the bearer token on the request into an explicit session.
fn session_from_headers<F, I, D, U>(
    state: &DistributionState<F, I, D, U>,
    headers: &HeaderMap,
) -> Result<Session, Response>
where
    U: UserRepository + 'static,
{
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    state.sessions.resolve(token).map_err(|_| unauthorized())
}

fn distribution_error_response(error: DistributionError) -> Response {
    let status = match &error {
        DistributionError::Forbidden => StatusCode::FORBIDDEN,
        DistributionError::MissingInstitution
        | DistributionError::InvalidName
        | DistributionError::FamilyBlocked { .. }
        | DistributionError::InvalidBasketCount
        | DistributionError::InsufficientInventory { .. }
        | DistributionError::InvalidItemName
        | DistributionError::InvalidQuantity => StatusCode::UNPROCESSABLE_ENTITY,
        DistributionError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        DistributionError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        DistributionError::Repository(RepositoryError::InsufficientStock { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DistributionError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, error_body(error.to_string())).into_response()
}

pub(crate) async fn login_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    Json(payload): Json<LoginRequest>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    match state.sessions.login(&payload.email, &payload.password) {
        Ok((token, session)) => (
            StatusCode::OK,
            Json(json!({ "token": token, "user": session })),
        )
            .into_response(),
        Err(AuthError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            error_body("invalid email or password"),
        )
            .into_response(),
        Err(other) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(other.to_string()))
            .into_response(),
    }
}

pub(crate) async fn logout_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        state.sessions.logout(token);
    }
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) async fn list_families_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Query(params): Query<FamilyListParams>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    if let Err(response) = session_from_headers(&state, &headers) {
        return response;
    }

    match state.service.families() {
        Ok(families) => {
            let filtered: Vec<_> = filter_families(&families, params.status, &params.search)
                .into_iter()
                .cloned()
                .collect();
            (StatusCode::OK, Json(filtered)).into_response()
        }
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn register_family_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Json(payload): Json<NewFamilyRequest>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let request = RegisterFamilyRequest {
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
        members: payload.members,
        income: payload.income,
    };

    match state.service.register_family(&session, request) {
        Ok(family) => (StatusCode::CREATED, Json(family)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn list_institutions_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.service.institutions_for(&session) {
        Ok(institutions) => (StatusCode::OK, Json(institutions)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn create_institution_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Json(payload): Json<NewInstitutionRequest>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let request = CreateInstitutionRequest {
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
        baskets: payload.baskets,
    };

    match state.service.create_institution(&session, request) {
        Ok(institution) => (StatusCode::CREATED, Json(institution)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn update_institution_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Path(institution_id): Path<String>,
    Json(payload): Json<EditInstitutionRequest>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let update = InstitutionUpdate {
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
    };

    match state
        .service
        .update_institution(&session, &InstitutionId(institution_id), update)
    {
        Ok(institution) => (StatusCode::OK, Json(institution)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn record_delivery_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Json(payload): Json<RecordDeliveryRequest>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let request = DeliveryRequest {
        family_id: FamilyId(payload.family_id),
        basket_count: payload.basket_count,
        other_items: payload.other_items,
        block_period: payload.block_period,
        institution_id: payload.institution_id.map(InstitutionId),
    };

    match state.service.record_delivery(&session, request) {
        Ok(delivery) => (StatusCode::CREATED, Json(delivery)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn list_deliveries_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.service.deliveries_for(&session) {
        Ok(deliveries) => (StatusCode::OK, Json(deliveries)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn unblock_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Path(family_id): Path<String>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state
        .service
        .unblock_family(&session, &FamilyId(family_id))
    {
        Ok(family) => (StatusCode::OK, Json(family)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn add_stock_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Json(payload): Json<AddStockRequest>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state
        .service
        .add_stock(&session, &payload.item, payload.quantity)
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => distribution_error_response(err),
    }
}

pub(crate) async fn dashboard_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match dashboard_summary(&state, &session) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => distribution_error_response(err),
    }
}

fn dashboard_summary<F, I, D, U>(
    state: &DistributionState<F, I, D, U>,
    session: &Session,
) -> Result<DashboardSummary, DistributionError>
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let families = state.service.families()?;
    let institutions = state.service.institutions()?;
    let deliveries = state.service.deliveries_for(session)?;
    Ok(dashboard::summarize(
        session,
        &families,
        &institutions,
        &deliveries,
    ))
}

pub(crate) async fn report_handler<F, I, D, U>(
    State(state): State<Arc<DistributionState<F, I, D, U>>>,
    headers: HeaderMap,
    Path(report): Path<String>,
) -> Response
where
    F: FamilyRepository + 'static,
    I: InstitutionRepository + 'static,
    D: DeliveryRepository + 'static,
    U: UserRepository + 'static,
{
    let session = match session_from_headers(&state, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let rendered = match report.as_str() {
        "families.csv" => state
            .service
            .families()
            .map_err(distribution_error_response)
            .and_then(|families| {
                export::families_csv(&families)
                    .map_err(|err| {
                        (StatusCode::INTERNAL_SERVER_ERROR, error_body(err.to_string()))
                            .into_response()
                    })
            }),
        "institutions.csv" => state
            .service
            .institutions()
            .map_err(distribution_error_response)
            .and_then(|institutions| {
                export::institutions_csv(&institutions)
                    .map_err(|err| {
                        (StatusCode::INTERNAL_SERVER_ERROR, error_body(err.to_string()))
                            .into_response()
                    })
            }),
        "deliveries.csv" => state
            .service
            .deliveries_for(&session)
            .map_err(distribution_error_response)
            .and_then(|deliveries| {
                export::deliveries_csv(&deliveries)
                    .map_err(|err| {
                        (StatusCode::INTERNAL_SERVER_ERROR, error_body(err.to_string()))
                            .into_response()
                    })
            }),
        _ => {
            return (StatusCode::NOT_FOUND, error_body("unknown report")).into_response();
        }
    };

    match rendered {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{report}\""),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(response) => response,
    }
}
