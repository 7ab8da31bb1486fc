//! Citizen HTTP routes.
//!
//! All paths are relative to the `/api/v2/citizen` mount point.

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, FixedOffset};
use citizen_core::{AddressFilter, CitizenListQuery, NewPerson, PersonId};
use serde::Deserialize;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    // One parameter name per segment position; `:id` is a personal number on `/guid`.
    Router::new()
        .route("/", get(list_citizens))
        .route("/batch", post(get_citizens_batch))
        .route("/changedaddress", get(get_changed_addresses))
        .route("/addresses", get(find_addresses))
        .route("/guid", post(create_person))
        .route("/guid/batch", post(get_person_ids_batch))
        .route("/:id", get(get_citizen))
        .route("/:id/personnumber", get(get_personal_number))
        .route("/:id/guid", get(get_person_id))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedQuery {
    #[serde(default)]
    pub show_classified: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub person_id: Option<Uuid>,
    #[serde(default)]
    pub show_classified: bool,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedAddressQuery {
    pub changed_date_from: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidQuery {
    pub municipality_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressQuery {
    pub status: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address_type: Option<String>,
}

pub async fn list_citizens(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Response, ApiError> {
    let query = CitizenListQuery {
        person_id: query.person_id,
        include_classified: query.show_classified,
        limit: query.limit,
        offset: query.offset,
    };
    let citizens = state
        .with_citizen_service(move |service| Ok(service.list_citizens(&query)?))
        .await?;
    Ok(Json(citizens).into_response())
}

pub async fn get_citizen(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ClassifiedQuery>,
) -> Result<Response, ApiError> {
    let person_id = parse_person_id(&id)?;
    let citizen = state
        .with_citizen_service(move |service| {
            Ok(service.get_by_id(person_id, query.show_classified)?)
        })
        .await?;

    Ok(match citizen {
        Some(citizen) => Json(citizen).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn get_citizens_batch(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ClassifiedQuery>,
    ApiJson(person_ids): ApiJson<Vec<Uuid>>,
) -> Result<Response, ApiError> {
    let citizens = state
        .with_citizen_service(move |service| {
            Ok(service.get_by_ids(&person_ids, query.show_classified)?)
        })
        .await?;
    Ok(Json(citizens).into_response())
}

pub async fn get_changed_addresses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChangedAddressQuery>,
) -> Result<Response, ApiError> {
    let since = query
        .changed_date_from
        .map(|changed_from| changed_from.timestamp_millis());
    let changed = state
        .with_address_service(move |service| Ok(service.get_changed_since(since)?))
        .await?;
    Ok(list_or_no_content(changed))
}

pub async fn find_addresses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> Result<Response, ApiError> {
    let filter = AddressFilter {
        status: query.status,
        city: query.city,
        postal_code: query.postal_code,
        address_type: query.address_type,
    };
    let addresses = state
        .with_address_service(move |service| Ok(service.find_addresses(&filter)?))
        .await?;
    Ok(list_or_no_content(addresses))
}

pub async fn get_personal_number(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let person_id = parse_person_id(&id)?;
    let personal_number = state
        .with_citizen_service(move |service| Ok(service.get_personal_number_by_id(person_id)?))
        .await?;
    Ok(Json(personal_number).into_response())
}

pub async fn get_person_id(
    State(state): State<AppState>,
    ApiPath(personal_number): ApiPath<String>,
    ApiQuery(query): ApiQuery<GuidQuery>,
) -> Result<Response, ApiError> {
    let municipality_id = query
        .municipality_id
        .unwrap_or_else(|| state.default_municipality_id().to_string());
    let person_id = state
        .with_citizen_service(move |service| {
            Ok(service.get_id_by_personal_number(&personal_number, &municipality_id)?)
        })
        .await?;

    Ok(match person_id {
        Some(person_id) => Json(person_id).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn get_person_ids_batch(
    State(state): State<AppState>,
    ApiJson(personal_numbers): ApiJson<Vec<String>>,
) -> Result<Response, ApiError> {
    let results = state
        .with_citizen_service(move |service| Ok(service.get_ids_in_batch(&personal_numbers)))
        .await?;
    Ok(Json(results).into_response())
}

pub async fn create_person(
    State(state): State<AppState>,
    body: Option<Json<NewPerson>>,
) -> Result<Response, ApiError> {
    let person = body.map(|Json(person)| person);
    let person_id = state
        .with_citizen_service(move |service| Ok(service.create_person(person.as_ref())?))
        .await?;
    Ok(Json(person_id).into_response())
}

fn parse_person_id(raw: &str) -> Result<PersonId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("not a valid UUID: {raw}")))
}

fn list_or_no_content<T: serde::Serialize>(items: Vec<T>) -> Response {
    if items.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(items).into_response()
    }
}
