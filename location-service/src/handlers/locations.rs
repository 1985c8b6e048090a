use crate::dtos::locations::{
    CreateLocationRequest, CreateLocationResponse, GetLocationParams, LocationListParams,
    LocationListResponse, LocationResponse, UpdateLocationsRequest,
};
use crate::models::UpdateOutcome;
use crate::services::PageRequest;
use crate::startup::AppState;
use crate::utils::{ParsedQuery, ValidatedJson};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

pub async fn create_location(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = state.locations.create(payload.into()).await?;

    Ok(Json(CreateLocationResponse { id: id.to_string() }))
}

pub async fn get_location(
    State(state): State<AppState>,
    ParsedQuery(params): ParsedQuery<GetLocationParams>,
) -> Result<impl IntoResponse, AppError> {
    let location = state.locations.get(&params.id).await?;

    Ok(Json(LocationResponse::from(location)))
}

pub async fn list_locations(
    State(state): State<AppState>,
    ParsedQuery(params): ParsedQuery<LocationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit);
    let locations = state.locations.list(page).await?;

    Ok(Json(LocationListResponse {
        locations: locations.into_iter().map(LocationResponse::from).collect(),
    }))
}

pub async fn update_locations(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateLocationsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.locations.update(payload.instructions()).await?;

    Ok((outcome_status(&outcome), Json(outcome)))
}

/// 200 when every record was updated, 206 for a mix, 500 when none were.
fn outcome_status(outcome: &UpdateOutcome) -> StatusCode {
    if outcome.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else if outcome.updated_ids.is_empty() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(updated: &[&str], failed: &[&str]) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();
        for id in updated {
            outcome.record_updated(*id, 1);
        }
        for id in failed {
            outcome.record_failed(*id);
        }
        outcome
    }

    #[test]
    fn status_follows_the_outcome_partition() {
        assert_eq!(outcome_status(&outcome(&["a"], &[])), StatusCode::OK);
        assert_eq!(
            outcome_status(&outcome(&["a"], &["b"])),
            StatusCode::PARTIAL_CONTENT
        );
        assert_eq!(
            outcome_status(&outcome(&[], &["b"])),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
