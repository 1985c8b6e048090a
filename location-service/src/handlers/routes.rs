use crate::dtos::locations::{RoutesParams, RoutesResponse};
use crate::startup::AppState;
use crate::utils::ValidatedQuery;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

pub async fn get_routes(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<RoutesParams>,
) -> Result<impl IntoResponse, AppError> {
    let origin = params.origin().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("latitude and longitude are required"))
    })?;

    let routes = state.locations.routes(origin).await?;

    Ok(Json(RoutesResponse { routes }))
}
