use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use super::extract::{ApiJson, ApiPath};
use super::AppState;
use crate::error::Result;
use crate::models::{AccommodationAlert, NewAlert, NewStudent, Student};

pub async fn create_student(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewStudent>,
) -> Result<(StatusCode, Json<Student>)> {
    let student = state.db.create_student(new).await?;
    info!("Registered student {}", student.id);
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<i64>,
) -> Result<Json<Vec<AccommodationAlert>>> {
    Ok(Json(state.db.list_alerts(student_id).await?))
}

pub async fn create_alert(
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<i64>,
    ApiJson(new): ApiJson<NewAlert>,
) -> Result<(StatusCode, Json<AccommodationAlert>)> {
    let alert = state.db.create_alert(student_id, new).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    ApiPath((student_id, alert_id)): ApiPath<(i64, i64)>,
) -> Result<StatusCode> {
    state.db.delete_alert(student_id, alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
