use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::Identity;
use crate::err::{Error, Success};
use crate::models::ThesisData;
use crate::{proceeds, Payload};

#[derive(Debug, Clone, Serialize)]
pub struct ThesisList {
    pub theses: Vec<ThesisData>,
}

pub async fn list_theses(
    Extension(identity): Extension<Identity>,
    Extension(pg): Extension<PgPool>,
) -> Payload<ThesisList> {
    let theses = sqlx::query_as::<_, ThesisData>(
        "SELECT id, teacher_id, title, summary FROM thesis WHERE teacher_id = $1",
    )
    .bind(identity.user_id)
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(ThesisList { theses })
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewThesis {
    pub title: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThesisCreated {
    pub message: String,
}

pub async fn create_thesis(
    Extension(identity): Extension<Identity>,
    Extension(pg): Extension<PgPool>,
    Json(body): Json<NewThesis>,
) -> Result<impl IntoResponse, Error> {
    let (title, summary) = match (non_empty(body.title), non_empty(body.summary)) {
        (Some(title), Some(summary)) => (title, summary),
        _ => {
            return Err(Error::InvalidPayload {
                message: "Title and summary are required".to_string(),
            })
        }
    };

    let res = sqlx::query("INSERT INTO thesis (teacher_id, title, summary) VALUES ($1, $2, $3)")
        .bind(identity.user_id)
        .bind(&title)
        .bind(&summary)
        .execute(&pg)
        .await
        .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        log::error!("Thesis insert affected no rows");
        return Err(Error::server_error("DatabaseError"));
    }

    log::info!("Thesis created by user {}", identity.user_id);
    Ok((
        StatusCode::CREATED,
        Success::of(ThesisCreated {
            message: "Thesis created successfully".to_string(),
        }),
    ))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
