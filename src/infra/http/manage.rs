use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::application::error::HttpError;
use crate::application::ingest::IngestError;
use crate::application::topics::TopicError;

use super::AppState;

const UPLOAD_FIELD: &str = "post_file";

/// Multipart upload of one Markdown file; responds with a redirect to the
/// created or updated post.
pub(super) async fn upload_post(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(UPLOAD_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes.to_vec()));
                        break;
                    }
                    Err(err) => {
                        return HttpError::from_error(
                            "infra::http::manage::upload_post",
                            StatusCode::BAD_REQUEST,
                            "Upload could not be read",
                            &err,
                        )
                        .into_response();
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(err) => {
                return HttpError::from_error(
                    "infra::http::manage::upload_post",
                    StatusCode::BAD_REQUEST,
                    "Upload could not be read",
                    &err,
                )
                .into_response();
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return HttpError::new(
            "infra::http::manage::upload_post",
            StatusCode::BAD_REQUEST,
            format!("`{UPLOAD_FIELD}` field is required."),
            "multipart body had no upload field",
        )
        .into_response();
    };

    match state.ingest.ingest(&filename, &bytes).await {
        Ok(post) => Redirect::to(&format!("/posts/{}", post.slug)).into_response(),
        Err(err) => ingest_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TopicForm {
    name: String,
}

pub(super) async fn create_topic(
    State(state): State<AppState>,
    Form(form): Form<TopicForm>,
) -> Response {
    match state.topic_service.create(&form.name).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => topic_error_response(err),
    }
}

pub(super) async fn delete_topic(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.topic_service.delete(&name).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => topic_error_response(err),
    }
}

fn ingest_error_response(err: IngestError) -> Response {
    match &err {
        IngestError::Decode(_) => HttpError::from_error(
            "infra::http::manage::upload_post",
            StatusCode::BAD_REQUEST,
            "Upload must be UTF-8 encoded.",
            &err,
        )
        .into_response(),
        IngestError::Validation(message) => HttpError::new(
            "infra::http::manage::upload_post",
            StatusCode::BAD_REQUEST,
            message.clone(),
            "upload failed validation",
        )
        .into_response(),
        IngestError::Render(_) | IngestError::Repo(_) => HttpError::from_error(
            "infra::http::manage::upload_post",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Upload failed",
            &err,
        )
        .into_response(),
    }
}

fn topic_error_response(err: TopicError) -> Response {
    match &err {
        TopicError::EmptyName => HttpError::new(
            "infra::http::manage::topics",
            StatusCode::BAD_REQUEST,
            "Topic name must not be empty.",
            "topic form submitted with an empty name",
        )
        .into_response(),
        TopicError::NotFound { .. } => HttpError::new(
            "infra::http::manage::topics",
            StatusCode::NOT_FOUND,
            err.to_string(),
            "topic deletion targeted an unknown name",
        )
        .into_response(),
        TopicError::Render(_) | TopicError::Repo(_) => HttpError::from_error(
            "infra::http::manage::topics",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Topic action failed",
            &err,
        )
        .into_response(),
    }
}
