//! Extractors for record and gateway routes that reject with `AppError`.
//!
//! Axum's own extractors answer bad input with plain text. These keep the
//! `{status, message}` shape and say which part of the request was wrong:
//! a record id that is not a number names the `id` parameter, a missing
//! `batchDate` names the query field.

use axum::{
    extract::{
        FromRequest, FromRequestParts, RawPathParams, Request,
        path::ErrorKind,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, msg};

/// Request or response body as JSON.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(body)| Json(body))
            .map_err(body_error)
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Record filters, batch dates and report options from the query string.
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(query)| Query(query))
            .map_err(query_error)
    }
}

/// Record ids and gateway object ids from the route.
#[derive(Debug, Clone)]
pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let names: Vec<String> = RawPathParams::from_request_parts(parts, state)
            .await
            .map(|raw| raw.iter().map(|(name, _)| name.to_string()).collect())
            .unwrap_or_default();
        axum::extract::Path::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Path(value)| Path(value))
            .map_err(|rejection| path_error(rejection, &names))
    }
}

fn body_error(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(format!("{}: {}", msg::INVALID_REQUEST_BODY, rejection.body_text()))
}

fn query_error(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(format!("{}: {}", msg::INVALID_QUERY, rejection.body_text()))
}

/// `names` are the route's parameter names in order, used when axum reports
/// a position or nothing at all instead of a key.
fn path_error(rejection: PathRejection, names: &[String]) -> AppError {
    let PathRejection::FailedToDeserializePathParams(failed) = &rejection else {
        return AppError::BadRequest(format!("{}: {}", msg::INVALID_PATH, rejection.body_text()));
    };
    let (name, value, expected_type) = match failed.kind() {
        ErrorKind::ParseErrorAtKey {
            key,
            value,
            expected_type,
        } => (Some(key.as_str()), value, *expected_type),
        ErrorKind::ParseErrorAtIndex {
            index,
            value,
            expected_type,
        } => (names.get(*index).map(String::as_str), value, *expected_type),
        ErrorKind::ParseError {
            value,
            expected_type,
        } => (
            names.first().filter(|_| names.len() == 1).map(String::as_str),
            value,
            *expected_type,
        ),
        _ => {
            return AppError::BadRequest(format!("{}: {}", msg::INVALID_PATH, failed.body_text()));
        }
    };
    let message = match name {
        Some(name) => format!(
            "{} '{}': expected {}, got '{}'",
            msg::INVALID_PATH,
            name,
            describe(expected_type),
            value
        ),
        None => format!(
            "{}: expected {}, got '{}'",
            msg::INVALID_PATH,
            describe(expected_type),
            value
        ),
    };
    AppError::BadRequest(message)
}

fn describe(expected_type: &'static str) -> &'static str {
    match expected_type {
        "i64" | "i32" | "u64" | "u32" | "usize" => "a whole number",
        other => other,
    }
}
