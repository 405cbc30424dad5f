//! Extractors whose rejections render as [`AppError`] bodies.
//!
//! Axum's stock `Json`, `Path` and `Query` reject with plain-text bodies
//! and, for JSON data errors, a 422. These wrappers report every malformed
//! request as a 400 in the same `{ code, message }` shape as other errors.

use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON body extractor.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
