use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, OptionalFromRequest, Request};

use crate::error::AppError;

/// JSON request body whose rejections render as `{"error": ...}` with 400.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

impl<T, S> OptionalFromRequest<S> for JsonBody<T>
where
    Json<T>: OptionalFromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let body = <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(body.map(|Json(value)| JsonBody(value)))
    }
}
