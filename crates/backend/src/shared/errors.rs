use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::shared::message::ApiMessage;
use serde::de::DeserializeOwned;

/// JSON `{level, message}` body with the given status
pub fn message_response(status: StatusCode, message: ApiMessage) -> Response {
    (status, Json(message)).into_response()
}

/// `Json<T>` whose rejections use the `{level, message}` body instead of plain text
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejection_response(rejection)),
        }
    }
}

fn rejection_response(rejection: JsonRejection) -> Response {
    tracing::warn!("Rejected request body: {}", rejection.body_text());
    message_response(
        rejection.status(),
        ApiMessage::warning(format!("Solicitud inválida: {}", rejection.body_text())),
    )
}
