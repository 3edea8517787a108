use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use contracts::shared::message::ApiMessage;
use thiserror::Error;

use crate::shared::errors::message_response;
use crate::system::users::UserSourceError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Usuario/contraseña incorrectos")]
    AuthFailed,

    #[error("Sesión no iniciada o expirada")]
    Unauthenticated,

    #[error(transparent)]
    Source(#[from] UserSourceError),

    #[error("Failed to issue session token: {0}")]
    Token(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::AuthFailed | AuthError::Unauthenticated => {
                message_response(StatusCode::UNAUTHORIZED, ApiMessage::error(self.to_string()))
            }
            AuthError::Source(e) => {
                tracing::error!("Login unavailable: {}", e);
                message_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiMessage::error("No se pudieron cargar los usuarios"),
                )
            }
            AuthError::Token(e) => {
                tracing::error!("Session token error: {}", e);
                message_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiMessage::error("Error interno al iniciar sesión"),
                )
            }
        }
    }
}
