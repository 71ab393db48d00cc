pub mod admin;
pub mod notifications;
pub mod passes;
pub mod payments;
pub mod qr;
pub mod tickets;
pub mod transit;
pub mod users;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use serde::Serialize;
use uuid::Uuid;

use std::future::{ready, Ready};

use crate::errors::ServiceError;

#[derive(Serialize)]
pub struct Response {
    pub success: bool,
}

/// Authenticated caller. Session handling lives in the auth proxy in front
/// of this service, which forwards the resolved user id in X-User-Id.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
}

impl FromRequest for Identity {
    type Error = ServiceError;
    type Future = Ready<Result<Identity, ServiceError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.headers()
                .get("X-User-Id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok())
                .map(|user_id| Identity { user_id })
                .ok_or(ServiceError::Unauthorized),
        )
    }
}
