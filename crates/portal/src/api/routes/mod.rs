pub mod admins;
pub mod deployments;
pub mod nodes;
pub mod solutions;
pub mod status;
pub mod user;
pub mod wallet;

use crate::api::server::AppState;
use crate::error::PortalError;
use actix_web::{web::Data, HttpResponse};
use log::error;
use serde_json::json;
use shared::models::api::ApiError;
use shared::models::user::prefixed_tname;
use shared::security::session::UserInfo;

/// Admin routes are open to members of the admin set only.
pub(crate) async fn ensure_admin(
    app_state: &Data<AppState>,
    user: &UserInfo,
) -> Result<(), HttpResponse> {
    match app_state
        .store_context
        .admin_store
        .contains(&user.tname)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => Err(HttpResponse::Forbidden().json(json!({
            "error": format!("{} is not an admin", user.tname)
        }))),
        Err(e) => {
            error!("Error checking admin membership: {e}");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to check admin membership"
            })))
        }
    }
}

/// Deployment, wallet and wizard routes require a consented user entry for
/// this portal's explorer. Returns the intermediate identity name.
pub(crate) async fn ensure_consent(
    app_state: &Data<AppState>,
    user: &UserInfo,
) -> Result<String, HttpResponse> {
    let entry_name = prefixed_tname(&user.tname);
    match app_state.store_context.user_store.get(&entry_name).await {
        Ok(Some(entry))
            if entry.has_agreed && entry.explorer_url == app_state.explorer_url =>
        {
            Ok(entry_name)
        }
        Ok(_) => Err(HttpResponse::Forbidden().json(json!({
            "error": "user has not accepted the terms of service"
        }))),
        Err(e) => {
            error!("Error loading user entry: {e}");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to load user entry"
            })))
        }
    }
}

/// Default mapping from portal errors to API responses. Routes with
/// endpoint-specific bodies (extend, secret) build their own.
pub(crate) fn portal_error_response(err: &PortalError) -> HttpResponse {
    match err {
        PortalError::Value(msg) => HttpResponse::BadRequest().json(ApiError::new(msg.clone())),
        PortalError::NotFound(what) => {
            HttpResponse::NotFound().json(ApiError::new(format!("{what} not found")))
        }
        PortalError::InsufficientFunds { .. } => {
            HttpResponse::InternalServerError().json(ApiError::new(err.to_string()))
        }
        _ => {
            error!("Request failed: {err}");
            HttpResponse::InternalServerError().json(ApiError::new("Internal error"))
        }
    }
}
