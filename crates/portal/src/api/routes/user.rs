use crate::api::server::AppState;
use actix_web::{
    web::{self, get, Data},
    HttpResponse, Scope,
};
use log::{error, info};
use serde_json::json;
use shared::grid::GridNetwork;
use shared::models::user::{prefixed_tname, suffixed_email};
use shared::models::UserEntry;
use shared::security::session::UserInfo;

/// Make sure the intermediate identity and user wallet behind a consented
/// user exist. Both calls are idempotent on the upstream services.
async fn provision_user(
    app_state: &Data<AppState>,
    user: &UserInfo,
    entry_name: &str,
) -> Result<(), HttpResponse> {
    if let Err(e) = app_state.wallet.get_or_create(entry_name).await {
        error!("Error provisioning wallet for {entry_name}: {e}");
        return Err(HttpResponse::InternalServerError().json(json!({
            "error": "Error on wallet activation"
        })));
    }
    if let Err(e) = app_state
        .grid
        .register_identity(entry_name, &suffixed_email(&user.email))
        .await
    {
        error!("Error registering identity {entry_name}: {e}");
        return Err(HttpResponse::InternalServerError().json(json!({
            "error": "Failed to register intermediate identity"
        })));
    }
    Ok(())
}

async fn accept(user: UserInfo, app_state: Data<AppState>) -> HttpResponse {
    let explorer_url = app_state.explorer_url.clone();
    if GridNetwork::from_explorer_url(&explorer_url).is_none() {
        return HttpResponse::InternalServerError().json(json!({
            "error": format!("explorer {explorer_url} is not supported")
        }));
    }

    let entry_name = prefixed_tname(&user.tname);
    let user_store = &app_state.store_context.user_store;
    match user_store.get(&entry_name).await {
        Ok(Some(entry)) if entry.has_agreed => {
            HttpResponse::Ok().json(json!({"allowed": true}))
        }
        Ok(_) => {
            let entry = UserEntry {
                tname: user.tname.clone(),
                explorer_url,
                has_agreed: true,
            };
            if let Err(e) = user_store.save(&entry_name, &entry).await {
                error!("Error saving user entry: {e}");
                return HttpResponse::InternalServerError().json(json!({
                    "error": "Failed to store user entry"
                }));
            }
            if let Err(resp) = provision_user(&app_state, &user, &entry_name).await {
                return resp;
            }
            info!("User {} accepted the terms", user.tname);
            HttpResponse::Created().json(json!({"allowed": true}))
        }
        Err(e) => {
            error!("Error loading user entry: {e}");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to load user entry"
            }))
        }
    }
}

async fn allowed(user: UserInfo, app_state: Data<AppState>) -> HttpResponse {
    let entries = match app_state.store_context.user_store.list_all().await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error listing user entries: {e}");
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to list user entries"
            }));
        }
    };

    for entry in entries {
        if entry.tname == user.tname
            && entry.explorer_url == app_state.explorer_url
            && entry.has_agreed
        {
            // Re-check on every call so a half-provisioned user heals here.
            let entry_name = prefixed_tname(&user.tname);
            if let Err(resp) = provision_user(&app_state, &user, &entry_name).await {
                return resp;
            }
            return HttpResponse::Ok().json(json!({"allowed": true}));
        }
    }
    HttpResponse::Ok().json(json!({"allowed": false}))
}

pub fn user_routes() -> Scope {
    web::scope("")
        .route("/accept", get().to(accept))
        .route("/allowed", get().to(allowed))
}
