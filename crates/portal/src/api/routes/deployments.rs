use crate::api::routes::ensure_consent;
use crate::api::server::AppState;
use crate::billing;
use crate::error::PortalError;
use crate::utils::secrets;
use actix_web::http::header::ContentType;
use actix_web::{
    web::{self, get, post, Data},
    HttpResponse, Scope,
};
use log::error;
use serde::Deserialize;
use serde_json::json;
use shared::models::api::ApiData;
use shared::models::{Deployment, SolutionType};
use shared::security::session::UserInfo;
use std::str::FromStr;

#[derive(Deserialize)]
struct DeploymentRequest {
    name: String,
    #[serde(default)]
    solution_type: String,
}

#[derive(Deserialize)]
struct SwitchAutoExtendRequest {
    name: String,
    #[serde(default)]
    solution_type: String,
    #[serde(default)]
    new_state: bool,
}

pub(crate) async fn find_deployment(
    app_state: &Data<AppState>,
    identity_name: &str,
    solution_type: &str,
    name: &str,
) -> Result<Deployment, HttpResponse> {
    let solution_type = SolutionType::from_str(solution_type)
        .map_err(|e| HttpResponse::BadRequest().json(json!({"error": e})))?;
    match app_state
        .store_context
        .deployment_store
        .get(identity_name, solution_type, name)
        .await
    {
        Ok(Some(deployment)) => Ok(deployment),
        Ok(None) => Err(HttpResponse::NotFound().json(json!({
            "error": format!("deployment {name} not found")
        }))),
        Err(e) => {
            error!("Error loading deployment: {e}");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to load deployment"
            })))
        }
    }
}

#[utoipa::path(
    get,
    path = "/deployments/{solution_type}",
    params(
        ("solution_type" = String, Path, description = "dash, presearch or ubuntu")
    ),
    responses(
        (status = 200, description = "Deployments retrieved successfully"),
        (status = 400, description = "Unknown solution type"),
        (status = 500, description = "Internal server error")
    ),
    tag = "deployments"
)]
async fn list_deployments(
    user: UserInfo,
    solution_type: web::Path<String>,
    app_state: Data<AppState>,
) -> HttpResponse {
    let identity_name = match ensure_consent(&app_state, &user).await {
        Ok(identity_name) => identity_name,
        Err(resp) => return resp,
    };
    let solution_type = match SolutionType::from_str(&solution_type) {
        Ok(solution_type) => solution_type,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": e})),
    };
    match app_state
        .store_context
        .deployment_store
        .list(&identity_name, Some(solution_type))
        .await
    {
        Ok(deployments) => ApiData::new(deployments).into(),
        Err(e) => {
            error!("Error listing deployments: {e}");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to list deployments"
            }))
        }
    }
}

async fn cancel_deployment(
    user: UserInfo,
    body: web::Json<DeploymentRequest>,
    app_state: Data<AppState>,
) -> HttpResponse {
    let identity_name = match ensure_consent(&app_state, &user).await {
        Ok(identity_name) => identity_name,
        Err(resp) => return resp,
    };
    let deployment =
        match find_deployment(&app_state, &identity_name, &body.solution_type, &body.name).await {
            Ok(deployment) => deployment,
            Err(resp) => return resp,
        };

    for wid in deployment.active_wids() {
        if let Err(e) = app_state.grid.decommission_workload(wid).await {
            error!("Error decommissioning workload {wid}: {e}");
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to cancel deployment"
            }));
        }
    }
    if let Err(e) = app_state
        .store_context
        .deployment_store
        .delete(&deployment)
        .await
    {
        error!("Error deleting deployment record: {e}");
        return HttpResponse::InternalServerError().json(json!({
            "error": "Failed to cancel deployment"
        }));
    }
    HttpResponse::Ok().json(json!({"data": {}}))
}

async fn extend_deployment(
    user: UserInfo,
    body: web::Json<DeploymentRequest>,
    app_state: Data<AppState>,
) -> HttpResponse {
    let identity_name = match ensure_consent(&app_state, &user).await {
        Ok(identity_name) => identity_name,
        Err(resp) => return resp,
    };
    let deployment =
        match find_deployment(&app_state, &identity_name, &body.solution_type, &body.name).await {
            Ok(deployment) => deployment,
            Err(resp) => return resp,
        };

    match billing::extend_deployment(
        &app_state.store_context,
        &app_state.grid,
        &app_state.wallet,
        &deployment,
    )
    .await
    {
        Ok(()) => HttpResponse::Ok().json(json!({"data": {}})),
        Err(PortalError::InsufficientFunds {
            required,
            available,
        }) => {
            error!(
                "Failed to extend deployment {}: {} TFT required, {} TFT available",
                deployment.deployment_name, required, available
            );
            HttpResponse::InternalServerError()
                .content_type(ContentType::json())
                .body(
                    "Failed to extend deployment due to insufficient funds in the wallet. \
                     To fund it, click on FUND WALLET",
                )
        }
        Err(e) => {
            error!(
                "Failed to extend deployment {}: {e}",
                deployment.deployment_name
            );
            HttpResponse::InternalServerError()
                .content_type(ContentType::json())
                .body("Failed to extend deployment")
        }
    }
}

async fn switch_auto_extend(
    user: UserInfo,
    body: web::Json<SwitchAutoExtendRequest>,
    app_state: Data<AppState>,
) -> HttpResponse {
    let identity_name = match ensure_consent(&app_state, &user).await {
        Ok(identity_name) => identity_name,
        Err(resp) => return resp,
    };
    let deployment =
        match find_deployment(&app_state, &identity_name, &body.solution_type, &body.name).await {
            Ok(deployment) => deployment,
            Err(resp) => return resp,
        };

    match app_state
        .store_context
        .deployment_store
        .set_auto_extend(
            &identity_name,
            deployment.solution_type,
            &deployment.deployment_name,
            body.new_state,
        )
        .await
    {
        Ok(()) => HttpResponse::Ok().json(json!({"data": {}})),
        Err(e) => {
            error!("Error switching auto extend: {e}");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to switch auto extend"
            }))
        }
    }
}

async fn get_secret(
    user: UserInfo,
    body: web::Json<DeploymentRequest>,
    app_state: Data<AppState>,
) -> HttpResponse {
    let identity_name = match ensure_consent(&app_state, &user).await {
        Ok(identity_name) => identity_name,
        Err(resp) => return resp,
    };
    let deployment =
        match find_deployment(&app_state, &identity_name, &body.solution_type, &body.name).await {
            Ok(deployment) => deployment,
            Err(resp) => return resp,
        };

    if deployment.secret_env.is_empty() {
        return HttpResponse::NotFound()
            .content_type(ContentType::json())
            .body("Failed to get deployment secret");
    }
    match secrets::decode_secret_env(&deployment.secret_env) {
        Ok(secret) => HttpResponse::Ok().json(json!({"data": secret})),
        Err(e) => {
            error!(
                "Error decoding secret env of {}: {e}",
                deployment.deployment_name
            );
            HttpResponse::NotFound()
                .content_type(ContentType::json())
                .body("Failed to get deployment secret")
        }
    }
}

pub fn deployments_routes() -> Scope {
    web::scope("/deployments")
        .route("/cancel", post().to(cancel_deployment))
        .route("/extend", post().to(extend_deployment))
        .route("/switch_auto_extend", post().to(switch_auto_extend))
        .route("/secret", post().to(get_secret))
        .route("/{solution_type}", get().to(list_deployments))
}
