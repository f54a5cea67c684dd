use crate::api::routes::deployments::find_deployment;
use crate::api::routes::ensure_consent;
use crate::api::server::AppState;
use actix_web::{
    web::{self, post, Data},
    HttpResponse, Scope,
};
use log::error;
use serde::Deserialize;
use serde_json::json;
use shared::models::NodeState;
use shared::security::session::UserInfo;

#[derive(Deserialize)]
struct NodeCancelRequest {
    name: String,
    #[serde(default)]
    solution_type: String,
    wid: u64,
}

/// Tear down a single workload of a deployment and mark its node Deleted.
async fn cancel_node(
    user: UserInfo,
    body: web::Json<NodeCancelRequest>,
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

    if deployment.node_by_wid(body.wid).is_none() {
        return HttpResponse::NotFound().json(json!({
            "error": format!("workload {} not part of deployment {}", body.wid, body.name)
        }));
    }

    if let Err(e) = app_state.grid.decommission_workload(body.wid).await {
        error!("Error decommissioning workload {}: {e}", body.wid);
        return HttpResponse::InternalServerError().json(json!({
            "error": "Failed to cancel node"
        }));
    }
    if let Err(e) = app_state
        .store_context
        .deployment_store
        .update_node_state(
            &identity_name,
            deployment.solution_type,
            &deployment.deployment_name,
            body.wid,
            NodeState::Deleted,
        )
        .await
    {
        error!("Error recording node deletion: {e}");
        return HttpResponse::InternalServerError().json(json!({
            "error": "Failed to cancel node"
        }));
    }
    HttpResponse::Ok().json(json!({"data": {}}))
}

pub fn nodes_routes() -> Scope {
    web::scope("/node").route("/cancel", post().to(cancel_node))
}
