use crate::api::routes::admins::admins_routes;
use crate::api::routes::deployments::deployments_routes;
use crate::api::routes::nodes::nodes_routes;
use crate::api::routes::solutions::solutions_routes;
use crate::api::routes::status::status_routes;
use crate::api::routes::user::user_routes;
use crate::api::routes::wallet::wallet_routes;
use crate::store::core::{RedisStore, StoreContext};
use crate::utils::loop_heartbeats::LoopHeartbeats;
use actix_web::middleware::{Compress, NormalizePath, TrailingSlash};
use actix_web::{middleware, web, web::Data, App, HttpResponse, HttpServer};
use anyhow::Error;
use log::info;
use serde_json::json;
use shared::grid::GridClient;
use shared::security::session::SessionAuth;
use shared::wallet::WalletClient;
use std::sync::Arc;

pub struct AppState {
    pub store_context: Arc<StoreContext>,
    pub grid: Arc<GridClient>,
    pub wallet: Arc<WalletClient>,
    pub heartbeats: Arc<LoopHeartbeats>,
    pub redis_store: Arc<RedisStore>,
    /// Explorer this portal instance is bound to; user entries are matched
    /// against it on every consent check.
    pub explorer_url: String,
}

#[allow(clippy::too_many_arguments)]
pub async fn start_server(
    host: &str,
    port: u16,
    store_context: Arc<StoreContext>,
    grid: Arc<GridClient>,
    wallet: Arc<WalletClient>,
    session_secret: String,
    heartbeats: Arc<LoopHeartbeats>,
    redis_store: Arc<RedisStore>,
    explorer_url: String,
) -> Result<(), Error> {
    info!("Starting portal at http://{}:{}", host, port);
    let app_state = Data::new(AppState {
        store_context,
        grid,
        wallet,
        heartbeats,
        redis_store,
        explorer_url,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(Compress::default())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .service(web::resource("/health").route(web::get().to(
                |data: web::Data<AppState>| async move {
                    let health_status = data.heartbeats.health_status();
                    if health_status.healthy {
                        HttpResponse::Ok().json(health_status)
                    } else {
                        HttpResponse::InternalServerError().json(health_status)
                    }
                },
            )))
            .service(
                web::scope("/api")
                    .wrap(SessionAuth::new(session_secret.clone()))
                    .service(status_routes())
                    .service(admins_routes())
                    .service(deployments_routes())
                    .service(nodes_routes())
                    .service(wallet_routes())
                    .service(solutions_routes())
                    .service(user_routes()),
            )
            .default_service(web::route().to(|| async {
                HttpResponse::NotFound().json(json!({
                    "error": "Resource not found"
                }))
            }))
    })
    .bind((host, port))?
    .run()
    .await?;
    Ok(())
}
