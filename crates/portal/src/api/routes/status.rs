use actix_web::{
    web::{self, get},
    HttpResponse, Resource,
};
use serde_json::json;
use shared::security::session::UserInfo;

async fn is_running(_user: UserInfo) -> HttpResponse {
    HttpResponse::Ok().json(json!({"running": true}))
}

pub fn status_routes() -> Resource {
    web::resource("/status").route(get().to(is_running))
}
