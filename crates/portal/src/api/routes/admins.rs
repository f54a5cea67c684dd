use crate::api::routes::ensure_admin;
use crate::api::server::AppState;
use actix_web::{
    web::{self, get, post, Data},
    HttpResponse, Scope,
};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use shared::security::session::UserInfo;

#[derive(Deserialize, utoipa::ToSchema)]
struct AdminRequest {
    #[serde(default)]
    name: String,
}

#[utoipa::path(
    get,
    path = "/admins/list",
    responses(
        (status = 200, description = "List of admins retrieved successfully"),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admins"
)]
async fn list_admins(user: UserInfo, app_state: Data<AppState>) -> HttpResponse {
    if let Err(resp) = ensure_admin(&app_state, &user).await {
        return resp;
    }
    match app_state.store_context.admin_store.list().await {
        Ok(admins) => HttpResponse::Ok().json(json!({"data": admins})),
        Err(e) => {
            error!("Error listing admins: {e}");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to list admins"
            }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/admins/add",
    responses(
        (status = 200, description = "Admin added"),
        (status = 400, description = "Empty or duplicate admin name"),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admins"
)]
async fn add_admin(
    user: UserInfo,
    body: web::Json<AdminRequest>,
    app_state: Data<AppState>,
) -> HttpResponse {
    if let Err(resp) = ensure_admin(&app_state, &user).await {
        return resp;
    }
    let name = body.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Admin name shouldn't be empty"
        }));
    }
    match app_state.store_context.admin_store.add(name).await {
        Ok(true) => HttpResponse::Ok().json(json!({"data": {}})),
        Ok(false) => HttpResponse::BadRequest().json(json!({
            "error": format!("Admin {name} already exists")
        })),
        Err(e) => {
            error!("Error adding admin: {e}");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to add admin"
            }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/admins/remove",
    responses(
        (status = 200, description = "Admin removed"),
        (status = 400, description = "Unknown name, empty name, or last admin"),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Internal server error")
    ),
    tag = "admins"
)]
async fn remove_admin(
    user: UserInfo,
    body: web::Json<AdminRequest>,
    app_state: Data<AppState>,
) -> HttpResponse {
    if let Err(resp) = ensure_admin(&app_state, &user).await {
        return resp;
    }
    let name = body.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Admin name shouldn't be empty"
        }));
    }

    let admin_store = &app_state.store_context.admin_store;
    match admin_store.contains(name).await {
        Ok(false) => {
            return HttpResponse::BadRequest().json(json!({
                "error": format!("Admin {name} does not exist")
            }));
        }
        Ok(true) => {}
        Err(e) => {
            error!("Error checking admin: {e}");
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to remove admin"
            }));
        }
    }
    match admin_store.count().await {
        Ok(1) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Jukebox should have at least one admin"
            }));
        }
        Ok(_) => {}
        Err(e) => {
            error!("Error counting admins: {e}");
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to remove admin"
            }));
        }
    }

    info!("Removing admin {name}");
    match admin_store.remove(name).await {
        Ok(_) => HttpResponse::Ok().json(json!({"data": {}})),
        Err(e) => {
            error!("Error removing admin: {e}");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to remove admin"
            }))
        }
    }
}

pub fn admins_routes() -> Scope {
    web::scope("/admins")
        .route("/list", get().to(list_admins))
        .route("/add", post().to(add_admin))
        .route("/remove", post().to(remove_admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::helper::{bearer, create_test_app_state, test_user, TEST_SESSION_SECRET};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use actix_web::App;
    use shared::security::session::SessionAuth;

    async fn seed_admins(app_state: &Data<AppState>, names: &[&str]) {
        for name in names {
            app_state
                .store_context
                .admin_store
                .add(name)
                .await
                .unwrap();
        }
    }

    #[actix_web::test]
    async fn test_duplicate_admin_rejected() {
        let app_state = create_test_app_state().await;
        seed_admins(&app_state, &["tester.3bot", "other.3bot"]).await;
        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(admins_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admins/add")
            .insert_header(bearer(&test_user()))
            .set_json(serde_json::json!({"name": "other.3bot"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("already exists"));
    }

    #[actix_web::test]
    async fn test_empty_admin_name_rejected() {
        let app_state = create_test_app_state().await;
        seed_admins(&app_state, &["tester.3bot"]).await;
        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(admins_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admins/add")
            .insert_header(bearer(&test_user()))
            .set_json(serde_json::json!({"name": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_last_admin_cannot_be_removed() {
        let app_state = create_test_app_state().await;
        seed_admins(&app_state, &["tester.3bot"]).await;
        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(admins_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admins/remove")
            .insert_header(bearer(&test_user()))
            .set_json(serde_json::json!({"name": test_user().tname}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Jukebox should have at least one admin");
    }

    #[actix_web::test]
    async fn test_remove_unknown_admin_rejected() {
        let app_state = create_test_app_state().await;
        seed_admins(&app_state, &["tester.3bot", "other.3bot"]).await;
        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(admins_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admins/remove")
            .insert_header(bearer(&test_user()))
            .set_json(serde_json::json!({"name": "ghost.3bot"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("does not exist"));
    }

    #[actix_web::test]
    async fn test_non_admin_is_forbidden() {
        let app_state = create_test_app_state().await;
        seed_admins(&app_state, &["boss.3bot"]).await;
        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(admins_routes()),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admins/list")
            .insert_header(bearer(&test_user()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_admin_lists_sorted_names() {
        let app_state = create_test_app_state().await;
        seed_admins(&app_state, &["tester.3bot", "zed.3bot", "ann.3bot"]).await;
        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(admins_routes()),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admins/list")
            .insert_header(bearer(&test_user()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let admins: Vec<String> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        let mut sorted = admins.clone();
        sorted.sort();
        assert_eq!(admins, sorted);
        assert!(admins.contains(&"ann.3bot".to_string()));
    }
}
