use crate::api::routes::{ensure_consent, portal_error_response};
use crate::api::server::AppState;
use crate::wizard::WizardRunner;
use actix_web::{
    web::{self, post, Data},
    HttpResponse, Scope,
};
use serde::Deserialize;
use serde_json::json;
use shared::models::SolutionType;
use shared::security::session::UserInfo;
use std::str::FromStr;

#[derive(Deserialize)]
struct NextStepRequest {
    session_id: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
}

fn runner(app_state: &Data<AppState>) -> WizardRunner {
    WizardRunner::new(
        app_state.store_context.clone(),
        app_state.grid.clone(),
        app_state.wallet.clone(),
    )
}

/// Open a deployment wizard for one solution and return its first question.
async fn start_wizard(
    user: UserInfo,
    solution_type: web::Path<String>,
    app_state: Data<AppState>,
) -> HttpResponse {
    if let Err(resp) = ensure_consent(&app_state, &user).await {
        return resp;
    }
    let solution_type = match SolutionType::from_str(&solution_type) {
        Ok(solution_type) => solution_type,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": e})),
    };

    match runner(&app_state).start(&user, solution_type).await {
        Ok((session_id, outcome)) => HttpResponse::Created().json(json!({
            "data": {"session_id": session_id, "step": outcome}
        })),
        Err(e) => portal_error_response(&e),
    }
}

/// Feed one answer to an open wizard; runs payment and deployment once the
/// last answer is in.
async fn next_step(
    user: UserInfo,
    body: web::Json<NextStepRequest>,
    app_state: Data<AppState>,
) -> HttpResponse {
    let identity_name = match ensure_consent(&app_state, &user).await {
        Ok(identity_name) => identity_name,
        Err(resp) => return resp,
    };

    match runner(&app_state)
        .next(&body.session_id, &identity_name, body.value.as_ref())
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(json!({"data": outcome})),
        Err(e) => portal_error_response(&e),
    }
}

pub fn solutions_routes() -> Scope {
    web::scope("/solutions")
        .route("/next", post().to(next_step))
        .route("/{solution_type}", post().to(start_wizard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::helper::{
        bearer, create_test_app_state_with_services, seed_consented_user, test_user,
        TEST_SESSION_SECRET,
    };
    use actix_web::http::StatusCode;
    use actix_web::test;
    use actix_web::App;
    use shared::security::session::SessionAuth;

    #[actix_web::test]
    async fn test_start_wizard_returns_first_prompt() {
        let grid_server = mockito::Server::new_async().await;
        let wallet_server = mockito::Server::new_async().await;
        let app_state =
            create_test_app_state_with_services(&grid_server.url(), &wallet_server.url()).await;
        seed_consented_user(&app_state, &test_user()).await;

        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(solutions_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/solutions/ubuntu")
            .insert_header(bearer(&test_user()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(!json["data"]["session_id"].as_str().unwrap().is_empty());
        assert_eq!(json["data"]["step"]["kind"], "prompt");
        assert_eq!(json["data"]["step"]["step"], "get_deployment_name");
    }

    #[actix_web::test]
    async fn test_unknown_solution_type_is_400() {
        let grid_server = mockito::Server::new_async().await;
        let wallet_server = mockito::Server::new_async().await;
        let app_state =
            create_test_app_state_with_services(&grid_server.url(), &wallet_server.url()).await;
        seed_consented_user(&app_state, &test_user()).await;

        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(solutions_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/solutions/windows")
            .insert_header(bearer(&test_user()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_next_with_unknown_session_is_404() {
        let grid_server = mockito::Server::new_async().await;
        let wallet_server = mockito::Server::new_async().await;
        let app_state =
            create_test_app_state_with_services(&grid_server.url(), &wallet_server.url()).await;
        seed_consented_user(&app_state, &test_user()).await;

        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(solutions_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/solutions/next")
            .insert_header(bearer(&test_user()))
            .set_json(json!({"session_id": "does-not-exist", "value": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
