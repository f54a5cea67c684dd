use crate::api::routes::ensure_consent;
use crate::api::server::AppState;
use crate::billing;
use actix_web::{
    web::{self, get, Data},
    HttpResponse, Resource,
};
use log::error;
use serde_json::json;
use shared::security::session::UserInfo;

/// Funding details of the user's wallet: address, TFT balance, the top-up
/// amount needed to keep auto-extend deployments alive, and a payment QR.
async fn get_wallet(user: UserInfo, app_state: Data<AppState>) -> HttpResponse {
    let identity_name = match ensure_consent(&app_state, &user).await {
        Ok(identity_name) => identity_name,
        Err(resp) => return resp,
    };

    match billing::wallet_funding_info(
        &app_state.store_context,
        &app_state.grid,
        &app_state.wallet,
        &identity_name,
    )
    .await
    {
        Ok(Some(info)) => HttpResponse::Ok().json(json!({"data": info})),
        Ok(None) => HttpResponse::NotFound().json(json!({"wallet": false})),
        Err(e) => {
            error!("Error building wallet funding info: {e}");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to get wallet info"
            }))
        }
    }
}

pub fn wallet_routes() -> Resource {
    web::resource("/wallet").route(get().to(get_wallet))
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
    async fn test_missing_wallet_is_404() {
        let grid_server = mockito::Server::new_async().await;
        let mut wallet_server = mockito::Server::new_async().await;
        wallet_server
            .mock("GET", "/wallets/jukebox_tester")
            .with_status(404)
            .create_async()
            .await;

        let app_state =
            create_test_app_state_with_services(&grid_server.url(), &wallet_server.url()).await;
        seed_consented_user(&app_state, &test_user()).await;

        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(wallet_routes()),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/wallet")
            .insert_header(bearer(&test_user()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["wallet"], false);
    }

    #[actix_web::test]
    async fn test_wallet_funding_info_payload() {
        let grid_server = mockito::Server::new_async().await;
        let mut wallet_server = mockito::Server::new_async().await;
        wallet_server
            .mock("GET", "/wallets/jukebox_tester")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "jukebox_tester", "address": "GFUND", "network": "TEST"}"#)
            .create_async()
            .await;
        wallet_server
            .mock("GET", "/wallets/jukebox_tester/balances/TFT")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"amount": 33.0}"#)
            .create_async()
            .await;

        let app_state =
            create_test_app_state_with_services(&grid_server.url(), &wallet_server.url()).await;
        seed_consented_user(&app_state, &test_user()).await;

        let app = test::init_service(
            App::new()
                .app_data(app_state.clone())
                .wrap(SessionAuth::new(TEST_SESSION_SECRET.to_string()))
                .service(wallet_routes()),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/wallet")
            .insert_header(bearer(&test_user()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["address"], "GFUND");
        assert_eq!(json["data"]["balance"]["asset"], "TFT");
        // No auto-extend deployments seeded: the wallet already covers it.
        assert_eq!(json["data"]["amount"], 0.0);
        assert_eq!(json["data"]["network"], "TEST");
        assert!(!json["data"]["qrcode"].as_str().unwrap().is_empty());
    }
}
