use crate::api::server::AppState;
use crate::store::core::{RedisStore, StoreContext};
use crate::utils::loop_heartbeats::LoopHeartbeats;
use crate::ServerMode;
use actix_web::web::Data;
use shared::grid::GridClient;
use shared::models::UserEntry;
use shared::security::session::{issue_token, UserInfo};
use shared::wallet::WalletClient;
use std::sync::Arc;
use url::Url;

pub(crate) const TEST_SESSION_SECRET: &str = "portal-test-secret";

pub(crate) const TEST_EXPLORER_URL: &str = "https://explorer.testnet.grid.tf/api/v1";

pub(crate) fn test_user() -> UserInfo {
    UserInfo {
        tname: "tester.3bot".to_string(),
        email: "tester@example.com".to_string(),
    }
}

/// Authorization header for the test user, signed with the test secret.
pub(crate) fn bearer(user: &UserInfo) -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", issue_token(TEST_SESSION_SECRET, user, 300)),
    )
}

pub(crate) async fn create_test_app_state() -> Data<AppState> {
    // Nothing should reach these endpoints; tests that talk to the grid or
    // wallet use create_test_app_state_with_services instead.
    create_test_app_state_with_services("http://127.0.0.1:1", "http://127.0.0.1:1").await
}

pub(crate) async fn create_test_app_state_with_services(
    grid_url: &str,
    wallet_url: &str,
) -> Data<AppState> {
    let store = Arc::new(RedisStore::new_test());
    let mut con = store
        .client
        .get_connection()
        .expect("Should connect to test Redis instance");

    redis::cmd("PING")
        .query::<String>(&mut con)
        .expect("Redis should be responsive");
    redis::cmd("FLUSHDB")
        .query::<String>(&mut con)
        .expect("Redis should be flushed");

    let store_context = Arc::new(StoreContext::new(store.clone()));
    let mode = ServerMode::Full;

    Data::new(AppState {
        store_context,
        grid: Arc::new(GridClient::new(Url::parse(grid_url).unwrap())),
        wallet: Arc::new(WalletClient::new(Url::parse(wallet_url).unwrap())),
        heartbeats: Arc::new(LoopHeartbeats::new(&mode)),
        redis_store: store,
        explorer_url: TEST_EXPLORER_URL.to_string(),
    })
}

/// Store a consented entry for the user so consent-gated routes pass.
pub(crate) async fn seed_consented_user(app_state: &Data<AppState>, user: &UserInfo) {
    let entry = UserEntry {
        tname: user.tname.clone(),
        explorer_url: app_state.explorer_url.clone(),
        has_agreed: true,
    };
    app_state
        .store_context
        .user_store
        .save(
            &shared::models::user::prefixed_tname(&user.tname),
            &entry,
        )
        .await
        .expect("user entry should be stored");
}
