use crate::error::PortalError;
use crate::store::core::StoreContext;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;
use shared::grid::{FarmPrices, GridClient, Pool, PoolReservation};
use shared::models::{Deployment, ResourceQuery};
use shared::wallet::{WalletClient, PAYMENT_ASSET, TRANSACTION_FEES};
use std::sync::Arc;

/// Pools are bought and extended in 30-day slices.
pub const EXTENSION_DAYS: i64 = 30;

/// Deployments expiring within this window are picked up by auto-extend and
/// counted into the wallet funding amount.
pub const AUTO_EXTEND_THRESHOLD_DAYS: i64 = 2;

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CloudUnits {
    pub cu: f64,
    pub su: f64,
    pub ipv4u: f64,
}

/// Compute/storage units one container of the given size consumes per second.
pub fn container_units(query: &ResourceQuery) -> CloudUnits {
    CloudUnits {
        cu: (query.cru as f64 / 2.0).min(query.mru as f64 / 4.0),
        su: query.sru as f64 / 300.0,
        ipv4u: 0.0,
    }
}

/// Unit-seconds a pool must hold for `count` containers over `duration`.
pub fn required_units(query: &ResourceQuery, count: u32, duration_seconds: i64) -> CloudUnits {
    let per_container = container_units(query);
    let factor = count as f64 * duration_seconds as f64;
    CloudUnits {
        cu: per_container.cu * factor,
        su: per_container.su * factor,
        ipv4u: per_container.ipv4u * factor,
    }
}

/// TFT per second a pool burns at the given farm prices.
pub fn cost_per_second(pool: &Pool, prices: &FarmPrices) -> f64 {
    pool.active_cu * prices.cu + pool.active_su * prices.su + pool.active_ipv4 * prices.ipv4u
}

fn round6(amount: f64) -> f64 {
    (amount * 1e6).round() / 1e6
}

fn qrcode_base64(data: &str) -> Result<String, PortalError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| PortalError::Upstream(anyhow::anyhow!("QR encoding failed: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build();
    Ok(STANDARD.encode(image))
}

#[derive(Debug, Serialize)]
pub struct WalletBalance {
    pub amount: f64,
    pub asset: String,
}

#[derive(Debug, Serialize)]
pub struct FundingInfo {
    pub address: String,
    pub balance: WalletBalance,
    pub amount: f64,
    pub qrcode: String,
    pub network: String,
}

/// Settle a pool reservation from the named wallet. The balance is checked
/// up front so a short wallet surfaces as `InsufficientFunds` instead of a
/// failed transfer.
pub async fn pay_reservation(
    wallet: &WalletClient,
    wallet_name: &str,
    reservation: &PoolReservation,
) -> Result<(), PortalError> {
    if reservation.amount_due <= 0.0 {
        return Ok(());
    }
    let available = wallet.balance(wallet_name, PAYMENT_ASSET).await?;
    let required = reservation.amount_due + TRANSACTION_FEES;
    if available < required {
        return Err(PortalError::InsufficientFunds {
            required,
            available,
        });
    }
    wallet
        .transfer(
            wallet_name,
            &reservation.escrow_address,
            reservation.amount_due,
            PAYMENT_ASSET,
            &format!("pool-{}", reservation.reservation_id),
        )
        .await?;
    Ok(())
}

/// Extend a deployment's capacity pool by one slice, paid from the owning
/// identity's wallet, and push the expiration date out accordingly.
pub async fn extend_deployment(
    store_context: &Arc<StoreContext>,
    grid: &GridClient,
    wallet: &WalletClient,
    deployment: &Deployment,
) -> Result<(), PortalError> {
    let pool_id = *deployment
        .pool_ids
        .first()
        .ok_or_else(|| PortalError::NotFound("capacity pool".to_string()))?;
    let pool = grid.get_pool(pool_id).await?;

    let extension_seconds = (EXTENSION_DAYS * SECONDS_PER_DAY) as f64;
    let reservation = grid
        .extend_pool(
            pool_id,
            pool.active_cu * extension_seconds,
            pool.active_su * extension_seconds,
            pool.active_ipv4 * extension_seconds,
        )
        .await?;
    pay_reservation(wallet, &deployment.identity_name, &reservation).await?;

    let mut updated = deployment.clone();
    let base = updated.expiration_date.max(Utc::now());
    updated.expiration_date = base + Duration::days(EXTENSION_DAYS);
    store_context.deployment_store.save(&updated).await?;
    Ok(())
}

/// TFT the identity's wallet should hold to keep its auto-extend deployments
/// alive for another slice.
pub async fn calculate_funding_amount(
    store_context: &Arc<StoreContext>,
    grid: &GridClient,
    identity_name: &str,
) -> Result<f64, PortalError> {
    let deployments = store_context
        .deployment_store
        .list(identity_name, None)
        .await?;
    let threshold = Utc::now() + Duration::days(AUTO_EXTEND_THRESHOLD_DAYS);

    let mut total = 0.0;
    for deployment in deployments {
        if !deployment.auto_extend {
            continue;
        }
        if deployment.expiration_date > threshold {
            continue;
        }
        // TODO: price all pools once deployments can span more than one
        let Some(&pool_id) = deployment.pool_ids.first() else {
            continue;
        };
        let pool = grid.get_pool(pool_id).await?;
        let farm = grid.get_farm(&deployment.farm_name).await?;
        let prices = grid.get_farm_prices(farm.id).await?;

        let slice_seconds = (EXTENSION_DAYS * SECONDS_PER_DAY) as f64;
        total += cost_per_second(&pool, &prices) * slice_seconds + TRANSACTION_FEES;
    }
    Ok(total)
}

/// Funding details shown on the FUND WALLET screen, or `None` when the user
/// has no wallet yet.
pub async fn wallet_funding_info(
    store_context: &Arc<StoreContext>,
    grid: &GridClient,
    wallet: &WalletClient,
    identity_name: &str,
) -> Result<Option<FundingInfo>, PortalError> {
    let info = match wallet.find(identity_name).await? {
        Some(info) => info,
        None => return Ok(None),
    };

    let balance = wallet.balance(identity_name, PAYMENT_ASSET).await?;
    let missing = calculate_funding_amount(store_context, grid, identity_name).await? - balance;
    let amount = if missing < 0.0 { 0.0 } else { round6(missing) };

    let qr_data = format!(
        "TFT:{}?amount={}&message=topup&sender=me",
        info.address, amount
    );
    Ok(Some(FundingInfo {
        address: info.address,
        balance: WalletBalance {
            amount: balance,
            asset: PAYMENT_ASSET.to_string(),
        },
        amount,
        qrcode: qrcode_base64(&qr_data)?,
        network: info.network.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_container_units() {
        let query = ResourceQuery {
            cru: 4,
            mru: 8,
            sru: 100,
        };
        let units = container_units(&query);
        assert!((units.cu - 2.0).abs() < f64::EPSILON);
        assert!((units.su - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn required_units_scale_with_count_and_duration() {
        let query = ResourceQuery {
            cru: 1,
            mru: 1,
            sru: 3,
        };
        let units = required_units(&query, 3, 100);
        let per_container = container_units(&query);
        assert!((units.cu - per_container.cu * 300.0).abs() < 1e-9);
        assert!((units.su - per_container.su * 300.0).abs() < 1e-9);
    }

    #[test]
    fn rounding_keeps_six_decimals() {
        assert!((round6(1.23456789) - 1.234568).abs() < 1e-12);
        assert!((round6(0.0000001) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn qr_payload_is_base64_svg() {
        let encoded = qrcode_base64("TFT:GABC?amount=12.5&message=topup&sender=me").unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        let svg = String::from_utf8(decoded).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[tokio::test]
    async fn pay_reservation_rejects_short_wallet() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/wallets/jukebox_poor/balances/TFT")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"amount": 1.0}"#)
            .create_async()
            .await;

        let wallet = WalletClient::new(url::Url::parse(&server.url()).unwrap());
        let reservation = PoolReservation {
            pool_id: 1,
            reservation_id: 10,
            escrow_address: "GESCROW".to_string(),
            amount_due: 5.0,
        };

        let result = pay_reservation(&wallet, "jukebox_poor", &reservation).await;
        assert!(matches!(
            result,
            Err(PortalError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn pay_reservation_skips_zero_cost() {
        // No wallet service behind this URL: a zero amount must not call it.
        let wallet = WalletClient::new(url::Url::parse("http://127.0.0.1:1").unwrap());
        let reservation = PoolReservation {
            pool_id: 1,
            reservation_id: 11,
            escrow_address: "GESCROW".to_string(),
            amount_due: 0.0,
        };
        pay_reservation(&wallet, "jukebox_anyone", &reservation)
            .await
            .unwrap();
    }
}
