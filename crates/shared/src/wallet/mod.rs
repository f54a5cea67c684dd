use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Flat per-transaction fee on the payment network, in TFT.
pub const TRANSACTION_FEES: f64 = 0.1;

/// The token every deployment is paid in.
pub const PAYMENT_ASSET: &str = "TFT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StellarNetwork {
    #[serde(rename = "STD")]
    Std,
    #[serde(rename = "TEST")]
    Test,
}

impl StellarNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            StellarNetwork::Std => "STD",
            StellarNetwork::Test => "TEST",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletInfo {
    pub name: String,
    pub address: String,
    pub network: StellarNetwork,
}

#[derive(Deserialize)]
struct BalanceResponse {
    amount: f64,
}

#[derive(Deserialize)]
struct TransferResponse {
    tx_hash: String,
}

#[derive(Serialize)]
struct CreateWalletRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct TrustlineRequest<'a> {
    asset: &'a str,
}

#[derive(Serialize)]
struct TransferRequest<'a> {
    destination: &'a str,
    amount: f64,
    asset: &'a str,
    memo: &'a str,
}

/// HTTP client for the Stellar-bridge wallet service. Key management and
/// transaction signing stay inside that service; the portal only refers to
/// wallets by name.
#[derive(Clone)]
pub struct WalletClient {
    base_url: Url,
    client: reqwest::Client,
}

impl WalletClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    pub async fn find(&self, name: &str) -> Result<Option<WalletInfo>> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/wallets/{name}")))
            .send()
            .await
            .context("wallet service unreachable")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            bail!("wallet lookup for {} failed: {}", name, resp.status());
        }
        Ok(Some(resp.json().await?))
    }

    pub async fn create(&self, name: &str) -> Result<WalletInfo> {
        let resp = self
            .client
            .post(self.endpoint("/wallets"))
            .json(&CreateWalletRequest { name })
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("wallet creation for {} failed: {}", name, resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn activate(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint(&format!("/wallets/{name}/activate")))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("wallet activation for {} failed: {}", name, resp.status());
        }
        Ok(())
    }

    pub async fn add_trustline(&self, name: &str, asset: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint(&format!("/wallets/{name}/trustlines")))
            .json(&TrustlineRequest { asset })
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("adding {} trustline to {} failed: {}", asset, name, resp.status());
        }
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.endpoint(&format!("/wallets/{name}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("wallet deletion for {} failed: {}", name, resp.status());
        }
        Ok(())
    }

    pub async fn balance(&self, name: &str, asset: &str) -> Result<f64> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/wallets/{name}/balances/{asset}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("balance lookup for {} failed: {}", name, resp.status());
        }
        let balance: BalanceResponse = resp.json().await?;
        Ok(balance.amount)
    }

    pub async fn transfer(
        &self,
        name: &str,
        destination: &str,
        amount: f64,
        asset: &str,
        memo: &str,
    ) -> Result<String> {
        let resp = self
            .client
            .post(self.endpoint(&format!("/wallets/{name}/transfer")))
            .json(&TransferRequest {
                destination,
                amount,
                asset,
                memo,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("transfer from {} failed: {}", name, resp.status());
        }
        let transfer: TransferResponse = resp.json().await?;
        Ok(transfer.tx_hash)
    }

    /// Find the named wallet or provision a fresh one: create, activate
    /// through the activation service, then add the TFT trustline. A failure
    /// in either step deletes the half-made wallet before the error is
    /// returned.
    pub async fn get_or_create(&self, name: &str) -> Result<WalletInfo> {
        if let Some(wallet) = self.find(name).await? {
            return Ok(wallet);
        }

        let wallet = self.create(name).await?;
        if let Err(e) = self.activate(name).await {
            let _ = self.delete(name).await;
            return Err(e.context("wallet activation failed"));
        }
        if let Err(e) = self.add_trustline(name, PAYMENT_ASSET).await {
            let _ = self.delete(name).await;
            return Err(e.context(format!(
                "failed to add trustlines to wallet {name}, changes reverted"
            )));
        }
        Ok(wallet)
    }
}
