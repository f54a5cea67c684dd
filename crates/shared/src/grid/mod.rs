use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::net::{Ipv4Addr, Ipv6Addr};
use url::Url;

use crate::models::ResourceQuery;

/// Which grid the configured explorer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridNetwork {
    Testnet,
    Devnet,
    Mainnet,
}

impl GridNetwork {
    /// Classify an explorer URL. Unknown hosts are unsupported.
    pub fn from_explorer_url(url: &str) -> Option<Self> {
        if url.contains("testnet") {
            Some(GridNetwork::Testnet)
        } else if url.contains("devnet") {
            Some(GridNetwork::Devnet)
        } else if url.contains("explorer.grid.tf") {
            Some(GridNetwork::Mainnet)
        } else {
            None
        }
    }
}

impl Display for GridNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridNetwork::Testnet => write!(f, "testnet"),
            GridNetwork::Devnet => write!(f, "devnet"),
            GridNetwork::Mainnet => write!(f, "mainnet"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Farm {
    pub id: u64,
    pub name: String,
}

/// Per-cloud-unit prices a farm charges, in TFT per unit-month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct FarmPrices {
    pub cu: f64,
    pub su: f64,
    pub ipv4u: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pool {
    pub pool_id: u64,
    pub active_cu: f64,
    pub active_su: f64,
    #[serde(default)]
    pub active_ipv4: f64,
}

/// A pool creation/extension that still has to be paid: the escrow expects
/// `amount_due` TFT before the capacity becomes usable.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolReservation {
    pub pool_id: u64,
    pub reservation_id: u64,
    pub escrow_address: String,
    pub amount_due: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadState {
    Init,
    Ok,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Workload {
    pub wid: u64,
    pub node_id: String,
    pub state: WorkloadState,
    #[serde(default)]
    pub ipv4_address: Option<Ipv4Addr>,
    #[serde(default)]
    pub ipv6_address: Option<Ipv6Addr>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkloadRequest {
    pub pool_id: u64,
    pub flist: String,
    pub entrypoint: String,
    pub env: HashMap<String, String>,
    pub secret_env: HashMap<String, String>,
    pub cru: u32,
    pub mru: u32,
    pub sru: u32,
    pub public_ip: bool,
}

#[derive(Deserialize)]
struct FarmCandidates {
    farm_names: Vec<String>,
}

#[derive(Serialize)]
struct CapacityRequest<'a> {
    #[serde(flatten)]
    query: &'a ResourceQuery,
    access_nodes: bool,
}

#[derive(Serialize)]
struct PoolRequest {
    farm_id: u64,
    cu: f64,
    su: f64,
    ipv4u: f64,
}

#[derive(Serialize)]
struct ExtendRequest {
    cu: f64,
    su: f64,
    ipv4u: f64,
}

#[derive(Serialize)]
struct IdentityRequest<'a> {
    name: &'a str,
    email: &'a str,
}

/// HTTP client for the grid explorer and its provisioning endpoints. The
/// capacity scheduler and workload state machine live behind this service;
/// the portal only issues requests and records the answers.
#[derive(Clone)]
pub struct GridClient {
    base_url: Url,
    client: reqwest::Client,
}

impl GridClient {
    pub fn new(explorer_url: Url) -> Self {
        Self {
            base_url: explorer_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn explorer_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    pub async fn get_farm(&self, farm_name: &str) -> Result<Farm> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/explorer/farms/{farm_name}")))
            .send()
            .await
            .context("explorer unreachable")?;
        if !resp.status().is_success() {
            bail!("farm {} not found: {}", farm_name, resp.status());
        }
        Ok(resp.json().await?)
    }

    /// Farms with enough free capacity for the given aggregate query.
    pub async fn get_available_farms(
        &self,
        query: &ResourceQuery,
        access_nodes: bool,
    ) -> Result<Vec<String>> {
        let resp = self
            .client
            .post(self.endpoint("/capacity/farms"))
            .json(&CapacityRequest {
                query,
                access_nodes,
            })
            .send()
            .await
            .context("capacity checker unreachable")?;
        if !resp.status().is_success() {
            bail!("capacity query failed: {}", resp.status());
        }
        let candidates: FarmCandidates = resp.json().await?;
        Ok(candidates.farm_names)
    }

    pub async fn get_farm_prices(&self, farm_id: u64) -> Result<FarmPrices> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/explorer/farms/{farm_id}/prices")))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("price lookup for farm {} failed: {}", farm_id, resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn get_pool(&self, pool_id: u64) -> Result<Pool> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/explorer/pools/{pool_id}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("pool {} not found: {}", pool_id, resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn create_pool(
        &self,
        farm_id: u64,
        cu: f64,
        su: f64,
        ipv4u: f64,
    ) -> Result<PoolReservation> {
        let resp = self
            .client
            .post(self.endpoint("/explorer/pools"))
            .json(&PoolRequest {
                farm_id,
                cu,
                su,
                ipv4u,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("pool creation failed: {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn extend_pool(
        &self,
        pool_id: u64,
        cu: f64,
        su: f64,
        ipv4u: f64,
    ) -> Result<PoolReservation> {
        let resp = self
            .client
            .post(self.endpoint(&format!("/explorer/pools/{pool_id}/extend")))
            .json(&ExtendRequest { cu, su, ipv4u })
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("pool {} extension failed: {}", pool_id, resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn deploy_workload(&self, request: &WorkloadRequest) -> Result<Workload> {
        let resp = self
            .client
            .post(self.endpoint("/workloads"))
            .json(request)
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("workload deployment failed: {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn get_workload(&self, wid: u64) -> Result<Workload> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/workloads/{wid}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("workload {} not found: {}", wid, resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn decommission_workload(&self, wid: u64) -> Result<()> {
        let resp = self
            .client
            .delete(self.endpoint(&format!("/workloads/{wid}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("decommission of workload {} failed: {}", wid, resp.status());
        }
        Ok(())
    }

    /// Register an intermediate identity against the explorer. Re-registering
    /// an existing name is not an error.
    pub async fn register_identity(&self, name: &str, email: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("/explorer/identities"))
            .json(&IdentityRequest { name, email })
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::CONFLICT || resp.status().is_success() {
            return Ok(());
        }
        bail!("identity registration for {} failed: {}", name, resp.status());
    }
}
