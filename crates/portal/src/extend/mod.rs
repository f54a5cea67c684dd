use crate::billing;
use crate::error::PortalError;
use crate::store::core::StoreContext;
use crate::utils::loop_heartbeats::LoopHeartbeats;
use chrono::{Duration, Utc};
use log::{debug, error, info, warn};
use shared::grid::{GridClient, WorkloadState};
use shared::models::{Deployment, NodeState};
use shared::wallet::WalletClient;
use std::sync::Arc;
use tokio::time::interval;

/// Background loop keeping deployments alive: refreshes node states from the
/// grid, marks run-out deployments Expired, and re-buys capacity for the ones
/// with auto-extend switched on.
pub struct AutoExtendWorker {
    store_context: Arc<StoreContext>,
    grid: Arc<GridClient>,
    wallet: Arc<WalletClient>,
    interval_seconds: u64,
    heartbeats: Arc<LoopHeartbeats>,
}

impl AutoExtendWorker {
    pub fn new(
        store_context: Arc<StoreContext>,
        grid: Arc<GridClient>,
        wallet: Arc<WalletClient>,
        interval_seconds: u64,
        heartbeats: Arc<LoopHeartbeats>,
    ) -> Self {
        Self {
            store_context,
            grid,
            wallet,
            interval_seconds,
            heartbeats,
        }
    }

    pub async fn run(&self) -> Result<(), anyhow::Error> {
        let mut interval = interval(std::time::Duration::from_secs(self.interval_seconds));
        loop {
            interval.tick().await;
            debug!("Running AutoExtendWorker over all deployments");
            if let Err(e) = self.process_deployments().await {
                error!("Error processing deployments: {e}");
            }
            self.heartbeats.update_extender();
        }
    }

    pub async fn process_deployments(&self) -> Result<(), PortalError> {
        let deployments = self.store_context.deployment_store.list_all().await?;
        let now = Utc::now();

        for mut deployment in deployments {
            if let Err(e) = self.refresh_nodes(&mut deployment).await {
                error!(
                    "Error refreshing nodes of {}: {e}",
                    deployment.deployment_name
                );
            }

            if deployment.is_expired(now) {
                if let Err(e) = self.expire(&mut deployment).await {
                    error!(
                        "Error expiring deployment {}: {e}",
                        deployment.deployment_name
                    );
                }
                continue;
            }

            let threshold = now + Duration::days(billing::AUTO_EXTEND_THRESHOLD_DAYS);
            if deployment.auto_extend && deployment.expiration_date <= threshold {
                match billing::extend_deployment(
                    &self.store_context,
                    &self.grid,
                    &self.wallet,
                    &deployment,
                )
                .await
                {
                    Ok(()) => info!("Extended deployment {}", deployment.deployment_name),
                    Err(PortalError::InsufficientFunds {
                        required,
                        available,
                    }) => warn!(
                        "Cannot auto-extend {}: {} TFT required, {} TFT in wallet {}",
                        deployment.deployment_name,
                        required,
                        available,
                        deployment.identity_name
                    ),
                    Err(e) => error!(
                        "Error auto-extending {}: {e}",
                        deployment.deployment_name
                    ),
                }
            }
        }
        Ok(())
    }

    /// Pull fresh workload state for nodes the grid is still bringing up.
    async fn refresh_nodes(&self, deployment: &mut Deployment) -> Result<(), PortalError> {
        let mut changed = false;
        for node in &mut deployment.nodes {
            if node.state != NodeState::Deploying {
                continue;
            }
            match self.grid.get_workload(node.wid).await {
                Ok(workload) => match workload.state {
                    WorkloadState::Ok => {
                        node.state = NodeState::Deployed;
                        node.ipv4_address = workload.ipv4_address;
                        node.ipv6_address = workload.ipv6_address;
                        changed = true;
                    }
                    WorkloadState::Error => {
                        error!(
                            "Workload {} of {} failed: {}",
                            node.wid,
                            deployment.deployment_name,
                            workload.message.unwrap_or_default()
                        );
                        node.state = NodeState::Error;
                        changed = true;
                    }
                    WorkloadState::Init => {}
                },
                Err(e) => debug!("Workload {} state not available yet: {e}", node.wid),
            }
        }
        if changed {
            self.store_context.deployment_store.save(deployment).await?;
        }
        Ok(())
    }

    async fn expire(&self, deployment: &mut Deployment) -> Result<(), PortalError> {
        let mut changed = false;
        for node in &mut deployment.nodes {
            if !matches!(node.state, NodeState::Expired | NodeState::Deleted) {
                node.state = NodeState::Expired;
                changed = true;
            }
        }
        if changed {
            info!("Deployment {} ran out of capacity", deployment.deployment_name);
            self.store_context.deployment_store.save(deployment).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::helper::create_test_app_state_with_services;
    use crate::ServerMode;
    use shared::models::{BlockchainNode, SolutionType};

    fn worker(
        app_state: &actix_web::web::Data<crate::api::server::AppState>,
    ) -> AutoExtendWorker {
        AutoExtendWorker::new(
            app_state.store_context.clone(),
            app_state.grid.clone(),
            app_state.wallet.clone(),
            1,
            Arc::new(LoopHeartbeats::new(&ServerMode::Full)),
        )
    }

    #[tokio::test]
    async fn expired_deployment_nodes_are_marked() {
        let grid_server = mockito::Server::new_async().await;
        let wallet_server = mockito::Server::new_async().await;
        let app_state =
            create_test_app_state_with_services(&grid_server.url(), &wallet_server.url()).await;

        let mut node = BlockchainNode::new(51, "node-51");
        node.state = NodeState::Deployed;
        let deployment = Deployment {
            deployment_name: "oldtimer".to_string(),
            solution_type: SolutionType::Ubuntu,
            identity_name: "jukebox_expiry".to_string(),
            expiration_date: Utc::now() - Duration::days(1),
            nodes: vec![node],
            ..Default::default()
        };
        app_state
            .store_context
            .deployment_store
            .save(&deployment)
            .await
            .unwrap();

        worker(&app_state).process_deployments().await.unwrap();

        let reloaded = app_state
            .store_context
            .deployment_store
            .get("jukebox_expiry", SolutionType::Ubuntu, "oldtimer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.nodes[0].state, NodeState::Expired);
    }

    #[tokio::test]
    async fn deploying_node_picks_up_grid_state() {
        let mut grid_server = mockito::Server::new_async().await;
        let wallet_server = mockito::Server::new_async().await;
        grid_server
            .mock("GET", "/workloads/61")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"wid": 61, "node_id": "node-61", "state": "ok", "ipv4_address": "185.10.1.4"}"#,
            )
            .create_async()
            .await;

        let app_state =
            create_test_app_state_with_services(&grid_server.url(), &wallet_server.url()).await;
        let deployment = Deployment {
            deployment_name: "fresh".to_string(),
            solution_type: SolutionType::Ubuntu,
            identity_name: "jukebox_fresh".to_string(),
            expiration_date: Utc::now() + Duration::days(10),
            nodes: vec![BlockchainNode::new(61, "node-61")],
            ..Default::default()
        };
        app_state
            .store_context
            .deployment_store
            .save(&deployment)
            .await
            .unwrap();

        worker(&app_state).process_deployments().await.unwrap();

        let reloaded = app_state
            .store_context
            .deployment_store
            .get("jukebox_fresh", SolutionType::Ubuntu, "fresh")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.nodes[0].state, NodeState::Deployed);
        assert_eq!(
            reloaded.nodes[0].ipv4_address.unwrap().to_string(),
            "185.10.1.4"
        );
    }
}
