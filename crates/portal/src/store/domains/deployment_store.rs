use crate::store::core::RedisStore;
use anyhow::{bail, Result};
use redis::AsyncCommands;
use shared::models::{Deployment, NodeState, SolutionType};
use std::sync::Arc;

const DEPLOYMENT_BASE_KEY: &str = "jukebox:deployment";

fn deployment_key(identity_name: &str, solution_type: SolutionType, name: &str) -> String {
    format!("{DEPLOYMENT_BASE_KEY}:{identity_name}:{solution_type}:{name}")
}

pub struct DeploymentStore {
    redis: Arc<RedisStore>,
}

impl DeploymentStore {
    pub fn new(redis: Arc<RedisStore>) -> Self {
        Self { redis }
    }

    pub async fn save(&self, deployment: &Deployment) -> Result<()> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let key = deployment_key(
            &deployment.identity_name,
            deployment.solution_type,
            &deployment.deployment_name,
        );
        let _: () = con.set(key, serde_json::to_string(deployment)?).await?;
        Ok(())
    }

    pub async fn get(
        &self,
        identity_name: &str,
        solution_type: SolutionType,
        name: &str,
    ) -> Result<Option<Deployment>> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let deployment_string: Option<String> = con
            .get(deployment_key(identity_name, solution_type, name))
            .await?;
        match deployment_string {
            Some(deployment_string) => Ok(Some(serde_json::from_str(&deployment_string)?)),
            None => Ok(None),
        }
    }

    /// All deployments of one identity, optionally narrowed to one solution
    /// type, ordered by name.
    pub async fn list(
        &self,
        identity_name: &str,
        solution_type: Option<SolutionType>,
    ) -> Result<Vec<Deployment>> {
        let pattern = match solution_type {
            Some(solution_type) => {
                format!("{DEPLOYMENT_BASE_KEY}:{identity_name}:{solution_type}:*")
            }
            None => format!("{DEPLOYMENT_BASE_KEY}:{identity_name}:*"),
        };
        self.list_by_pattern(&pattern).await
    }

    /// Every deployment in the store, for the background extend worker.
    pub async fn list_all(&self) -> Result<Vec<Deployment>> {
        self.list_by_pattern(&format!("{DEPLOYMENT_BASE_KEY}:*"))
            .await
    }

    async fn list_by_pattern(&self, pattern: &str) -> Result<Vec<Deployment>> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = con.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let deployment_strings: Vec<String> =
            redis::pipe().get(&keys).query_async(&mut con).await?;
        let mut deployments = Vec::new();
        for deployment_string in deployment_strings {
            let deployment: Deployment = serde_json::from_str(&deployment_string)?;
            deployments.push(deployment);
        }
        deployments.sort_by(|a, b| a.deployment_name.cmp(&b.deployment_name));
        Ok(deployments)
    }

    pub async fn delete(&self, deployment: &Deployment) -> Result<()> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let _: () = con
            .del(deployment_key(
                &deployment.identity_name,
                deployment.solution_type,
                &deployment.deployment_name,
            ))
            .await?;
        Ok(())
    }

    pub async fn update_node_state(
        &self,
        identity_name: &str,
        solution_type: SolutionType,
        name: &str,
        wid: u64,
        state: NodeState,
    ) -> Result<()> {
        let mut deployment = match self.get(identity_name, solution_type, name).await? {
            Some(deployment) => deployment,
            None => bail!("deployment {} not found", name),
        };
        let node = deployment
            .nodes
            .iter_mut()
            .find(|n| n.wid == wid)
            .ok_or_else(|| anyhow::anyhow!("workload {} not part of deployment {}", wid, name))?;
        node.state = state;
        self.save(&deployment).await
    }

    pub async fn set_auto_extend(
        &self,
        identity_name: &str,
        solution_type: SolutionType,
        name: &str,
        enabled: bool,
    ) -> Result<()> {
        let mut deployment = match self.get(identity_name, solution_type, name).await? {
            Some(deployment) => deployment,
            None => bail!("deployment {} not found", name),
        };
        deployment.auto_extend = enabled;
        self.save(&deployment).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::tests::helper::create_test_app_state;
    use shared::models::{BlockchainNode, Deployment, NodeState, SolutionType};

    #[tokio::test]
    async fn list_filters_by_solution_type() {
        let app_state = create_test_app_state().await;
        let store = &app_state.store_context.deployment_store;

        let dash = Deployment {
            deployment_name: "alpha".to_string(),
            solution_type: SolutionType::Dash,
            identity_name: "jukebox_lister".to_string(),
            ..Default::default()
        };
        let ubuntu = Deployment {
            deployment_name: "beta".to_string(),
            solution_type: SolutionType::Ubuntu,
            identity_name: "jukebox_lister".to_string(),
            ..Default::default()
        };
        store.save(&dash).await.unwrap();
        store.save(&ubuntu).await.unwrap();

        let dash_only = store
            .list("jukebox_lister", Some(SolutionType::Dash))
            .await
            .unwrap();
        assert_eq!(dash_only.len(), 1);
        assert_eq!(dash_only[0].deployment_name, "alpha");

        let all = store.list("jukebox_lister", None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_node_state_round_trips() {
        let app_state = create_test_app_state().await;
        let store = &app_state.store_context.deployment_store;

        let mut deployment = Deployment {
            deployment_name: "statenode".to_string(),
            solution_type: SolutionType::Presearch,
            identity_name: "jukebox_stater".to_string(),
            ..Default::default()
        };
        deployment.nodes.push(BlockchainNode::new(7, "node-7"));
        store.save(&deployment).await.unwrap();

        store
            .update_node_state(
                "jukebox_stater",
                SolutionType::Presearch,
                "statenode",
                7,
                NodeState::Deleted,
            )
            .await
            .unwrap();

        let reloaded = store
            .get("jukebox_stater", SolutionType::Presearch, "statenode")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.nodes[0].state, NodeState::Deleted);

        let missing = store
            .update_node_state(
                "jukebox_stater",
                SolutionType::Presearch,
                "statenode",
                8,
                NodeState::Deleted,
            )
            .await;
        assert!(missing.is_err());
    }
}
