use crate::models::node::{BlockchainNode, NodeState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

/// The pre-packaged workloads the portal can deploy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolutionType {
    Dash,
    Presearch,
    #[default]
    Ubuntu,
}

impl SolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolutionType::Dash => "dash",
            SolutionType::Presearch => "presearch",
            SolutionType::Ubuntu => "ubuntu",
        }
    }
}

impl Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SolutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dash" => Ok(SolutionType::Dash),
            "presearch" => Ok(SolutionType::Presearch),
            "ubuntu" => Ok(SolutionType::Ubuntu),
            other => Err(format!("unknown solution type: {other}")),
        }
    }
}

/// Grid resource requirements of a single workload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    /// Virtual cores.
    pub cru: u32,
    /// Memory in GB.
    pub mru: u32,
    /// SSD storage in GB.
    pub sru: u32,
}

impl ResourceQuery {
    pub fn scaled(&self, count: u32) -> Self {
        Self {
            cru: self.cru * count,
            mru: self.mru * count,
            sru: self.sru * count,
        }
    }
}

/// One wizard outcome: a named set of workloads on a capacity pool, owned by
/// an intermediate identity. Secret env values are sealed before the record
/// is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Deployment {
    pub deployment_name: String,
    pub solution_type: SolutionType,
    pub identity_name: String,
    pub farm_name: String,
    #[serde(default)]
    pub pool_ids: Vec<u64>,
    pub expiration_date: DateTime<Utc>,
    #[serde(default)]
    pub auto_extend: bool,
    #[serde(default)]
    pub nodes: Vec<BlockchainNode>,
    #[serde(default)]
    pub secret_env: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Deployment {
    /// Storage key fragment, unique per identity + type + name.
    pub fn instance_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.identity_name, self.solution_type, self.deployment_name
        )
    }

    pub fn node_by_wid(&self, wid: u64) -> Option<&BlockchainNode> {
        self.nodes.iter().find(|n| n.wid == wid)
    }

    /// Workload ids that still hold grid capacity.
    pub fn active_wids(&self) -> Vec<u64> {
        self.nodes
            .iter()
            .filter(|n| !matches!(n.state, NodeState::Deleted | NodeState::Expired))
            .map(|n| n.wid)
            .collect()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solution_type_parses_case_insensitive() {
        assert_eq!("Dash".parse::<SolutionType>().unwrap(), SolutionType::Dash);
        assert_eq!(
            "PRESEARCH".parse::<SolutionType>().unwrap(),
            SolutionType::Presearch
        );
        assert!("windows".parse::<SolutionType>().is_err());
    }

    #[test]
    fn active_wids_skips_deleted_nodes() {
        let mut deployment = Deployment {
            deployment_name: "mynode".to_string(),
            solution_type: SolutionType::Dash,
            identity_name: "jukebox_alice".to_string(),
            ..Default::default()
        };
        deployment.nodes.push(BlockchainNode::new(1, "node-a"));
        let mut deleted = BlockchainNode::new(2, "node-b");
        deleted.state = NodeState::Deleted;
        deployment.nodes.push(deleted);

        assert_eq!(deployment.active_wids(), vec![1]);
        assert_eq!(deployment.instance_name(), "jukebox_alice_dash_mynode");
    }
}
