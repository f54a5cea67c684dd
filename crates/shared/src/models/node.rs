use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Lifecycle of a single provisioned workload. Transitions are driven by the
/// grid: the portal records what the grid reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    #[default]
    Deploying,
    Deployed,
    Deleted,
    Error,
    Expired,
}

impl Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlockchainNode {
    pub state: NodeState,
    pub wid: u64,
    pub node_id: String,
    #[serde(default)]
    pub ipv4_address: Option<Ipv4Addr>,
    #[serde(default)]
    pub ipv6_address: Option<Ipv6Addr>,
    pub creation_time: DateTime<Utc>,
}

impl BlockchainNode {
    pub fn new(wid: u64, node_id: impl Into<String>) -> Self {
        Self {
            state: NodeState::Deploying,
            wid,
            node_id: node_id.into(),
            ipv4_address: None,
            ipv6_address: None,
            creation_time: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_state_serializes_upper() {
        let node = BlockchainNode::new(42, "node-1");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["state"], "DEPLOYING");
        assert_eq!(json["wid"], 42);
    }

    #[test]
    fn node_state_round_trips() {
        for state in [
            NodeState::Deploying,
            NodeState::Deployed,
            NodeState::Deleted,
            NodeState::Error,
            NodeState::Expired,
        ] {
            let encoded = serde_json::to_string(&state).unwrap();
            let decoded: NodeState = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, state);
        }
    }
}
