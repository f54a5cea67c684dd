pub mod api;
pub mod deployment;
pub mod node;
pub mod user;

pub use deployment::{Deployment, ResourceQuery, SolutionType};
pub use node::{BlockchainNode, NodeState};
pub use user::UserEntry;
