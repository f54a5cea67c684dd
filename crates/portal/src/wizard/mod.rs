pub mod runner;

pub use runner::{StepOutcome, WizardRunner};

use serde::{Deserialize, Serialize};
use shared::models::{ResourceQuery, SolutionType};
use shared::security::session::UserInfo;
use std::collections::HashMap;
use uuid::Uuid;

/// The deployment sequence every solution walks through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    GetDeploymentName,
    BlockchainInfo,
    ChooseFarm,
    SetExpiration,
    Environment,
    Payment,
    Deploy,
    Success,
}

impl WizardStep {
    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::GetDeploymentName => "Deployment name",
            WizardStep::BlockchainInfo => "Blockchain information",
            WizardStep::ChooseFarm => "Choose farm",
            WizardStep::SetExpiration => "Expiration time",
            WizardStep::Environment => "User configurations",
            WizardStep::Payment => "Payment",
            WizardStep::Deploy => "Deploy",
            WizardStep::Success => "Success",
        }
    }
}

const DEPLOY_STEPS: &[WizardStep] = &[
    WizardStep::GetDeploymentName,
    WizardStep::BlockchainInfo,
    WizardStep::ChooseFarm,
    WizardStep::SetExpiration,
    WizardStep::Environment,
    WizardStep::Payment,
    WizardStep::Deploy,
    WizardStep::Success,
];

/// Static configuration of one deployable solution: what to ask, what image
/// to run and how much capacity each node needs.
pub struct SolutionSpec {
    pub title: &'static str,
    pub solution_type: SolutionType,
    pub query: ResourceQuery,
    pub flist: &'static str,
    pub entrypoint: &'static str,
    pub steps: &'static [WizardStep],
}

pub const DASH: SolutionSpec = SolutionSpec {
    title: "Dash",
    solution_type: SolutionType::Dash,
    query: ResourceQuery {
        cru: 4,
        mru: 8,
        sru: 100,
    },
    flist: "https://hub.grid.tf/ashraf.3bot/arrajput-dash-flist-1.0.flist",
    entrypoint: "/start_dash.sh",
    steps: DEPLOY_STEPS,
};

pub const PRESEARCH: SolutionSpec = SolutionSpec {
    title: "Presearch",
    solution_type: SolutionType::Presearch,
    query: ResourceQuery {
        cru: 1,
        mru: 1,
        sru: 3,
    },
    flist: "https://hub.grid.tf/ashraf.3bot/arrajput-presearch-flist-1.0.flist",
    entrypoint: "/start_presearch.sh",
    steps: DEPLOY_STEPS,
};

pub const UBUNTU: SolutionSpec = SolutionSpec {
    title: "Ubuntu",
    solution_type: SolutionType::Ubuntu,
    query: ResourceQuery {
        cru: 1,
        mru: 1,
        sru: 1,
    },
    flist: "https://hub.grid.tf/tf-bootable/3bot-ubuntu-20.04.flist",
    entrypoint: "/bin/bash /start.sh",
    steps: DEPLOY_STEPS,
};

pub fn spec_for(solution_type: SolutionType) -> &'static SolutionSpec {
    match solution_type {
        SolutionType::Dash => &DASH,
        SolutionType::Presearch => &PRESEARCH,
        SolutionType::Ubuntu => &UBUNTU,
    }
}

/// Collected answers of one in-flight wizard, persisted between steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSession {
    pub session_id: String,
    pub owner_tname: String,
    pub identity_name: String,
    pub solution_type: SolutionType,
    pub step_index: usize,
    #[serde(default)]
    pub deployment_name: String,
    #[serde(default)]
    pub nodes_count: u32,
    #[serde(default)]
    pub candidate_farms: Vec<String>,
    #[serde(default)]
    pub farm_name: String,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub secret_env: HashMap<String, String>,
    #[serde(default)]
    pub pool_id: Option<u64>,
}

impl WizardSession {
    pub fn new(user: &UserInfo, solution_type: SolutionType) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            owner_tname: user.tname.clone(),
            identity_name: shared::models::user::prefixed_tname(&user.tname),
            solution_type,
            step_index: 0,
            deployment_name: String::new(),
            nodes_count: 0,
            candidate_farms: Vec::new(),
            farm_name: String::new(),
            duration_days: 0,
            env: HashMap::new(),
            secret_env: HashMap::new(),
            pool_id: None,
        }
    }

    pub fn current_step(&self) -> Option<WizardStep> {
        spec_for(self.solution_type).steps.get(self.step_index).copied()
    }
}

/// Whether the step waits for a user answer, given the solution. Only the
/// Presearch environment step asks anything; Dash generates its credentials
/// and Ubuntu ships with an empty environment.
pub fn step_requires_input(step: WizardStep, solution_type: SolutionType) -> bool {
    match step {
        WizardStep::GetDeploymentName
        | WizardStep::BlockchainInfo
        | WizardStep::ChooseFarm
        | WizardStep::SetExpiration => true,
        WizardStep::Environment => solution_type == SolutionType::Presearch,
        WizardStep::Payment | WizardStep::Deploy | WizardStep::Success => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserInfo {
        UserInfo {
            tname: "alice.3bot".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn specs_cover_all_solutions() {
        for solution_type in [
            SolutionType::Dash,
            SolutionType::Presearch,
            SolutionType::Ubuntu,
        ] {
            let spec = spec_for(solution_type);
            assert_eq!(spec.solution_type, solution_type);
            assert_eq!(spec.steps, DEPLOY_STEPS);
            assert!(spec.flist.starts_with("https://hub.grid.tf/"));
        }
        assert_eq!(DASH.query.cru, 4);
        assert_eq!(PRESEARCH.query.sru, 3);
    }

    #[test]
    fn only_presearch_environment_needs_input() {
        assert!(step_requires_input(
            WizardStep::Environment,
            SolutionType::Presearch
        ));
        assert!(!step_requires_input(
            WizardStep::Environment,
            SolutionType::Dash
        ));
        assert!(!step_requires_input(
            WizardStep::Payment,
            SolutionType::Presearch
        ));
    }

    #[test]
    fn new_session_derives_identity_name() {
        let session = WizardSession::new(&alice(), SolutionType::Ubuntu);
        assert_eq!(session.identity_name, "jukebox_alice");
        assert_eq!(session.current_step(), Some(WizardStep::GetDeploymentName));
    }
}
