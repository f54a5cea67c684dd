use crate::billing;
use crate::error::PortalError;
use crate::store::core::StoreContext;
use crate::utils::secrets;
use crate::wizard::{spec_for, step_requires_input, WizardSession, WizardStep};
use chrono::{Duration, Utc};
use log::info;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use shared::grid::{GridClient, WorkloadRequest};
use shared::models::{BlockchainNode, Deployment, SolutionType};
use shared::security::session::UserInfo;
use shared::wallet::WalletClient;
use std::collections::HashMap;
use std::sync::Arc;

/// What the caller sees after each wizard round: either the next question or
/// the final summary.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepOutcome {
    Prompt {
        step: WizardStep,
        title: String,
        message: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        choices: Vec<String>,
    },
    Done {
        message: String,
        deployment_name: String,
    },
}

/// Shared step-runner behind every solution wizard. The per-solution
/// differences live entirely in `SolutionSpec` and the environment step.
pub struct WizardRunner {
    store_context: Arc<StoreContext>,
    grid: Arc<GridClient>,
    wallet: Arc<WalletClient>,
}

impl WizardRunner {
    pub fn new(
        store_context: Arc<StoreContext>,
        grid: Arc<GridClient>,
        wallet: Arc<WalletClient>,
    ) -> Self {
        Self {
            store_context,
            grid,
            wallet,
        }
    }

    pub async fn start(
        &self,
        user: &UserInfo,
        solution_type: SolutionType,
    ) -> Result<(String, StepOutcome), PortalError> {
        let mut session = WizardSession::new(user, solution_type);
        let outcome = self.prompt(&mut session).await?;
        self.store_context.wizard_store.save(&session).await?;
        Ok((session.session_id.clone(), outcome))
    }

    /// Feed one answer into the session, then run forward until the wizard
    /// needs another answer or finishes. Sessions are bound to the identity
    /// that started them.
    pub async fn next(
        &self,
        session_id: &str,
        identity_name: &str,
        value: Option<&Value>,
    ) -> Result<StepOutcome, PortalError> {
        let mut session = self
            .store_context
            .wizard_store
            .get(session_id)
            .await?
            .filter(|session| session.identity_name == identity_name)
            .ok_or_else(|| PortalError::NotFound(format!("wizard session {session_id}")))?;

        self.apply_input(&mut session, value).await?;
        session.step_index += 1;

        loop {
            match session.current_step() {
                Some(step) if step_requires_input(step, session.solution_type) => break,
                Some(WizardStep::Environment) => {
                    generate_environment(&mut session);
                    session.step_index += 1;
                }
                Some(WizardStep::Payment) => {
                    self.run_payment(&mut session).await?;
                    session.step_index += 1;
                }
                Some(WizardStep::Deploy) => {
                    self.run_deploy(&mut session).await?;
                    session.step_index += 1;
                }
                Some(WizardStep::Success) | None => break,
                Some(step) => {
                    return Err(PortalError::Value(format!(
                        "wizard stuck on step {}",
                        step.title()
                    )));
                }
            }
        }

        if matches!(session.current_step(), Some(WizardStep::Success) | None) {
            let outcome = StepOutcome::Done {
                message: success_message(&session),
                deployment_name: session.deployment_name.clone(),
            };
            self.store_context
                .wizard_store
                .delete(&session.session_id)
                .await?;
            return Ok(outcome);
        }

        let outcome = self.prompt(&mut session).await?;
        self.store_context.wizard_store.save(&session).await?;
        Ok(outcome)
    }

    async fn prompt(&self, session: &mut WizardSession) -> Result<StepOutcome, PortalError> {
        let spec = spec_for(session.solution_type);
        let step = session
            .current_step()
            .ok_or_else(|| PortalError::Value("wizard already finished".to_string()))?;

        let (message, choices) = match step {
            WizardStep::GetDeploymentName => (
                format!("Please enter a name for your {} deployment", spec.title),
                Vec::new(),
            ),
            WizardStep::BlockchainInfo => (
                "How many nodes do you want to deploy?".to_string(),
                Vec::new(),
            ),
            WizardStep::ChooseFarm => {
                let aggregate = spec.query.scaled(session.nodes_count);
                let farms = self.grid.get_available_farms(&aggregate, true).await?;
                if farms.is_empty() {
                    return Err(PortalError::Value(
                        "no farm has enough capacity for this deployment".to_string(),
                    ));
                }
                session.candidate_farms = farms.clone();
                ("Please choose the farm to deploy on".to_string(), farms)
            }
            WizardStep::SetExpiration => (
                "Please enter the expiration period in days".to_string(),
                Vec::new(),
            ),
            WizardStep::Environment => (
                "Please enter the registration code".to_string(),
                Vec::new(),
            ),
            _ => {
                return Err(PortalError::Value(format!(
                    "step {} takes no input",
                    step.title()
                )));
            }
        };

        Ok(StepOutcome::Prompt {
            step,
            title: step.title().to_string(),
            message,
            choices,
        })
    }

    async fn apply_input(
        &self,
        session: &mut WizardSession,
        value: Option<&Value>,
    ) -> Result<(), PortalError> {
        let step = session
            .current_step()
            .ok_or_else(|| PortalError::Value("wizard already finished".to_string()))?;

        match step {
            WizardStep::GetDeploymentName => {
                let name = required_str(value, "deployment name")?;
                if !name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                {
                    return Err(PortalError::Value(
                        "deployment name may only contain lowercase letters, digits and dashes"
                            .to_string(),
                    ));
                }
                let existing = self
                    .store_context
                    .deployment_store
                    .get(&session.identity_name, session.solution_type, name)
                    .await?;
                if existing.is_some() {
                    return Err(PortalError::Value(format!(
                        "deployment {name} already exists"
                    )));
                }
                session.deployment_name = name.to_string();
            }
            WizardStep::BlockchainInfo => {
                let count = required_u64(value, "node count")?;
                if count < 1 {
                    return Err(PortalError::Value(
                        "at least one node must be deployed".to_string(),
                    ));
                }
                session.nodes_count = count as u32;
            }
            WizardStep::ChooseFarm => {
                let farm = required_str(value, "farm name")?;
                if !session.candidate_farms.iter().any(|f| f == farm) {
                    return Err(PortalError::Value(format!(
                        "farm {farm} is not among the offered farms"
                    )));
                }
                session.farm_name = farm.to_string();
            }
            WizardStep::SetExpiration => {
                let days = required_u64(value, "expiration period")?;
                if days < 1 {
                    return Err(PortalError::Value(
                        "expiration period must be at least one day".to_string(),
                    ));
                }
                session.duration_days = days as u32;
            }
            WizardStep::Environment if session.solution_type == SolutionType::Presearch => {
                let code = required_str(value, "registration code")?;
                if code.is_empty() {
                    return Err(PortalError::Value(
                        "registration code is required".to_string(),
                    ));
                }
                session
                    .secret_env
                    .insert("registration_code".to_string(), code.to_string());
            }
            _ => {
                return Err(PortalError::Value(format!(
                    "wizard is not waiting for input on step {}",
                    step.title()
                )));
            }
        }
        Ok(())
    }

    async fn run_payment(&self, session: &mut WizardSession) -> Result<(), PortalError> {
        let spec = spec_for(session.solution_type);
        let farm = self.grid.get_farm(&session.farm_name).await?;
        let duration_seconds = session.duration_days as i64 * 60 * 60 * 24;
        let units = billing::required_units(&spec.query, session.nodes_count, duration_seconds);

        let reservation = self
            .grid
            .create_pool(farm.id, units.cu, units.su, units.ipv4u)
            .await?;
        billing::pay_reservation(&self.wallet, &session.identity_name, &reservation).await?;
        session.pool_id = Some(reservation.pool_id);
        Ok(())
    }

    async fn run_deploy(&self, session: &mut WizardSession) -> Result<(), PortalError> {
        let spec = spec_for(session.solution_type);
        let pool_id = session
            .pool_id
            .ok_or_else(|| PortalError::Value("payment has not completed".to_string()))?;

        let mut nodes = Vec::new();
        for _ in 0..session.nodes_count {
            let request = WorkloadRequest {
                pool_id,
                flist: spec.flist.to_string(),
                entrypoint: spec.entrypoint.to_string(),
                env: session.env.clone(),
                secret_env: session.secret_env.clone(),
                cru: spec.query.cru,
                mru: spec.query.mru,
                sru: spec.query.sru,
                public_ip: true,
            };
            let workload = self.grid.deploy_workload(&request).await?;
            nodes.push(BlockchainNode::new(workload.wid, workload.node_id));
        }

        let mut metadata = HashMap::new();
        metadata.insert("chatflow".to_string(), session.solution_type.to_string());
        metadata.insert(
            "solution_name".to_string(),
            session.deployment_name.clone(),
        );

        let deployment = Deployment {
            deployment_name: session.deployment_name.clone(),
            solution_type: session.solution_type,
            identity_name: session.identity_name.clone(),
            farm_name: session.farm_name.clone(),
            pool_ids: vec![pool_id],
            expiration_date: Utc::now() + Duration::days(session.duration_days as i64),
            auto_extend: false,
            nodes,
            secret_env: secrets::encode_secret_env(&session.secret_env),
            metadata,
        };
        self.store_context.deployment_store.save(&deployment).await?;
        info!(
            "Deployed {} {} nodes for {}",
            session.nodes_count, session.solution_type, session.identity_name
        );
        Ok(())
    }
}

/// Dash gets generated RPC credentials; the other solutions ship whatever the
/// environment step collected.
fn generate_environment(session: &mut WizardSession) {
    if session.solution_type == SolutionType::Dash {
        let password: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        session
            .secret_env
            .insert("rpcuser".to_string(), session.owner_tname.clone());
        session
            .secret_env
            .insert("rpcpasswd".to_string(), password);
    }
}

fn success_message(session: &WizardSession) -> String {
    let base = format!(
        "You deployed {} nodes of {}",
        session.nodes_count, session.solution_type
    );
    if session.solution_type == SolutionType::Dash {
        let password = session
            .secret_env
            .get("rpcpasswd")
            .map(String::as_str)
            .unwrap_or_default();
        format!(
            "{base}\nYour RPC credentials:\nusername: {}\npassword: {password}",
            session.owner_tname
        )
    } else {
        base
    }
}

fn required_str<'a>(value: Option<&'a Value>, what: &str) -> Result<&'a str, PortalError> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PortalError::Value(format!("{what} is required")))
}

fn required_u64(value: Option<&Value>, what: &str) -> Result<u64, PortalError> {
    value
        .and_then(Value::as_u64)
        .ok_or_else(|| PortalError::Value(format!("{what} must be a positive number")))
}
