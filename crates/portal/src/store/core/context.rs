use crate::store::core::RedisStore;
use crate::store::domains::admin_store::AdminStore;
use crate::store::domains::deployment_store::DeploymentStore;
use crate::store::domains::user_store::UserStore;
use crate::store::domains::wizard_store::WizardStore;
use std::sync::Arc;

pub struct StoreContext {
    pub admin_store: Arc<AdminStore>,
    pub user_store: Arc<UserStore>,
    pub deployment_store: Arc<DeploymentStore>,
    pub wizard_store: Arc<WizardStore>,
}

impl StoreContext {
    pub fn new(store: Arc<RedisStore>) -> Self {
        Self {
            admin_store: Arc::new(AdminStore::new(store.clone())),
            user_store: Arc::new(UserStore::new(store.clone())),
            deployment_store: Arc::new(DeploymentStore::new(store.clone())),
            wizard_store: Arc::new(WizardStore::new(store)),
        }
    }
}
