use crate::store::core::RedisStore;
use crate::wizard::WizardSession;
use anyhow::Result;
use redis::AsyncCommands;
use std::sync::Arc;

const WIZARD_BASE_KEY: &str = "jukebox:wizard";

/// Abandoned wizard sessions fall out of redis after an hour.
const WIZARD_TTL_SECONDS: u64 = 3600;

pub struct WizardStore {
    redis: Arc<RedisStore>,
}

impl WizardStore {
    pub fn new(redis: Arc<RedisStore>) -> Self {
        Self { redis }
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<WizardSession>> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let session_string: Option<String> =
            con.get(format!("{WIZARD_BASE_KEY}:{session_id}")).await?;
        match session_string {
            Some(session_string) => Ok(Some(serde_json::from_str(&session_string)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, session: &WizardSession) -> Result<()> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let _: () = con
            .set_ex(
                format!("{WIZARD_BASE_KEY}:{}", session.session_id),
                serde_json::to_string(session)?,
                WIZARD_TTL_SECONDS,
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let _: () = con.del(format!("{WIZARD_BASE_KEY}:{session_id}")).await?;
        Ok(())
    }
}
