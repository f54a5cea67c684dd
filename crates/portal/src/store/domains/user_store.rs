use crate::store::core::RedisStore;
use anyhow::Result;
use redis::AsyncCommands;
use shared::models::UserEntry;
use std::sync::Arc;

const USER_BASE_KEY: &str = "jukebox:user";

pub struct UserStore {
    redis: Arc<RedisStore>,
}

impl UserStore {
    pub fn new(redis: Arc<RedisStore>) -> Self {
        Self { redis }
    }

    pub async fn get(&self, entry_name: &str) -> Result<Option<UserEntry>> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let entry_string: Option<String> =
            con.get(format!("{USER_BASE_KEY}:{entry_name}")).await?;
        match entry_string {
            Some(entry_string) => Ok(Some(serde_json::from_str(&entry_string)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, entry_name: &str, entry: &UserEntry) -> Result<()> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let _: () = con
            .set(
                format!("{USER_BASE_KEY}:{entry_name}"),
                serde_json::to_string(entry)?,
            )
            .await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<UserEntry>> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = con.keys(format!("{USER_BASE_KEY}:*")).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for key in keys {
            if let Ok(Some(entry_string)) = con.get::<_, Option<String>>(&key).await {
                if let Ok(entry) = serde_json::from_str::<UserEntry>(&entry_string) {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }
}
