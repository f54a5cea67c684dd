use crate::store::core::RedisStore;
use anyhow::Result;
use log::info;
use redis::AsyncCommands;
use std::sync::Arc;

const ADMINS_KEY: &str = "jukebox:admins";

pub struct AdminStore {
    redis: Arc<RedisStore>,
}

impl AdminStore {
    pub fn new(redis: Arc<RedisStore>) -> Self {
        Self { redis }
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let mut admins: Vec<String> = con.smembers(ADMINS_KEY).await?;
        admins.sort();
        Ok(admins)
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        Ok(con.sismember(ADMINS_KEY, name).await?)
    }

    pub async fn count(&self) -> Result<usize> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        Ok(con.scard(ADMINS_KEY).await?)
    }

    /// Returns false when the name was already an admin.
    pub async fn add(&self, name: &str) -> Result<bool> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let added: u32 = con.sadd(ADMINS_KEY, name).await?;
        Ok(added == 1)
    }

    pub async fn remove(&self, name: &str) -> Result<bool> {
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let removed: u32 = con.srem(ADMINS_KEY, name).await?;
        Ok(removed == 1)
    }

    /// Populate the admin set on first boot. A non-empty set wins over the
    /// configured defaults.
    pub async fn seed(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut con = self.redis.client.get_multiplexed_async_connection().await?;
        let existing: usize = con.scard(ADMINS_KEY).await?;
        if existing > 0 {
            return Ok(());
        }
        let _: () = con.sadd(ADMINS_KEY, names).await?;
        info!("Seeded admin list with {} entries", names.len());
        Ok(())
    }
}
