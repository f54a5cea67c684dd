use anyhow::Result;

pub struct RedisStore {
    pub client: redis::Client,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Test stores cycle through the redis databases so concurrently running
    /// tests rarely share keyspace.
    #[cfg(test)]
    pub fn new_test() -> Self {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

        let base = std::env::var("REDIS_TEST_URL")
            .unwrap_or_else(|_| "redis://localhost:6380".to_string());
        let db = NEXT_DB.fetch_add(1, Ordering::Relaxed) % 16;
        let client = redis::Client::open(format!("{base}/{db}"))
            .expect("Should connect to test Redis instance");
        Self { client }
    }
}
