use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ServerMode;

#[derive(Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub extender_last_run_seconds_ago: i64,
}

/// Liveness bookkeeping for the auto-extend loop, surfaced on `/health`.
pub struct LoopHeartbeats {
    last_extender_iteration: Arc<AtomicI64>,
    server_mode: ServerMode,
}

impl LoopHeartbeats {
    pub fn new(server_mode: &ServerMode) -> Self {
        Self {
            last_extender_iteration: Arc::new(AtomicI64::new(-1)),
            server_mode: *server_mode,
        }
    }

    pub fn update_extender(&self) {
        self.last_extender_iteration.store(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs() as i64,
            Ordering::SeqCst,
        );
    }

    pub fn health_status(&self) -> HealthStatus {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let stale_after = 30 * 60;

        let extender_last = self.last_extender_iteration.load(Ordering::SeqCst);
        let extender_seconds_ago = if extender_last > 0 {
            now - extender_last
        } else {
            -1
        };

        let healthy = match self.server_mode {
            ServerMode::ApiOnly => true,
            ServerMode::Full => extender_seconds_ago != -1 && extender_seconds_ago < stale_after,
        };

        HealthStatus {
            healthy,
            extender_last_run_seconds_ago: extender_seconds_ago,
        }
    }
}
