pub mod api;
pub mod billing;
pub mod error;
pub mod extend;
pub mod store;
pub mod utils;
pub mod wizard;

pub use api::server::start_server;
pub use extend::AutoExtendWorker;
pub use store::core::RedisStore;
pub use store::core::StoreContext;
pub use utils::loop_heartbeats::LoopHeartbeats;

#[derive(Clone, Copy, clap::ValueEnum, Debug, PartialEq)]
pub enum ServerMode {
    ApiOnly,
    Full,
}
