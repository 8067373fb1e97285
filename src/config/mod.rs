mod settings;

pub use settings::{
    ApiConfig, BroadcastConfig, DatabaseConfig, InboxConfig, JwtConfig, SchedulerConfig,
    ServerConfig, Settings,
};
