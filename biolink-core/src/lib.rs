pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BotConfig, ModerationConfig, StorageKind};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{ChatPermissions, MessagingGateway};
