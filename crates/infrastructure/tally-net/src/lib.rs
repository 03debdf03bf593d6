pub mod api;
pub mod discovery;
pub mod error;
pub mod poll;
pub mod stream;

// Re-exports for convenience
pub use api::dataset::{DatasetClient, EntryPage, SyncOutcome};
pub use api::default_http_client;
pub use api::gateway::{ChatReply, ChatRequest, GatewayClient};
pub use api::monitoring::{DockerAction, MonitoringClient, ServiceAction};
pub use discovery::{discover, Endpoints};
pub use error::{ApiError, ApiErrorKind};
pub use poll::spawn_poll;
pub use stream::{ConnState, ReconnectPolicy, StreamEvent, StreamHandle};
