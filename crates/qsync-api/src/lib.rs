// qsync-api: Async Rust client for remote control cores (JSON-RPC over WebSocket)

pub mod error;
pub mod gateway;
pub mod rpc;
pub mod types;
pub mod websocket;

pub use error::Error;
pub use gateway::{ComponentDirectory, ControlGateway};
pub use types::{ComponentInfo, Control, ControlUpdate};
pub use websocket::{QrcClient, QrcConfig, ReconnectConfig};
