pub mod actors;
pub mod backend;
pub mod backoff;
pub mod connector;
pub mod token_store;

pub use actors::handshake_actor::{HandshakeActor, HandshakeState};
