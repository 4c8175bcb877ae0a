// handshake-client/src/connector.rs
//! Interfaces to the external collaborators the handshake drives.
//!
//! The wallet connector and the embedding host are out of scope here;
//! the state machine only ever talks to them through these traits.
//! Connector events travel the other way, as `ConnectorStatusUpdate`
//! messages delivered straight into the actor's mailbox.

/// Commands the handshake machine issues to the wallet connector
pub trait WalletConnector: Send + Sync {
    /// Hand the connector the challenge to embed in its next connect
    /// request; `None` while a fresh one is being fetched
    fn set_pending_challenge(&self, challenge: Option<&str>);

    /// Force the wallet connection closed
    fn disconnect(&self);
}

/// Hooks into the embedding messaging-platform host
pub trait HostHandle: Send + Sync {
    /// Identifier of the host user driving this handshake, when known
    fn principal(&self) -> Option<i64>;

    /// Dismiss the host webview after successful authentication
    fn close_webview(&self);
}
