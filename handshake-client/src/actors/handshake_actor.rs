// handshake-client/src/actors/handshake_actor.rs
//
// The handshake lifecycle as a single actor. The mailbox is the one
// logical event queue: connector callbacks, rotation ticks, and the
// completions of async backend calls all land here, and every handler
// runs to completion before the next event. Async responses carry the
// epoch they were started under; a response whose epoch no longer
// matches was superseded and is dropped.
use actix::{
    Actor, ActorFutureExt, AsyncContext, Context, Handler, Message, MessageResult, WrapFuture,
};
use std::sync::Arc;
use std::time::Duration;

use common::messages::ConnectorStatusUpdate;
use common::models::proof::ProofPayload;
use common::{ConnectorProof, ProofRequest, SessionGrant, WalletAccount};

use crate::backend::{BackendError, HandshakeBackend};
use crate::backoff::Backoff;
use crate::connector::{HostHandle, WalletConnector};
use crate::token_store::TokenStore;

/// Client-side view of the handshake lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingChallenge,
    ChallengeReady,
    ProofSubmitted,
    Authenticated,
    Failed,
}

/// Actor message: Start the handshake cycle
#[derive(Message)]
#[rtype(result = "()")]
pub struct Boot;

/// Actor message: Request a fresh challenge (manual retry)
#[derive(Message)]
#[rtype(result = "()")]
pub struct RequestChallenge;

/// Actor message: Read the current lifecycle state
#[derive(Message)]
#[rtype(result = "HandshakeState")]
pub struct GetState;

/// Actor message: Read the persisted session token
#[derive(Message)]
#[rtype(result = "Option<String>")]
pub struct GetSessionToken;

// Completion of an issuance started while unauthenticated
#[derive(Message)]
#[rtype(result = "()")]
struct ChallengeOutcome {
    epoch: u64,
    result: Result<String, BackendError>,
}

// Completion of a silent rotation while authenticated
#[derive(Message)]
#[rtype(result = "()")]
struct RotationOutcome {
    epoch: u64,
    result: Result<String, BackendError>,
}

// Completion of a proof submission
#[derive(Message)]
#[rtype(result = "()")]
struct ProofOutcome {
    epoch: u64,
    result: Result<SessionGrant, BackendError>,
}

/// Actor owning the handshake state machine
pub struct HandshakeActor {
    backend: Arc<dyn HandshakeBackend>,
    connector: Arc<dyn WalletConnector>,
    host: Arc<dyn HostHandle>,
    tokens: Arc<dyn TokenStore>,
    refresh_interval: Duration,
    state: HandshakeState,
    // At most one live challenge per handshake instance
    current_challenge: Option<String>,
    // Tags in-flight backend calls; a bump invalidates their results
    epoch: u64,
    backoff: Backoff,
}

impl HandshakeActor {
    pub fn new(
        backend: Arc<dyn HandshakeBackend>,
        connector: Arc<dyn WalletConnector>,
        host: Arc<dyn HostHandle>,
        tokens: Arc<dyn TokenStore>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            backend,
            connector,
            host,
            tokens,
            refresh_interval,
            state: HandshakeState::Idle,
            current_challenge: None,
            epoch: 0,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Begin fetching a fresh challenge; supersedes any outstanding call
    fn start_issue(&mut self, ctx: &mut Context<Self>) {
        self.state = HandshakeState::AwaitingChallenge;
        self.current_challenge = None;
        self.connector.set_pending_challenge(None);
        self.epoch += 1;

        let epoch = self.epoch;
        let backend = self.backend.clone();
        let principal = self.host.principal();

        ctx.spawn(
            async move { backend.issue_challenge(principal).await }
                .into_actor(self)
                .map(move |result, _act, ctx| {
                    ctx.notify(ChallengeOutcome { epoch, result });
                }),
        );
    }

    /// Rotate the unused challenge in the background without leaving
    /// `Authenticated`
    fn start_rotation(&mut self, ctx: &mut Context<Self>) {
        self.epoch += 1;

        let epoch = self.epoch;
        let backend = self.backend.clone();
        let principal = self.host.principal();

        ctx.spawn(
            async move { backend.issue_challenge(principal).await }
                .into_actor(self)
                .map(move |result, _act, ctx| {
                    ctx.notify(RotationOutcome { epoch, result });
                }),
        );
    }

    fn submit_proof(
        &mut self,
        account: &WalletAccount,
        proof: &ConnectorProof,
        ctx: &mut Context<Self>,
    ) {
        self.state = HandshakeState::ProofSubmitted;
        self.epoch += 1;

        let epoch = self.epoch;
        let backend = self.backend.clone();
        let request = ProofRequest {
            address: account.address.clone(),
            telegram_id: self.host.principal(),
            proof: ProofPayload {
                address: account.address.clone(),
                public_key: account.public_key.clone(),
                domain: proof.domain.clone(),
                timestamp: proof.timestamp,
                payload: proof.payload.clone(),
                signature: proof.signature.clone(),
                state_init: account.wallet_state_init.clone(),
            },
        };

        tracing::info!("Submitting wallet proof for {}", account.address);

        ctx.spawn(
            async move { backend.submit_proof(request).await }
                .into_actor(self)
                .map(move |result, _act, ctx| {
                    ctx.notify(ProofOutcome { epoch, result });
                }),
        );
    }

    fn clear_session(&mut self, ctx: &mut Context<Self>) {
        if let Some(token) = self.tokens.load() {
            // Best-effort server-side revocation; the local session is
            // gone either way
            let backend = self.backend.clone();
            ctx.spawn(
                async move {
                    if let Err(e) = backend.revoke_session(&token).await {
                        tracing::debug!("Server-side session revocation failed: {}", e);
                    }
                }
                .into_actor(self),
            );
        }
        if let Err(e) = self.tokens.clear() {
            tracing::warn!("Failed to clear persisted session token: {}", e);
        }
    }
}

impl Actor for HandshakeActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "HandshakeActor started, challenge refresh every {:?}",
            self.refresh_interval
        );

        ctx.run_interval(self.refresh_interval, |act, ctx| match act.state {
            HandshakeState::ChallengeReady => {
                tracing::debug!("Rotating outstanding challenge");
                act.start_issue(ctx);
            }
            HandshakeState::Authenticated => {
                tracing::debug!("Rotating reconnection challenge");
                act.start_rotation(ctx);
            }
            // Never rotate under an in-flight approval or request
            _ => {}
        });

        ctx.notify(Boot);
    }
}

impl Handler<Boot> for HandshakeActor {
    type Result = ();

    fn handle(&mut self, _msg: Boot, ctx: &mut Self::Context) -> Self::Result {
        if self.state != HandshakeState::Idle {
            return;
        }

        if self.tokens.load().is_some() {
            tracing::info!("Found persisted session token; awaiting connector confirmation");
        }

        // A challenge is requested regardless: a restored session still
        // needs one ready for the next first-time pairing
        self.start_issue(ctx);
    }
}

impl Handler<RequestChallenge> for HandshakeActor {
    type Result = ();

    fn handle(&mut self, _msg: RequestChallenge, ctx: &mut Self::Context) -> Self::Result {
        match self.state {
            HandshakeState::Idle | HandshakeState::Failed | HandshakeState::ChallengeReady => {
                self.start_issue(ctx);
            }
            HandshakeState::AwaitingChallenge
            | HandshakeState::ProofSubmitted
            | HandshakeState::Authenticated => {
                tracing::debug!("Ignoring challenge request while {:?}", self.state);
            }
        }
    }
}

impl Handler<ChallengeOutcome> for HandshakeActor {
    type Result = ();

    fn handle(&mut self, msg: ChallengeOutcome, ctx: &mut Self::Context) -> Self::Result {
        if msg.epoch != self.epoch || self.state != HandshakeState::AwaitingChallenge {
            tracing::debug!("Discarding superseded challenge response");
            return;
        }

        match msg.result {
            Ok(value) => {
                self.connector.set_pending_challenge(Some(value.as_str()));
                self.current_challenge = Some(value);
                self.state = HandshakeState::ChallengeReady;
                self.backoff.reset();
            }
            Err(e) => {
                tracing::warn!("Challenge issuance failed: {}", e);
                self.state = HandshakeState::Idle;

                match self.backoff.next_delay() {
                    Some(delay) => {
                        tracing::info!("Retrying challenge issuance in {:?}", delay);
                        ctx.run_later(delay, |act, ctx| {
                            if act.state == HandshakeState::Idle {
                                act.start_issue(ctx);
                            }
                        });
                    }
                    None => {
                        tracing::error!(
                            "Challenge issuance retries exhausted; waiting for a manual retry"
                        );
                    }
                }
            }
        }
    }
}

impl Handler<RotationOutcome> for HandshakeActor {
    type Result = ();

    fn handle(&mut self, msg: RotationOutcome, _ctx: &mut Self::Context) -> Self::Result {
        if msg.epoch != self.epoch || self.state != HandshakeState::Authenticated {
            tracing::debug!("Discarding superseded rotation response");
            return;
        }

        match msg.result {
            Ok(value) => {
                self.connector.set_pending_challenge(Some(value.as_str()));
                self.current_challenge = Some(value);
            }
            Err(e) => {
                // Keep the previous challenge; the next tick tries again
                tracing::warn!("Background challenge rotation failed: {}", e);
            }
        }
    }
}

impl Handler<ConnectorStatusUpdate> for HandshakeActor {
    type Result = ();

    fn handle(&mut self, msg: ConnectorStatusUpdate, ctx: &mut Self::Context) -> Self::Result {
        if !msg.connected {
            match self.state {
                HandshakeState::Authenticated => {
                    tracing::info!("Wallet disconnected; clearing session");
                    self.clear_session(ctx);
                    self.start_issue(ctx);
                }
                HandshakeState::ProofSubmitted => {
                    tracing::warn!("Wallet disconnected mid-verification");
                    self.start_issue(ctx);
                }
                _ => {
                    tracing::debug!("Connector disconnect while {:?}", self.state);
                }
            }
            return;
        }

        match (msg.proof, msg.account) {
            (Some(proof), Some(account)) => {
                // A proof may still arrive for the previous challenge
                // while a rotation is in flight; the server arbitrates
                // whether that challenge is still outstanding
                if !matches!(
                    self.state,
                    HandshakeState::ChallengeReady | HandshakeState::AwaitingChallenge
                ) {
                    tracing::debug!("Ignoring wallet proof while {:?}", self.state);
                    return;
                }
                if let Some(current) = &self.current_challenge {
                    if *current != proof.payload {
                        tracing::debug!(
                            "Wallet proof references a rotated challenge; submitting anyway"
                        );
                    }
                }
                self.submit_proof(&account, &proof, ctx);
            }
            (None, _) => {
                // Reconnection rather than a first-time pairing
                if self.tokens.load().is_some() {
                    if self.state != HandshakeState::Authenticated {
                        tracing::info!("Wallet reconnected; restoring persisted session");
                        self.state = HandshakeState::Authenticated;
                    }
                } else {
                    tracing::warn!("Wallet connected without proof and no stored session");
                }
            }
            (Some(_), None) => {
                tracing::warn!("Connector reported a proof without an account");
            }
        }
    }
}

impl Handler<ProofOutcome> for HandshakeActor {
    type Result = ();

    fn handle(&mut self, msg: ProofOutcome, ctx: &mut Self::Context) -> Self::Result {
        if msg.epoch != self.epoch || self.state != HandshakeState::ProofSubmitted {
            tracing::debug!("Discarding superseded proof response");
            return;
        }

        match msg.result {
            Ok(grant) => {
                if let Err(e) = self.tokens.save(&grant.token) {
                    tracing::warn!("Failed to persist session token: {}", e);
                }
                self.current_challenge = None;
                self.state = HandshakeState::Authenticated;
                tracing::info!("Wallet authenticated ({:?})", grant.status);

                self.host.close_webview();
                // Line up an unused challenge for a future reconnection
                self.start_rotation(ctx);
            }
            Err(e) => {
                tracing::warn!("Proof verification failed: {}", e);
                self.state = HandshakeState::Failed;
                self.connector.disconnect();
                ctx.notify(RequestChallenge);
            }
        }
    }
}

impl Handler<GetState> for HandshakeActor {
    type Result = MessageResult<GetState>;

    fn handle(&mut self, _msg: GetState, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.state)
    }
}

impl Handler<GetSessionToken> for HandshakeActor {
    type Result = MessageResult<GetSessionToken>;

    fn handle(&mut self, _msg: GetSessionToken, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.tokens.load())
    }
}
