// auth-server/src/session_registry.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::generate_session_token;
use common::models::proof::VerifiedIdentity;
use common::models::session::{AccountStatus, SessionError, SessionResult, WalletSession};

// Default session TTL in seconds (24 hours)
const DEFAULT_SESSION_TTL: i64 = 86400;

/// Actor message: Mint a session for a verified identity
#[derive(Message)]
#[rtype(result = "Result<WalletSession, SessionError>")]
pub struct IssueSession {
    pub identity: VerifiedIdentity,
    pub telegram_id: Option<i64>,
}

/// Actor message: Look up a session by its token
#[derive(Message)]
#[rtype(result = "SessionResult")]
pub struct ResolveSession {
    pub token: String,
}

/// Actor message: Remove a session binding; idempotent
#[derive(Message)]
#[rtype(result = "bool")]
pub struct RevokeSession {
    pub token: String,
}

/// Actor message: Clean up expired sessions
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredSessions;

/// Actor message: Get session metrics
#[derive(Message)]
#[rtype(result = "SessionMetrics")]
pub struct GetSessionMetrics;

/// Session metrics
#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub total_sessions: usize,
    pub early_backer_sessions: usize,
    pub need_invite_sessions: usize,
    pub expired_count: usize,
    pub avg_session_age_seconds: f64,
}

/// SessionRegistryActor owns the token-to-wallet bindings issued after
/// successful proof verification.
pub struct SessionRegistryActor {
    // Map from session token to session data
    sessions: Arc<DashMap<String, WalletSession>>,
    // Map from wallet address to session token
    wallet_lookup: Arc<DashMap<String, String>>,
    // Secret for minting session tokens
    jwt_secret: Vec<u8>,
    // Session TTL in seconds
    session_ttl: i64,
    // Cleanup interval in seconds
    cleanup_interval: u64,
    // Wallets classified as early backers at issuance
    early_backers: HashSet<String>,
    // Metrics
    metrics: SessionMetrics,
}

impl SessionRegistryActor {
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            wallet_lookup: Arc::new(DashMap::new()),
            jwt_secret: jwt_secret.to_vec(),
            session_ttl: DEFAULT_SESSION_TTL,
            cleanup_interval: 3600,
            early_backers: HashSet::new(),
            metrics: SessionMetrics {
                total_sessions: 0,
                early_backer_sessions: 0,
                need_invite_sessions: 0,
                expired_count: 0,
                avg_session_age_seconds: 0.0,
            },
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.session_ttl = ttl_seconds;
        self
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds;
        self
    }

    pub fn with_early_backers(mut self, wallets: HashSet<String>) -> Self {
        self.early_backers = wallets;
        self
    }

    fn classify(&self, wallet_address: &str) -> AccountStatus {
        if self.early_backers.contains(wallet_address) {
            AccountStatus::EarlyBacker
        } else {
            AccountStatus::NeedInvite
        }
    }

    /// Update session metrics
    fn update_metrics(&mut self) {
        let mut early_backer_count = 0;
        let mut need_invite_count = 0;
        let mut age_sum = 0.0;

        for entry in self.sessions.iter() {
            let session = entry.value();
            match session.status {
                AccountStatus::EarlyBacker => early_backer_count += 1,
                AccountStatus::NeedInvite => need_invite_count += 1,
            }

            let age = Utc::now()
                .signed_duration_since(session.created_at)
                .num_seconds() as f64;
            age_sum += age;
        }

        let total = early_backer_count + need_invite_count;

        self.metrics = SessionMetrics {
            total_sessions: total,
            early_backer_sessions: early_backer_count,
            need_invite_sessions: need_invite_count,
            expired_count: self.metrics.expired_count,
            avg_session_age_seconds: if total > 0 { age_sum / total as f64 } else { 0.0 },
        };
    }

    /// Remove expired sessions and update metrics
    fn cleanup_sessions(&mut self) -> usize {
        let mut expired_count = 0;

        // Collect expired session tokens
        let expired_tokens: Vec<String> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                let session = entry.value();
                if session.is_expired(self.session_ttl) {
                    Some(session.token.clone())
                } else {
                    None
                }
            })
            .collect();

        // Remove expired sessions
        for token in expired_tokens {
            if let Some((_, session)) = self.sessions.remove(&token) {
                self.wallet_lookup.remove(&session.wallet_address);
                expired_count += 1;
            }
        }

        self.metrics.expired_count += expired_count;
        self.update_metrics();

        expired_count
    }
}

impl Actor for SessionRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "SessionRegistryActor started with TTL: {}s, {} known early backers",
            self.session_ttl,
            self.early_backers.len()
        );

        // Schedule periodic session cleanup
        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let expired_count = act.cleanup_sessions();
            if expired_count > 0 {
                tracing::info!("Cleaned up {} expired sessions", expired_count);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "SessionRegistryActor stopped. Final metrics: {} total sessions, {} expired during lifetime",
            self.metrics.total_sessions,
            self.metrics.expired_count
        );
    }
}

impl Handler<IssueSession> for SessionRegistryActor {
    type Result = MessageResult<IssueSession>;

    fn handle(&mut self, msg: IssueSession, _ctx: &mut Self::Context) -> Self::Result {
        let status = self.classify(&msg.identity.address);

        let token = match generate_session_token(
            &msg.identity.address,
            msg.telegram_id,
            &self.jwt_secret,
            self.session_ttl.max(0) as usize,
        ) {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Failed to mint session token: {}", e);
                return MessageResult(Err(SessionError::TokenMint(e)));
            }
        };

        // A wallet holds at most one session; a re-proof supersedes the
        // previous binding
        if let Some((_, old_token)) = self.wallet_lookup.remove(&msg.identity.address) {
            if self.sessions.remove(&old_token).is_some() {
                tracing::info!(
                    "Superseded existing session for wallet: {}",
                    msg.identity.address
                );
            }
        }

        let session = WalletSession::new(token.clone(), &msg.identity, msg.telegram_id, status);

        self.sessions.insert(token.clone(), session.clone());
        self.wallet_lookup
            .insert(session.wallet_address.clone(), token);

        self.update_metrics();

        tracing::info!(
            "Issued session {} for wallet {} ({:?})",
            session.session_id,
            session.wallet_address,
            session.status
        );

        MessageResult(Ok(session))
    }
}

impl Handler<ResolveSession> for SessionRegistryActor {
    type Result = MessageResult<ResolveSession>;

    fn handle(&mut self, msg: ResolveSession, _ctx: &mut Self::Context) -> Self::Result {
        let result = if let Some(mut entry) = self.sessions.get_mut(&msg.token) {
            let session = entry.value_mut();

            if session.is_expired(self.session_ttl) {
                tracing::debug!("Session expired: {}", session.session_id);
                SessionResult::Expired
            } else {
                session.update_activity();

                tracing::debug!("Resolved session: {}", session.session_id);
                SessionResult::Success(session.clone())
            }
        } else {
            tracing::debug!("Session not found for presented token");
            SessionResult::NotFound
        };

        MessageResult(result)
    }
}

impl Handler<RevokeSession> for SessionRegistryActor {
    type Result = MessageResult<RevokeSession>;

    fn handle(&mut self, msg: RevokeSession, _ctx: &mut Self::Context) -> Self::Result {
        let result = if let Some((_, session)) = self.sessions.remove(&msg.token) {
            self.wallet_lookup.remove(&session.wallet_address);
            self.update_metrics();

            tracing::info!("Revoked session for wallet: {}", session.wallet_address);
            true
        } else {
            false
        };

        MessageResult(result)
    }
}

impl Handler<CleanupExpiredSessions> for SessionRegistryActor {
    type Result = MessageResult<CleanupExpiredSessions>;

    fn handle(&mut self, _msg: CleanupExpiredSessions, _ctx: &mut Self::Context) -> Self::Result {
        let expired_count = self.cleanup_sessions();
        tracing::info!("Cleaned up {} expired sessions", expired_count);
        MessageResult(expired_count)
    }
}

impl Handler<GetSessionMetrics> for SessionRegistryActor {
    type Result = MessageResult<GetSessionMetrics>;

    fn handle(&mut self, _msg: GetSessionMetrics, _ctx: &mut Self::Context) -> Self::Result {
        // Update metrics before returning
        self.update_metrics();
        MessageResult(self.metrics.clone())
    }
}
