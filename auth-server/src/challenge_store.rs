// auth-server/src/challenge_store.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use common::models::challenge::{Challenge, ChallengeError};

use crate::utils::token::generate_challenge_value;

/// Actor message: Issue a fresh challenge
#[derive(Message)]
#[rtype(result = "Challenge")]
pub struct IssueChallenge {
    pub principal: Option<i64>,
}

/// Actor message: Atomically spend a challenge
#[derive(Message)]
#[rtype(result = "Result<Challenge, ChallengeError>")]
pub struct ConsumeChallenge {
    pub value: String,
    pub principal: Option<i64>,
}

/// Actor message: Remove challenges past their expiry
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredChallenges;

/// Actor message: Count outstanding challenges
#[derive(Message)]
#[rtype(result = "usize")]
pub struct ChallengeCount;

/// ChallengeStoreActor issues and tracks single-use challenge values.
///
/// Consumed entries stay in the map until their expiry passes so that a
/// replay reports `AlreadyUsed` rather than `NotFound`.
pub struct ChallengeStoreActor {
    // Map from challenge value to challenge data
    challenges: Arc<DashMap<String, Challenge>>,
    // Challenge TTL in seconds
    challenge_ttl: i64,
    // Cleanup interval in seconds
    cleanup_interval: u64,
}

impl ChallengeStoreActor {
    pub fn new(challenge_ttl: i64) -> Self {
        Self {
            challenges: Arc::new(DashMap::new()),
            challenge_ttl,
            cleanup_interval: 60,
        }
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds;
        self
    }

    fn cleanup_challenges(&mut self) -> usize {
        let now = Utc::now();
        let before = self.challenges.len();
        self.challenges.retain(|_, challenge| !challenge.is_expired(now));
        before - self.challenges.len()
    }
}

impl Actor for ChallengeStoreActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "ChallengeStoreActor started with TTL: {}s",
            self.challenge_ttl
        );

        // Garbage-collect expired challenges periodically
        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let expired = act.cleanup_challenges();
            if expired > 0 {
                tracing::info!("Cleaned up {} expired challenges", expired);
            }
        });
    }
}

impl Handler<IssueChallenge> for ChallengeStoreActor {
    type Result = MessageResult<IssueChallenge>;

    fn handle(&mut self, msg: IssueChallenge, _ctx: &mut Self::Context) -> Self::Result {
        let challenge = Challenge::new(
            generate_challenge_value(),
            self.challenge_ttl,
            msg.principal,
        );

        self.challenges
            .insert(challenge.value.clone(), challenge.clone());

        tracing::debug!(
            "Issued challenge expiring at {} (principal: {:?})",
            challenge.expires_at,
            challenge.principal
        );

        MessageResult(challenge)
    }
}

impl Handler<ConsumeChallenge> for ChallengeStoreActor {
    type Result = MessageResult<ConsumeChallenge>;

    fn handle(&mut self, msg: ConsumeChallenge, _ctx: &mut Self::Context) -> Self::Result {
        // The entry guard serializes racing consumers of the same value;
        // the first one marks it consumed, everyone after sees AlreadyUsed
        let result = if let Some(mut entry) = self.challenges.get_mut(&msg.value) {
            let challenge = entry.value_mut();

            if challenge.principal.is_some() && challenge.principal != msg.principal {
                tracing::warn!(
                    "Challenge consume attempt with wrong principal: issued for {:?}, presented {:?}",
                    challenge.principal,
                    msg.principal
                );
                Err(ChallengeError::NotFound)
            } else if challenge.is_expired(Utc::now()) {
                Err(ChallengeError::Expired)
            } else if challenge.consumed {
                Err(ChallengeError::AlreadyUsed)
            } else {
                challenge.consumed = true;
                Ok(challenge.clone())
            }
        } else {
            Err(ChallengeError::NotFound)
        };

        MessageResult(result)
    }
}

impl Handler<CleanupExpiredChallenges> for ChallengeStoreActor {
    type Result = MessageResult<CleanupExpiredChallenges>;

    fn handle(&mut self, _msg: CleanupExpiredChallenges, _ctx: &mut Self::Context) -> Self::Result {
        let expired = self.cleanup_challenges();
        tracing::info!("Cleaned up {} expired challenges", expired);
        MessageResult(expired)
    }
}

impl Handler<ChallengeCount> for ChallengeStoreActor {
    type Result = MessageResult<ChallengeCount>;

    fn handle(&mut self, _msg: ChallengeCount, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.challenges.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::Actor;

    #[actix_rt::test]
    async fn test_consume_succeeds_exactly_once() {
        let store = ChallengeStoreActor::new(540).start();

        let challenge = store.send(IssueChallenge { principal: None }).await.unwrap();

        let first = store
            .send(ConsumeChallenge {
                value: challenge.value.clone(),
                principal: None,
            })
            .await
            .unwrap();
        assert!(first.unwrap().consumed);

        let replay = store
            .send(ConsumeChallenge {
                value: challenge.value.clone(),
                principal: None,
            })
            .await
            .unwrap();
        assert_eq!(replay, Err(ChallengeError::AlreadyUsed));
    }

    #[actix_rt::test]
    async fn test_unknown_challenge_not_found() {
        let store = ChallengeStoreActor::new(540).start();

        let result = store
            .send(ConsumeChallenge {
                value: "abc123".to_string(),
                principal: None,
            })
            .await
            .unwrap();
        assert_eq!(result, Err(ChallengeError::NotFound));
    }

    #[actix_rt::test]
    async fn test_expired_challenge_rejected_and_collected() {
        let store = ChallengeStoreActor::new(-1).start();

        let challenge = store.send(IssueChallenge { principal: None }).await.unwrap();

        let result = store
            .send(ConsumeChallenge {
                value: challenge.value.clone(),
                principal: None,
            })
            .await
            .unwrap();
        assert_eq!(result, Err(ChallengeError::Expired));

        let removed = store.send(CleanupExpiredChallenges).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.send(ChallengeCount).await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_principal_scoping() {
        let store = ChallengeStoreActor::new(540).start();

        let challenge = store
            .send(IssueChallenge { principal: Some(1) })
            .await
            .unwrap();

        let wrong = store
            .send(ConsumeChallenge {
                value: challenge.value.clone(),
                principal: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(wrong, Err(ChallengeError::NotFound));

        let right = store
            .send(ConsumeChallenge {
                value: challenge.value.clone(),
                principal: Some(1),
            })
            .await
            .unwrap();
        assert!(right.is_ok());
    }
}
