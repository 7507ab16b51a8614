use chrono::Duration;
use rand::Rng;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::email::{EmailMessage, EmailSender};
use super::models::{OtpPurpose, VerificationSession};
use crate::account::normalize_email;
use crate::clock::Clock;
use crate::config::OtpConfig;
use crate::core_types::SessionId;
use crate::error::{CoreError, CoreResult};
use crate::store::locks::otp_key;
use crate::store::{
    DocumentStore, Filter, KeyedLocks, Sort, collections, from_document, from_documents,
    to_document,
};

/// Uniform over 000000..=999999
fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

pub struct OtpGate {
    store: Arc<dyn DocumentStore>,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
    sender: Arc<dyn EmailSender>,
    config: OtpConfig,
}

impl OtpGate {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
        sender: Arc<dyn EmailSender>,
        config: OtpConfig,
    ) -> Self {
        Self {
            store,
            locks,
            clock,
            sender,
            config,
        }
    }

    /// Persist a new code and email it. Nothing survives a failed send.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> CoreResult<VerificationSession> {
        let email = normalize_email(email)?;
        if self.config.invalidate_previous {
            for previous in self.unconsumed(&email, purpose, None).await? {
                self.discard(previous.id).await?;
            }
        }

        let now = self.clock.now();
        let session = VerificationSession {
            id: uuid::Uuid::new_v4(),
            email,
            code: generate_code(),
            purpose,
            expires_at: now + Duration::minutes(self.config.ttl_minutes),
            is_consumed: false,
            consumed_at: None,
            created_at: now,
        };
        self.store
            .put(
                collections::VERIFICATION_SESSIONS,
                &session.id.to_string(),
                to_document(&session)?,
            )
            .await?;

        let message = EmailMessage {
            to: session.email.clone(),
            subject: purpose.subject().to_string(),
            body: format!(
                "Your verification code is {}. It expires in {} minutes.",
                session.code, self.config.ttl_minutes
            ),
        };
        if let Err(e) = self.sender.send(&message).await {
            warn!(email = %session.email, purpose = purpose.as_str(), error = %e, "OTP delivery failed");
            self.discard(session.id).await?;
            return Err(match e {
                CoreError::ExternalServiceFailure(_) => e,
                other => CoreError::ExternalServiceFailure(other.to_string()),
            });
        }

        info!(email = %session.email, purpose = purpose.as_str(), session_id = %session.id, "OTP issued");
        Ok(session)
    }

    /// Consume a matching code. Returns the session id as verification token.
    pub async fn verify(&self, email: &str, code: &str, purpose: OtpPurpose) -> CoreResult<SessionId> {
        let session = self.check(email, code, purpose).await?;
        self.claim(session.id).await?;
        Ok(session.id)
    }

    /// Validate a code without consuming it
    pub async fn check(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> CoreResult<VerificationSession> {
        let email = normalize_email(email)?;
        let candidates = self.unconsumed(&email, purpose, Some(code)).await?;
        let now = self.clock.now();

        // Several live codes may coexist; any unexpired match is accepted
        match candidates.iter().find(|s| !s.is_expired(now)) {
            Some(session) => Ok(session.clone()),
            None if !candidates.is_empty() => Err(CoreError::Expired("Verification code".into())),
            None => Err(CoreError::InvalidCode),
        }
    }

    /// Atomically mark a session consumed. A second claim fails with InvalidCode.
    pub async fn claim(&self, id: SessionId) -> CoreResult<()> {
        let _guard = self.locks.lock(&otp_key(&id)).await;
        let session = self.get(id).await?.ok_or(CoreError::InvalidCode)?;
        if session.is_consumed {
            return Err(CoreError::InvalidCode);
        }
        let now = self.clock.now();
        if session.is_expired(now) {
            return Err(CoreError::Expired("Verification code".into()));
        }

        let mut fields = Map::new();
        fields.insert("is_consumed".into(), json!(true));
        fields.insert("consumed_at".into(), json!(now.timestamp_millis()));
        self.update(id, fields).await?;
        debug!(session_id = %id, "OTP consumed");
        Ok(())
    }

    /// Undo a claim whose surrounding operation failed
    pub async fn release(&self, id: SessionId) -> CoreResult<()> {
        let _guard = self.locks.lock(&otp_key(&id)).await;
        let mut fields = Map::new();
        fields.insert("is_consumed".into(), json!(false));
        fields.insert("consumed_at".into(), Value::Null);
        self.update(id, fields).await?;
        info!(session_id = %id, "OTP claim released");
        Ok(())
    }

    pub async fn discard(&self, id: SessionId) -> CoreResult<()> {
        self.store
            .delete(collections::VERIFICATION_SESSIONS, &id.to_string())
            .await?;
        Ok(())
    }

    /// Resolve a verification token produced by [`OtpGate::verify`]
    pub async fn redeem_token(
        &self,
        token: &str,
        email: &str,
        purpose: OtpPurpose,
    ) -> CoreResult<VerificationSession> {
        let email = normalize_email(email)?;
        let id: SessionId = token.trim().parse().map_err(|_| CoreError::InvalidToken)?;
        let session = self.get(id).await?.ok_or(CoreError::InvalidToken)?;

        let fresh = session.consumed_at.is_some_and(|at| {
            self.clock.now() <= at + Duration::minutes(self.config.registration_token_ttl_minutes)
        });
        if !session.is_consumed || session.email != email || session.purpose != purpose || !fresh {
            return Err(CoreError::InvalidToken);
        }
        Ok(session)
    }

    /// Delete sessions that can no longer be verified or redeemed
    pub async fn purge_expired(&self) -> CoreResult<usize> {
        let now = self.clock.now();
        let token_ttl = Duration::minutes(self.config.registration_token_ttl_minutes);
        let docs = self
            .store
            .find(collections::VERIFICATION_SESSIONS, &Filter::new(), None, None)
            .await?;

        let mut purged = 0;
        for session in from_documents::<VerificationSession>(docs)? {
            let dead = match session.consumed_at {
                Some(at) if session.is_consumed => now > at + token_ttl,
                _ => session.is_expired(now),
            };
            if dead {
                self.discard(session.id).await?;
                purged += 1;
            }
        }
        if purged > 0 {
            info!(purged, "Purged expired verification sessions");
        }
        Ok(purged)
    }

    async fn get(&self, id: SessionId) -> CoreResult<Option<VerificationSession>> {
        match self
            .store
            .get(collections::VERIFICATION_SESSIONS, &id.to_string())
            .await?
        {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: SessionId, fields: Map<String, Value>) -> CoreResult<()> {
        if !self
            .store
            .update_set(collections::VERIFICATION_SESSIONS, &id.to_string(), fields)
            .await?
        {
            return Err(CoreError::InvalidCode);
        }
        Ok(())
    }

    /// Unconsumed sessions for (email, purpose), newest first
    async fn unconsumed(
        &self,
        email: &str,
        purpose: OtpPurpose,
        code: Option<&str>,
    ) -> CoreResult<Vec<VerificationSession>> {
        let mut filter = Filter::new()
            .eq("email", email)
            .eq("purpose", purpose.as_str())
            .eq("is_consumed", false);
        if let Some(code) = code {
            filter = filter.eq("code", code);
        }
        let docs = self
            .store
            .find(
                collections::VERIFICATION_SESSIONS,
                &filter,
                Some(&Sort::desc("created_at")),
                None,
            )
            .await?;
        Ok(from_documents(docs)?)
    }
}

/// Periodically purge expired sessions
pub fn spawn_sweeper(gate: Arc<OtpGate>, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = gate.purge_expired().await {
                warn!(error = %e, "OTP sweep failed");
            }
        }
    })
}
