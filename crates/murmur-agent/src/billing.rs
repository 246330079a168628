// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment webhook verification and subscription bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use murmur_config::model::BillingConfig;
use murmur_core::types::{SubscriptionTier, UserId};
use murmur_core::{MurmurError, StorageAdapter};
use serde_json::Value;
use sha2::Sha256;
use tracing::{error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`).
///
/// The expected signature is HMAC-SHA256 of `"{t}.{body}"` keyed with
/// `secret`. Timestamps further than `tolerance` from `now` are rejected.
pub fn verify_signature(
    header: &str,
    body: &[u8],
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), MurmurError> {
    let invalid = || MurmurError::Unauthenticated("Invalid webhook signature".into());

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(invalid)?;

    if now.abs_diff(timestamp) > tolerance.as_secs() {
        warn!(timestamp, now, "webhook timestamp outside tolerance");
        return Err(invalid());
    }

    let matches = signatures.iter().any(|signature| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        mac.verify_slice(signature).is_ok()
    });
    if matches { Ok(()) } else { Err(invalid()) }
}

/// Hex signature for `"{timestamp}.{body}"`, as a sender would compute it.
pub fn sign_payload(body: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// The webhook events Murmur acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted {
        user_id: Option<UserId>,
    },
    PaymentFailed {
        customer: Option<String>,
        amount_due: i64,
    },
    SubscriptionDeleted {
        customer: Option<String>,
        user_id: Option<UserId>,
    },
    Other {
        event_type: String,
    },
}

impl BillingEvent {
    /// Parses a `{type, data: {object}}` event body.
    pub fn parse(body: &[u8]) -> Result<(String, Self), MurmurError> {
        let event: Value = serde_json::from_slice(body)
            .map_err(|_| MurmurError::Validation("Invalid JSON payload".into()))?;
        let event_type = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let object = event.pointer("/data/object").unwrap_or(&Value::Null);
        let customer = object
            .get("customer")
            .and_then(Value::as_str)
            .map(str::to_string);
        let metadata_user = object.pointer("/metadata/user_id").and_then(parse_user_id);

        let parsed = match event_type.as_str() {
            "checkout.session.completed" => Self::CheckoutCompleted {
                user_id: metadata_user
                    .or_else(|| object.get("client_reference_id").and_then(parse_user_id)),
            },
            "invoice.payment_failed" => Self::PaymentFailed {
                customer,
                amount_due: object.get("amount_due").and_then(Value::as_i64).unwrap_or(0),
            },
            "customer.subscription.deleted" => Self::SubscriptionDeleted {
                customer,
                user_id: metadata_user,
            },
            other => Self::Other {
                event_type: other.to_string(),
            },
        };
        Ok((event_type, parsed))
    }
}

fn parse_user_id(value: &Value) -> Option<UserId> {
    match value {
        Value::Number(n) => n.as_i64().map(UserId),
        Value::String(s) => s.trim().parse().ok().map(UserId),
        _ => None,
    }
}

/// What handling an event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingOutcome {
    Upgraded(UserId),
    Downgraded(UserId),
    Logged,
}

/// Applies verified webhook events to user subscriptions.
pub struct BillingService {
    storage: Arc<dyn StorageAdapter>,
    webhook_secret: Option<String>,
    tolerance: Duration,
    downgrade_on_cancel: bool,
}

impl BillingService {
    pub fn new(storage: Arc<dyn StorageAdapter>, config: &BillingConfig) -> Self {
        Self {
            storage,
            webhook_secret: config.webhook_secret.clone().filter(|s| !s.is_empty()),
            tolerance: Duration::from_secs(config.signature_tolerance_secs),
            downgrade_on_cancel: config.downgrade_on_cancel,
        }
    }

    /// Verifies, parses and applies a raw webhook delivery. Returns the
    /// event type for the acknowledgement message.
    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<String, MurmurError> {
        let Some(secret) = self.webhook_secret.as_deref() else {
            warn!("webhook rejected: no signing secret configured");
            return Err(MurmurError::Unauthenticated(
                "Webhook signing secret is not configured".into(),
            ));
        };
        let signature = signature.ok_or_else(|| {
            MurmurError::Unauthenticated("Missing webhook signature".into())
        })?;
        verify_signature(
            signature,
            body,
            secret,
            self.tolerance,
            chrono::Utc::now().timestamp(),
        )?;

        let (event_type, event) = BillingEvent::parse(body)?;
        self.handle(event).await?;
        Ok(event_type)
    }

    pub async fn handle(&self, event: BillingEvent) -> Result<BillingOutcome, MurmurError> {
        match event {
            BillingEvent::CheckoutCompleted { user_id: None } => {
                error!("no user id found in checkout session");
                Ok(BillingOutcome::Logged)
            }
            BillingEvent::CheckoutCompleted {
                user_id: Some(user_id),
            } => self.set_tier(user_id, SubscriptionTier::Pro).await,
            BillingEvent::PaymentFailed {
                customer,
                amount_due,
            } => {
                warn!(customer = customer.as_deref().unwrap_or("unknown"), amount_due, "payment failed");
                Ok(BillingOutcome::Logged)
            }
            BillingEvent::SubscriptionDeleted { customer, user_id } => {
                info!(customer = customer.as_deref().unwrap_or("unknown"), "subscription cancelled");
                match user_id {
                    Some(user_id) if self.downgrade_on_cancel => {
                        self.set_tier(user_id, SubscriptionTier::Basic).await
                    }
                    _ => Ok(BillingOutcome::Logged),
                }
            }
            BillingEvent::Other { event_type } => {
                info!(event_type, "received unhandled webhook event");
                Ok(BillingOutcome::Logged)
            }
        }
    }

    async fn set_tier(
        &self,
        user_id: UserId,
        tier: SubscriptionTier,
    ) -> Result<BillingOutcome, MurmurError> {
        if !self.storage.set_subscription_tier(user_id, tier).await? {
            error!(user_id = %user_id, %tier, "user not found for subscription change");
            return Ok(BillingOutcome::Logged);
        }
        info!(user_id = %user_id, %tier, "subscription tier changed");
        Ok(match tier {
            SubscriptionTier::Pro => BillingOutcome::Upgraded(user_id),
            SubscriptionTier::Basic => BillingOutcome::Downgraded(user_id),
        })
    }
}
