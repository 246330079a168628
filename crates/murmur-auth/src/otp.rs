// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-time passcodes kept in the key-value store.
//!
//! A code is stored under `otp:{mobile}:{purpose}` with the configured TTL.
//! Issuing again replaces the previous code; a successful verification
//! deletes it, so every code is accepted at most once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use murmur_core::{KvStore, KvStoreExt, MurmurError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, warn};

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Login,
    ForgotPassword,
}

/// A freshly issued code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedOtp {
    pub otp_code: String,
    pub mobile_number: String,
    pub otp_type: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub struct OtpService {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(mobile_number: &str, purpose: OtpPurpose) -> String {
        format!("otp:{mobile_number}:{purpose}")
    }

    /// Generates and stores a new code, replacing any outstanding one.
    pub async fn issue(
        &self,
        mobile_number: &str,
        purpose: OtpPurpose,
    ) -> Result<IssuedOtp, MurmurError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| MurmurError::Internal(format!("invalid otp ttl: {e}")))?;
        let otp = IssuedOtp {
            otp_code: generate_code(),
            mobile_number: mobile_number.to_string(),
            otp_type: purpose,
            expires_at: now + ttl,
            created_at: now,
        };
        let key = Self::key(mobile_number, purpose);
        if !self.kv.set_json(&key, &otp, Some(self.ttl)).await {
            warn!(%purpose, "could not store otp");
            return Err(MurmurError::Internal("Failed to generate OTP".into()));
        }
        info!(%purpose, "otp issued");
        Ok(otp)
    }

    /// Accepts `code` once. Unknown, expired and mismatched codes are all
    /// reported as invalid.
    pub async fn verify(
        &self,
        mobile_number: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), MurmurError> {
        let key = Self::key(mobile_number, purpose);
        let stored = self.kv.get_json::<IssuedOtp>(&key).await;
        match stored {
            Some(otp) if otp.otp_code == code.trim() && otp.expires_at > Utc::now() => {
                self.kv.delete(&key).await;
                info!(%purpose, "otp verified");
                Ok(())
            }
            _ => Err(MurmurError::Validation("Invalid or expired OTP code".into())),
        }
    }
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
