// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution for inbound credentials.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::types::Principal;

/// Turns a bearer credential into an authenticated [`Principal`].
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    /// Resolves the credential or fails with [`MurmurError::Unauthenticated`].
    ///
    /// Unknown and inactive users are both rejected.
    async fn resolve_principal(&self, credential: &str) -> Result<Principal, MurmurError>;
}
