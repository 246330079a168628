// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for AI text-generation backends.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse};

/// Adapter for AI text-generation backends.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Whether the backend has the credentials it needs to be called.
    ///
    /// Callers fall back to a local reply generator when this is `false`.
    fn is_configured(&self) -> bool {
        true
    }

    /// Sends a prompt and returns the generated text.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, MurmurError>;
}
