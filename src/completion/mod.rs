//! Chat-completion service that turns symptom descriptions into structured
//! medical-style replies

pub mod azure;
pub mod prompts;

use async_trait::async_trait;

use crate::error::CompletionError;

pub use azure::{AzureOpenAiClient, CompletionSettings};

/// Opaque, fallible completion call
///
/// No retries happen here; callers surface failures to the user.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn generate_medical_response(
        &self,
        user_text: &str,
        credential: &str,
    ) -> Result<String, CompletionError>;

    fn name(&self) -> &str;
}
