//! Generative-text service port.

use std::future::Future;

use crate::chat::ChatError;

/// A remote text-generation service.
pub trait TextGenerator: Send + Sync {
    /// Generates a reply to `user` under the `system` instruction.
    ///
    /// `Ok(None)` means the service answered but produced no text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-success responses.
    fn generate(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<Option<String>, ChatError>> + Send;
}
