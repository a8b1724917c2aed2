/*!
 * Clients for the remote translation service.
 *
 * This module contains the service seam and its implementations:
 * - `remote`: HTTP/JSON client for the hosted service
 * - `mock`: scripted in-process service for tests and offline runs
 */

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::translation::unit::{Language, TranslationUnit};

pub mod mock;
pub mod remote;

pub use mock::{MockBehavior, MockService};
pub use remote::HttpTranslationService;

/// Operations offered by the remote translation service
///
/// Outbound units carry the source text and the language it is written in;
/// `target` is the language the caller wants back. Returned units are
/// matched to their requests by hash and carry the translated text.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// List the languages the service can translate into
    async fn languages(&self) -> Result<Vec<Language>, ServiceError>;

    /// Translate a single unit, `None` when the service has nothing for it
    async fn translate(
        &self,
        unit: &TranslationUnit,
        target: &str,
    ) -> Result<Option<TranslationUnit>, ServiceError>;

    /// Look units up in the service's shared cache
    async fn translate_all(
        &self,
        units: &[TranslationUnit],
        target: &str,
    ) -> Result<Vec<TranslationUnit>, ServiceError>;

    /// Translate units nobody has translated yet, with optional page context
    async fn translate_untranslated(
        &self,
        units: &[TranslationUnit],
        context: Option<&str>,
        target: &str,
    ) -> Result<Vec<TranslationUnit>, ServiceError>;
}
