//! Persistence for the builders. The remote service is opaque: builders only
//! see the [`QuestionStore`] contract.

use async_trait::async_trait;

mod error;
mod http;
pub mod payload;

#[cfg(test)]
pub(crate) mod fake;

pub use error::StoreError;
pub use http::{CATEGORIZATION_PATH, CLOZE_PATH, COMPREHENSION_PATH, HttpStore};
pub use payload::{
    CategorizationPayload, CategoryRecord, ClozePayload, ComprehensionPayload, SavedComprehension,
    SavedQuestion,
};

/// Shared with spawned request tasks, so implementations must be `Send + Sync`.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn save_categorization(&self, payload: &CategorizationPayload) -> Result<(), StoreError>;

    /// Returns the server's confirmation message, if it sent one.
    async fn save_cloze(&self, payload: &ClozePayload) -> Result<Option<String>, StoreError>;

    async fn save_comprehension(&self, payload: &ComprehensionPayload) -> Result<(), StoreError>;

    async fn fetch_comprehensions(&self) -> Result<Vec<SavedComprehension>, StoreError>;
}
