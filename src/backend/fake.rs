use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    CategorizationPayload, ClozePayload, ComprehensionPayload, QuestionStore, SavedComprehension,
    StoreError,
};

/// In-memory store for tests. Records every payload it receives and answers
/// with either success or a canned server error. A `pending` store records the
/// request and then never answers.
#[derive(Default)]
pub struct FakeStore {
    failure: Option<(u16, String)>,
    saved: Vec<SavedComprehension>,
    hang: bool,
    pub requests: Mutex<Vec<(&'static str, Value)>>,
}

impl FakeStore {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            ..Self::default()
        }
    }

    pub fn with_saved(saved: Vec<SavedComprehension>) -> Self {
        Self {
            saved,
            ..Self::default()
        }
    }

    pub fn pending() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|(_, body)| body.clone())
    }

    async fn respond(&self, endpoint: &'static str, body: Value) -> Result<(), StoreError> {
        self.requests.lock().unwrap().push((endpoint, body));
        if self.hang {
            std::future::pending::<()>().await;
        }
        match &self.failure {
            Some((status, body)) => Err(StoreError::from_response(*status, body)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QuestionStore for FakeStore {
    async fn save_categorization(&self, payload: &CategorizationPayload) -> Result<(), StoreError> {
        self.respond("categorization", serde_json::to_value(payload).unwrap())
            .await
    }

    async fn save_cloze(&self, payload: &ClozePayload) -> Result<Option<String>, StoreError> {
        self.respond("cloze", serde_json::to_value(payload).unwrap())
            .await?;
        Ok(Some("Question saved".to_string()))
    }

    async fn save_comprehension(&self, payload: &ComprehensionPayload) -> Result<(), StoreError> {
        self.respond("comprehension", serde_json::to_value(payload).unwrap())
            .await
    }

    async fn fetch_comprehensions(&self) -> Result<Vec<SavedComprehension>, StoreError> {
        self.respond("fetch", Value::Null).await?;
        Ok(self.saved.clone())
    }
}
