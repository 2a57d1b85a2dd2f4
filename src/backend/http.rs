use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;

use super::{
    QuestionStore, StoreError,
    payload::{CategorizationPayload, ClozePayload, ComprehensionPayload, SavedComprehension},
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub const CATEGORIZATION_PATH: &str = "/question";
pub const CLOZE_PATH: &str = "/questioning/savees";
pub const COMPREHENSION_PATH: &str = "/questionss/save";

/// Talks JSON to the question service.
#[derive(Clone, Debug)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(settings: &Settings) -> Result<Self, StoreError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: settings.api_base_url.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Posts `body` and returns the raw response text of a 2xx reply.
    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<String, StoreError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        read_body(response).await
    }

    async fn get(&self, path: &str) -> Result<String, StoreError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(StoreError::from_response(status.as_u16(), &text));
    }
    Ok(text)
}

fn parse_json(text: &str) -> Result<Value, StoreError> {
    serde_json::from_str(text).map_err(|err| StoreError::Decode(err.to_string()))
}

#[async_trait]
impl QuestionStore for HttpStore {
    async fn save_categorization(&self, payload: &CategorizationPayload) -> Result<(), StoreError> {
        // Any 2xx counts, whatever the body looks like.
        self.post(CATEGORIZATION_PATH, payload).await.map(|_| ())
    }

    async fn save_cloze(&self, payload: &ClozePayload) -> Result<Option<String>, StoreError> {
        let text = self.post(CLOZE_PATH, payload).await?;
        let body = parse_json(&text)?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn save_comprehension(&self, payload: &ComprehensionPayload) -> Result<(), StoreError> {
        let text = self.post(COMPREHENSION_PATH, payload).await?;
        parse_json(&text).map(|_| ())
    }

    async fn fetch_comprehensions(&self) -> Result<Vec<SavedComprehension>, StoreError> {
        let text = self.get(COMPREHENSION_PATH).await?;
        serde_json::from_str(&text).map_err(|err| StoreError::Decode(err.to_string()))
    }
}
