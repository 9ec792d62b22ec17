//! Completion invocation and response materialization.
//!
//! One request/response cycle per call: build the prompt, submit it (or
//! stop there in dry-run mode), decode the raw response, construct the
//! typed instance. No retry, no recovery; every failure propagates.

use std::sync::OnceLock;

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError, ResponseFormat};
use tracing::{debug, info};

use crate::error::{FillError, Result, ValidationError};
use crate::prompt::{build_prompt, ModelQuery};
use crate::schema::FillModel;

/// Completion capability consumed by the filler.
///
/// Implementations submit one chat-style request and return the first
/// choice's message content. Wrap a provider client here to substitute it;
/// tests use [`crate::testing::MockCompletion`].
#[async_trait]
pub trait Completion: Send + Sync {
    /// Submit one request; return the first choice's content.
    async fn complete(&self, request: ChatRequest) -> std::result::Result<String, OpenAIError>;
}

#[async_trait]
impl Completion for OpenAIClient {
    async fn complete(&self, request: ChatRequest) -> std::result::Result<String, OpenAIError> {
        self.chat_completion(request).await.map(|r| r.content)
    }
}

/// Fills typed models by querying a completion capability.
///
/// Holds the completion handle as an explicit dependency: construct one
/// filler per application (or per provider) and reuse it across calls.
/// The handle is never mutated after construction, so a filler is safe to
/// share across concurrent calls.
pub struct ModelFiller<C: Completion = OpenAIClient> {
    completion: C,
}

impl ModelFiller<OpenAIClient> {
    /// Create an OpenAI-backed filler from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let client = OpenAIClient::from_env().map_err(|e| FillError::Config(e.to_string()))?;
        Ok(Self::new(client))
    }
}

impl<C: Completion> ModelFiller<C> {
    /// Create a filler over the given completion capability.
    pub fn new(completion: C) -> Self {
        Self { completion }
    }

    /// Fill an instance of `T` from the query.
    ///
    /// The prompt is always fully built (including the image read, when an
    /// image is attached). In dry-run mode the completion capability is
    /// never contacted and `Ok(None)` is returned; the would-be prompt is
    /// logged at debug level and available via
    /// [`build_prompt`](crate::prompt::build_prompt).
    pub async fn query<T: FillModel>(&self, query: &ModelQuery) -> Result<Option<T>> {
        let prompt = build_prompt::<T>(query)?;

        if query.dry_run {
            debug!(system = %prompt.system, "dry run, skipping completion request");
            return Ok(None);
        }

        let request = ChatRequest::new(&query.model)
            .message(Message::system(prompt.system))
            .message(Message::user_parts(prompt.content))
            .temperature(query.temperature)
            .response_format(ResponseFormat::json_object());

        info!(
            model = %query.model,
            model_name = %T::model_name(),
            "requesting completion"
        );
        let raw = self.completion.complete(request).await?;
        debug!(response = %raw, "completion response");

        materialize(&raw).map(Some)
    }
}

/// Two-stage materialization of a raw response.
///
/// Stage one decodes the string to a generic JSON value
/// ([`FillError::Parse`] on failure); stage two constructs the typed
/// instance, with serde failures sorted into distinct
/// [`ValidationError`](crate::error::ValidationError) variants.
pub fn materialize<T: FillModel>(raw: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(FillError::Parse)?;
    serde_json::from_value(value).map_err(|e| ValidationError::classify(e).into())
}

static SHARED_CLIENT: OnceLock<OpenAIClient> = OnceLock::new();

/// Process-wide client, created lazily from the environment on first use.
fn shared_client() -> Result<&'static OpenAIClient> {
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(client);
    }
    let client = OpenAIClient::from_env().map_err(|e| FillError::Config(e.to_string()))?;
    debug!("initialized shared OpenAI client");
    // Racing first calls may both construct; OnceLock keeps exactly one.
    Ok(SHARED_CLIENT.get_or_init(|| client))
}

/// Fill an instance of `T` using the process-wide OpenAI client.
///
/// Convenience entry point mirroring [`ModelFiller::query`]: the client is
/// created once from `OPENAI_API_KEY` on the first call and reused for the
/// process lifetime. Returns `Ok(None)` in dry-run mode.
pub async fn query_model<T: FillModel>(query: &ModelQuery) -> Result<Option<T>> {
    let client = shared_client()?;
    ModelFiller::new(client.clone()).query(query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompletion;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Person {
        name: String,
        age: i64,
    }

    impl FillModel for Person {}

    #[tokio::test]
    async fn test_query_materializes_response() {
        let mock = MockCompletion::new(r#"{"name": "Taro", "age": 10}"#);
        let filler = ModelFiller::new(mock.clone());

        let person: Person = filler
            .query(&ModelQuery::from_body("Taro is ten years old"))
            .await
            .unwrap()
            .expect("non-dry-run returns a value");

        assert_eq!(person.name, "Taro");
        assert_eq!(person.age, 10);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_query_parameters() {
        let mock = MockCompletion::new(r#"{"name": "Taro", "age": 10}"#);
        let filler = ModelFiller::new(mock.clone());

        let query = ModelQuery::from_body("Taro is ten years old")
            .with_model("gpt-4o")
            .with_temperature(0.7);
        let _: Option<Person> = filler.query(&query).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o");
        assert_eq!(requests[0].temperature, Some(0.7));
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[0].role, "system");
        assert_eq!(requests[0].messages[1].role, "user");

        let wire = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(wire["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn test_dry_run_skips_completion() {
        let mock = MockCompletion::new(r#"{"name": "Taro", "age": 10}"#);
        let filler = ModelFiller::new(mock.clone());

        let result: Option<Person> = filler
            .query(&ModelQuery::from_body("Taro is ten years old").dry_run(true))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_filler_is_reused_across_calls() {
        let mock = MockCompletion::new(r#"{"name": "Taro", "age": 10}"#);
        let filler = ModelFiller::new(mock.clone());

        let query = ModelQuery::from_body("Taro is ten years old");
        let _: Option<Person> = filler.query(&query).await.unwrap();
        let _: Option<Person> = filler.query(&query).await.unwrap();

        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_non_json_response_is_a_parse_error() {
        let mock = MockCompletion::new("not json");
        let filler = ModelFiller::new(mock);

        let err = filler
            .query::<Person>(&ModelQuery::from_body("whatever"))
            .await
            .unwrap_err();

        assert!(matches!(err, FillError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_field_is_a_validation_error() {
        let mock = MockCompletion::new(r#"{"name": "Taro"}"#);
        let filler = ModelFiller::new(mock);

        let err = filler
            .query::<Person>(&ModelQuery::from_body("whatever"))
            .await
            .unwrap_err();

        match err {
            FillError::Validation(ValidationError::MissingField { field }) => {
                assert_eq!(field, "age");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mistyped_field_is_a_validation_error() {
        let mock = MockCompletion::new(r#"{"name": "Taro", "age": "ten"}"#);
        let filler = ModelFiller::new(mock);

        let err = filler
            .query::<Person>(&ModelQuery::from_body("whatever"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FillError::Validation(ValidationError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_completion_failure_propagates_unmodified() {
        let mock = MockCompletion::failing("rate limited");
        let filler = ModelFiller::new(mock);

        let err = filler
            .query::<Person>(&ModelQuery::from_body("whatever"))
            .await
            .unwrap_err();

        assert!(matches!(err, FillError::Completion(OpenAIError::Api(_))));
    }

    // Owns OPENAI_API_KEY for this test binary; no other modelfill test
    // touches the environment.
    #[test]
    fn test_shared_client_initialized_once_per_process() {
        std::env::remove_var("OPENAI_API_KEY");
        assert!(matches!(shared_client(), Err(FillError::Config(_))));

        // A failed first attempt must not poison later calls.
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let first = shared_client().unwrap();
        let second = shared_client().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_materialize_stages() {
        let person: Person = materialize(r#"{"name": "Taro", "age": 10}"#).unwrap();
        assert_eq!(person.name, "Taro");

        assert!(matches!(
            materialize::<Person>("[1, 2").unwrap_err(),
            FillError::Parse(_)
        ));
        // Valid JSON of the wrong shape fails in stage two, not stage one.
        assert!(matches!(
            materialize::<Person>("[1, 2]").unwrap_err(),
            FillError::Validation(_)
        ));
    }
}
