//! Fill strongly-typed models from free-form text and images using an LLM.
//!
//! The caller supplies a target type (any [`FillModel`]) and free-form
//! input; the library builds a prompt asking the model to emit JSON
//! conforming to the type's schema, submits one completion request,
//! parses the response, and constructs a validated instance.
//!
//! Exactly one request/response cycle per call: no history, no streaming,
//! no retry, no caching.
//!
//! # Usage
//!
//! ```rust,ignore
//! use modelfill::{query_model, FillModel, ModelQuery};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct Person {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl FillModel for Person {}
//!
//! // Process-wide client, created from OPENAI_API_KEY on first use.
//! let person: Option<Person> =
//!     query_model(&ModelQuery::from_body("Taro is ten years old")).await?;
//!
//! // Or hold the completion handle explicitly:
//! let filler = modelfill::ModelFiller::from_env()?;
//! let person: Option<Person> = filler
//!     .query(&ModelQuery::from_body("Taro is ten years old").dry_run(true))
//!     .await?; // dry run: prompt is built and logged, nothing is sent
//! ```
//!
//! # Modules
//!
//! - [`schema`] - Target-model capability ([`FillModel`])
//! - [`prompt`] - Prompt construction ([`ModelQuery`], [`build_prompt`])
//! - [`query`] - Completion invocation and materialization
//! - [`error`] - Typed errors
//! - [`testing`] - Mock completion capability for tests

pub mod error;
pub mod prompt;
pub mod query;
pub mod schema;
pub mod testing;

pub use error::{FillError, Result, ValidationError};
pub use prompt::{build_prompt, normalize_whitespace, BuiltPrompt, ModelQuery, DEFAULT_MODEL};
pub use query::{materialize, query_model, Completion, ModelFiller};
pub use schema::FillModel;

// Re-export the wire types a custom Completion implementation needs.
pub use openai_client::{
    ChatRequest, ContentPart, Message, OpenAIClient, OpenAIError, ResponseFormat,
};
