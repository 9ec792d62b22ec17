//! Target-model schema capability.
//!
//! A fill target is any type implementing [`FillModel`]: `schemars` derives
//! the structural description embedded in the prompt, `serde` constructs
//! the instance from the model's JSON response.
//!
//! # Example
//!
//! ```rust,ignore
//! use modelfill::FillModel;
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Person {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl FillModel for Person {
//!     // Optional per-model prompt instructions.
//!     fn extra_requests() -> Vec<String> {
//!         vec!["Use the full legal name if present.".to_string()]
//!     }
//! }
//! ```

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// A type the model can be asked to fill.
///
/// Implement this trait for each target type; both methods have defaults,
/// so `impl FillModel for T {}` is enough when no extra instructions are
/// needed.
pub trait FillModel: JsonSchema + DeserializeOwned {
    /// Machine-readable structural description for the prompt.
    ///
    /// The raw `schemars` output is cleaned up for LLM consumption:
    /// `$ref` references are inlined (models do not follow refs reliably),
    /// every property is marked required with `additionalProperties:
    /// false`, and the `$schema`/`definitions` bookkeeping is stripped.
    fn schema_document() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut doc = serde_json::to_value(schema).unwrap_or_default();

        let definitions = doc.get("definitions").cloned();
        if let Some(defs) = &definitions {
            inline_definitions(&mut doc, defs);
        }
        tighten_objects(&mut doc);

        if let serde_json::Value::Object(map) = &mut doc {
            map.remove("definitions");
            map.remove("$schema");
        }
        doc
    }

    /// Extra natural-language instructions folded into the prompt.
    ///
    /// Defaults to none.
    fn extra_requests() -> Vec<String> {
        Vec::new()
    }

    /// Name of the target model, for logging.
    fn model_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

/// Replace every `{"$ref": "#/definitions/X"}` with the definition of `X`.
fn inline_definitions(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(ref_path)) = map.get("$ref") {
                if let Some(name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(name) {
                        *value = def.clone();
                        // The inlined definition may itself contain refs.
                        inline_definitions(value, definitions);
                        return;
                    }
                }
            }
            for (_, nested) in map.iter_mut() {
                inline_definitions(nested, definitions);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                inline_definitions(item, definitions);
            }
        }
        _ => {}
    }
}

/// Mark every object schema strict: `additionalProperties: false` and all
/// declared properties listed in `required`.
fn tighten_objects(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.get("type") == Some(&serde_json::Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), false.into());
                if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<serde_json::Value> =
                        props.keys().map(|k| k.as_str().into()).collect();
                    map.insert("required".to_string(), serde_json::Value::Array(all_keys));
                }
            }
            for (_, nested) in map.iter_mut() {
                tighten_objects(nested);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                tighten_objects(item);
            }
        }
        _ => {}
    }
}
