//! Fill a typed model from free-form text.
//!
//! Requires OPENAI_API_KEY. Pass `--dry-run` to build and print the prompt
//! without contacting the API.

use modelfill::{build_prompt, FillModel, ModelFiller, ModelQuery};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
struct Person {
    name: String,
    age: i64,
    occupation: String,
}

impl FillModel for Person {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dry_run = std::env::args().any(|arg| arg == "--dry-run");

    let query = ModelQuery::from_body("John Smith is a 35 year old software engineer.")
        .with_japanese_output(false)
        .dry_run(dry_run);

    if dry_run {
        let prompt = build_prompt::<Person>(&query)?;
        println!("system prompt:\n{}", prompt.system);
        return Ok(());
    }

    let filler = ModelFiller::from_env()?;
    let person: Person = filler
        .query(&query)
        .await?
        .expect("non-dry-run always produces a value");

    println!("Name: {}", person.name);
    println!("Age: {}", person.age);
    println!("Occupation: {}", person.occupation);

    Ok(())
}
