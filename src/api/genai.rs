//! Generative AI client.
//!
//! One JSON endpoint serves meal-photo analysis, plan and recipe
//! generation, and the assistant chat. Models are tried in order; the first
//! one that answers wins. Replies are free text that usually contains a
//! JSON document, extracted with [`extract_json`].

use crate::{cli::globals::GlobalArgs, APP_USER_AGENT};
use anyhow::{anyhow, Result};
use base64ct::{Base64, Encoding};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

const GENERATE_CONTENT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// Newest first; older models stay as fallbacks for quota errors.
const MODEL_FALLBACK: [&str; 3] = ["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro"];

#[must_use]
pub fn is_configured(globals: &GlobalArgs) -> bool {
    globals.genai_api_key.is_some()
}

/// Ask the service to answer a text prompt.
///
/// # Errors
///
/// Returns an error if the service is not configured or every model fails.
pub async fn generate_text(globals: &GlobalArgs, prompt: &str) -> Result<String> {
    generate(globals, json!([{ "text": prompt }])).await
}

/// Ask the vision service about an image, sent inline as base64.
///
/// # Errors
///
/// Returns an error if the service is not configured or every model fails.
pub async fn analyze_image(
    globals: &GlobalArgs,
    prompt: &str,
    bytes: &[u8],
    mime_type: &str,
) -> Result<String> {
    generate(
        globals,
        json!([
            { "text": prompt },
            {
                "inline_data": {
                    "mime_type": mime_type,
                    "data": Base64::encode_string(bytes),
                }
            }
        ]),
    )
    .await
}

#[instrument(skip(globals, parts))]
async fn generate(globals: &GlobalArgs, parts: Value) -> Result<String> {
    let api_key = globals
        .genai_api_key
        .as_ref()
        .ok_or_else(|| anyhow!("AI service is not configured"))?;

    let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

    let payload = json!({ "contents": [{ "parts": parts }] });

    let mut last_error = anyhow!("No models configured");

    for model in MODEL_FALLBACK {
        let url = format!(
            "{GENERATE_CONTENT_BASE}/{model}:generateContent?key={}",
            api_key.expose_secret()
        );

        let response = match client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Model {} failed: {}", model, e);
                last_error = e.into();
                continue;
            }
        };

        if !response.status().is_success() {
            let status = response.status();

            warn!("Model {} failed: {}", model, status);
            last_error = anyhow!("{status}");
            continue;
        }

        let body: Value = response.json().await?;

        if let Some(text) = body["candidates"][0]["content"]["parts"][0]["text"].as_str() {
            debug!("Model {} answered", model);

            return Ok(text.to_string());
        }

        warn!("Model {} returned no text", model);
        last_error = anyhow!("Model {model} returned no text");
    }

    Err(last_error)
}

/// Pull the first JSON object out of a model reply, tolerating markdown
/// fences and stray prose around it.
#[must_use]
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if end < start {
        return None;
    }

    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"calories": 420, "rating": 8}"#).unwrap();
        assert_eq!(value["calories"], 420);
    }

    #[test]
    fn test_extract_fenced_json() {
        let reply = "```json\n{\"calories\": 420}\n```";
        let value = extract_json(reply).unwrap();
        assert_eq!(value["calories"], 420);
    }

    #[test]
    fn test_extract_json_with_surrounding_prose() {
        let reply = "Here is your analysis:\n{\"rating\": 7}\nEnjoy your meal!";
        let value = extract_json(reply).unwrap();
        assert_eq!(value["rating"], 7);
    }

    #[test]
    fn test_extract_nested_json() {
        let reply = r#"{"nutrition": {"calories": 400}, "servings": 2}"#;
        let value = extract_json(reply).unwrap();
        assert_eq!(value["nutrition"]["calories"], 400);
    }

    #[test]
    fn test_extract_json_failures() {
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("{not valid json}").is_none());
        assert!(extract_json("} backwards {").is_none());
        assert!(extract_json("").is_none());
    }
}
