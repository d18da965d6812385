//! Object storage client.
//!
//! Opaque pass-through to an S3-compatible HTTP endpoint addressed as
//! `{endpoint}/{bucket}/{object}`. The store keeps uploaded meal and profile
//! images plus their analysis documents; everything else about the store is
//! its own concern.

use crate::{cli::globals::GlobalArgs, APP_USER_AGENT};
use anyhow::{anyhow, Result};
use axum::extract::Multipart;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, error, instrument};
use url::Url;

/// A file read out of a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[must_use]
pub fn is_configured(globals: &GlobalArgs) -> bool {
    globals.storage_endpoint.is_some() && !globals.storage_bucket.is_empty()
}

/// Object names come from client filenames; keep them to a single path
/// segment.
fn object_name(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    if name.is_empty() {
        "upload.bin".to_string()
    } else {
        name.replace(' ', "_")
    }
}

fn object_url(endpoint: &str, bucket: &str, object: &str) -> Result<String> {
    // Parse to reject garbage endpoints early
    Url::parse(endpoint)?;

    Ok(format!(
        "{}/{bucket}/{object}",
        endpoint.trim_end_matches('/')
    ))
}

/// Public URL for a stored object, preferring the public endpoint when the
/// internal one is not reachable from clients.
///
/// # Errors
///
/// Returns an error if storage is not configured or the endpoint is not a
/// valid URL.
pub fn public_url(globals: &GlobalArgs, object: &str) -> Result<String> {
    let endpoint = globals
        .storage_public_endpoint
        .as_deref()
        .or(globals.storage_endpoint.as_deref())
        .ok_or_else(|| anyhow!("Object storage is not configured"))?;

    object_url(endpoint, &globals.storage_bucket, object)
}

/// Store an object and return its public URL.
///
/// # Errors
///
/// Returns an error if storage is not configured, the request fails, or the
/// store answers with a non-success status.
#[instrument(skip(globals, bytes))]
pub async fn put_object(
    globals: &GlobalArgs,
    object: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<String> {
    let endpoint = globals
        .storage_endpoint
        .as_deref()
        .ok_or_else(|| anyhow!("Object storage is not configured"))?;

    let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

    let url = object_url(endpoint, &globals.storage_bucket, object)?;

    debug!("Storing object: {}", object);

    let response = client
        .put(&url)
        .header(CONTENT_TYPE, content_type)
        .body(bytes)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();

        error!("Failed to store object: {}", status);

        return Err(anyhow!("Failed to store object: {status}"));
    }

    public_url(globals, object)
}

/// Read the first file field out of a multipart request.
///
/// Returns `Ok(None)` when the request carries no file.
///
/// # Errors
///
/// Returns an error if the multipart stream is malformed or truncated.
pub async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>> {
    let Some(field) = multipart.next_field().await? else {
        return Ok(None);
    };

    let filename = field.file_name().map(object_name);
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await?.to_vec();

    Ok(Some(Upload {
        filename: filename.unwrap_or_else(|| "upload.bin".to_string()),
        content_type,
        bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn globals() -> GlobalArgs {
        let mut globals = GlobalArgs::new(SecretString::from("s3cret"), 30);
        globals.storage_endpoint = Some("http://localhost:9000".to_string());
        globals.storage_bucket = "vigoro".to_string();
        globals
    }

    #[test]
    fn test_is_configured() {
        assert!(is_configured(&globals()));

        let unconfigured = GlobalArgs::new(SecretString::from("s3cret"), 30);
        assert!(!is_configured(&unconfigured));
    }

    #[test]
    fn test_object_name_is_a_single_segment() {
        assert_eq!(object_name("meal.jpg"), "meal.jpg");
        assert_eq!(object_name("a/b/meal.jpg"), "meal.jpg");
        assert_eq!(object_name("..\\meal.jpg"), "meal.jpg");
        assert_eq!(object_name("my meal.jpg"), "my_meal.jpg");
        assert_eq!(object_name(""), "upload.bin");
    }

    #[test]
    fn test_public_url_prefers_public_endpoint() {
        let mut globals = globals();
        assert_eq!(
            public_url(&globals, "meal.jpg").unwrap(),
            "http://localhost:9000/vigoro/meal.jpg"
        );

        globals.storage_public_endpoint = Some("http://media.example.com".to_string());
        assert_eq!(
            public_url(&globals, "meal.jpg").unwrap(),
            "http://media.example.com/vigoro/meal.jpg"
        );
    }

    #[test]
    fn test_public_url_requires_configuration() {
        let unconfigured = GlobalArgs::new(SecretString::from("s3cret"), 30);
        assert!(public_url(&unconfigured, "meal.jpg").is_err());
    }

    #[test]
    fn test_object_url_rejects_invalid_endpoint() {
        assert!(object_url("not a url", "vigoro", "meal.jpg").is_err());
        assert_eq!(
            object_url("http://localhost:9000/", "vigoro", "meal.jpg").unwrap(),
            "http://localhost:9000/vigoro/meal.jpg"
        );
    }
}
