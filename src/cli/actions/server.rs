use crate::{api, cli::actions::Action, cli::globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            token_secret,
            token_ttl_minutes,
            storage_endpoint,
            storage_public_endpoint,
            storage_bucket,
            genai_api_key,
        } => {
            let mut globals = GlobalArgs::new(SecretString::from(token_secret), token_ttl_minutes);

            globals.storage_endpoint = storage_endpoint;
            globals.storage_public_endpoint = storage_public_endpoint;
            globals.storage_bucket = storage_bucket;
            globals.genai_api_key = genai_api_key.map(SecretString::from);

            debug!("Global args: {:?}", globals);

            api::new(port, dsn, globals).await?;
        }
    }

    Ok(())
}
