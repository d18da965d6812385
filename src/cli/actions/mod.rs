pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        token_secret: String,
        token_ttl_minutes: i64,
        storage_endpoint: Option<String>,
        storage_public_endpoint: Option<String>,
        storage_bucket: String,
        genai_api_key: Option<String>,
    },
}
