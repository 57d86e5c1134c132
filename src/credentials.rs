//! AWS credentials for the introspector's import.
//!
//! Resolved through the SDK's default provider chain (environment, shared
//! profile, SSO, instance metadata) and handed to the import exec as
//! environment variables.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use thiserror::Error;
use tracing::debug;

pub const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("No AWS credentials provider configured")]
    NoProvider,

    #[error("Failed to load AWS credentials: {0}")]
    Provider(#[from] aws_credential_types::provider::error::CredentialsError),
}

/// Resolve credentials from the default chain as exec environment variables.
///
/// # Errors
///
/// Returns [`CredentialsError`] if no provider is configured or it fails.
pub async fn load_environment() -> Result<Vec<(String, String)>, CredentialsError> {
    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let provider = config
        .credentials_provider()
        .ok_or(CredentialsError::NoProvider)?;

    let credentials = provider.provide_credentials().await?;
    debug!(
        "Loaded AWS credentials (session token: {})",
        credentials.session_token().is_some()
    );
    Ok(environment(&credentials))
}

/// Access key and secret, plus the session token when there is one.
pub fn environment(credentials: &Credentials) -> Vec<(String, String)> {
    let mut env = vec![
        (
            ACCESS_KEY_ID.to_string(),
            credentials.access_key_id().to_string(),
        ),
        (
            SECRET_ACCESS_KEY.to_string(),
            credentials.secret_access_key().to_string(),
        ),
    ];
    if let Some(token) = credentials.session_token().filter(|t| !t.is_empty()) {
        env.push((SESSION_TOKEN.to_string(), token.to_string()));
    }
    env
}
