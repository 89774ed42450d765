use crate::api::{self, handlers::auth::AuthConfig, DatabaseConfig};
use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub token_expire_minutes: u32,
    pub db_max_connections: u32,
    pub skip_migrations: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN is invalid, the database is unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = Url::parse(&args.dsn).context("Invalid database DSN")?;

    debug!("Database: {}", redact_dsn(&dsn));

    let auth_config =
        AuthConfig::new(args.jwt_secret).with_token_ttl_minutes(args.token_expire_minutes);

    let db_config = DatabaseConfig::new(dsn.to_string())
        .with_max_connections(args.db_max_connections)
        .with_migrations(!args.skip_migrations);

    api::new(args.port, db_config, auth_config).await
}

/// Masks the password component so the DSN can be logged.
fn redact_dsn(dsn: &Url) -> String {
    let mut redacted = dsn.clone();
    if redacted.password().is_some() && redacted.set_password(Some("***")).is_err() {
        return String::from("<unprintable dsn>");
    }
    redacted.to_string()
}
