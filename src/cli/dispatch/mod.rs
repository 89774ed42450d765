//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary runs, checking the
//! cross-argument constraints clap cannot express on its own.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{
    ARG_DB_MAX_CONNECTIONS, ARG_DSN, ARG_JWT_SECRET, ARG_PORT, ARG_SKIP_MIGRATIONS,
    ARG_TOKEN_EXPIRE_MINUTES,
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// HS256 keys shorter than the digest size weaken the signature.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or the signing secret is too short.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>(ARG_JWT_SECRET)
        .cloned()
        .context("missing required argument: --jwt-secret")?;
    if jwt_secret.len() < MIN_JWT_SECRET_LEN {
        return Err(anyhow!(
            "--jwt-secret must be at least {MIN_JWT_SECRET_LEN} bytes long"
        ));
    }

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: SecretString::from(jwt_secret),
        token_expire_minutes: matches
            .get_one::<u32>(ARG_TOKEN_EXPIRE_MINUTES)
            .copied()
            .unwrap_or(60),
        db_max_connections: matches
            .get_one::<u32>(ARG_DB_MAX_CONNECTIONS)
            .copied()
            .unwrap_or(5),
        skip_migrations: matches.get_flag(ARG_SKIP_MIGRATIONS),
    }))
}
