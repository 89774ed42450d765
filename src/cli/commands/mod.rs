pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_TOKEN_EXPIRE_MINUTES: &str = "token-expire-minutes";
pub const ARG_DB_MAX_CONNECTIONS: &str = "db-max-connections";
pub const ARG_SKIP_MIGRATIONS: &str = "skip-migrations";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("marketplace")
        .about("Marketplace catalog, reviews and accounts API")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("MARKETPLACE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("MARKETPLACE_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long("jwt-secret")
                .help("Secret used to sign access tokens (HS256, at least 32 bytes)")
                .env("MARKETPLACE_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_EXPIRE_MINUTES)
                .long("token-expire-minutes")
                .help("Access token lifetime in minutes")
                .default_value("60")
                .env("MARKETPLACE_TOKEN_EXPIRE_MINUTES")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_DB_MAX_CONNECTIONS)
                .long("db-max-connections")
                .help("Maximum number of pooled database connections")
                .default_value("5")
                .env("MARKETPLACE_DB_MAX_CONNECTIONS")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_SKIP_MIGRATIONS)
                .long("skip-migrations")
                .help("Do not apply sql/schema.sql on startup")
                .env("MARKETPLACE_SKIP_MIGRATIONS")
                .action(ArgAction::SetTrue),
        );

    logging::with_args(command)
}
