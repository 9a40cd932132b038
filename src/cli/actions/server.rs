use crate::api;
use crate::api::handlers::auth::AuthConfig;
use anyhow::Result;
use secrecy::SecretString;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub frontend_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        frontend_url = %args.frontend_url,
        "Starting {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );

    let auth_config = AuthConfig::new(args.frontend_url, args.jwt_secret);

    api::new(args.port, args.dsn, auth_config).await
}
