//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! cartline-cli user create -u alice -p secret1
//! ```

use cartline_server::services::{AuthService, SessionAuthority};

use super::{CliError, connect};

/// Register a user, applying the same rules as `POST /users`.
///
/// # Errors
///
/// Returns an error if the username is invalid or taken, or the database
/// operation fails.
pub async fn create(username: &str, password: &str) -> Result<(), CliError> {
    let (config, store) = connect().await?;
    let sessions = SessionAuthority::new(&config.session_secret, config.session_ttl)?;

    let user = AuthService::new(&store, &sessions)
        .register(username, password)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User created");
    Ok(())
}
