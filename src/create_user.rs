//! Provisions a user account with password credentials.
//!
//! The server has no self-registration endpoint; accounts are created
//! out-of-band with this tool.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::SystemTime;

use discolog_server::user::{
    CredentialsHasher, SqliteUserStore, UserAuthCredentials, UserAuthCredentialsStore, UserStore,
    UsernamePasswordCredentials,
};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite user database file. Created if it does not exist.
    pub user_db: PathBuf,

    /// Handle of the user to create.
    pub handle: String,

    /// Password for the new user.
    #[clap(long)]
    pub password: String,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let store = SqliteUserStore::new(&args.user_db)?;
    if store.get_user_id(&args.handle)?.is_some() {
        bail!("User {} already exists", args.handle);
    }

    let user_id = store.create_user(&args.handle)?;

    let hasher = CredentialsHasher::Argon2;
    let salt = hasher.generate_b64_salt();
    let hash = hasher.hash(args.password.as_bytes(), &salt)?;

    store.update_user_auth_credentials(UserAuthCredentials {
        user_id,
        username_password: Some(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        }),
    })?;

    println!("Created user {} with id {}", args.handle, user_id);
    Ok(())
}
