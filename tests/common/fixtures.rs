//! Test fixture creation for the user and collection databases

use super::constants::*;
use anyhow::Result;
use discolog_server::user::{
    CredentialsHasher, SqliteUserStore, UserAuthCredentials, UserAuthCredentialsStore, UserStore,
    UsernamePasswordCredentials,
};
use std::path::PathBuf;
use std::time::SystemTime;
use tempfile::TempDir;

/// Creates a temporary db directory with a user database holding the two
/// test users. The collection database is created lazily by the store.
/// Returns (temp_dir, collection_db_path, user_db_path).
pub fn create_test_db_dir() -> Result<(TempDir, PathBuf, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let collection_db_path = temp_dir.path().join("collection.db");
    let user_db_path = temp_dir.path().join("user.db");

    {
        let store = SqliteUserStore::new(&user_db_path)?;
        let user_id = create_user_with_password(&store, TEST_USER, TEST_PASS)?;
        eprintln!("Created test user {} with id {}", TEST_USER, user_id);
        let second_id = create_user_with_password(&store, SECOND_USER, SECOND_PASS)?;
        eprintln!("Created test user {} with id {}", SECOND_USER, second_id);
    }

    Ok((temp_dir, collection_db_path, user_db_path))
}

/// Creates a user with the given credentials
pub fn create_user_with_password(
    store: &SqliteUserStore,
    username: &str,
    password: &str,
) -> Result<usize> {
    let user_id = store.create_user(username)?;

    let hasher = CredentialsHasher::Argon2;
    let salt = hasher.generate_b64_salt();
    let hash = hasher.hash(password.as_bytes(), &salt)?;

    let password_credentials = UsernamePasswordCredentials {
        user_id,
        salt,
        hash,
        hasher,
        created: SystemTime::now(),
        last_tried: None,
        last_used: None,
    };

    store.update_user_auth_credentials(UserAuthCredentials {
        user_id,
        username_password: Some(password_credentials),
    })?;

    Ok(user_id)
}
