pub mod auth;
mod sqlite_user_store;
mod user_store;

pub use auth::{
    AuthToken, AuthTokenValue, CredentialsHasher, UserAuthCredentials, UsernamePasswordCredentials,
};
pub use sqlite_user_store::SqliteUserStore;
pub use user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
