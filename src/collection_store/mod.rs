mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{Album, AlbumUpsert, NewReview, Review, ReviewPatch, ReviewSort, ReviewWithAlbum};
pub use schema::COLLECTION_VERSIONED_SCHEMAS;
pub use store::SqliteCollectionStore;
pub use trait_def::CollectionStore;
