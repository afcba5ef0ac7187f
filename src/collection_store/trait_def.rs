use super::models::{Album, AlbumUpsert, NewReview, ReviewPatch, ReviewSort, ReviewWithAlbum};
use anyhow::Result;

/// Storage for the user's album collection and listen reviews.
pub trait CollectionStore: Send + Sync {
    /// Inserts the album, or fully replaces its mutable fields if a row with
    /// the same id already exists. `created_at` is preserved on replace.
    /// Returns the persisted row.
    fn upsert_album(&self, album: AlbumUpsert) -> Result<Album>;

    /// Returns the album with the given id, or Ok(None) if it does not exist.
    fn get_album(&self, id: &str) -> Result<Option<Album>>;

    /// Lists reviews joined with their albums, sorted descending by the
    /// given key. `owner` filters to one user's rows; None returns every
    /// row (single-user databases). Reviews whose album cannot be resolved
    /// are excluded. The order of equal sort keys is unspecified.
    fn list_reviews(&self, owner: Option<usize>, sort: ReviewSort) -> Result<Vec<ReviewWithAlbum>>;

    /// Returns the review with the given id joined with its album, or
    /// Ok(None) if the review (or its album) does not exist.
    fn get_review(&self, id: &str) -> Result<Option<ReviewWithAlbum>>;

    /// Creates a review owned by `user_id` and returns it joined with its
    /// album. Fails if the rating is outside 1-5 or the album is missing.
    fn create_review(&self, user_id: usize, review: NewReview) -> Result<ReviewWithAlbum>;

    /// Applies a partial update to the review. The review's id, owner and
    /// album are immutable. Returns Ok(None) if the review does not exist.
    fn update_review(&self, id: &str, patch: ReviewPatch) -> Result<Option<ReviewWithAlbum>>;

    /// Deletes the review. Its album is left untouched.
    /// Returns true if a row was deleted.
    fn delete_review(&self, id: &str) -> Result<bool>;
}
