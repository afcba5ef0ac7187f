use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An album in the user's collection. The id is either an external catalog
/// id or an opaque client-generated token for manually entered albums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub image_url: Option<String>,
    pub release_year: Option<String>,
    pub spotify_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when inserting or replacing an album.
/// `created_at` is owned by the store and not part of the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumUpsert {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub release_year: Option<String>,
    #[serde(default)]
    pub spotify_id: Option<String>,
}

/// A logged listen of an album. `user_id` is None only for legacy rows
/// written before accounts existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user_id: Option<usize>,
    pub album_id: String,
    pub rating: u8,
    pub review_text: Option<String>,
    pub listened_at: NaiveDate,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review joined with its album. Listings only ever contain reviews whose
/// album resolved, so the album is not optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithAlbum {
    #[serde(flatten)]
    pub review: Review,
    pub album: Album,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub album_id: String,
    pub rating: u8,
    #[serde(default)]
    pub review_text: Option<String>,
    pub listened_at: NaiveDate,
    #[serde(default)]
    pub favorite: bool,
}

/// Partial update of a review. `id`, `user_id` and `album_id` are immutable
/// after creation and deliberately not expressible here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    pub rating: Option<u8>,
    pub review_text: Option<String>,
    pub listened_at: Option<NaiveDate>,
    pub favorite: Option<bool>,
}

impl ReviewPatch {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none()
            && self.review_text.is_none()
            && self.listened_at.is_none()
            && self.favorite.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSort {
    Rating,
    #[default]
    Date,
}
