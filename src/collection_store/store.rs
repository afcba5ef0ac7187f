use super::models::{Album, AlbumUpsert, NewReview, Review, ReviewPatch, ReviewSort, ReviewWithAlbum};
use super::schema::COLLECTION_VERSIONED_SCHEMAS;
use super::CollectionStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

const ALBUM_COLUMNS: &str = "id, title, artist, image_url, release_year, spotify_id, created_at";
const REVIEW_COLUMNS: &str =
    "id, user_id, album_id, rating, review_text, listened_at, favorite, created_at, updated_at";

pub struct SqliteCollectionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCollectionStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open collection database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            // Fresh database - create with latest schema
            info!("Creating new collection database at {:?}", path);
            COLLECTION_VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
        } else {
            // Existing database - check version and migrate if needed
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            if db_version < 1 {
                bail!(
                    "Collection database version {} is invalid (expected >= 1)",
                    db_version
                );
            }

            let current_schema_version =
                COLLECTION_VERSIONED_SCHEMAS.last().unwrap().version as i64;

            let version_index = COLLECTION_VERSIONED_SCHEMAS
                .iter()
                .position(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown collection database version {}", db_version))?;
            COLLECTION_VERSIONED_SCHEMAS[version_index]
                .validate(&conn)
                .with_context(|| {
                    format!(
                        "Collection database schema validation failed for version {}",
                        db_version
                    )
                })?;

            if db_version < current_schema_version {
                info!(
                    "Migrating collection database from version {} to {}",
                    db_version, current_schema_version
                );
                Self::migrate_if_needed(&mut conn, db_version as usize)?;
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &mut Connection, from_version: usize) -> Result<()> {
        let tx = conn.transaction()?;
        let mut latest_from = from_version;
        for schema in COLLECTION_VERSIONED_SCHEMAS.iter() {
            if schema.version > from_version {
                info!(
                    "Running collection database migration from version {} to {}",
                    latest_from, schema.version
                );
                if let Some(migration_fn) = schema.migration {
                    migration_fn(&tx).with_context(|| {
                        format!("Failed to run migration to version {}", schema.version)
                    })?;
                }
                latest_from = schema.version;
            }
        }
        tx.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn row_to_album(row: &rusqlite::Row) -> rusqlite::Result<Album> {
        let created_at_str: String = row.get("created_at")?;
        Ok(Album {
            id: row.get("id")?,
            title: row.get("title")?,
            artist: row.get("artist")?,
            image_url: row.get("image_url")?,
            release_year: row.get("release_year")?,
            spotify_id: row.get("spotify_id")?,
            created_at: Self::parse_datetime(&created_at_str),
        })
    }

    fn row_to_review(row: &rusqlite::Row) -> rusqlite::Result<Review> {
        let listened_at_str: String = row.get("listened_at")?;
        let created_at_str: String = row.get("created_at")?;
        let updated_at_str: String = row.get("updated_at")?;

        Ok(Review {
            id: row.get("id")?,
            user_id: row.get::<_, Option<i64>>("user_id")?.map(|id| id as usize),
            album_id: row.get("album_id")?,
            rating: row.get::<_, i64>("rating")? as u8,
            review_text: row.get("review_text")?,
            listened_at: Self::parse_date(&listened_at_str)?,
            favorite: row.get("favorite")?,
            created_at: Self::parse_datetime(&created_at_str),
            updated_at: Self::parse_datetime(&updated_at_str),
        })
    }

    /// Maps a row of review columns followed by album columns, as produced
    /// by the joined single-review query.
    fn row_to_review_with_album(row: &rusqlite::Row) -> rusqlite::Result<ReviewWithAlbum> {
        let listened_at_str: String = row.get(5)?;
        let review = Review {
            id: row.get(0)?,
            user_id: row.get::<_, Option<i64>>(1)?.map(|id| id as usize),
            album_id: row.get(2)?,
            rating: row.get::<_, i64>(3)? as u8,
            review_text: row.get(4)?,
            listened_at: Self::parse_date(&listened_at_str)?,
            favorite: row.get(6)?,
            created_at: Self::parse_datetime(&row.get::<_, String>(7)?),
            updated_at: Self::parse_datetime(&row.get::<_, String>(8)?),
        };
        let album = Album {
            id: row.get(9)?,
            title: row.get(10)?,
            artist: row.get(11)?,
            image_url: row.get(12)?,
            release_year: row.get(13)?,
            spotify_id: row.get(14)?,
            created_at: Self::parse_datetime(&row.get::<_, String>(15)?),
        };
        Ok(ReviewWithAlbum { review, album })
    }
}

impl CollectionStore for SqliteCollectionStore {
    fn upsert_album(&self, album: AlbumUpsert) -> Result<Album> {
        let conn = self.conn.lock().unwrap();
        let now = Self::format_datetime(&Utc::now());

        // Full replace of the mutable fields; created_at stays from the
        // original insert.
        conn.execute(
            "INSERT INTO albums (id, title, artist, image_url, release_year, spotify_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 title = ?2, artist = ?3, image_url = ?4, release_year = ?5, spotify_id = ?6",
            params![
                album.id,
                album.title,
                album.artist,
                album.image_url,
                album.release_year,
                album.spotify_id,
                now
            ],
        )
        .with_context(|| format!("Failed to upsert album {}", album.id))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM albums WHERE id = ?1",
            ALBUM_COLUMNS
        ))?;
        let persisted = stmt.query_row(params![album.id], Self::row_to_album)?;
        Ok(persisted)
    }

    fn get_album(&self, id: &str) -> Result<Option<Album>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM albums WHERE id = ?1",
            ALBUM_COLUMNS
        ))?;
        let album = stmt.query_row(params![id], Self::row_to_album).optional()?;
        Ok(album)
    }

    fn list_reviews(&self, owner: Option<usize>, sort: ReviewSort) -> Result<Vec<ReviewWithAlbum>> {
        let conn = self.conn.lock().unwrap();

        let order_by = match sort {
            ReviewSort::Rating => "rating DESC",
            ReviewSort::Date => "listened_at DESC",
        };

        let reviews: Vec<Review> = match owner {
            Some(user_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM reviews WHERE user_id = ?1 ORDER BY {}",
                    REVIEW_COLUMNS, order_by
                ))?;
                let rows = stmt
                    .query_map(params![user_id as i64], Self::row_to_review)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM reviews ORDER BY {}",
                    REVIEW_COLUMNS, order_by
                ))?;
                let rows = stmt
                    .query_map([], Self::row_to_review)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };

        if reviews.is_empty() {
            return Ok(Vec::new());
        }

        // Second round trip: fetch the distinct set of referenced albums
        // and merge in memory, keyed by album id.
        let mut seen = HashSet::new();
        let album_ids: Vec<&str> = reviews
            .iter()
            .map(|r| r.album_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();

        let placeholders = vec!["?"; album_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM albums WHERE id IN ({})",
            ALBUM_COLUMNS, placeholders
        ))?;
        let albums = stmt
            .query_map(params_from_iter(album_ids.iter()), Self::row_to_album)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let albums_by_id: HashMap<String, Album> =
            albums.into_iter().map(|a| (a.id.clone(), a)).collect();

        // A review whose album row is gone is dropped from the listing.
        Ok(reviews
            .into_iter()
            .filter_map(|review| {
                albums_by_id
                    .get(&review.album_id)
                    .cloned()
                    .map(|album| ReviewWithAlbum { review, album })
            })
            .collect())
    }

    fn get_review(&self, id: &str) -> Result<Option<ReviewWithAlbum>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.user_id, r.album_id, r.rating, r.review_text, r.listened_at,
                    r.favorite, r.created_at, r.updated_at,
                    a.id, a.title, a.artist, a.image_url, a.release_year, a.spotify_id, a.created_at
             FROM reviews r
             INNER JOIN albums a ON a.id = r.album_id
             WHERE r.id = ?1",
        )?;
        let review = stmt
            .query_row(params![id], Self::row_to_review_with_album)
            .optional()?;
        Ok(review)
    }

    fn create_review(&self, user_id: usize, review: NewReview) -> Result<ReviewWithAlbum> {
        if !(1..=5).contains(&review.rating) {
            bail!("Rating must be between 1 and 5, got {}", review.rating);
        }

        let id = Uuid::new_v4().to_string();
        {
            let conn = self.conn.lock().unwrap();
            let now = Self::format_datetime(&Utc::now());
            conn.execute(
                "INSERT INTO reviews (id, user_id, album_id, rating, review_text, listened_at, favorite, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id,
                    user_id as i64,
                    review.album_id,
                    review.rating as i64,
                    review.review_text,
                    review.listened_at.to_string(),
                    review.favorite,
                    now
                ],
            )
            .with_context(|| format!("Failed to create review for album {}", review.album_id))?;
        }

        self.get_review(&id)?
            .context("Created review did not read back")
    }

    fn update_review(&self, id: &str, patch: ReviewPatch) -> Result<Option<ReviewWithAlbum>> {
        if let Some(rating) = patch.rating {
            if !(1..=5).contains(&rating) {
                bail!("Rating must be between 1 and 5, got {}", rating);
            }
        }

        if patch.is_empty() {
            return self.get_review(id);
        }

        let affected = {
            let conn = self.conn.lock().unwrap();

            let mut assignments: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(rating) = patch.rating {
                assignments.push("rating = ?");
                values.push(Value::from(rating as i64));
            }
            if let Some(review_text) = patch.review_text {
                assignments.push("review_text = ?");
                values.push(Value::from(review_text));
            }
            if let Some(listened_at) = patch.listened_at {
                assignments.push("listened_at = ?");
                values.push(Value::from(listened_at.to_string()));
            }
            if let Some(favorite) = patch.favorite {
                assignments.push("favorite = ?");
                values.push(Value::from(favorite));
            }
            assignments.push("updated_at = ?");
            values.push(Value::from(Self::format_datetime(&Utc::now())));
            values.push(Value::from(id.to_string()));

            conn.execute(
                &format!(
                    "UPDATE reviews SET {} WHERE id = ?",
                    assignments.join(", ")
                ),
                params_from_iter(values),
            )
            .with_context(|| format!("Failed to update review {}", id))?
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_review(id)
    }

    fn delete_review(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM reviews WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete review {}", id))?;
        Ok(deleted > 0)
    }
}
