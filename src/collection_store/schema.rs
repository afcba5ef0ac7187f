//! SQLite schema definitions for the collection database.
//!
//! Two tables: `albums` (the catalog entries the user has logged) and
//! `reviews` (one row per logged listen, referencing an album).

use crate::sql_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnDelete, SqlType, Table, VersionedSchema,
};

// Deleting an album out from under its reviews is not an operation this
// crate exposes; RESTRICT keeps stray manual deletes from orphaning rows.
const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnDelete::Restrict,
};

/// V 1
const ALBUMS_TABLE_V1: Table = Table {
    name: "albums",
    columns: &[
        sql_column!("id", &SqlType::Text, is_primary_key = true),
        sql_column!("title", &SqlType::Text, non_null = true),
        sql_column!("artist", &SqlType::Text, non_null = true),
        sql_column!("image_url", &SqlType::Text),
        sql_column!("release_year", &SqlType::Text),
        sql_column!("spotify_id", &SqlType::Text),
        sql_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const REVIEWS_TABLE_V1: Table = Table {
    name: "reviews",
    columns: &[
        sql_column!("id", &SqlType::Text, is_primary_key = true),
        sql_column!("user_id", &SqlType::Integer),
        sql_column!(
            "album_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sql_column!("rating", &SqlType::Integer, non_null = true),
        sql_column!("review_text", &SqlType::Text),
        sql_column!("listened_at", &SqlType::Text, non_null = true),
        sql_column!("created_at", &SqlType::Text, non_null = true),
        sql_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_reviews_user_id", "user_id"),
        ("idx_reviews_album_id", "album_id"),
        ("idx_reviews_listened_at", "listened_at DESC"),
    ],
};

/// V 2 - favorite flag on reviews
///
/// `favorite` is listed last because ALTER TABLE appends it there on
/// migrated databases, and validation compares column order.
const REVIEWS_TABLE_V2: Table = Table {
    name: "reviews",
    columns: &[
        sql_column!("id", &SqlType::Text, is_primary_key = true),
        sql_column!("user_id", &SqlType::Integer),
        sql_column!(
            "album_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sql_column!("rating", &SqlType::Integer, non_null = true),
        sql_column!("review_text", &SqlType::Text),
        sql_column!("listened_at", &SqlType::Text, non_null = true),
        sql_column!("created_at", &SqlType::Text, non_null = true),
        sql_column!("updated_at", &SqlType::Text, non_null = true),
        sql_column!(
            "favorite",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_reviews_user_id", "user_id"),
        ("idx_reviews_album_id", "album_id"),
        ("idx_reviews_listened_at", "listened_at DESC"),
    ],
};

/// All versioned schemas for the collection database.
///
/// Version 1: albums and reviews tables
/// Version 2: favorite flag on reviews
pub const COLLECTION_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[ALBUMS_TABLE_V1, REVIEWS_TABLE_V1],
        migration: None, // Initial version has no migration
    },
    VersionedSchema {
        version: 2,
        tables: &[ALBUMS_TABLE_V1, REVIEWS_TABLE_V2],
        migration: Some(|conn: &rusqlite::Connection| {
            conn.execute(
                "ALTER TABLE reviews ADD COLUMN favorite INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
            Ok(())
        }),
    },
];
