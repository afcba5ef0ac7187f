mod versioned_schema;

pub use versioned_schema::{
    Column, ForeignKey, ForeignKeyOnDelete, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
