//! Database module: pool setup, migrations and the SQL-only functions over
//! the `kv_store` table. Encoding of the stored values lives in the
//! persistence layer.

pub mod repo;

pub use repo::*;
