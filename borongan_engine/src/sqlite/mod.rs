//! SQLite backend for the Borongan engine.
//!
//! SQLite has no `SELECT ... FOR UPDATE`. Row locks are taken by making the first statement of every mutating
//! transaction a no-op write against the row (`UPDATE ... SET id = id WHERE id = $1 RETURNING *`). That acquires the
//! database write lock for the rest of the transaction, so concurrent writers queue on the busy timeout until the
//! holder commits or rolls back. The lock is coarser than a row lock, but gives the same serialization guarantee.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
