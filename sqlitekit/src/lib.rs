//! Minimal safe SQLite wrapper over the C FFI.
//!
//! Provides connections, prepared statements with typed bind/scan, and
//! online backup sessions. The raw symbols come from `libsqlite3-sys` with
//! the `bundled` feature, so the engine is compiled and linked statically
//! at build time.
//!
//! Consumer code uses only the safe types defined here and never touches
//! raw FFI directly. The `ffi` module is the **only** file that names the
//! C interface.
//!
//! ```
//! use sqlitekit::{params, targets, Connection};
//!
//! # fn main() -> sqlitekit::Result<()> {
//! let conn = Connection::open_in_memory()?;
//! conn.exec("CREATE TABLE t (a INT, b TEXT)", &[])?;
//! conn.exec("INSERT INTO t (a, b) VALUES (?1, ?2)", params![1, "x"])?;
//!
//! let mut stmt = conn.prepare("SELECT a, b FROM t")?;
//! let (mut a, mut b) = (0_i32, String::new());
//! while stmt.next() {
//!     stmt.scan(targets![&mut a, &mut b])?;
//! }
//! # assert_eq!((a, b.as_str()), (1, "x"));
//! # Ok(())
//! # }
//! ```

mod ffi;

mod backup;
mod connection;
pub mod error;
mod statement;
mod transaction;
pub mod value;

pub use backup::{Backup, BackupProgress, BackupStep, CancelToken};
pub use connection::{version, Connection};
pub use error::{Error, ErrorCode, Result};
pub use statement::Statement;
pub use transaction::{Transaction, TransactionBehavior};
pub use value::{ScanTarget, Value};

#[cfg(test)]
mod tests;
