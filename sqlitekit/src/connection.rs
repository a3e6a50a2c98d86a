//! Safe wrapper around a SQLite database connection.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, ErrorCode, Result};
use crate::ffi;
use crate::statement::Statement;
use crate::transaction::{Transaction, TransactionBehavior};
use crate::value::Value;

/// Returns the linked SQLite library version string.
#[must_use]
pub fn version() -> &'static str {
    // libversion points at a static nul-terminated string.
    let ptr = unsafe { ffi::sqlite3_libversion() };
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("unknown")
}

/// One-time capability probe: the engine must have been built with its
/// internal mutexes enabled before any handle is opened.
fn threadsafe() -> bool {
    static THREADSAFE: OnceLock<bool> = OnceLock::new();
    *THREADSAFE.get_or_init(|| unsafe { ffi::sqlite3_threadsafe() } != 0)
}

/// A SQLite database connection.
///
/// The handle is either valid-and-open or null-and-closed; every operation
/// on a closed connection fails fast with [`Error::Closed`] instead of
/// touching the handle. An open handle is released on drop. The connection
/// is **not** `Sync` – all access must happen from one thread at a time,
/// even though the engine's full-mutex mode would serialize it anyway.
pub struct Connection {
    /// Raw `sqlite3*` handle. Null after [`close`](Self::close).
    db: *mut ffi::sqlite3,
}

// Safety: Connection is not Sync but is Send – the handle may move to
// another thread as long as only one thread uses it at a time, which the
// engine's full-mutex open mode makes sound.
unsafe impl Send for Connection {}

impl Connection {
    /// Opens (or creates) a database at `path`.
    ///
    /// Opens read-write with create-if-absent and full-mutex threading.
    /// Refuses to open at all when the linked engine build is not
    /// thread-safe.
    pub fn open(path: &Path) -> Result<Self> {
        if !threadsafe() {
            return Err(Error::NotThreadSafe);
        }

        let path_str = path.to_string_lossy();
        let c_path = CString::new(path_str.as_bytes())
            .map_err(|e| Error::InvalidString(e.to_string()))?;

        let flags =
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_FULLMUTEX;
        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        if rc != ffi::SQLITE_OK {
            // Open can fail yet still hand back a handle carrying the message.
            let message = if db.is_null() {
                format!("sqlite3_open_v2 returned {rc}")
            } else {
                let m = errmsg_raw(db);
                unsafe {
                    ffi::sqlite3_close_v2(db);
                }
                m
            };
            return Err(Error::Engine {
                code: ErrorCode::from_raw(rc),
                message,
            });
        }
        if db.is_null() {
            return Err(Error::NoHandle);
        }
        log::debug!("opened database at {}", path.display());
        Ok(Self { db })
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    /// Returns the raw database handle for use by statements and backups.
    pub(crate) fn raw(&self) -> *mut ffi::sqlite3 {
        self.db
    }

    /// True once [`close`](Self::close) has released the handle.
    pub(crate) fn is_closed(&self) -> bool {
        self.db.is_null()
    }

    /// Sets the engine's lock-wait timeout.
    pub fn busy_timeout(&self, timeout: Duration) -> Result<()> {
        if self.db.is_null() {
            return Err(Error::Closed);
        }
        let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let rc = unsafe { ffi::sqlite3_busy_timeout(self.db, ms) };
        if rc != ffi::SQLITE_OK {
            return Err(self.error_for(rc));
        }
        Ok(())
    }

    /// Prepares a single SQL statement.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        if self.db.is_null() {
            return Err(Error::Closed);
        }
        Statement::prepare(self, sql)
    }

    /// Prepares, binds, and executes a statement to completion.
    ///
    /// Succeeds only when the single step finishes with no result rows;
    /// a statement that produces a row is an error here.
    pub fn exec(&self, sql: &str, params: &[Value]) -> Result<()> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind(params)?;
        log::trace!("exec: {}", stmt.sql());
        let rc = stmt.step_code();
        if rc != ffi::SQLITE_DONE {
            return Err(self.error_for(rc));
        }
        stmt.finalize()
    }

    /// Begins a deferred transaction.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Deferred)
    }

    /// Begins an immediate transaction (acquires a RESERVED lock right away).
    pub fn transaction_immediate(&self) -> Result<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Immediate)
    }

    /// Returns the number of rows changed by the most recent statement.
    pub fn changes(&self) -> Result<usize> {
        if self.db.is_null() {
            return Err(Error::Closed);
        }
        let n = unsafe { ffi::sqlite3_changes(self.db) };
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Returns the rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        if self.db.is_null() {
            return Err(Error::Closed);
        }
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(self.db) })
    }

    /// Closes the connection, releasing the handle.
    ///
    /// A second close fails with [`Error::Closed`] instead of releasing the
    /// handle twice; after a successful close any later use fails the same
    /// way.
    pub fn close(&mut self) -> Result<()> {
        if self.db.is_null() {
            return Err(Error::Closed);
        }
        let rc = unsafe { ffi::sqlite3_close(self.db) };
        if rc != ffi::SQLITE_OK {
            return Err(self.error_for(rc));
        }
        self.db = ptr::null_mut();
        log::debug!("closed database");
        Ok(())
    }

    /// Renders a nonzero engine status as an error for this connection.
    ///
    /// Misuse (status 21) is rendered as the bare code: asking the engine
    /// for a diagnostic message in that state is itself unreliable. Every
    /// other status carries the connection's current diagnostic message.
    pub(crate) fn error_for(&self, rc: i32) -> Error {
        if self.db.is_null() {
            return Error::Closed;
        }
        if rc == ffi::SQLITE_MISUSE {
            return Error::Status(ErrorCode::Misuse);
        }
        Error::Engine {
            code: ErrorCode::from_raw(rc),
            message: errmsg_raw(self.db),
        }
    }
}

fn errmsg_raw(db: *mut ffi::sqlite3) -> String {
    let ptr = unsafe { ffi::sqlite3_errmsg(db) };
    if ptr.is_null() {
        "unknown error".to_string()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("db", &self.db).finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.db.is_null() {
            unsafe {
                ffi::sqlite3_close_v2(self.db);
            }
            self.db = ptr::null_mut();
        }
    }
}
