//! Safe wrapper around a SQLite prepared statement.

use std::ffi::CString;
use std::ptr;
use std::time::{Duration, Instant};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::ffi;
use crate::value::{render_params, ScanTarget, Value};

/// A prepared SQLite statement.
///
/// Created via [`Connection::prepare`]. Borrows its connection, so the
/// borrow checker prevents closing the connection while statements are
/// alive and prevents mixing handles across connections. Alongside the
/// handle it keeps the SQL text, a rendering of the last bound arguments,
/// and the preparation instant, for diagnostics.
///
/// [`finalize`](Self::finalize) consumes the statement; one that is dropped
/// instead is finalized automatically.
pub struct Statement<'conn> {
    /// Raw `sqlite3_stmt*` handle. Null only after explicit finalization.
    stmt: *mut ffi::sqlite3_stmt,
    conn: &'conn Connection,
    sql: String,
    args: String,
    created: Instant,
    err: Option<Error>,
}

impl<'conn> Statement<'conn> {
    /// Compiles `sql` against `conn`. The caller has already checked that
    /// the connection is open.
    pub(crate) fn prepare(conn: &'conn Connection, sql: &str) -> Result<Self> {
        let c_sql = CString::new(sql).map_err(|e| Error::InvalidString(e.to_string()))?;
        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(conn.raw(), c_sql.as_ptr(), -1, &mut stmt, ptr::null_mut())
        };
        if rc != ffi::SQLITE_OK {
            return Err(conn.error_for(rc));
        }
        if stmt.is_null() {
            // Whitespace or an empty string compiles to nothing.
            return Err(Error::NoHandle);
        }
        Ok(Self {
            stmt,
            conn,
            sql: sql.to_string(),
            args: String::new(),
            created: Instant::now(),
            err: None,
        })
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Resets the statement and binds `params` positionally (1-indexed).
    ///
    /// Fails with [`Error::ArgumentCount`] unless the supplied count equals
    /// the number of parameters the compiled statement expects. The engine
    /// copies every bound value before this returns, so callers may reuse
    /// their buffers immediately. The first failing bind aborts the rest.
    pub fn bind(&mut self, params: &[Value]) -> Result<()> {
        self.args = render_params(params);
        self.reset()?;

        let want = usize::try_from(unsafe { ffi::sqlite3_bind_parameter_count(self.stmt) })
            .unwrap_or(0);
        if want != params.len() {
            return Err(Error::ArgumentCount {
                have: params.len(),
                want,
            });
        }

        for (i, value) in params.iter().enumerate() {
            let idx = i32::try_from(i + 1).expect("parameter index overflow");
            let rc = match value {
                Value::Blob(bytes) => {
                    // A zero-length blob binds a null pointer with length 0
                    // so the engine never sees a dangling pointer.
                    let data = if bytes.is_empty() {
                        ptr::null()
                    } else {
                        bytes.as_ptr().cast()
                    };
                    let len = i32::try_from(bytes.len()).expect("blob too large to bind");
                    unsafe {
                        ffi::sqlite3_bind_blob(self.stmt, idx, data, len, ffi::SQLITE_TRANSIENT())
                    }
                }
                Value::Null => unsafe { ffi::sqlite3_bind_null(self.stmt, idx) },
                Value::Bool(v) => self.bind_str(idx, if *v { "1" } else { "0" }),
                Value::Integer(v) => self.bind_str(idx, &v.to_string()),
                Value::Float(v) => self.bind_str(idx, &v.to_string()),
                Value::Text(v) => self.bind_str(idx, v),
            };
            if rc != ffi::SQLITE_OK {
                return Err(self.conn.error_for(rc));
            }
        }
        Ok(())
    }

    fn bind_str(&self, idx: i32, text: &str) -> i32 {
        let len = i32::try_from(text.len()).expect("text too large to bind");
        unsafe {
            ffi::sqlite3_bind_text(
                self.stmt,
                idx,
                text.as_ptr().cast(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        }
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Advances to the next result row.
    ///
    /// Returns true while a row is available. Returns false both when the
    /// statement has finished and when stepping failed; the two cases are
    /// distinguished by [`error`](Self::error), which callers must check
    /// after a false result.
    pub fn next(&mut self) -> bool {
        let rc = unsafe { ffi::sqlite3_step(self.stmt) };
        if rc == ffi::SQLITE_ROW {
            return true;
        }
        if rc != ffi::SQLITE_DONE {
            self.err = Some(self.conn.error_for(rc));
        }
        false
    }

    /// The error recorded by the last [`next`](Self::next), if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Raw single step for execute-to-completion paths.
    pub(crate) fn step_code(&mut self) -> i32 {
        unsafe { ffi::sqlite3_step(self.stmt) }
    }

    /// Rewinds the statement to before its first row and clears the
    /// recorded error, surfacing the engine's reset status.
    pub fn reset(&mut self) -> Result<()> {
        self.err = None;
        let rc = unsafe { ffi::sqlite3_reset(self.stmt) };
        if rc != ffi::SQLITE_OK {
            return Err(self.conn.error_for(rc));
        }
        Ok(())
    }

    // ── Column reading ──────────────────────────────────────────────────

    /// Returns the number of columns in the result set.
    #[must_use]
    pub fn column_count(&self) -> usize {
        usize::try_from(unsafe { ffi::sqlite3_column_count(self.stmt) }).unwrap_or(0)
    }

    /// Copies the current row into `targets`, converting each column to its
    /// target's kind.
    ///
    /// Valid only while a row is available. Fails with
    /// [`Error::ArgumentCount`] unless one target is supplied per column;
    /// numeric targets that cannot be parsed from the column's text
    /// rendering fail with [`Error::Conversion`].
    pub fn scan(&self, targets: &mut [ScanTarget<'_>]) -> Result<()> {
        let want = self.column_count();
        if want != targets.len() {
            return Err(Error::ArgumentCount {
                have: targets.len(),
                want,
            });
        }
        for (column, target) in targets.iter_mut().enumerate() {
            let raw = self.raw_column(column)?;
            target.assign(column, &raw)?;
        }
        Ok(())
    }

    /// Reads one column dynamically, by the engine's declared storage class.
    pub fn column_value(&self, column: usize) -> Result<Value> {
        let idx = i32::try_from(column).expect("column index overflow");
        match unsafe { ffi::sqlite3_column_type(self.stmt, idx) } {
            ffi::SQLITE_INTEGER => {
                Ok(Value::Integer(unsafe { ffi::sqlite3_column_int64(self.stmt, idx) }))
            }
            ffi::SQLITE_FLOAT => {
                Ok(Value::Float(unsafe { ffi::sqlite3_column_double(self.stmt, idx) }))
            }
            ffi::SQLITE_TEXT => Ok(Value::Text(
                String::from_utf8_lossy(&self.raw_column(column)?).into_owned(),
            )),
            ffi::SQLITE_BLOB => Ok(Value::Blob(self.raw_column(column)?)),
            ffi::SQLITE_NULL => Ok(Value::Null),
            code => Err(Error::UnsupportedColumnType { column, code }),
        }
    }

    /// Copies one column's raw bytes.
    ///
    /// The engine owns the returned pointer only until the next step, so
    /// the bytes are copied out immediately. A null pointer with a nonzero
    /// length is never valid.
    fn raw_column(&self, column: usize) -> Result<Vec<u8>> {
        let idx = i32::try_from(column).expect("column index overflow");
        let data = unsafe { ffi::sqlite3_column_blob(self.stmt, idx) };
        let len = unsafe { ffi::sqlite3_column_bytes(self.stmt, idx) };
        if data.is_null() && len > 0 {
            return Err(Error::NullBlob { column });
        }
        if data.is_null() || len <= 0 {
            return Ok(Vec::new());
        }
        let len = usize::try_from(len).expect("column length overflow");
        Ok(unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) }.to_vec())
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    /// Returns the SQL text with a rendering of the most recently bound
    /// arguments appended, for logging.
    #[must_use]
    pub fn sql(&self) -> String {
        if self.args.is_empty() {
            self.sql.clone()
        } else {
            format!("{} {}", self.sql, self.args)
        }
    }

    /// Wall-clock time since the statement was prepared.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }

    // ── Finalization ────────────────────────────────────────────────────

    /// Releases the compiled statement, surfacing the engine's status.
    ///
    /// Consumes the statement, so use-after-finalize cannot compile.
    pub fn finalize(mut self) -> Result<()> {
        log::trace!("finalize `{}` after {:?}", self.sql(), self.elapsed());
        let rc = unsafe { ffi::sqlite3_finalize(self.stmt) };
        self.stmt = ptr::null_mut();
        if rc != ffi::SQLITE_OK {
            return Err(self.conn.error_for(rc));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if !self.stmt.is_null() {
            unsafe {
                ffi::sqlite3_finalize(self.stmt);
            }
            self.stmt = ptr::null_mut();
        }
    }
}
