//! Raw FFI surface for the wrapper.
//!
//! Symbols and status constants come from `libsqlite3-sys` with the
//! `bundled` feature: the engine is compiled from the vendored amalgamation
//! at build time and linked statically, so no system library is required.
//!
//! This module re-exports exactly the subset of the C interface the wrapper
//! touches. The rest of the crate names engine symbols only through `ffi::`,
//! keeping a single place that knows what the boundary looks like.

pub(crate) use libsqlite3_sys::{
    sqlite3,
    sqlite3_backup,
    sqlite3_backup_finish,
    sqlite3_backup_init,
    sqlite3_backup_pagecount,
    sqlite3_backup_remaining,
    sqlite3_backup_step,
    sqlite3_bind_blob,
    sqlite3_bind_null,
    sqlite3_bind_parameter_count,
    sqlite3_bind_text,
    sqlite3_busy_timeout,
    sqlite3_changes,
    sqlite3_close,
    sqlite3_column_blob,
    sqlite3_column_bytes,
    sqlite3_column_count,
    sqlite3_column_double,
    sqlite3_column_int64,
    sqlite3_column_type,
    sqlite3_errcode,
    sqlite3_errmsg,
    sqlite3_finalize,
    sqlite3_last_insert_rowid,
    sqlite3_libversion,
    sqlite3_open_v2,
    sqlite3_prepare_v2,
    sqlite3_reset,
    sqlite3_step,
    sqlite3_stmt,
    sqlite3_threadsafe,
    SQLITE_BLOB,
    SQLITE_BUSY,
    SQLITE_DONE,
    SQLITE_FLOAT,
    SQLITE_INTEGER,
    SQLITE_LOCKED,
    SQLITE_MISUSE,
    SQLITE_NULL,
    SQLITE_OK,
    SQLITE_OPEN_CREATE,
    SQLITE_OPEN_FULLMUTEX,
    SQLITE_OPEN_READWRITE,
    SQLITE_ROW,
    SQLITE_TEXT,
    // Transient destructor: the engine copies bound data before returning.
    SQLITE_TRANSIENT,
};

// `libsqlite3-sys` deliberately omits the `sqlite3_close_v2` binding (it lives
// on its generator's skip list), but the symbol is part of the public C API
// and is compiled into the statically linked `bundled` engine. Bind it
// directly so the wrapper can name it through `ffi::` like every other symbol.
extern "C" {
    pub(crate) fn sqlite3_close_v2(db: *mut sqlite3) -> ::std::os::raw::c_int;
}
