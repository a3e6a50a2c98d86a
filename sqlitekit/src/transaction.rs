//! Safe wrapper around a SQLite transaction.
//!
//! Purely delegating: all transactional semantics live in the engine, this
//! type only issues the BEGIN/COMMIT/ROLLBACK statements.

use crate::connection::Connection;
use crate::error::Result;
use crate::statement::Statement;
use crate::value::Value;

/// Transaction isolation / locking behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionBehavior {
    /// `BEGIN DEFERRED` (the default).
    Deferred,
    /// `BEGIN IMMEDIATE` – acquires a RESERVED lock immediately.
    Immediate,
}

/// An open database transaction.
///
/// Rolls back on drop unless explicitly committed.
pub struct Transaction<'conn> {
    conn: &'conn Connection,
    committed: bool,
}

impl<'conn> Transaction<'conn> {
    /// Begins a new transaction on `conn`.
    pub(crate) fn begin(conn: &'conn Connection, behavior: TransactionBehavior) -> Result<Self> {
        let sql = match behavior {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
        };
        conn.exec(sql, &[])?;
        Ok(Self {
            conn,
            committed: false,
        })
    }

    /// Commits the transaction.
    pub fn commit(mut self) -> Result<()> {
        self.conn.exec("COMMIT", &[])?;
        self.committed = true;
        Ok(())
    }

    /// See [`Connection::exec`].
    pub fn exec(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.conn.exec(sql, params)
    }

    /// See [`Connection::prepare`].
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        self.conn.prepare(sql)
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            // Best-effort rollback.
            let _ = self.conn.exec("ROLLBACK", &[]);
        }
    }
}
