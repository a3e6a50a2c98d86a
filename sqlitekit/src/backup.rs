//! Online backup session between two open connections.
//!
//! The engine copies pages incrementally; this wrapper owns the session
//! handle and drives it either one [`step`](Backup::step) at a time or
//! through the blocking [`run`](Backup::run) loop, which reports progress
//! through a channel and stops cooperatively through a [`CancelToken`].

use std::ffi::CString;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::ffi;

/// Outcome of a single backup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStep {
    /// Pages were copied and more remain.
    More,
    /// The source was busy or a table was locked; nothing was copied.
    /// Transient – retry after a pause.
    Busy,
    /// Every page has been copied.
    Done,
}

/// Point-in-time backup progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupProgress {
    /// Pages still to be copied.
    pub remaining: usize,
    /// Total pages in the source database.
    pub page_count: usize,
}

/// Cooperative cancellation flag for [`Backup::run`].
///
/// Clone the token, hand one clone to the thread driving the run loop, and
/// call [`cancel`](Self::cancel) from anywhere else.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The run loop stops before its next step.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// An online backup session copying one database into another.
///
/// Borrows both connections, so neither can be closed or dropped while the
/// session is alive. The session handle is released exactly once: by
/// [`close`](Self::close) or, failing that, on drop.
pub struct Backup<'a> {
    /// Raw `sqlite3_backup*` handle. Null after [`close`](Self::close).
    raw: *mut ffi::sqlite3_backup,
    dst: &'a Connection,
    src: &'a Connection,
}

impl<'a> Backup<'a> {
    /// Initializes an online backup of `src_name` in `src` into `dst_name`
    /// in `dst` (the schema names, usually both `"main"`).
    ///
    /// When the engine refuses to create the session, the destination
    /// connection's current error is surfaced.
    pub fn new(
        dst: &'a Connection,
        dst_name: &str,
        src: &'a Connection,
        src_name: &str,
    ) -> Result<Self> {
        if dst.is_closed() || src.is_closed() {
            return Err(Error::Closed);
        }
        let c_dst = CString::new(dst_name).map_err(|e| Error::InvalidString(e.to_string()))?;
        let c_src = CString::new(src_name).map_err(|e| Error::InvalidString(e.to_string()))?;

        let raw = unsafe {
            ffi::sqlite3_backup_init(dst.raw(), c_dst.as_ptr(), src.raw(), c_src.as_ptr())
        };
        if raw.is_null() {
            let rc = unsafe { ffi::sqlite3_errcode(dst.raw()) };
            return Err(dst.error_for(rc));
        }
        Ok(Self { raw, dst, src })
    }

    /// Copies up to `pages` pages; a non-positive count copies everything
    /// that remains.
    ///
    /// Busy and locked statuses are transient: they surface as
    /// [`BackupStep::Busy`], not as errors, and the caller retries later.
    pub fn step(&mut self, pages: i32) -> Result<BackupStep> {
        if self.raw.is_null() {
            return Err(Error::BackupClosed);
        }
        let rc = unsafe { ffi::sqlite3_backup_step(self.raw, pages) };
        match rc {
            ffi::SQLITE_OK => Ok(BackupStep::More),
            ffi::SQLITE_DONE => Ok(BackupStep::Done),
            ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => Ok(BackupStep::Busy),
            rc => Err(self.dst.error_for(rc)),
        }
    }

    /// Returns the current progress snapshot.
    pub fn status(&self) -> Result<BackupProgress> {
        if self.raw.is_null() {
            return Err(Error::BackupClosed);
        }
        let remaining = unsafe { ffi::sqlite3_backup_remaining(self.raw) };
        let page_count = unsafe { ffi::sqlite3_backup_pagecount(self.raw) };
        Ok(BackupProgress {
            remaining: usize::try_from(remaining).unwrap_or(0),
            page_count: usize::try_from(page_count).unwrap_or(0),
        })
    }

    /// Drives [`step`](Self::step) to completion, blocking the calling
    /// thread for the duration of the backup.
    ///
    /// After every step a progress snapshot is pushed into `progress` (when
    /// supplied) and the loop sleeps `pause` before stepping again. The
    /// token (when supplied) is checked each iteration; cancellation stops
    /// the loop with [`Error::Cancelled`]. Returns `Ok(())` exactly when
    /// the engine reported that every page was copied.
    pub fn run(
        &mut self,
        pages: i32,
        pause: Duration,
        progress: Option<&mpsc::Sender<BackupProgress>>,
        cancel: Option<&CancelToken>,
    ) -> Result<()> {
        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(Error::Cancelled);
            }
            let step = self.step(pages)?;
            if let Some(sender) = progress {
                // A dropped receiver stops progress reporting, not the copy.
                let _ = sender.send(self.status()?);
            }
            match step {
                BackupStep::Done => break,
                BackupStep::More | BackupStep::Busy => thread::sleep(pause),
            }
        }
        log::debug!("backup complete: {} pages", self.status()?.page_count);
        Ok(())
    }

    /// Releases the session handle, surfacing the engine's status.
    ///
    /// The handle is released exactly once; a second close fails with
    /// [`Error::BackupClosed`] instead of releasing it again.
    pub fn close(&mut self) -> Result<()> {
        if self.raw.is_null() {
            return Err(Error::BackupClosed);
        }
        let rc = unsafe { ffi::sqlite3_backup_finish(self.raw) };
        self.raw = ptr::null_mut();
        if rc != ffi::SQLITE_OK {
            return Err(self.dst.error_for(rc));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Backup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backup")
            .field("raw", &self.raw)
            .field("dst", &self.dst)
            .field("src", &self.src)
            .finish()
    }
}

impl Drop for Backup<'_> {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            unsafe {
                ffi::sqlite3_backup_finish(self.raw);
            }
            self.raw = ptr::null_mut();
        }
    }
}
