//! Raw descriptor helpers

use std::os::unix::io::RawFd;

/// Restores a descriptor's original flags when dropped
///
/// Returned by [`set_nonblocking`]. Descriptors such as stdin and stdout are
/// shared with the parent process, so the mode change must not outlive it.
#[must_use = "dropping the guard immediately restores blocking mode"]
#[derive(Debug)]
pub struct NonblockingGuard {
    fd: RawFd,
    saved: Option<libc::c_int>,
}

impl NonblockingGuard {
    /// The guarded descriptor
    pub const fn fd(&self) -> RawFd {
        self.fd
    }

    /// Whether dropping the guard will change the descriptor's flags
    pub const fn changed(&self) -> bool {
        self.saved.is_some()
    }
}

impl Drop for NonblockingGuard {
    fn drop(&mut self) {
        let Some(flags) = self.saved else {
            return;
        };
        // SAFETY: F_SETFL only updates descriptor flags.
        if unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags) } < 0 {
            tracing::warn!(
                fd = self.fd,
                error = %std::io::Error::last_os_error(),
                "failed to restore descriptor flags"
            );
        } else {
            tracing::debug!(fd = self.fd, "descriptor flags restored");
        }
    }
}

/// Put `fd` into non-blocking mode until the returned guard is dropped
///
/// Reads and writes that would otherwise park the thread then fail with
/// `EAGAIN`, which [`crate::stream::FromStd`] reports as would-block. A
/// descriptor that was already non-blocking is left as it is on drop.
///
/// # Errors
///
/// Returns an error if either `fcntl` call fails
pub fn set_nonblocking(fd: RawFd) -> std::io::Result<NonblockingGuard> {
    // SAFETY: F_GETFL/F_SETFL only inspect and update descriptor flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    if flags & libc::O_NONBLOCK != 0 {
        return Ok(NonblockingGuard { fd, saved: None });
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    tracing::debug!(fd, "descriptor set to non-blocking");
    Ok(NonblockingGuard {
        fd,
        saved: Some(flags),
    })
}

/// Whether `fd` is in non-blocking mode
///
/// # Errors
///
/// Returns an error if `fcntl` fails
pub fn is_nonblocking(fd: RawFd) -> std::io::Result<bool> {
    // SAFETY: F_GETFL only inspects descriptor flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(flags & libc::O_NONBLOCK != 0)
}
