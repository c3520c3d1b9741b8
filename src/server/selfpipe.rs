//! The self-pipe: lets the accept loop join finished worker
//! threads through the same `poll()` wait it already uses for incoming
//! connections, instead of a second blocking call.
//!
//! Worker threads don't expose a raw numeric handle the way a C
//! `pthread_t` does, so each thread writes the hash of its
//! [`std::thread::ThreadId`] (a `u64`) to the pipe on completion; the
//! accept loop looks the id up in a map of outstanding
//! [`JoinHandle`](std::thread::JoinHandle)s to join it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::os::unix::io::RawFd;
use std::thread::ThreadId;

/// Hashes a [`ThreadId`] down to a `u64` so it can travel through the
/// pipe as a fixed-width payload.
pub fn thread_id_to_u64(id: ThreadId) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// A Unix pipe used purely as a termination-notification channel.
pub struct SelfPipe {
    read_fd: RawFd,
    write_fd: RawFd,
}

impl SelfPipe {
    pub fn new() -> io::Result<Self> {
        let mut fds = [0i32; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            read_fd: fds[0],
            write_fd: fds[1],
        })
    }

    pub fn read_fd(&self) -> RawFd {
        self.read_fd
    }

    pub fn write_fd(&self) -> RawFd {
        self.write_fd
    }

    /// Writes `id` to `write_fd`. `id`'s 8 bytes fit well within
    /// `PIPE_BUF`, so concurrent writers from different worker threads
    /// never interleave.
    pub fn notify(write_fd: RawFd, id: u64) -> io::Result<()> {
        let bytes = id.to_ne_bytes();
        let n = unsafe { libc::write(write_fd, bytes.as_ptr().cast(), bytes.len()) };
        if n as usize != bytes.len() {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Blocks (the caller is expected to have just observed the read end
    /// as ready via `poll`) until one `u64` thread id is available.
    pub fn recv_one(&self) -> io::Result<u64> {
        let mut bytes = [0u8; 8];
        let n = unsafe { libc::read(self.read_fd, bytes.as_mut_ptr().cast(), bytes.len()) };
        if n as usize != bytes.len() {
            return Err(io::Error::last_os_error());
        }
        Ok(u64::from_ne_bytes(bytes))
    }

    /// Wakes a blocked `poll()` without carrying a real thread id, used
    /// when `server_continues` flips to false with no threads left to
    /// reap.
    pub fn wake(write_fd: RawFd) -> io::Result<()> {
        Self::notify(write_fd, 0)
    }
}

impl Drop for SelfPipe {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.read_fd);
            libc::close(self.write_fd);
        }
    }
}
