//! Connection server: the TCP accept loop, threading policy, and
//! the self-pipe-driven wait for either a new connection or a finished
//! worker thread, grounded on `himono_server.c`'s `start_server`/
//! `run_server`/`server_wait_for_event`.

use crate::logsink::LogSink;
use crate::repo::Repository;
use crate::server::connection::handle_connection;
use crate::server::selfpipe::{thread_id_to_u64, SelfPipe};
use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::FromRawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

/// Server configuration (the CLI flags that shape the accept loop,
/// minus logging/persistence which are handled by their own collaborators).
pub struct Config {
    pub port: u16,
    pub backlog: i32,
    pub threaded: bool,
    pub data_dir: PathBuf,
}

/// The TCP accept loop and its shared state.
pub struct Listener {
    socket: TcpListener,
    repo: Arc<RwLock<Repository>>,
    log: Arc<LogSink>,
    threaded: bool,
    data_dir: PathBuf,
    server_continues: Arc<AtomicBool>,
    self_pipe: SelfPipe,
}

/// Binds a TCP socket with an explicit listen backlog. `std::net`'s
/// `TcpListener::bind` doesn't expose the backlog parameter (the `-q`
/// flag), so this goes through raw `socket`/`bind`/`listen` the way the
/// original C source does, and wraps the resulting fd as a
/// `std::net::TcpListener` for everything else (`accept`, `try_clone`,
/// non-blocking toggles).
fn bind_with_backlog(port: u16, backlog: i32) -> io::Result<TcpListener> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let yes: libc::c_int = 1;
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            std::ptr::from_ref(&yes).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        let mut addr: libc::sockaddr_in = std::mem::zeroed();
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_port = port.to_be();
        addr.sin_addr.s_addr = libc::INADDR_ANY.to_be();
        let rc = libc::bind(
            fd,
            std::ptr::from_ref(&addr).cast(),
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if rc != 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }
        if libc::listen(fd, backlog) != 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }
        Ok(TcpListener::from_raw_fd(fd))
    }
}

impl Listener {
    /// Binds the listening socket, opening port 0 as "let the OS pick",
    /// and creates an empty repository.
    pub fn bind(config: Config, log: Arc<LogSink>) -> io::Result<Self> {
        let socket = bind_with_backlog(config.port, config.backlog)?;
        let self_pipe = SelfPipe::new()?;
        log.log(&format!("server listening on port {}", socket.local_addr()?.port()));
        Ok(Self {
            socket,
            repo: Arc::new(RwLock::new(Repository::new())),
            log,
            threaded: config.threaded,
            data_dir: config.data_dir,
            server_continues: Arc::new(AtomicBool::new(true)),
            self_pipe,
        })
    }

    /// Replaces the repository with one loaded from disk, for `-L`.
    pub fn with_repository(mut self, repo: Repository) -> Self {
        self.repo = Arc::new(RwLock::new(repo));
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// A handle to stop the loop from outside (used by tests that want
    /// a clean shutdown without sending `quit` over the wire).
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.server_continues)
    }

    /// Runs the accept loop until `quit` is received (or the shutdown
    /// handle is flipped) and every in-flight connection has finished.
    pub fn run(&self) {
        let mut threads: HashMap<u64, JoinHandle<()>> = HashMap::new();
        let mut active = 0usize;

        loop {
            let continues = self.server_continues.load(Ordering::SeqCst);
            if !continues && active == 0 {
                break;
            }

            let mut fds = [
                libc::pollfd {
                    fd: self.self_pipe.read_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.socket_fd(),
                    events: if continues { libc::POLLIN } else { 0 },
                    revents: 0,
                },
            ];
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if rc < 0 {
                self.log.log(&format!("poll failed: {}", io::Error::last_os_error()));
                break;
            }

            if fds[0].revents & libc::POLLIN != 0 {
                if let Ok(id) = self.self_pipe.recv_one() {
                    if let Some(handle) = threads.remove(&id) {
                        let _ = handle.join();
                        active -= 1;
                        self.log.log(&format!("reaped thread {id}"));
                    }
                    // id == 0 with no matching handle is the internal
                    // wake-up used to unblock this poll() on shutdown.
                }
                continue;
            }

            if continues && fds[1].revents & libc::POLLIN != 0 {
                match self.socket.accept() {
                    Ok((stream, addr)) => {
                        self.log.log(&format!("accepted connection from {addr}"));
                        if self.threaded {
                            active += 1;
                            let (id, handle) = self.spawn_worker(stream);
                            threads.insert(id, handle);
                        } else {
                            self.serve_one(stream);
                        }
                    }
                    Err(e) => self.log.log(&format!("accept failed: {e}")),
                }
            }
        }
    }

    fn socket_fd(&self) -> i32 {
        use std::os::unix::io::AsRawFd;
        self.socket.as_raw_fd()
    }

    fn serve_one(&self, stream: TcpStream) {
        let outcome = handle_connection(stream, &self.repo, &self.log, &self.data_dir);
        if outcome.quit_requested {
            self.server_continues.store(false, Ordering::SeqCst);
        }
    }

    fn spawn_worker(&self, stream: TcpStream) -> (u64, JoinHandle<()>) {
        let repo = Arc::clone(&self.repo);
        let log = Arc::clone(&self.log);
        let data_dir = self.data_dir.clone();
        let server_continues = Arc::clone(&self.server_continues);
        let write_fd = self.self_pipe.write_fd();

        let handle = std::thread::spawn(move || {
            let outcome = handle_connection(stream, &repo, &log, &data_dir);
            if outcome.quit_requested {
                server_continues.store(false, Ordering::SeqCst);
            }
            let id = thread_id_to_u64(std::thread::current().id());
            if SelfPipe::notify(write_fd, id).is_err() {
                // The pipe write failed; there is no thread left to
                // carry this news further, so log and exit the thread.
                eprintln!("himono: worker thread failed to notify self-pipe");
            }
        });
        let id = thread_id_to_u64(handle.thread().id());
        (id, handle)
    }

    /// Wakes a blocked `poll()` so the loop can observe a shutdown
    /// requested from outside (tests, signal handlers).
    pub fn wake(&self) {
        let _ = SelfPipe::wake(self.self_pipe.write_fd());
    }
}
