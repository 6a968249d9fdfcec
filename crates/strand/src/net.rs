use std::{
    fmt::{self, Debug},
    future::Future,
    io::{self, Error, ErrorKind, Result},
    net::{Shutdown, SocketAddr, ToSocketAddrs},
    os::fd::{AsRawFd, RawFd},
};

use strand_reactor::{
    op::{self, Op},
    util,
};

use crate::GlobalReactor;

const CHUNK_SIZE: usize = 4096;
const DEFAULT_LISTEN_BACKLOG: u32 = 4096;

async fn for_each_addr<A, F, H, T>(addr: A, f: F) -> Result<T>
where
    A: ToSocketAddrs,
    F: Fn(SocketAddr) -> H,
    H: Future<Output = Result<T>>,
{
    let mut last_error = None;
    for addr in addr.to_socket_addrs()? {
        match f(addr).await {
            Ok(res) => return Ok(res),
            Err(err) => {
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or(io::Error::new(
        io::ErrorKind::InvalidInput,
        "could not resolve any addresses",
    )))
}

/// Byte stream over non-blocking file descriptors.
///
/// Reads and writes suspend on selector readiness and resume when the fd
/// is ready; a wakeup that turns out stale (`EWOULDBLOCK`) re-suspends.
/// The read and write fds are usually one and the same socket, but a
/// pipe pair works too.
pub struct Stream {
    read_fd: RawFd,
    write_fd: RawFd,
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    shut: bool,
}

impl Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("read_fd", &self.read_fd)
            .field("write_fd", &self.write_fd)
            .finish()
    }
}

impl Stream {
    /// Take ownership of a socket fd. The fd is switched to non-blocking;
    /// local and peer addresses are cached best-effort (a socket without
    /// a peer simply has none).
    pub fn from_fd(fd: RawFd) -> Self {
        let _ = util::set_nonblocking(fd);

        Self {
            read_fd: fd,
            write_fd: fd,
            local: util::getsockname(fd).ok(),
            peer: util::getpeername(fd).ok(),
            shut: false,
        }
    }

    /// Take ownership of a socket fd with a caller-supplied local
    /// address; the peer address is left empty.
    pub fn from_fd_with_addr(fd: RawFd, local: SocketAddr) -> Self {
        let _ = util::set_nonblocking(fd);

        Self {
            read_fd: fd,
            write_fd: fd,
            local: Some(local),
            peer: None,
            shut: false,
        }
    }

    /// Build a stream over distinct read and write fds (pipes).
    pub fn from_pair(read_fd: RawFd, write_fd: RawFd) -> Self {
        let _ = util::set_nonblocking(read_fd);
        let _ = util::set_nonblocking(write_fd);

        Self {
            read_fd,
            write_fd,
            local: None,
            peer: None,
            shut: false,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.local
            .ok_or_else(|| Error::new(ErrorKind::AddrNotAvailable, "local address unavailable"))
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.peer
            .ok_or_else(|| Error::new(ErrorKind::AddrNotAvailable, "peer address unavailable"))
    }

    /// Read up to `len` bytes.
    ///
    /// With `fill_buffer` false this is a single suspend-and-read: the
    /// result is the prefix the kernel had available, possibly empty at
    /// EOF. With `fill_buffer` true it keeps reading until `len` bytes
    /// arrived, coming up short only at EOF. `read(0, _)` returns an
    /// empty buffer without suspending.
    pub async fn read(&mut self, len: usize, fill_buffer: bool) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let filled = self.read_in_place(&mut buf, fill_buffer).await?;
        buf.truncate(filled);
        Ok(buf)
    }

    /// Read until the peer signals EOF, growing the buffer in 4096-byte
    /// chunks.
    pub async fn read_to_eof(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut total = 0;

        loop {
            buf.resize(total + CHUNK_SIZE, 0);

            op::Readable::new(self.read_fd).run_on(GlobalReactor).await?;
            let count = match util::read(self.read_fd, &mut buf[total..]) {
                Ok(count) => count,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err),
            };

            total += count;
            if count == 0 {
                break;
            }
        }

        buf.truncate(total);
        Ok(buf)
    }

    /// Same contract as [`read`](Self::read), into a caller-provided
    /// buffer. Returns the length of the valid prefix.
    pub async fn read_in_place(&mut self, buf: &mut [u8], fill_buffer: bool) -> Result<usize> {
        let mut filled = 0;

        while filled < buf.len() {
            op::Readable::new(self.read_fd).run_on(GlobalReactor).await?;

            let count = match util::read(self.read_fd, &mut buf[filled..]) {
                Ok(count) => count,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err),
            };

            if count > buf.len() - filled {
                return Err(Error::other("read returned more than requested"));
            }

            filled += count;
            if !fill_buffer || count == 0 {
                break;
            }
        }

        Ok(filled)
    }

    /// Write all of `buf`, suspending on writability as needed.
    ///
    /// A zero-length kernel write after a readiness wakeup means the
    /// write side is gone and fails with `WriteZero`.
    pub async fn write(&mut self, buf: &[u8]) -> Result<()> {
        let mut remaining = buf;

        while !remaining.is_empty() {
            op::Writable::new(self.write_fd).run_on(GlobalReactor).await?;

            match util::write(self.write_fd, remaining) {
                Ok(0) => {
                    return Err(Error::new(
                        ErrorKind::WriteZero,
                        "write returned zero after readiness",
                    ));
                }
                Ok(count) if count > remaining.len() => {
                    return Err(Error::other("write returned more than requested"));
                }
                Ok(count) => remaining = &remaining[count..],
                Err(err) if err.kind() == ErrorKind::WouldBlock => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Close both fds. Idempotent.
    pub fn close(&mut self) {
        if self.read_fd >= 0 {
            let _ = util::close(self.read_fd);
        }
        if self.write_fd >= 0 && self.write_fd != self.read_fd {
            let _ = util::close(self.write_fd);
        }
        self.read_fd = -1;
        self.write_fd = -1;
    }

    /// Shut down both directions without closing the fds: pending reads
    /// observe EOF, writes fail. Idempotent; a no-op on non-sockets.
    pub fn shutdown(&mut self) {
        if self.shut {
            return;
        }
        self.shut = true;

        if self.read_fd >= 0 {
            let _ = util::shutdown(self.read_fd, Shutdown::Both);
        }
        if self.write_fd >= 0 && self.write_fd != self.read_fd {
            let _ = util::shutdown(self.write_fd, Shutdown::Both);
        }
    }
}

impl AsRawFd for Stream {
    fn as_raw_fd(&self) -> RawFd {
        self.read_fd
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Non-blocking listening socket with suspend-based accept.
pub struct Listener {
    fd: RawFd,
    local: SocketAddr,
}

impl Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("local", &self.local).finish()
    }
}

impl Listener {
    pub async fn bind<A>(addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        for_each_addr(addr, Self::bind_addr).await
    }

    async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let sock = util::socket_stream(&addr)?;

        let bound = util::set_reuseaddr(sock)
            .and_then(|()| util::bind(sock, addr))
            .and_then(|()| util::listen(sock, DEFAULT_LISTEN_BACKLOG))
            .and_then(|()| util::getsockname(sock));

        match bound {
            Ok(local) => Ok(Self { fd: sock, local }),
            Err(err) => {
                let _ = util::close(sock);
                Err(err)
            }
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Suspend until a connection arrives and yield it as a [`Stream`].
    pub async fn accept(&self) -> Result<(Stream, SocketAddr)> {
        loop {
            op::Readable::new(self.fd).run_on(GlobalReactor).await?;

            match util::accept(self.fd) {
                Ok((conn, peer)) => return Ok((Stream::from_fd(conn), peer)),
                Err(err) if err.kind() == ErrorKind::WouldBlock => {}
                Err(err) => return Err(err),
            }
        }
    }
}

impl AsRawFd for Listener {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = util::close(self.fd);
    }
}

/// Resolve `host`, connect a non-blocking socket, and yield a [`Stream`].
///
/// Name resolution goes through [`ToSocketAddrs`] and may block; the
/// connect itself suspends on writability until the kernel reports an
/// outcome.
pub async fn open_connection(host: &str, port: u16) -> Result<Stream> {
    for_each_addr((host, port), connect_addr).await
}

async fn connect_addr(addr: SocketAddr) -> Result<Stream> {
    let sock = util::socket_stream(&addr)?;

    let connected = async {
        if !util::connect(sock, addr)? {
            op::Writable::new(sock).run_on(GlobalReactor).await?;
            util::take_socket_error(sock)?;
        }
        Ok(())
    }
    .await;

    match connected {
        Ok(()) => Ok(Stream::from_fd(sock)),
        Err(err) => {
            let _ = util::close(sock);
            Err(err)
        }
    }
}
