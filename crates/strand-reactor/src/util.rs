//! Thin syscall wrappers used by the runtime's stream and connection
//! plumbing. Everything returns `io::Result` with the errno attached.

use std::{
    io::{Error, Result},
    mem::{self, MaybeUninit},
    net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, SocketAddrV4, SocketAddrV6},
    os::fd::RawFd,
};

pub(crate) union SocketAddrCRepr {
    g: libc::sockaddr,
    v4: libc::sockaddr_in,
    v6: libc::sockaddr_in6,
}

impl SocketAddrCRepr {
    pub fn as_ptr(&self) -> *const libc::sockaddr {
        self as *const _ as *const libc::sockaddr
    }
}

pub(crate) fn into_raw_addr(addr: SocketAddr) -> (SocketAddrCRepr, libc::socklen_t) {
    match addr {
        SocketAddr::V4(addr_v4) => (
            SocketAddrCRepr {
                v4: libc::sockaddr_in {
                    sin_family: libc::AF_INET as libc::sa_family_t,
                    sin_port: addr_v4.port().to_be(),
                    sin_addr: libc::in_addr {
                        s_addr: u32::from_ne_bytes(addr_v4.ip().octets()),
                    },
                    ..unsafe { mem::zeroed() }
                },
            },
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        ),

        SocketAddr::V6(addr_v6) => (
            SocketAddrCRepr {
                v6: libc::sockaddr_in6 {
                    sin6_family: libc::AF_INET6 as libc::sa_family_t,
                    sin6_port: addr_v6.port().to_be(),
                    sin6_addr: libc::in6_addr {
                        s6_addr: addr_v6.ip().octets(),
                    },
                    sin6_flowinfo: addr_v6.flowinfo(),
                    sin6_scope_id: addr_v6.scope_id(),
                    ..unsafe { mem::zeroed() }
                },
            },
            mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
        ),
    }
}

pub(crate) fn from_raw_addr(addr: &SocketAddrCRepr) -> Result<SocketAddr> {
    unsafe {
        match addr.g.sa_family as i32 {
            libc::AF_INET => Ok(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(addr.v4.sin_addr.s_addr.to_ne_bytes()),
                u16::from_be(addr.v4.sin_port),
            ))),

            libc::AF_INET6 => Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(addr.v6.sin6_addr.s6_addr),
                u16::from_be(addr.v6.sin6_port),
                addr.v6.sin6_flowinfo,
                addr.v6.sin6_scope_id,
            ))),

            family => Err(Error::other(format!(
                "unknown address family: {family}"
            ))),
        }
    }
}

fn cvt(ret: libc::c_int) -> Result<libc::c_int> {
    if ret < 0 {
        Err(Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Create a non-blocking, close-on-exec stream socket for `addr`'s family.
pub fn socket_stream(addr: &SocketAddr) -> Result<RawFd> {
    let domain = if addr.is_ipv4() {
        libc::AF_INET
    } else {
        libc::AF_INET6
    };

    #[cfg(target_os = "linux")]
    {
        cvt(unsafe {
            libc::socket(
                domain,
                libc::SOCK_STREAM | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                0,
            )
        })
    }

    #[cfg(not(target_os = "linux"))]
    {
        let sock = cvt(unsafe { libc::socket(domain, libc::SOCK_STREAM, 0) })?;
        set_cloexec(sock)?;
        set_nonblocking(sock)?;
        Ok(sock)
    }
}

pub fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = cvt(unsafe { libc::fcntl(fd, libc::F_GETFL, 0) })?;
    cvt(unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) })?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_cloexec(fd: RawFd) -> Result<()> {
    cvt(unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) })?;
    Ok(())
}

/// Initiate a non-blocking connect. `Ok(true)` means the connection is
/// already established; `Ok(false)` means the kernel reported
/// `EINPROGRESS` — await writability, then check [`take_socket_error`].
pub fn connect(sock: RawFd, addr: SocketAddr) -> Result<bool> {
    let (addr, len) = into_raw_addr(addr);
    let ret = unsafe { libc::connect(sock, addr.as_ptr(), len) };
    if ret == 0 {
        return Ok(true);
    }

    let err = Error::last_os_error();
    if err.raw_os_error() == Some(libc::EINPROGRESS) {
        Ok(false)
    } else {
        Err(err)
    }
}

pub fn set_reuseaddr(sock: RawFd) -> Result<()> {
    let enable: libc::c_int = 1;
    cvt(unsafe {
        libc::setsockopt(
            sock,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &enable as *const _ as *const _,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    })?;
    Ok(())
}

/// Drain the pending socket error after an asynchronous connect.
pub fn take_socket_error(sock: RawFd) -> Result<()> {
    let mut err: libc::c_int = 0;
    let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;

    cvt(unsafe {
        libc::getsockopt(
            sock,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            &mut err as *mut _ as *mut _,
            &mut len,
        )
    })?;

    if err == 0 {
        Ok(())
    } else {
        Err(Error::from_raw_os_error(err))
    }
}

pub fn bind(sock: RawFd, addr: SocketAddr) -> Result<()> {
    let (addr, len) = into_raw_addr(addr);
    cvt(unsafe { libc::bind(sock, addr.as_ptr(), len) })?;
    Ok(())
}

pub fn listen(sock: RawFd, backlog: u32) -> Result<()> {
    cvt(unsafe { libc::listen(sock, backlog as i32) })?;
    Ok(())
}

/// Accept one connection; the returned fd is non-blocking and cloexec.
pub fn accept(sock: RawFd) -> Result<(RawFd, SocketAddr)> {
    let mut addr: MaybeUninit<SocketAddrCRepr> = MaybeUninit::uninit();
    let mut len = mem::size_of::<SocketAddrCRepr>() as libc::socklen_t;

    #[cfg(target_os = "linux")]
    let conn = cvt(unsafe {
        libc::accept4(
            sock,
            addr.as_mut_ptr() as *mut _,
            &mut len,
            libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
        )
    })?;

    #[cfg(not(target_os = "linux"))]
    let conn = {
        let conn = cvt(unsafe { libc::accept(sock, addr.as_mut_ptr() as *mut _, &mut len) })?;
        set_cloexec(conn)?;
        set_nonblocking(conn)?;
        conn
    };

    let peer = from_raw_addr(unsafe { &addr.assume_init() })?;
    Ok((conn, peer))
}

pub fn getsockname(sock: RawFd) -> Result<SocketAddr> {
    let mut addr: MaybeUninit<SocketAddrCRepr> = MaybeUninit::uninit();
    let mut len = mem::size_of::<SocketAddrCRepr>() as libc::socklen_t;

    cvt(unsafe { libc::getsockname(sock, addr.as_mut_ptr() as *mut _, &mut len) })?;
    from_raw_addr(unsafe { &addr.assume_init() })
}

pub fn getpeername(sock: RawFd) -> Result<SocketAddr> {
    let mut addr: MaybeUninit<SocketAddrCRepr> = MaybeUninit::uninit();
    let mut len = mem::size_of::<SocketAddrCRepr>() as libc::socklen_t;

    cvt(unsafe { libc::getpeername(sock, addr.as_mut_ptr() as *mut _, &mut len) })?;
    from_raw_addr(unsafe { &addr.assume_init() })
}

pub fn read(fd: RawFd, buf: &mut [u8]) -> Result<usize> {
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) };
    if ret < 0 {
        Err(Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

pub fn write(fd: RawFd, buf: &[u8]) -> Result<usize> {
    let ret = unsafe { libc::write(fd, buf.as_ptr() as *const _, buf.len()) };
    if ret < 0 {
        Err(Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

pub fn close(fd: RawFd) -> Result<()> {
    cvt(unsafe { libc::close(fd) })?;
    Ok(())
}

pub fn shutdown(fd: RawFd, how: Shutdown) -> Result<()> {
    let how = match how {
        Shutdown::Read => libc::SHUT_RD,
        Shutdown::Write => libc::SHUT_WR,
        Shutdown::Both => libc::SHUT_RDWR,
    };

    cvt(unsafe { libc::shutdown(fd, how) })?;
    Ok(())
}

/// Non-blocking pipe pair `(read, write)`.
pub fn pipe() -> Result<(RawFd, RawFd)> {
    let mut fds = [0 as RawFd; 2];

    #[cfg(target_os = "linux")]
    cvt(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) })?;

    #[cfg(not(target_os = "linux"))]
    {
        cvt(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
        for fd in fds {
            set_cloexec(fd)?;
            set_nonblocking(fd)?;
        }
    }

    Ok((fds[0], fds[1]))
}
