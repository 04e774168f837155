// Listener module
// Binds the TCP listener the HTTP front-end accepts on

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Pending connection queue length
const BACKLOG: i32 = 128;

/// Create a non-blocking `TcpListener` with `SO_REUSEADDR` enabled,
/// so a restarted process can bind while old sockets sit in `TIME_WAIT`.
pub fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    TcpListener::from_std(socket.into())
}
