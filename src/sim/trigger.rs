//! Trigger untuk memulai simulasi.
//!
//! Producer in-kernel bisa dipicu timer atau trafik network di port
//! tertentu. Versi user-space: timer langsung jalan, port menunggu
//! koneksi TCP pertama lewat mio poll.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use tracing::info;

const LISTENER_TOKEN: Token = Token(0);
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Sumber pemicu mulainya game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Mulai langsung, generasi baru tiap interval producer.
    Timer,
    /// Tunggu koneksi TCP pertama di port ini sebelum mulai.
    Port(u16),
}

impl Trigger {
    /// Block sampai trigger armed. `Ok(false)` jika `cancelled`
    /// terpenuhi duluan (shutdown sebelum game mulai).
    pub fn wait_armed<F>(&self, cancelled: F) -> io::Result<bool>
    where
        F: Fn() -> bool,
    {
        match *self {
            Trigger::Timer => Ok(!cancelled()),
            Trigger::Port(port) => wait_for_connection(port, cancelled),
        }
    }
}

fn wait_for_connection<F>(port: u16, cancelled: F) -> io::Result<bool>
where
    F: Fn() -> bool,
{
    let addr: SocketAddr = format!("127.0.0.1:{port}")
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut listener = TcpListener::bind(addr)?;
    let mut poll = Poll::new()?;
    poll.registry()
        .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
    let mut events = Events::with_capacity(8);

    info!(port, "waiting for a connection to start the game");

    loop {
        if cancelled() {
            return Ok(false);
        }

        // Poll dengan timeout supaya cancel tetap terlihat
        poll.poll(&mut events, Some(POLL_TIMEOUT))?;

        for event in events.iter() {
            if event.token() != LISTENER_TOKEN {
                continue;
            }
            match listener.accept() {
                Ok((_stream, peer)) => {
                    info!(%peer, "trigger connection received");
                    return Ok(true);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpStream;
    use std::thread;

    #[test]
    fn test_timer_arms_immediately() {
        assert!(Trigger::Timer.wait_armed(|| false).unwrap());
    }

    #[test]
    fn test_timer_respects_cancel() {
        assert!(!Trigger::Timer.wait_armed(|| true).unwrap());
    }

    #[test]
    fn test_port_arms_on_connection() {
        let port = 39841;
        let waiter = thread::spawn(move || Trigger::Port(port).wait_armed(|| false));

        // Retry sampai listener selesai bind
        let mut attempts = 0;
        let _stream = loop {
            match TcpStream::connect(("127.0.0.1", port)) {
                Ok(stream) => break stream,
                Err(_) if attempts < 50 => {
                    attempts += 1;
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => panic!("connect to trigger port: {}", e),
            }
        };

        assert!(waiter.join().unwrap().unwrap());
    }

    #[test]
    fn test_port_respects_cancel() {
        let armed = Trigger::Port(39842).wait_armed(|| true).unwrap();
        assert!(!armed);
    }
}
