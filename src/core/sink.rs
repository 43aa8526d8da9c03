//! Marker transport
//!
//! The controller forwards every marker a state emits, in emission order,
//! before the draw calls of the same tick. Delivery is the sink's concern:
//! a failing transport logs and drops, it never stalls the tick.

use log::{info, warn};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::entities::{Marker, Technical};

pub trait MarkerSink {
    fn send(&mut self, marker: Marker);
}

impl<S: MarkerSink + ?Sized> MarkerSink for Box<S> {
    fn send(&mut self, marker: Marker) {
        (**self).send(marker)
    }
}

/// Fan-out to several sinks
impl MarkerSink for Vec<Box<dyn MarkerSink>> {
    fn send(&mut self, marker: Marker) {
        for sink in self.iter_mut() {
            sink.send(marker);
        }
    }
}

/// Writes markers to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl MarkerSink for LogSink {
    fn send(&mut self, marker: Marker) {
        match Technical::from_marker(marker) {
            Some(t) => info!("marker {} ({})", marker, t.name()),
            None => info!("marker {}", marker),
        }
    }
}

/// Sends each marker as a decimal string datagram
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    pub fn connect(target: impl ToSocketAddrs) -> std::io::Result<Self> {
        let target = target.to_socket_addrs()?.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no address for marker target")
        })?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        info!("Sending markers to udp://{}", target);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl MarkerSink for UdpSink {
    fn send(&mut self, marker: Marker) {
        let payload = marker.to_string();
        if let Err(e) = self.socket.send_to(payload.as_bytes(), self.target) {
            warn!("Failed to send marker {} to {}: {}", marker, self.target, e);
        }
    }
}
