use std::io;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use muxsock_transport::types::Address;
use muxsock_transport::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Process-wide routing from addresses to the inbox of the bound listener.
pub struct ListenerTable<T> {
    entries: DashMap<String, flume::Sender<T>>,
}

impl<T> ListenerTable<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn bind(&self, addr: &str) -> Result<Binding<T>> {
        match self.entries.entry(addr.to_string()) {
            Entry::Occupied(_) => Err(Error::Io(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("memory address {addr} already has a listener"),
            ))),
            Entry::Vacant(slot) => {
                let (sender, inbox) = flume::unbounded();
                slot.insert(sender.clone());
                debug!(addr, "memory listener bound");
                Ok(Binding {
                    addr: addr.to_string(),
                    registration: sender,
                    inbox,
                    closed: CancellationToken::new(),
                })
            }
        }
    }

    pub fn connect(&self, addr: &str) -> Result<flume::Sender<T>> {
        self.entries
            .get(addr)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("no memory listener at {addr}"),
                ))
            })
    }

    /// Removes `binding`, leaving a newer listener on the same address alone.
    pub fn unbind(&self, binding: &Binding<T>) {
        self.entries.remove_if(&binding.addr, |_, sender| {
            sender.same_channel(&binding.registration)
        });
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// A bound address and its inbox.
pub struct Binding<T> {
    pub addr: String,
    registration: flume::Sender<T>,
    pub inbox: flume::Receiver<T>,
    pub closed: CancellationToken,
}

impl<T> Binding<T> {
    /// Waits for the next inbound item until the binding is closed.
    pub async fn accept(&self) -> Result<T> {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(Error::Closed),
            item = self.inbox.recv_async() => item.map_err(|_| Error::Closed),
        }
    }
}

/// Opaque address of an in-memory endpoint.
pub fn named(network: &str, host: impl Into<String>) -> Address {
    Address::Named {
        network: network.to_string(),
        host: host.into(),
        port: 0,
    }
}

pub fn refused(addr: &str) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::ConnectionRefused,
        format!("memory listener at {addr} is gone"),
    ))
}
