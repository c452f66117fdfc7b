//! Broker session lifecycle and the slot registration loop.
//!
//! The manager creates a session with the broker, then keeps every free slot
//! joined to the broker's pool. A joined connection sits idle until the broker
//! writes a single dispatch byte, at which point it is handed to a [`Relay`]
//! task and the next free slot is registered.

use std::future::Future;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::{OnceCell, watch};
use tokio::time::sleep;

use crate::addr::Addr;
use crate::config::Config;
use crate::error::TunnelError;
use crate::protocol::{Code, ControlFrame};
use crate::proxy::pool::{SlotId, SlotPool};
use crate::proxy::relay::Relay;
use crate::session;

/// Broker-side state created by a successful [`PoolManager::connect`].
#[derive(Debug)]
struct Session {
    key: String,
    pool: SlotPool,
    relay: Relay,
}

/// Reply to a single JoinPool attempt.
enum JoinReply {
    Joined(TcpStream),
    MaxConnections,
    AuthError,
}

/// How registering one slot ended.
enum Registration {
    /// The broker sent the dispatch byte on this connection
    Dispatched(TcpStream, u8),
    /// The broker has no room for another slot right now
    Rejected,
    /// The joined connection closed before anything was dispatched
    Dropped,
    /// The broker no longer recognises the session
    Revoked,
    Shutdown,
}

/// Owns the broker session and the slot pool.
#[derive(Debug)]
pub struct PoolManager {
    config: Config,
    broker: Addr,

    /// Scheme the broker address was given with, used for the public URL
    scheme: String,

    /// Broker `ip:port`, resolved once on first dial
    broker_ip: OnceCell<String>,

    session: Option<Session>,
}

impl PoolManager {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let (scheme, broker) = Addr::parse_with_scheme(&config.broker)?;

        Ok(Self {
            config,
            broker,
            scheme,
            broker_ip: OnceCell::new(),
            session: None,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Session key issued by the broker, once connected.
    pub fn session_key(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.key.as_str())
    }

    pub fn pool(&self) -> Option<&SlotPool> {
        self.session.as_ref().map(|s| &s.pool)
    }

    /// Slot ids currently waiting to be registered; empty when disconnected.
    pub async fn available_slots(&self) -> Vec<SlotId> {
        match self.pool() {
            Some(pool) => pool.available_slots().await,
            None => Vec::new(),
        }
    }

    /// Public URL the broker serves this session under.
    pub fn public_url(&self) -> Option<url::Url> {
        let key = self.session_key()?;
        session::public_url(key, &self.scheme, &self.broker).ok()
    }

    /// Create the session with the broker and fill the slot pool.
    ///
    /// Fails with [`TunnelError::Auth`] if the broker rejects the shared key;
    /// no pool is created in that case.
    pub async fn connect(&mut self) -> Result<(), TunnelError> {
        let mut stream = self.dial().await?;

        ControlFrame::create_pool(self.config.key.as_str())
            .write_to(&mut stream)
            .await?;
        let reply = ControlFrame::read_from(&mut stream).await?;

        match reply.code {
            Code::Success => {}
            Code::AuthError => return Err(TunnelError::Auth),
            other => return Err(TunnelError::UnexpectedReply(other)),
        }

        let pool = SlotPool::new(self.config.pool_size);
        let relay = Relay::new(&self.config, pool.clone());

        tracing::info!(
            session = %reply.key,
            slots = self.config.pool_size,
            "Session created"
        );

        self.session = Some(Session {
            key: reply.key,
            pool,
            relay,
        });
        Ok(())
    }

    /// Keep free slots registered with the broker until shutdown.
    ///
    /// Returns `Ok(())` once `shutdown` turns true, or
    /// [`TunnelError::SessionRevoked`] if the broker answers a join with an
    /// auth error. Relays already dispatched keep running either way.
    pub async fn listen(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), TunnelError> {
        let session = self.session.as_ref().ok_or(TunnelError::NotConnected)?;

        match self.public_url() {
            Some(url) => tracing::info!(%url, "Tunnel listening"),
            None => tracing::info!(session = %session.key, "Tunnel listening"),
        }

        loop {
            let Some(slot) = until_shutdown(&mut shutdown, session.pool.claim()).await else {
                return Ok(());
            };
            tracing::debug!(slot, "Registering slot");

            match self.register(session, slot, &mut shutdown).await {
                Registration::Dispatched(stream, seed) => {
                    tracing::debug!(slot, "Request dispatched");
                    let relay = session.relay.clone();
                    tokio::spawn(async move {
                        // Outcome is logged by the relay itself
                        let _ = relay.forward(stream, seed, slot).await;
                    });
                }
                Registration::Rejected => {
                    tracing::warn!(slot, "Max connections limit reached");
                    // Held out of the pool for one retry interval
                    let pool = session.pool.clone();
                    let delay = self.config.retry_interval();
                    tokio::spawn(async move {
                        sleep(delay).await;
                        pool.release(slot).await;
                    });
                }
                Registration::Dropped => {
                    tracing::warn!(slot, "Broker closed joined connection before dispatch");
                    session.pool.release(slot).await;
                    if until_shutdown(&mut shutdown, sleep(self.config.retry_interval()))
                        .await
                        .is_none()
                    {
                        return Ok(());
                    }
                }
                Registration::Revoked => {
                    tracing::error!(slot, "Broker rejected the session key");
                    session.pool.release(slot).await;
                    return Err(TunnelError::SessionRevoked);
                }
                Registration::Shutdown => {
                    session.pool.release(slot).await;
                    return Ok(());
                }
            }
        }
    }

    /// Join `slot` to the broker pool, retrying transport failures, then
    /// wait for the dispatch byte.
    async fn register(
        &self,
        session: &Session,
        slot: SlotId,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Registration {
        let mut stream = loop {
            match until_shutdown(shutdown, self.join(session, slot)).await {
                None => return Registration::Shutdown,
                Some(Ok(JoinReply::Joined(stream))) => break stream,
                Some(Ok(JoinReply::MaxConnections)) => return Registration::Rejected,
                Some(Ok(JoinReply::AuthError)) => return Registration::Revoked,
                Some(Err(e)) => {
                    tracing::warn!(slot, error = %e, "Failed joining the broker pool, retrying");
                    if until_shutdown(shutdown, sleep(self.config.retry_interval()))
                        .await
                        .is_none()
                    {
                        return Registration::Shutdown;
                    }
                }
            }
        };

        match until_shutdown(shutdown, stream.read_u8()).await {
            None => Registration::Shutdown,
            Some(Ok(seed)) => Registration::Dispatched(stream, seed),
            Some(Err(e)) => {
                tracing::debug!(slot, error = %e, "Joined connection ended");
                Registration::Dropped
            }
        }
    }

    async fn join(&self, session: &Session, slot: SlotId) -> Result<JoinReply, TunnelError> {
        let mut stream = self.dial().await?;

        ControlFrame::join_pool(session.key.as_str(), slot)
            .write_to(&mut stream)
            .await?;
        let reply = ControlFrame::read_from(&mut stream).await?;

        match reply.code {
            Code::Success => Ok(JoinReply::Joined(stream)),
            Code::MaxConnectionsReached => Ok(JoinReply::MaxConnections),
            Code::AuthError => Ok(JoinReply::AuthError),
            other => Err(TunnelError::UnexpectedReply(other)),
        }
    }

    /// Tell the broker the session is over.
    ///
    /// Best effort: an unreachable broker is only logged.
    pub async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        tracing::info!(session = %session.key, "Disconnecting");

        let mut stream = match self.dial().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(error = %e, "Broker unreachable, skipping DeletePool");
                return;
            }
        };

        if let Err(e) = ControlFrame::delete_pool(session.key.as_str())
            .write_to(&mut stream)
            .await
        {
            tracing::debug!(error = %e, "Failed to send DeletePool");
        }
    }

    async fn dial(&self) -> Result<TcpStream, TunnelError> {
        let addr = self
            .broker_ip
            .get_or_try_init(|| async { self.broker.resolve().await.map_err(TunnelError::Resolve) })
            .await?;

        Ok(TcpStream::connect(addr.as_str()).await?)
    }
}

/// Runs `fut` unless `shutdown` turns true first.
async fn until_shutdown<F: Future>(
    shutdown: &mut watch::Receiver<bool>,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        _ = wait_for_shutdown(shutdown) => None,
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // Sender gone: nobody can ask for shutdown any more
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(broker: &str) -> PoolManager {
        let cfg = Config::new(3000, "secret", broker);
        let mut manager = PoolManager::new(cfg.clone()).unwrap();
        let pool = SlotPool::new(cfg.pool_size);
        manager.session = Some(Session {
            key: session::derive_session_key(b"secret"),
            relay: Relay::new(&cfg, pool.clone()),
            pool,
        });
        manager
    }

    #[test]
    fn public_url_on_default_port() {
        let manager = connected("tunnel.example.com");
        let url = manager.public_url().unwrap();

        let expected = format!("{}.tunnel.example.com", manager.session_key().unwrap());
        assert_eq!(url.host_str(), Some(expected.as_str()));
        assert_eq!(url.port(), None);
    }

    #[test]
    fn public_url_keeps_custom_port() {
        let manager = connected("http://tunnel.example.com:8080");
        assert_eq!(manager.public_url().unwrap().port(), Some(8080));

        let manager = connected("tunnel.example.com:8080");
        assert_eq!(manager.public_url().unwrap().port(), Some(8080));
    }

    #[test]
    fn public_url_follows_broker_scheme() {
        let manager = connected("https://tunnel.example.com");
        let url = manager.public_url().unwrap();

        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port(), None);
        assert!(!url.as_str().contains(":443"));

        let manager = connected("https://tunnel.example.com:80");
        assert_eq!(manager.public_url().unwrap().port(), Some(80));
    }

    #[test]
    fn no_public_url_before_connect() {
        let manager = PoolManager::new(Config::new(3000, "secret", "tunnel.example.com")).unwrap();
        assert!(manager.public_url().is_none());
    }
}
