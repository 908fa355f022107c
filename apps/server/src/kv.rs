//! Redis-backed pinger for the health endpoint.

use async_trait::async_trait;
use jamroom_core::Pinger;
use redis::aio::ConnectionManager;

/// Pings a Redis instance over a shared multiplexed connection.
///
/// The connection manager reconnects on its own, so a transient outage
/// shows up as failed pings rather than a dead client.
pub struct RedisPinger {
    conn: ConnectionManager,
}

impl RedisPinger {
    /// Connects to `addr` (`host:port`) and verifies the connection once.
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(format!("redis://{}", addr))?;
        let conn = client.get_connection_manager().await?;
        let pinger = Self { conn };
        pinger.ping_once().await?;
        Ok(pinger)
    }

    async fn ping_once(&self) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        anyhow::ensure!(pong == "PONG", "unexpected PING reply: {pong}");
        Ok(())
    }
}

#[async_trait]
impl Pinger for RedisPinger {
    async fn ping(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(format!("unexpected PING reply: {pong}").into());
        }
        Ok(())
    }
}
