//! Key-value backend interface for the health check.
//!
//! The engine itself keeps no persistent state; the health endpoint just
//! pings whatever key-value service the deployment wires in (Redis in the
//! standalone server). Kept behind a trait so the library builds without
//! a client and tests can substitute a stub.

use async_trait::async_trait;

/// A pingable backend dependency.
#[async_trait]
pub trait Pinger: Send + Sync {
    /// Round-trips a ping; any error marks the dependency unhealthy.
    async fn ping(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Pinger used when no key-value backend is configured; always healthy.
pub struct NoopPinger;

#[async_trait]
impl Pinger for NoopPinger {
    async fn ping(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
