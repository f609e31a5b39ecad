use std::time::Duration;

/// Politeness hook awaited after every autocomplete call
#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleep for a fixed duration between calls
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait::async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// No delay at all (tests, or endpoints without rate limits)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait::async_trait]
impl Pacer for NoDelay {
    async fn pause(&self) {}
}
