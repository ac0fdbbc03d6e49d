//! Traits implemented by pooled resources and their factories

use async_trait::async_trait;

/// Something a [`crate::ResourcePool`] can hold
#[async_trait]
pub trait Resource: Send + Sized + 'static {
    /// Liveness as last observed by the resource itself.
    ///
    /// Must be cheap and must not perform I/O; the pool and its callers
    /// consult it on every release and checkout.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Confirm the resource still works, with I/O if needed.
    ///
    /// Callers use it for resources that sat idle long enough for the other
    /// side to have dropped them without [`Resource::is_healthy`] noticing.
    async fn check_liveness(&mut self) -> bool {
        self.is_healthy()
    }

    /// Shut the resource down gracefully
    async fn close(self) {}
}

/// Produces fresh resources for a pool
#[async_trait]
pub trait ResourceFactory: Send + Sync + 'static {
    type Resource: Resource;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create(&self) -> Result<Self::Resource, Self::Error>;
}
