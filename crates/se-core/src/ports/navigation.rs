use crate::navigation::NavigationRequest;
use anyhow::Result;

#[async_trait::async_trait]
pub trait NavigationPort: Send + Sync {
    async fn navigate(&self, request: NavigationRequest) -> Result<()>;
}
