use async_trait::async_trait;
use eyre::Result;

/// Hooks a static-site build pipeline calls around generation.
#[async_trait]
pub trait BuildLifecycle: Send + Sync {
    /// Runs before the build: loads the static rules file.
    async fn on_before_build(&self) -> Result<()>;

    /// Runs after the build: renders the build-time document and writes it out.
    async fn on_generate_done(&self) -> Result<()>;
}
