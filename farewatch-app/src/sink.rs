use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use farewatch_crawler::{Checkpoint, ScreenshotSink};
use tracing::debug;

/// Writes each screenshot to `<dir>/<timestamp>_<checkpoint>.png`.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, checkpoint: Checkpoint) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S%.3f");
        self.dir.join(format!("{stamp}_{checkpoint}.png"))
    }
}

#[async_trait]
impl ScreenshotSink for DirectorySink {
    async fn store(&self, checkpoint: Checkpoint, png: Vec<u8>) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.file_for(checkpoint);
        tokio::fs::write(&path, png).await?;
        debug!(target: "crawl.screenshot", path = %path.display(), "screenshot saved");
        Ok(())
    }
}
