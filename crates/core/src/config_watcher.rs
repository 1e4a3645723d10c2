use crate::config::AppConfig;
use crate::config_loader::ConfigLoader;
use anyhow::Result;
use notify::{Event, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::watch;

/// Reloads the configuration directory on change and publishes valid results.
pub struct ConfigWatcher {
    tx: watch::Sender<AppConfig>,
    dir: PathBuf,
    profile: Option<String>,
}

impl ConfigWatcher {
    /// Creates a new configuration watcher with an initial configuration.
    ///
    /// Returns a tuple of the watcher and a receiver for configuration updates.
    #[must_use]
    pub fn new(
        initial_config: AppConfig,
        dir: impl Into<PathBuf>,
        profile: Option<String>,
    ) -> (Self, watch::Receiver<AppConfig>) {
        let (tx, rx) = watch::channel(initial_config);
        (
            Self {
                tx,
                dir: dir.into(),
                profile,
            },
            rx,
        )
    }

    /// Reloads once and publishes if the new configuration is valid.
    ///
    /// An invalid file keeps the previous configuration in place.
    pub fn reload(&self) -> bool {
        match ConfigLoader::load_from(&self.dir, self.profile.as_deref()) {
            Ok(new_config) => {
                let _ = self.tx.send(new_config);
                tracing::info!("Config reloaded successfully");
                true
            }
            Err(e) => {
                tracing::error!("Failed to reload config: {:#}", e);
                false
            }
        }
    }

    /// Watches the configuration directory for changes and broadcasts updates.
    ///
    /// # Errors
    ///
    /// Returns an error if file watching cannot be initiated or if the watcher task fails.
    pub async fn watch(self) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            let (notify_tx, notify_rx) = std::sync::mpsc::channel();

            let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            })?;

            watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

            for event in notify_rx {
                if event.kind.is_modify() || event.kind.is_create() {
                    tracing::info!("Config file changed, reloading...");
                    self.reload();
                }
            }

            Ok::<_, anyhow::Error>(())
        })
        .await??;

        Ok(())
    }
}
