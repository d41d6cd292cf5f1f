//! CLI command action handlers

use super::App;
use crate::catalog::ScriptEntry;
use crate::remote::UNKNOWN_VERSION;
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

impl App {
    /// Fetch the catalog or fail the command with the status text
    async fn load_catalog_for_cli(&mut self) -> Result<()> {
        match self.fetch_catalog().await {
            Ok(catalog) => {
                self.catalog = catalog;
                self.catalog.recompute_updates(&self.versions);
                Ok(())
            }
            Err(e) => bail!("{}", e),
        }
    }

    fn find_entry(&self, target: &str) -> Result<&ScriptEntry> {
        match self.catalog.find(target) {
            Some(entry) => Ok(entry),
            None => bail!(
                "Script '{}' not found. Run 'scriptstore list' to see available scripts.",
                target
            ),
        }
    }

    pub async fn cmd_list(&mut self) -> Result<()> {
        self.load_catalog_for_cli().await?;

        if self.catalog.is_empty() {
            println!("No categories available.");
            return Ok(());
        }

        for category in self.catalog.categories() {
            let heading = if category.is_updates() {
                format!("* {} *", category.name)
            } else {
                category.name.clone()
            };
            println!("{} ({})", heading, category.len());
            println!("{:-<60}", "");

            for entry in self.catalog.iter_category(category) {
                println!(
                    "  {:<24} {:<12} {}",
                    entry.name,
                    entry.version,
                    self.versions.state_of(entry).label()
                );
            }
            println!();
        }
        Ok(())
    }

    pub async fn cmd_updates(&mut self) -> Result<()> {
        self.load_catalog_for_cli().await?;

        let Some(updates) = self.catalog.categories().iter().find(|c| c.is_updates()) else {
            println!("All scripts up to date");
            return Ok(());
        };

        println!("{} update(s) available", updates.len());
        for entry in self.catalog.iter_category(updates) {
            let installed = self.versions.get(&entry.key()).unwrap_or("None");
            println!("  {}: {} -> {}", entry.key(), installed, entry.version);
        }
        Ok(())
    }

    pub async fn cmd_install(&mut self, target: &str) -> Result<()> {
        self.load_catalog_for_cli().await?;
        let entry = self.find_entry(target)?.clone();
        if !self.installer.needs_update(&entry, &self.versions) {
            println!("{} is up to date, reinstalling", entry.name);
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = self
            .installer
            .install(&entry, &mut self.versions, &mut |text: &str| {
                spinner.set_message(text.to_string())
            })
            .await;
        spinner.finish_and_clear();

        let report = match result {
            Ok(report) => report,
            Err(e) => bail!("{}", e),
        };

        if !report.committed() {
            for err in &report.errors {
                println!("  {}", err);
            }
            bail!(
                "{} ({}/{} files written, version not recorded)",
                report.status_message(),
                report.succeeded,
                report.total
            );
        }

        println!("{}", report.status_message());
        if entry.version != UNKNOWN_VERSION {
            println!("Version: {}", entry.version);
        }
        Ok(())
    }

    pub async fn cmd_remove(&mut self, target: &str) -> Result<()> {
        self.load_catalog_for_cli().await?;
        let entry = self.find_entry(target)?.clone();

        if self.versions.get(&entry.key()).is_none() {
            println!("Note: {} is not recorded as installed", entry.name);
        }

        let report = match self.installer.delete(&entry, &mut self.versions).await {
            Ok(report) => report,
            Err(e) => bail!("Error deleting script: {}", e),
        };

        if !report.committed() {
            bail!("{}", report.status_message());
        }
        println!("{}", report.status_message());
        println!("Removed {}/{} file(s)", report.removed, report.total);
        Ok(())
    }

    pub async fn cmd_installed(&self) -> Result<()> {
        if self.versions.is_empty() {
            println!("Nothing installed.");
            return Ok(());
        }

        println!("Installed Scripts:");
        println!("{:-<60}", "");
        for (key, version) in self.versions.iter() {
            println!("  {:<48} {}", key, version);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PackageKey;
    use crate::config::Config;
    use crate::error::FetchError;
    use crate::remote::MockTransport;
    use crate::storage::FsStorage;
    use std::sync::Arc;

    fn config() -> Config {
        let mut config = Config::default();
        config.base_url = "http://store.test/".to_string();
        config
    }

    #[tokio::test]
    async fn cli_commands_fail_with_status_text_when_offline() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = MockTransport::new();
        transport.expect_is_online().returning(|| false);

        let mut app = App::with_backends(
            config(),
            Arc::new(transport),
            Arc::new(FsStorage::new(dir.path())),
        )
        .await
        .unwrap();

        let err = app.cmd_install("Clock").await.unwrap_err();
        assert_eq!(err.to_string(), "WiFi not connected");
        assert!(app.cmd_installed().await.is_ok());
    }

    #[tokio::test]
    async fn unknown_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = MockTransport::new();
        transport.expect_is_online().returning(|| true);
        transport
            .expect_get()
            .returning(|_| Ok(br#"{"Tools": [{"name": "Clock", "owner": "a", "repo": "b"}]}"#.to_vec()));

        let mut app = App::with_backends(
            config(),
            Arc::new(transport),
            Arc::new(FsStorage::new(dir.path())),
        )
        .await
        .unwrap();

        let err = app.cmd_remove("Snake").await.unwrap_err();
        assert!(err.to_string().contains("Script 'Snake' not found"));
        assert!(app.versions.get(&PackageKey::from("a/b:Clock")).is_none());
    }

    #[tokio::test]
    async fn updates_lists_outdated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = MockTransport::new();
        transport.expect_is_online().returning(|| true);
        transport.expect_get().returning(|url| {
            if url.ends_with("releases.json") {
                Ok(br#"{"Tools": [{"name": "Clock", "owner": "a", "repo": "b", "version": "2"}]}"#.to_vec())
            } else {
                Err(FetchError::Status(404))
            }
        });

        let mut app = App::with_backends(
            config(),
            Arc::new(transport),
            Arc::new(FsStorage::new(dir.path())),
        )
        .await
        .unwrap();
        app.versions.set(PackageKey::from("a/b:Clock"), "1");

        app.cmd_updates().await.unwrap();
        assert_eq!(app.update_count(), 1);
    }
}
