//! Application state and orchestration

mod actions;
pub mod scroll;
pub mod state;

pub use scroll::{wrap_words, ScrollController, StatusLine};
pub use state::{
    Command, InputEvent, MenuAction, Mode, NavigationState, Region, Render, Transition,
};

use crate::catalog::{Catalog, EntryId};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::installer::PackageInstaller;
use crate::remote::{Endpoints, HttpTransport, Transport};
use crate::storage::{FsStorage, Storage};
use crate::tui::Tui;
use crate::versions::VersionStore;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;

/// Description/status character budget when none is configured or measured
pub const DEFAULT_MAX_CHARACTERS: usize = 40;

/// Main application struct that owns every component of the store
pub struct App {
    /// Application configuration
    pub config: Config,

    /// Last successfully fetched catalog, with the derived Updates category
    pub catalog: Catalog,

    /// Installed versions
    pub versions: VersionStore,

    /// Mode and selection
    pub nav: NavigationState,

    /// Description marquee
    pub scroll: ScrollController,

    /// Transient status message
    pub status: StatusLine,

    /// Progress line shown by the Loading/Downloading overlays
    pub progress: String,

    /// Characters that fit on one line of the description and status box
    pub max_characters: usize,

    /// Should quit
    pub should_quit: bool,

    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    installer: PackageInstaller,
}

impl App {
    /// Create a new App backed by the network and the configured storage root
    pub async fn new(config: Config) -> Result<Self> {
        config.ensure_dirs().context("Failed to create directories")?;

        let root = config.storage_root();
        tracing::info!("Using storage root {}", root.display());

        let transport = HttpTransport::new(&config).context("Failed to initialize HTTP client")?;
        Self::with_backends(config, Arc::new(transport), Arc::new(FsStorage::new(root))).await
    }

    /// Create an App with explicit transport and storage
    pub async fn with_backends(
        config: Config,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let endpoints = Endpoints::new(&config.base_url)?;
        let versions = VersionStore::open(storage.clone()).await;
        let installer = PackageInstaller::new(transport.clone(), storage, endpoints.clone());

        Ok(Self {
            scroll: ScrollController::new(config.ui.scroll_interval()),
            max_characters: config.ui.max_characters.unwrap_or(DEFAULT_MAX_CHARACTERS),
            config,
            catalog: Catalog::default(),
            versions,
            nav: NavigationState::new(),
            status: StatusLine::new(),
            progress: String::new(),
            should_quit: false,
            transport,
            endpoints,
            installer,
        })
    }

    /// Run the TUI interface
    pub async fn run_tui(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.run(self).await
    }

    /// Show a status message with the regular expiry
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status
            .show(message, Instant::now(), self.config.ui.status_duration());
    }

    /// Show a status message with the short expiry
    pub fn set_short_status(&mut self, message: impl Into<String>) {
        self.status
            .show(message, Instant::now(), self.config.ui.short_status_duration());
    }

    /// Download and parse the catalog
    pub async fn fetch_catalog(&self) -> StoreResult<Catalog> {
        if !self.transport.is_online().await {
            return Err(StoreError::NetworkUnavailable);
        }

        let body = self
            .transport
            .get(&self.endpoints.catalog())
            .await
            .map_err(StoreError::CatalogFetchFailed)?;
        Catalog::load(&body)
    }

    /// Fetch the catalog behind the Loading overlay.
    ///
    /// On failure the previous catalog stays in place and the error becomes the
    /// status message.
    pub async fn reload_catalog(&mut self, progress: &mut dyn FnMut(Mode, &str)) -> Render {
        self.nav.begin_loading();
        self.progress = "Fetching latest versions".to_string();
        progress(Mode::Loading, &self.progress);

        match self.fetch_catalog().await {
            Ok(catalog) => {
                self.catalog = catalog;
                self.catalog.recompute_updates(&self.versions);
                let updates = self.update_count();
                if updates > 0 {
                    self.set_short_status(format!("{} update(s) available", updates));
                }
            }
            Err(e) => {
                tracing::warn!("Catalog load failed: {}", e);
                self.catalog.recompute_updates(&self.versions);
                self.set_status(e.to_string());
            }
        }

        self.progress.clear();
        self.nav.finish_loading(&self.catalog);
        self.scroll.reset();
        Render::Full
    }

    /// Number of entries in the Updates category
    pub fn update_count(&self) -> usize {
        self.catalog
            .categories()
            .iter()
            .find(|c| c.is_updates())
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Feed one input event through the state machine and run whatever it asks
    /// for. Returns the redraw the caller should perform, if any.
    pub async fn handle_input(
        &mut self,
        event: InputEvent,
        progress: &mut dyn FnMut(Mode, &str),
    ) -> Option<Render> {
        let focus = self.nav.focus();
        let was_browsing = self.nav.mode == Mode::Scripts;
        let transition = self.nav.handle(event, &self.catalog, &self.versions);
        // Moving in the script list restarts the marquee even when the index wraps onto itself
        let moved = was_browsing
            && matches!(event, InputEvent::Next | InputEvent::Prev)
            && transition == Transition::Changed;

        let render = match transition {
            Transition::Ignored => None,
            Transition::Changed => Some(Render::Full),
            Transition::Exit => {
                self.should_quit = true;
                None
            }
            Transition::Run(command) => {
                self.run_command(command, progress).await;
                Some(Render::Full)
            }
        };

        if moved || self.nav.focus() != focus {
            self.scroll.reset();
        }
        render
    }

    async fn run_command(&mut self, command: Command, progress: &mut dyn FnMut(Mode, &str)) {
        self.nav.begin_download();
        self.status.clear();

        let message = match command {
            Command::Install(id) => self.install_entry(id, progress).await,
            Command::Delete(id) => self.delete_entry(id, progress).await,
        };

        self.progress.clear();
        self.catalog.recompute_updates(&self.versions);
        self.nav.finish_download(&self.catalog);
        self.set_status(message);
    }

    async fn install_entry(&mut self, id: EntryId, progress: &mut dyn FnMut(Mode, &str)) -> String {
        let Some(entry) = self.catalog.entry(id) else {
            return "Script not found".to_string();
        };

        let last = &mut self.progress;
        let mut report = |text: &str| {
            *last = text.to_string();
            progress(Mode::Downloading, text);
        };

        match self.installer.install(entry, &mut self.versions, &mut report).await {
            Ok(result) => result.status_message(),
            Err(e) => {
                tracing::warn!("Install of {} failed: {}", entry.key(), e);
                e.to_string()
            }
        }
    }

    async fn delete_entry(&mut self, id: EntryId, progress: &mut dyn FnMut(Mode, &str)) -> String {
        let Some(entry) = self.catalog.entry(id) else {
            return "Script not found".to_string();
        };

        self.progress = format!("Deleting {}...", entry.name);
        progress(Mode::Downloading, &self.progress);

        match self.installer.delete(entry, &mut self.versions).await {
            Ok(result) => result.status_message(),
            Err(e) => {
                tracing::warn!("Delete of {} failed: {}", entry.key(), e);
                format!("Error deleting script: {}", e)
            }
        }
    }

    /// Advance the timers. Returns the region to redraw, if any.
    pub fn tick(&mut self, now: Instant) -> Option<Render> {
        if self.status.tick(now) {
            return Some(Render::Region(Region::Status));
        }

        let active = self.nav.mode == Mode::Scripts && !self.status.is_showing();
        let description = self
            .nav
            .selected_entry(&self.catalog)
            .and_then(|id| self.catalog.entry(id))
            .map(|e| e.description.as_str())
            .unwrap_or("");

        if self.scroll.tick(now, active, description, self.max_characters) {
            Some(Render::Region(Region::Description))
        } else {
            None
        }
    }

    /// Description of the selected script as it should currently be drawn
    pub fn visible_description(&self) -> String {
        self.nav
            .selected_entry(&self.catalog)
            .and_then(|id| self.catalog.entry(id))
            .map(|e| self.scroll.visible(&e.description, self.max_characters))
            .unwrap_or_default()
    }
}
