//! Navigation state machine
//!
//! Owns the active mode, the selection indices and the action-menu overlay.
//! Input is turned into a [`Transition`]; side effects (install, delete,
//! catalog reload) are carried out by the caller, which reports back through
//! the `begin_*`/`finish_*` methods.

use crate::catalog::{Catalog, EntryId};
use crate::versions::{InstallState, VersionStore};

/// The four buttons of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Next,
    Prev,
    Select,
    Esc,
}

/// Current UI mode; exactly one is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Loading,
    Categories,
    Scripts,
    /// Overlay on top of Scripts, keeps the underlying script selection
    ActionMenu,
    Downloading,
}

impl Mode {
    /// Loading and Downloading ignore all input
    pub fn is_busy(&self) -> bool {
        matches!(self, Mode::Loading | Mode::Downloading)
    }
}

/// Option of the per-script action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Install,
    Update,
    Reinstall,
    Delete,
    Back,
}

impl MenuAction {
    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Install => "Install",
            MenuAction::Update => "Update",
            MenuAction::Reinstall => "Reinstall",
            MenuAction::Delete => "Delete",
            MenuAction::Back => "Back",
        }
    }

    /// Menu for a script in the given state; Back is always last
    pub fn options_for(state: InstallState) -> Vec<MenuAction> {
        match state {
            InstallState::NotInstalled => vec![MenuAction::Install, MenuAction::Back],
            InstallState::UpdateAvailable => vec![
                MenuAction::Update,
                MenuAction::Reinstall,
                MenuAction::Delete,
                MenuAction::Back,
            ],
            InstallState::UpToDate => {
                vec![MenuAction::Reinstall, MenuAction::Delete, MenuAction::Back]
            }
        }
    }
}

/// Part of the screen that can be redrawn on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Description,
    Status,
}

/// Redraw request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Full,
    Region(Region),
}

/// Side effect requested by the action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Install, update and reinstall are the same operation
    Install(EntryId),
    Delete(EntryId),
}

/// Result of feeding one input event to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed, no redraw needed
    Ignored,
    Changed,
    Exit,
    Run(Command),
}

/// Selection and mode of the single-screen UI
#[derive(Debug, Default)]
pub struct NavigationState {
    pub mode: Mode,
    pub category_index: usize,
    pub script_index: usize,
    /// Category index to restore when leaving the script list
    pub last_category_index: usize,
    pub menu_index: usize,
    pub menu_options: Vec<MenuAction>,
    /// Name of the category whose scripts are shown
    pub selected_category: Option<String>,
}

fn wrap(index: usize, count: usize, forward: bool) -> usize {
    let index = index % count;
    if forward {
        (index + 1) % count
    } else {
        (index + count - 1) % count
    }
}

fn clamp(index: usize, count: usize) -> usize {
    index.min(count.saturating_sub(1))
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one input event
    pub fn handle(
        &mut self,
        event: InputEvent,
        catalog: &Catalog,
        versions: &VersionStore,
    ) -> Transition {
        match self.mode {
            Mode::Loading | Mode::Downloading => Transition::Ignored,
            Mode::Categories => self.handle_categories(event, catalog),
            Mode::Scripts => self.handle_scripts(event, catalog, versions),
            Mode::ActionMenu => self.handle_menu(event, catalog),
        }
    }

    fn handle_categories(&mut self, event: InputEvent, catalog: &Catalog) -> Transition {
        let count = catalog.categories().len();
        match event {
            InputEvent::Esc => Transition::Exit,
            _ if count == 0 => Transition::Ignored,
            InputEvent::Next | InputEvent::Prev => {
                self.category_index =
                    wrap(self.category_index, count, event == InputEvent::Next);
                Transition::Changed
            }
            InputEvent::Select => {
                let Some(category) = catalog.category(self.category_index) else {
                    return Transition::Ignored;
                };
                self.last_category_index = self.category_index;
                self.selected_category = Some(category.name.clone());
                self.script_index = 0;
                self.mode = Mode::Scripts;
                Transition::Changed
            }
        }
    }

    fn handle_scripts(
        &mut self,
        event: InputEvent,
        catalog: &Catalog,
        versions: &VersionStore,
    ) -> Transition {
        let count = catalog.script_count(self.category_index);
        match event {
            InputEvent::Esc => {
                self.leave_scripts(catalog);
                Transition::Changed
            }
            _ if count == 0 => Transition::Ignored,
            InputEvent::Next | InputEvent::Prev => {
                self.script_index = wrap(self.script_index, count, event == InputEvent::Next);
                Transition::Changed
            }
            InputEvent::Select => {
                let Some(entry) = catalog.entry_at(self.category_index, self.script_index) else {
                    return Transition::Ignored;
                };
                self.menu_options = MenuAction::options_for(versions.state_of(entry));
                self.menu_index = 0;
                self.mode = Mode::ActionMenu;
                Transition::Changed
            }
        }
    }

    fn handle_menu(&mut self, event: InputEvent, catalog: &Catalog) -> Transition {
        match event {
            InputEvent::Esc => {
                self.close_menu();
                Transition::Changed
            }
            _ if self.menu_options.is_empty() => Transition::Ignored,
            InputEvent::Next | InputEvent::Prev => {
                self.menu_index = wrap(
                    self.menu_index,
                    self.menu_options.len(),
                    event == InputEvent::Next,
                );
                Transition::Changed
            }
            InputEvent::Select => {
                let action = self.menu_options[clamp(self.menu_index, self.menu_options.len())];
                let target = catalog.entry_id_at(self.category_index, self.script_index);
                self.close_menu();
                match (action, target) {
                    (MenuAction::Install | MenuAction::Update | MenuAction::Reinstall, Some(id)) => {
                        Transition::Run(Command::Install(id))
                    }
                    (MenuAction::Delete, Some(id)) => Transition::Run(Command::Delete(id)),
                    (MenuAction::Back, _) | (_, None) => Transition::Changed,
                }
            }
        }
    }

    fn close_menu(&mut self) {
        self.mode = Mode::Scripts;
        self.menu_options.clear();
        self.menu_index = 0;
    }

    fn leave_scripts(&mut self, catalog: &Catalog) {
        self.mode = Mode::Categories;
        self.selected_category = None;
        self.script_index = 0;
        self.menu_options.clear();
        self.category_index = clamp(self.last_category_index, catalog.categories().len());
    }

    /// Selected script, while one is on screen
    pub fn focus(&self) -> Option<(usize, usize)> {
        match self.mode {
            Mode::Scripts | Mode::ActionMenu | Mode::Downloading => {
                Some((self.category_index, self.script_index))
            }
            Mode::Loading | Mode::Categories => None,
        }
    }

    /// Entry under the cursor in the script list
    pub fn selected_entry(&self, catalog: &Catalog) -> Option<EntryId> {
        self.focus()?;
        catalog.entry_id_at(self.category_index, self.script_index)
    }

    pub fn begin_loading(&mut self) {
        self.mode = Mode::Loading;
    }

    /// Catalog is available (or failed to load); show the category list
    pub fn finish_loading(&mut self, catalog: &Catalog) {
        self.mode = Mode::Categories;
        self.selected_category = None;
        self.menu_options.clear();
        self.script_index = 0;
        self.category_index = clamp(self.category_index, catalog.categories().len());
    }

    pub fn begin_download(&mut self) {
        self.mode = Mode::Downloading;
    }

    /// Side effect done; back to the script list it was started from
    pub fn finish_download(&mut self, catalog: &Catalog) {
        self.mode = Mode::Scripts;
        self.revalidate(catalog);
    }

    /// Re-resolve the selection after the catalog changed.
    ///
    /// Categories may have shifted (Updates appears or disappears at the front),
    /// so the selected category is looked up by name. If it no longer exists
    /// the script list is left for the category list.
    pub fn revalidate(&mut self, catalog: &Catalog) {
        let categories = catalog.categories().len();

        if let Some(name) = self.selected_category.as_deref() {
            match catalog.category_index(name) {
                Some(index) => {
                    self.category_index = index;
                    self.last_category_index = index;
                    self.script_index = clamp(self.script_index, catalog.script_count(index));
                }
                None => {
                    tracing::debug!("Category '{}' disappeared, returning to categories", name);
                    self.mode = Mode::Categories;
                    self.selected_category = None;
                    self.menu_options.clear();
                    self.script_index = 0;
                    self.category_index = self.last_category_index;
                }
            }
        }

        self.category_index = clamp(self.category_index, categories);
        self.last_category_index = clamp(self.last_category_index, categories);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PackageKey;
    use crate::storage::FsStorage;
    use std::sync::Arc;

    const CATALOG: &str = r#"{
        "Tools": [
            {"name": "Clock", "owner": "alice", "repo": "tools", "version": "1.1"},
            {"name": "Timer", "owner": "alice", "repo": "tools", "version": "2.0"},
            {"name": "Notes", "owner": "alice", "repo": "notes", "version": "0.3"}
        ],
        "Themes": [
            {"name": "Dark", "owner": "bob", "repo": "themes", "version": "2.0"}
        ],
        "Empty": []
    }"#;

    fn fixture() -> (Catalog, VersionStore) {
        let catalog = Catalog::load(CATALOG.as_bytes()).unwrap();
        let versions = VersionStore::new(Arc::new(FsStorage::new("/nonexistent")), "v.json");
        (catalog, versions)
    }

    fn ready(catalog: &Catalog) -> NavigationState {
        let mut nav = NavigationState::new();
        nav.finish_loading(catalog);
        nav
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap(0, 3, true), 1);
        assert_eq!(wrap(2, 3, true), 0);
        assert_eq!(wrap(0, 3, false), 2);
        assert_eq!(wrap(1, 3, false), 0);
        assert_eq!(wrap(0, 1, true), 0);
        assert_eq!(wrap(0, 1, false), 0);
    }

    #[test]
    fn category_navigation_wraps_both_ways() {
        let (catalog, versions) = fixture();
        let mut nav = ready(&catalog);

        assert_eq!(nav.handle(InputEvent::Prev, &catalog, &versions), Transition::Changed);
        assert_eq!(nav.category_index, 2);
        nav.handle(InputEvent::Next, &catalog, &versions);
        assert_eq!(nav.category_index, 0);

        for _ in 0..7 {
            nav.handle(InputEvent::Next, &catalog, &versions);
            assert!(nav.category_index < 3);
        }
        assert_eq!(nav.category_index, 1);
    }

    #[test]
    fn script_navigation_wraps_both_ways() {
        let (catalog, versions) = fixture();
        let mut nav = ready(&catalog);
        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(nav.mode, Mode::Scripts);

        assert_eq!(nav.handle(InputEvent::Prev, &catalog, &versions), Transition::Changed);
        assert_eq!(nav.script_index, 2);
        nav.handle(InputEvent::Next, &catalog, &versions);
        assert_eq!(nav.script_index, 0);

        let mut expected = 0usize;
        for (i, event) in [InputEvent::Next, InputEvent::Prev, InputEvent::Next]
            .into_iter()
            .cycle()
            .take(11)
            .enumerate()
        {
            nav.handle(event, &catalog, &versions);
            expected = if event == InputEvent::Next {
                (expected + 1) % 3
            } else {
                (expected + 2) % 3
            };
            assert!(nav.script_index < 3, "out of range after step {}", i);
            assert_eq!(nav.script_index, expected);
        }
        assert_eq!(nav.category_index, 0);
    }

    #[test]
    fn select_and_escape_restore_category() {
        let (catalog, versions) = fixture();
        let mut nav = ready(&catalog);

        nav.handle(InputEvent::Next, &catalog, &versions);
        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(nav.mode, Mode::Scripts);
        assert_eq!(nav.selected_category.as_deref(), Some("Themes"));
        assert_eq!(nav.focus(), Some((1, 0)));

        nav.handle(InputEvent::Esc, &catalog, &versions);
        assert_eq!(nav.mode, Mode::Categories);
        assert_eq!(nav.category_index, 1);
        assert_eq!(nav.focus(), None);

        assert_eq!(nav.handle(InputEvent::Esc, &catalog, &versions), Transition::Exit);
    }

    #[test]
    fn empty_lists_ignore_movement() {
        let (_, versions) = fixture();
        let empty = Catalog::default();
        let mut nav = ready(&empty);
        for event in [InputEvent::Next, InputEvent::Prev, InputEvent::Select] {
            assert_eq!(nav.handle(event, &empty, &versions), Transition::Ignored);
        }
        assert_eq!(nav.mode, Mode::Categories);

        let (catalog, versions) = fixture();
        let mut nav = ready(&catalog);
        nav.category_index = 2;
        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(nav.mode, Mode::Scripts);
        for event in [InputEvent::Next, InputEvent::Prev, InputEvent::Select] {
            assert_eq!(nav.handle(event, &catalog, &versions), Transition::Ignored);
        }
        assert_eq!(nav.handle(InputEvent::Esc, &catalog, &versions), Transition::Changed);
        assert_eq!(nav.category_index, 2);
    }

    #[test]
    fn menu_options_follow_install_state() {
        let (catalog, mut versions) = fixture();
        let mut nav = ready(&catalog);
        nav.handle(InputEvent::Select, &catalog, &versions);

        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(nav.mode, Mode::ActionMenu);
        assert_eq!(nav.menu_options, vec![MenuAction::Install, MenuAction::Back]);
        nav.handle(InputEvent::Esc, &catalog, &versions);
        assert_eq!(nav.mode, Mode::Scripts);
        assert_eq!(nav.script_index, 0);

        versions.set(PackageKey::from("alice/tools:Clock"), "1.0");
        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(
            nav.menu_options,
            vec![
                MenuAction::Update,
                MenuAction::Reinstall,
                MenuAction::Delete,
                MenuAction::Back
            ]
        );
        nav.handle(InputEvent::Esc, &catalog, &versions);

        versions.set(PackageKey::from("alice/tools:Clock"), "1.1");
        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(
            nav.menu_options,
            vec![MenuAction::Reinstall, MenuAction::Delete, MenuAction::Back]
        );
    }

    #[test]
    fn menu_selection_produces_commands() {
        let (catalog, mut versions) = fixture();
        versions.set(PackageKey::from("alice/tools:Timer"), "2.0");
        let mut nav = ready(&catalog);
        nav.handle(InputEvent::Select, &catalog, &versions);
        nav.handle(InputEvent::Next, &catalog, &versions);
        let timer = catalog.entry_id_at(0, 1).unwrap();

        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(
            nav.handle(InputEvent::Select, &catalog, &versions),
            Transition::Run(Command::Install(timer))
        );
        assert_eq!(nav.mode, Mode::Scripts);

        nav.handle(InputEvent::Select, &catalog, &versions);
        nav.handle(InputEvent::Next, &catalog, &versions);
        assert_eq!(
            nav.handle(InputEvent::Select, &catalog, &versions),
            Transition::Run(Command::Delete(timer))
        );

        nav.handle(InputEvent::Select, &catalog, &versions);
        nav.handle(InputEvent::Prev, &catalog, &versions);
        assert_eq!(nav.menu_options[nav.menu_index], MenuAction::Back);
        assert_eq!(nav.handle(InputEvent::Select, &catalog, &versions), Transition::Changed);
        assert_eq!(nav.mode, Mode::Scripts);
        assert_eq!(nav.script_index, 1);
    }

    #[test]
    fn busy_modes_ignore_everything() {
        let (catalog, versions) = fixture();
        let mut nav = NavigationState::new();
        assert_eq!(nav.mode, Mode::Loading);
        for event in [InputEvent::Next, InputEvent::Prev, InputEvent::Select, InputEvent::Esc] {
            assert_eq!(nav.handle(event, &catalog, &versions), Transition::Ignored);
        }

        nav.finish_loading(&catalog);
        nav.handle(InputEvent::Select, &catalog, &versions);
        nav.begin_download();
        assert_eq!(nav.handle(InputEvent::Esc, &catalog, &versions), Transition::Ignored);
        nav.finish_download(&catalog);
        assert_eq!(nav.mode, Mode::Scripts);
    }

    #[test]
    fn revalidate_follows_shifted_category() {
        let (mut catalog, mut versions) = fixture();
        let mut nav = ready(&catalog);
        nav.handle(InputEvent::Next, &catalog, &versions);
        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(nav.category_index, 1);

        versions.set(PackageKey::from("bob/themes:Dark"), "1.0");
        catalog.recompute_updates(&versions);
        nav.revalidate(&catalog);
        assert_eq!(nav.category_index, 2);
        assert_eq!(catalog.entry_at(nav.category_index, 0).unwrap().name, "Dark");

        nav.handle(InputEvent::Esc, &catalog, &versions);
        assert_eq!(nav.category_index, 2);
    }

    #[test]
    fn vanished_category_returns_to_categories() {
        let (mut catalog, mut versions) = fixture();
        versions.set(PackageKey::from("alice/tools:Clock"), "1.0");
        catalog.recompute_updates(&versions);

        let mut nav = ready(&catalog);
        nav.handle(InputEvent::Select, &catalog, &versions);
        assert_eq!(nav.selected_category.as_deref(), Some("Updates"));
        nav.begin_download();

        versions.set(PackageKey::from("alice/tools:Clock"), "1.1");
        catalog.recompute_updates(&versions);
        nav.finish_download(&catalog);

        assert_eq!(nav.mode, Mode::Categories);
        assert_eq!(nav.selected_category, None);
        assert_eq!(nav.category_index, 0);
        assert_eq!(catalog.categories()[nav.category_index].name, "Tools");
    }
}
