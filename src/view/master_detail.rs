//! A resource view made of two pages: the master table and a details page
//! for the selected row.

use crate::identity::fqn;
use crate::input::Action;
use crate::model::{NamespaceScope, TableData};
use crate::view::actions::{Hint, KeyAction, KeyActions};
use crate::view::details::DetailsView;
use crate::view::table::TableView;
use crossterm::event::KeyCode;

const HELP_KEY: KeyCode = KeyCode::Char('?');
const PREVIOUS_KEY: KeyCode = KeyCode::Char('p');

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PageKind {
    Master,
    Details,
}

impl PageKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Details => "details",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ViewScope {
    /// Cluster-scoped resources; the namespace never changes.
    NotNamespaced,
    Namespaced(NamespaceScope),
}

/// What the enter handler asks the shell to do with the selection.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Drill {
    /// Runs `line` and, when `workload` is set, narrows the new table to the
    /// pods owned by that workload.
    Command {
        line: String,
        workload: Option<String>,
    },
    Details,
}

pub type ExtraActionsFn = Box<dyn Fn(&mut KeyActions)>;
pub type SelectedFn = Box<dyn Fn(&TableView, usize, usize) -> String>;
pub type EnterFn = Box<dyn Fn(&str) -> Drill>;

pub struct MasterDetail {
    title: String,
    scope: ViewScope,
    master: TableView,
    details: DetailsView,
    front: PageKind,
    selected_item: String,
    extra_actions: Option<ExtraActionsFn>,
    selected_fn: Option<SelectedFn>,
    enter_fn: Option<EnterFn>,
}

impl MasterDetail {
    pub fn new(
        title: impl Into<String>,
        scope: ViewScope,
        extra_actions: Option<ExtraActionsFn>,
    ) -> Self {
        let title = title.into();
        let mut view = Self {
            master: TableView::new(title.clone()),
            title,
            scope,
            details: DetailsView::new(),
            front: PageKind::Master,
            selected_item: String::new(),
            extra_actions,
            selected_fn: None,
            enter_fn: None,
        };
        view.default_actions();
        view
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Re-enters the view with a new namespace. Cluster-scoped views ignore it.
    pub fn init(&mut self, namespace: &NamespaceScope) {
        if let ViewScope::Namespaced(current) = &mut self.scope {
            *current = namespace.clone();
        }
    }

    pub fn set_selected_fn(&mut self, selected_fn: SelectedFn) {
        self.selected_fn = Some(selected_fn);
    }

    pub fn set_enter_fn(&mut self, enter_fn: EnterFn) {
        self.enter_fn = Some(enter_fn);
    }

    /// Installs the help and previous-view bindings, then lets the view
    /// extension add or override bindings. The two baseline keys survive any
    /// extension.
    pub fn default_actions(&mut self) {
        let help = KeyAction::new("Help", Action::ToggleHelp, true);
        let previous = KeyAction::new("Previous", Action::PreviousView, true);

        let mut actions = KeyActions::new();
        actions.insert(HELP_KEY, help.clone());
        actions.insert(PREVIOUS_KEY, previous.clone());
        if let Some(extend) = &self.extra_actions {
            extend(&mut actions);
        }
        if !actions.contains(HELP_KEY) {
            actions.insert(HELP_KEY, help);
        }
        if !actions.contains(PREVIOUS_KEY) {
            actions.insert(PREVIOUS_KEY, previous);
        }

        self.master.set_actions(actions);
    }

    /// Bindings of the master page, hidden ones included.
    pub fn actions(&self) -> &KeyActions {
        self.master.actions()
    }

    /// Binding for `key` on the frontmost page.
    pub fn key_action(&self, key: KeyCode) -> Option<&KeyAction> {
        match self.front {
            PageKind::Master => self.master.actions().get(key),
            PageKind::Details => self.details.actions().get(key),
        }
    }

    pub fn hints(&self) -> Vec<Hint> {
        match self.front {
            PageKind::Master => self.master.hints(),
            PageKind::Details => self.details.hints(),
        }
    }

    pub fn front_page(&self) -> PageKind {
        self.front
    }

    pub fn master_page(&self) -> &TableView {
        &self.master
    }

    pub fn details_page(&self) -> &DetailsView {
        &self.details
    }

    pub fn details_page_mut(&mut self) -> &mut DetailsView {
        &mut self.details
    }

    pub fn show_details(&mut self, title: impl Into<String>, text: impl Into<String>) {
        self.details.set_content(title, text);
        self.front = PageKind::Details;
    }

    pub fn show_master(&mut self) {
        self.front = PageKind::Master;
    }

    /// Selection-changed handler of the master table.
    pub fn select_item(&mut self, row: usize, column: usize) {
        self.selected_item = self.resolve_selection(row, column);
    }

    pub fn selected_item(&self) -> &str {
        &self.selected_item
    }

    pub fn row_selected(&self) -> bool {
        !self.selected_item.is_empty()
    }

    fn resolve_selection(&self, row: usize, column: usize) -> String {
        if let Some(selected_fn) = &self.selected_fn {
            return selected_fn(&self.master, row, column);
        }

        let Some(first) = self.master.trim_cell(row, 0) else {
            return String::new();
        };

        match &self.scope {
            ViewScope::NotNamespaced => first.to_string(),
            ViewScope::Namespaced(NamespaceScope::All) => {
                let name = self.master.trim_cell(row, 1).unwrap_or_default();
                fqn(first, name)
            }
            ViewScope::Namespaced(NamespaceScope::Named(namespace)) => fqn(namespace, first),
        }
    }

    /// Applies a fresh snapshot to the master page and re-resolves the
    /// selection against the row it stayed attached to.
    pub fn update(&mut self, snapshot: TableData) {
        let row = self.master.update(snapshot, &self.selected_item);
        self.select_item(row, 0);
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.master.set_error(error);
    }

    pub fn move_selection(&mut self, delta: isize) {
        let row = self.master.move_selection(delta);
        self.select_item(row, 0);
    }

    pub fn select_first(&mut self) {
        let row = self.master.select_first();
        self.select_item(row, 0);
    }

    pub fn select_last(&mut self) {
        let row = self.master.select_last();
        self.select_item(row, 0);
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        let row = self.master.set_filter(filter);
        self.select_item(row, 0);
    }

    pub fn set_workload(&mut self, workload: Option<String>) {
        let row = self.master.set_workload(workload);
        self.select_item(row, 0);
    }

    /// Runs the enter handler on the current selection. Nothing happens while
    /// no row is selected.
    pub fn enter(&self) -> Option<Drill> {
        if !self.row_selected() {
            return None;
        }

        Some(match &self.enter_fn {
            Some(enter_fn) => enter_fn(&self.selected_item),
            None => Drill::Details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Drill, MasterDetail, PageKind, ViewScope};
    use crate::input::Action;
    use crate::model::{NamespaceScope, RowData, TableData};
    use crate::view::actions::{KeyAction, KeyActions};
    use crate::view::table::TableView;
    use crossterm::event::KeyCode;
    use std::cell::Cell;
    use std::rc::Rc;

    fn row(namespace: Option<&str>, columns: &[&str]) -> RowData {
        RowData {
            name: columns.last().copied().unwrap_or_default().to_string(),
            namespace: namespace.map(str::to_string),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            detail: String::new(),
        }
    }

    fn table(headers: &[&str], rows: Vec<RowData>) -> TableData {
        TableData {
            headers: headers.iter().map(|header| header.to_string()).collect(),
            rows,
            last_refreshed: None,
        }
    }

    #[test]
    fn not_namespaced_view_selects_first_column() {
        let mut view = MasterDetail::new("Nodes", ViewScope::NotNamespaced, None);
        view.update(table(&["NAME"], vec![row(None, &["bozo"]), row(None, &[" fred "])]));

        view.select_item(2, 0);
        assert_eq!(view.selected_item(), "fred");
        assert!(view.row_selected());
    }

    #[test]
    fn all_namespaces_view_joins_namespace_and_name_columns() {
        let mut view = MasterDetail::new(
            "Pods",
            ViewScope::Namespaced(NamespaceScope::All),
            None,
        );
        view.update(table(
            &["NAMESPACE", "NAME"],
            vec![row(Some("blee"), &["blee", "fred"])],
        ));

        view.select_item(1, 0);
        assert_eq!(view.selected_item(), "blee/fred");
    }

    #[test]
    fn named_namespace_view_qualifies_first_column() {
        let mut view = MasterDetail::new(
            "Pods",
            ViewScope::Namespaced(NamespaceScope::Named("blee".to_string())),
            None,
        );
        view.update(table(&["NAME"], vec![row(Some("blee"), &["fred"])]));

        view.select_item(1, 0);
        assert_eq!(view.selected_item(), "blee/fred");
    }

    #[test]
    fn header_row_clears_selection() {
        let mut view = MasterDetail::new("Nodes", ViewScope::NotNamespaced, None);
        view.update(table(&["NAME"], vec![row(None, &["fred"])]));
        assert!(view.row_selected());

        view.select_item(0, 0);
        assert_eq!(view.selected_item(), "");
        assert!(!view.row_selected());
    }

    #[test]
    fn missing_row_clears_selection() {
        let mut view = MasterDetail::new("Nodes", ViewScope::NotNamespaced, None);
        view.update(table(&["NAME"], vec![row(None, &["fred"])]));

        view.select_item(5, 0);
        assert!(!view.row_selected());
    }

    #[test]
    fn custom_resolver_takes_precedence() {
        let mut view = MasterDetail::new("Nodes", ViewScope::NotNamespaced, None);
        view.set_selected_fn(Box::new(|table: &TableView, row: usize, _column: usize| {
            table
                .row(row)
                .map(|row| format!("custom:{}", row.name))
                .unwrap_or_default()
        }));
        view.update(table(&["NAME"], vec![row(None, &["fred"])]));

        view.select_item(1, 0);
        assert_eq!(view.selected_item(), "custom:fred");
    }

    #[test]
    fn init_updates_namespaced_scope_only() {
        let mut namespaced = MasterDetail::new(
            "Pods",
            ViewScope::Namespaced(NamespaceScope::Named("default".to_string())),
            None,
        );
        namespaced.init(&NamespaceScope::All);
        assert_eq!(
            namespaced.scope(),
            &ViewScope::Namespaced(NamespaceScope::All)
        );

        let mut cluster = MasterDetail::new("Nodes", ViewScope::NotNamespaced, None);
        cluster.init(&NamespaceScope::Named("kube-system".to_string()));
        assert_eq!(cluster.scope(), &ViewScope::NotNamespaced);
    }

    #[test]
    fn default_actions_keep_help_and_previous() {
        let view = MasterDetail::new(
            "Pods",
            ViewScope::NotNamespaced,
            Some(Box::new(|actions: &mut KeyActions| {
                actions.remove(KeyCode::Char('?'));
                actions.remove(KeyCode::Char('p'));
                actions.insert(
                    KeyCode::Enter,
                    KeyAction::new("View", Action::EnterResource, true),
                );
            })),
        );

        let help = view.actions().get(KeyCode::Char('?')).expect("help");
        assert_eq!(help.action, Action::ToggleHelp);
        assert!(help.visible);
        let previous = view.actions().get(KeyCode::Char('p')).expect("previous");
        assert_eq!(previous.action, Action::PreviousView);
        assert!(previous.visible);
        assert!(view.actions().contains(KeyCode::Enter));
    }

    #[test]
    fn extension_may_override_other_bindings() {
        let view = MasterDetail::new(
            "Pods",
            ViewScope::NotNamespaced,
            Some(Box::new(|actions: &mut KeyActions| {
                actions.insert(
                    KeyCode::Char('?'),
                    KeyAction::new("Keys", Action::ToggleHelp, true),
                );
            })),
        );
        assert_eq!(
            view.actions()
                .get(KeyCode::Char('?'))
                .map(|action| action.description.as_str()),
            Some("Keys")
        );
    }

    #[test]
    fn hints_follow_front_page() {
        let mut view = MasterDetail::new("Nodes", ViewScope::NotNamespaced, None);
        let master_keys = view
            .hints()
            .into_iter()
            .map(|hint| hint.key)
            .collect::<Vec<_>>();
        assert_eq!(master_keys, vec!["?".to_string(), "p".to_string()]);
        assert_eq!(view.front_page().name(), "master");

        view.show_details("node fred", "kind: Node");
        assert_eq!(view.front_page(), PageKind::Details);
        assert!(view.hints().iter().any(|hint| hint.key == "esc"));
        assert_eq!(
            view.key_action(KeyCode::Esc).map(|action| action.action.clone()),
            Some(Action::Back)
        );

        view.show_master();
        assert_eq!(view.front_page().name(), "master");
    }

    #[test]
    fn enter_is_refused_without_selection() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut view = MasterDetail::new("Nodes", ViewScope::NotNamespaced, None);
        view.set_enter_fn(Box::new(move |_: &str| {
            counter.set(counter.get() + 1);
            Drill::Details
        }));

        assert_eq!(view.enter(), None);
        assert_eq!(calls.get(), 0);

        view.update(table(&["NAME"], vec![row(None, &["fred"])]));
        assert_eq!(view.enter(), Some(Drill::Details));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn enter_handler_receives_selected_identity() {
        let mut view = MasterDetail::new("Namespaces", ViewScope::NotNamespaced, None);
        view.set_enter_fn(Box::new(|selected: &str| Drill::Command {
            line: format!("pods {selected}"),
            workload: None,
        }));
        view.update(table(&["NAME"], vec![row(None, &["kube-system"])]));

        assert_eq!(
            view.enter(),
            Some(Drill::Command {
                line: "pods kube-system".to_string(),
                workload: None,
            })
        );
    }

    #[test]
    fn workload_narrowing_reresolves_selection() {
        let mut view = MasterDetail::new(
            "Pods",
            ViewScope::Namespaced(NamespaceScope::Named("default".to_string())),
            None,
        );
        view.update(table(
            &["NAME"],
            vec![
                row(Some("default"), &["webhook-x"]),
                row(Some("default"), &["web-78f8b5d78c-f8588"]),
            ],
        ));
        assert_eq!(view.selected_item(), "default/webhook-x");

        view.set_workload(Some("web".to_string()));
        assert_eq!(view.master_page().row_count(), 1);
        assert_eq!(view.selected_item(), "default/web-78f8b5d78c-f8588");
    }

    #[test]
    fn refresh_keeps_selection_on_same_identity() {
        let mut view = MasterDetail::new(
            "Pods",
            ViewScope::Namespaced(NamespaceScope::Named("default".to_string())),
            None,
        );
        view.update(table(
            &["NAME"],
            vec![row(Some("default"), &["api"]), row(Some("default"), &["db"])],
        ));
        view.move_selection(1);
        assert_eq!(view.selected_item(), "default/db");

        view.update(table(
            &["NAME"],
            vec![
                row(Some("default"), &["aaa"]),
                row(Some("default"), &["api"]),
                row(Some("default"), &["db"]),
            ],
        ));
        assert_eq!(view.master_page().selected(), 3);
        assert_eq!(view.selected_item(), "default/db");
    }
}
