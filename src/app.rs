use crate::config::{RuntimeConfigSnapshot, resolve_alias};
use crate::history::CommandStack;
use crate::identity::{container_id, is_tcp_port, strip_port};
use crate::input::{Action, map_key};
use crate::model::{NamespaceScope, ResourceKind, TableData};
use crate::view::table::TableRow;
use crate::view::{Drill, MasterDetail, PageKind, alias_table, resource_view};
use crossterm::event::{KeyEvent, KeyModifiers};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const PORTS_HEADER: &str = "PORTS";
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Command,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Refresh,
    Quit,
    StartPortForward {
        kind: ResourceKind,
        namespace: String,
        name: String,
        key: String,
        local_port: u16,
        remote_port: u16,
    },
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    prompt: String,
    command: AppCommand,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PortForwardSession {
    pub key: String,
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub local_port: u16,
    pub remote_port: u16,
    pub pid: u32,
}

/// Snapshot fetch for the view that was current when it was requested.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RefreshRequest {
    pub generation: u64,
    pub kind: ResourceKind,
    pub scope: NamespaceScope,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub generation: u64,
    pub kind: ResourceKind,
    pub scope: NamespaceScope,
    pub result: Result<TableData, String>,
}

pub struct App {
    running: bool,
    mode: InputMode,
    input: String,
    status: String,
    show_help: bool,
    pending_confirmation: Option<PendingConfirmation>,
    cluster: String,
    context: String,
    namespace_scope: NamespaceScope,
    kind: ResourceKind,
    view: MasterDetail,
    history: CommandStack,
    aliases: HashMap<String, String>,
    generation: u64,
    port_forwards: Vec<PortForwardSession>,
    page_size: usize,
}

impl App {
    pub fn new(cluster: String, context: String, namespace_scope: NamespaceScope) -> Self {
        let kind = ResourceKind::Pods;
        Self {
            running: true,
            mode: InputMode::Normal,
            input: String::new(),
            status: "Ready".to_string(),
            show_help: false,
            pending_confirmation: None,
            cluster,
            context,
            view: resource_view(kind, &namespace_scope),
            namespace_scope,
            kind,
            history: CommandStack::new(),
            aliases: HashMap::new(),
            generation: 0,
            port_forwards: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn pending_confirmation_prompt(&self) -> Option<&str> {
        self.pending_confirmation
            .as_ref()
            .map(|pending| pending.prompt.as_str())
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn namespace_scope(&self) -> &NamespaceScope {
        &self.namespace_scope
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn view(&self) -> &MasterDetail {
        &self.view
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    pub fn history_top(&self) -> Option<&str> {
        self.history.top()
    }

    pub fn port_forwards(&self) -> &[PortForwardSession] {
        &self.port_forwards
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn apply_config(&mut self, snapshot: RuntimeConfigSnapshot) {
        info!(
            source = snapshot.source.as_deref().unwrap_or("<none>"),
            aliases = snapshot.aliases.len(),
            "applied runtime config"
        );
        self.aliases = snapshot.aliases;
        if self.kind.local() {
            self.hydrate_local();
        }
    }

    /// Fetch for the current view, or `None` when its table is built locally.
    pub fn refresh_request(&self) -> Option<RefreshRequest> {
        if self.kind.local() {
            return None;
        }

        Some(RefreshRequest {
            generation: self.generation,
            kind: self.kind,
            scope: self.namespace_scope.clone(),
        })
    }

    /// Key bindings of the frontmost page win over the global key map.
    pub fn action_for_key(&self, key: KeyEvent) -> Option<Action> {
        let plain = key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT;
        if self.mode == InputMode::Normal
            && self.pending_confirmation.is_none()
            && plain
            && let Some(binding) = self.view.key_action(key.code)
        {
            return Some(binding.action.clone());
        }

        map_key(self.mode, key)
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if let Some(pending) = self.pending_confirmation.take() {
            match action {
                Action::ConfirmYes | Action::EnterResource => {
                    self.status = format!("Confirmed: {}", pending.prompt);
                    if pending.command == AppCommand::Quit {
                        self.running = false;
                    }
                    return pending.command;
                }
                Action::ConfirmNo | Action::CancelInput | Action::Back => {
                    self.status = "Action cancelled".to_string();
                    return AppCommand::None;
                }
                _ => {
                    self.pending_confirmation = Some(pending);
                    self.status =
                        "Pending confirmation: press y to confirm or n to cancel".to_string();
                    return AppCommand::None;
                }
            }
        }

        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
            if matches!(action, Action::Back) {
                return AppCommand::None;
            }
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::Quit
            }
            Action::Down => {
                self.scroll_or_move(1);
                AppCommand::None
            }
            Action::Up => {
                self.scroll_or_move(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.scroll_or_move(self.page_size as isize);
                AppCommand::None
            }
            Action::PageUp => {
                self.scroll_or_move(-(self.page_size as isize));
                AppCommand::None
            }
            Action::Top => {
                match self.view.front_page() {
                    PageKind::Master => self.view.select_first(),
                    PageKind::Details => self.view.details_page_mut().scroll_top(),
                }
                AppCommand::None
            }
            Action::Bottom => {
                match self.view.front_page() {
                    PageKind::Master => self.view.select_last(),
                    PageKind::Details => self.view.details_page_mut().scroll_bottom(),
                }
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::PreviousView => self.previous_view(),
            Action::EnterResource => self.drill(),
            Action::ShowDetails => {
                self.open_selected_details();
                AppCommand::None
            }
            Action::Back => {
                if self.view.front_page() == PageKind::Details {
                    self.view.show_master();
                    self.status = "Closed details".to_string();
                } else if !self.view.master_page().filter().is_empty() {
                    self.view.set_filter("");
                    self.status = "Filter cleared".to_string();
                } else if self.view.master_page().workload().is_some() {
                    self.view.set_workload(None);
                    self.status = format!("Showing all {}", self.kind.title());
                }
                AppCommand::None
            }
            Action::StartCommand => {
                self.mode = InputMode::Command;
                self.input.clear();
                self.status = "Command mode (:<resource> [namespace|all], :q to quit)".to_string();
                AppCommand::None
            }
            Action::StartFilter => {
                self.mode = InputMode::Filter;
                self.input = self.view.master_page().filter().to_string();
                self.status = "Filter mode".to_string();
                AppCommand::None
            }
            Action::Refresh if self.kind.local() => {
                self.hydrate_local();
                self.status = format!("Rebuilt {}", self.kind.title());
                AppCommand::None
            }
            Action::Refresh => {
                self.status = format!(
                    "Refreshing {} in namespace '{}'",
                    self.kind.title(),
                    self.namespace_scope
                );
                AppCommand::Refresh
            }
            Action::PortForward => self.prepare_port_forward(),
            Action::SubmitInput => self.submit_input(),
            Action::CancelInput => {
                self.mode = InputMode::Normal;
                self.input.clear();
                self.status = "Input cancelled".to_string();
                AppCommand::None
            }
            Action::Backspace => {
                self.input.pop();
                if self.mode == InputMode::Filter {
                    self.view.set_filter(self.input.clone());
                }
                AppCommand::None
            }
            Action::InputChar(c) => {
                self.input.push(c);
                if self.mode == InputMode::Filter {
                    self.view.set_filter(self.input.clone());
                }
                AppCommand::None
            }
            Action::ConfirmYes | Action::ConfirmNo => AppCommand::None,
        }
    }

    /// Applies a finished fetch. Results requested for a view that is no
    /// longer current are dropped; returns whether the outcome was applied.
    pub fn apply_refresh(&mut self, outcome: RefreshOutcome) -> bool {
        if outcome.generation != self.generation
            || outcome.kind != self.kind
            || outcome.scope != self.namespace_scope
        {
            debug!(
                generation = outcome.generation,
                current = self.generation,
                kind = outcome.kind.title(),
                "discarding stale refresh"
            );
            return false;
        }

        match outcome.result {
            Ok(table) => self.view.update(table),
            Err(error) => {
                warn!(kind = self.kind.title(), %error, "refresh failed");
                self.view.set_error(error.clone());
                let summary = summarize_error_line(&error);
                self.set_status(format!("{} refresh failed: {summary}", self.kind.title()));
            }
        }
        true
    }

    /// Opens a view from a command line such as `pods kube-system` and records
    /// it in the history.
    pub fn execute_command_line(&mut self, line: &str) -> AppCommand {
        self.open_command(line, true)
    }

    fn open_command(&mut self, line: &str, record: bool) -> AppCommand {
        let line = line.trim().trim_start_matches(':').trim();
        let mut parts = line.split_whitespace();
        let Some(token) = parts.next() else {
            return AppCommand::None;
        };
        if matches!(token, "q" | "q!" | "quit" | "exit") {
            self.running = false;
            self.status = "Exit requested".to_string();
            return AppCommand::Quit;
        }

        let expanded = resolve_alias(&self.aliases, token);
        let tokens = expanded
            .split_whitespace()
            .chain(parts)
            .map(str::to_string)
            .collect::<Vec<_>>();
        let Some(kind) = tokens.first().and_then(|token| ResourceKind::from_token(token)) else {
            self.status = format!("Unknown command '{token}'");
            return AppCommand::None;
        };

        let scope = match tokens.get(1) {
            Some(namespace) => NamespaceScope::parse(namespace),
            None => self.namespace_scope.clone(),
        };
        let canonical = if kind.namespaced() {
            format!("{} {scope}", kind.command())
        } else {
            kind.command().to_string()
        };

        self.open_view(kind, scope);
        if record {
            self.history.push(canonical.clone());
            debug!(command = %canonical, depth = self.history.len(), "pushed view");
        }
        self.status = format!("Viewing {} in '{}'", kind.title(), self.namespace_scope);
        AppCommand::Refresh
    }

    /// Switches to `kind` in `scope`. Rows listed for another kind or
    /// namespace never carry over into the new view.
    fn open_view(&mut self, kind: ResourceKind, scope: NamespaceScope) {
        let rescoped = kind.namespaced() && scope != self.namespace_scope;
        if kind.namespaced() {
            self.namespace_scope = scope;
        }

        if kind == self.kind && !rescoped {
            self.view.init(&self.namespace_scope);
            self.view.show_master();
            self.view.set_filter("");
            self.view.set_workload(None);
        } else {
            self.kind = kind;
            self.view = resource_view(kind, &self.namespace_scope);
        }
        self.generation = self.generation.wrapping_add(1);
        if kind.local() {
            self.hydrate_local();
        }
    }

    fn hydrate_local(&mut self) {
        if self.kind == ResourceKind::Aliases {
            self.view.update(alias_table(&self.aliases));
        }
    }

    fn previous_view(&mut self) -> AppCommand {
        if self.history.is_empty() || self.history.is_last() {
            self.pending_confirmation = Some(PendingConfirmation {
                prompt: "Quit krill? (y/n)".to_string(),
                command: AppCommand::Quit,
            });
            self.status = "No previous view. Quit krill? (y/n)".to_string();
            return AppCommand::None;
        }

        let popped = self.history.pop();
        debug!(command = ?popped, "popped view");
        let Some(previous) = self.history.top().map(str::to_string) else {
            return AppCommand::None;
        };
        self.open_command(&previous, false)
    }

    fn drill(&mut self) -> AppCommand {
        if self.view.front_page() != PageKind::Master {
            return AppCommand::None;
        }

        match self.view.enter() {
            None => {
                self.status = "No resource selected".to_string();
                AppCommand::None
            }
            Some(Drill::Command { line, workload }) => {
                let command = self.execute_command_line(&line);
                if let Some(workload) = workload {
                    self.status = format!("{} (owned by {workload})", self.status);
                    self.view.set_workload(Some(workload));
                }
                command
            }
            Some(Drill::Details) => {
                self.open_selected_details();
                AppCommand::None
            }
        }
    }

    fn open_selected_details(&mut self) {
        if !self.view.row_selected() {
            self.status = "No resource selected".to_string();
            return;
        }
        let Some(detail) = self
            .view
            .master_page()
            .selected_row()
            .map(|row| row.detail.clone())
        else {
            self.status = "No resource selected".to_string();
            return;
        };

        let title = format!("{} {}", self.kind.title(), self.view.selected_item());
        self.view.show_details(title, detail);
        self.status = format!("Describing {}", self.view.selected_item());
    }

    fn submit_input(&mut self) -> AppCommand {
        let input = std::mem::take(&mut self.input);
        let mode = std::mem::replace(&mut self.mode, InputMode::Normal);
        match mode {
            InputMode::Command => self.execute_command_line(&input),
            InputMode::Filter => {
                let filter = input.trim().to_string();
                self.status = if filter.is_empty() {
                    "Filter cleared".to_string()
                } else {
                    format!("Filter: {filter}")
                };
                self.view.set_filter(filter);
                AppCommand::None
            }
            InputMode::Normal => AppCommand::None,
        }
    }

    fn scroll_or_move(&mut self, delta: isize) {
        match self.view.front_page() {
            PageKind::Master => self.view.move_selection(delta),
            PageKind::Details => self.view.details_page_mut().scroll_by(delta),
        }
    }

    fn prepare_port_forward(&mut self) -> AppCommand {
        let kind = self.kind;
        if !matches!(kind, ResourceKind::Pods | ResourceKind::Services) {
            self.status = "Port-forward is available for pods and services".to_string();
            return AppCommand::None;
        }

        let master = self.view.master_page();
        let Some(row) = master.selected_row() else {
            self.status = "No selected target for port-forward".to_string();
            return AppCommand::None;
        };
        let Some(namespace) = row.namespace.clone() else {
            self.status = "Selected target has no namespace".to_string();
            return AppCommand::None;
        };
        let Some(descriptor) = tcp_ports(master.column_index(PORTS_HEADER), row)
            .into_iter()
            .next()
        else {
            self.status = format!("No TCP port exposed by {}", row.id);
            return AppCommand::None;
        };
        let Ok(port) = strip_port(&descriptor).parse::<u16>() else {
            self.status = format!("Unsupported port '{descriptor}'");
            return AppCommand::None;
        };

        let key = session_key(kind, row, &descriptor);
        if self.port_forwards.iter().any(|session| session.key == key) {
            self.status = format!("Port-forward already active for {key}");
            return AppCommand::None;
        }

        let name = row.name.clone();
        self.status = format!("Starting port-forward {namespace}/{name} {port}:{port}");
        AppCommand::StartPortForward {
            kind,
            namespace,
            name,
            key,
            local_port: port,
            remote_port: port,
        }
    }

    pub fn register_port_forward(&mut self, session: PortForwardSession) {
        info!(
            key = %session.key,
            pid = session.pid,
            local = session.local_port,
            remote = session.remote_port,
            "port-forward started"
        );
        self.port_forwards.retain(|existing| existing.key != session.key);
        self.port_forwards.push(session);
    }

    pub fn remove_port_forward_by_pid(&mut self, pid: u32) -> Option<PortForwardSession> {
        let index = self
            .port_forwards
            .iter()
            .position(|session| session.pid == pid)?;
        let session = self.port_forwards.remove(index);
        info!(key = %session.key, pid, "port-forward ended");
        Some(session)
    }

    /// PF column text for a row: the active forward of the row's workload
    /// container, if any.
    pub fn port_forward_marker(&self, row: &TableRow) -> String {
        if !matches!(self.kind, ResourceKind::Pods | ResourceKind::Services) {
            return String::new();
        }

        let ports_column = self.view.master_page().column_index(PORTS_HEADER);
        let keys = match self.kind {
            ResourceKind::Pods => tcp_ports(ports_column, row)
                .iter()
                .map(|descriptor| session_key(self.kind, row, descriptor))
                .collect::<Vec<_>>(),
            _ => vec![row.id.clone()],
        };

        self.port_forwards
            .iter()
            .find(|session| session.kind == self.kind && keys.contains(&session.key))
            .map(|session| format!("{}→{}", session.local_port, session.remote_port))
            .unwrap_or_default()
    }
}

fn tcp_ports(column: Option<usize>, row: &TableRow) -> Vec<String> {
    let Some(cell) = column.and_then(|column| row.cell_text(column)) else {
        return Vec::new();
    };

    cell.split(',')
        .map(str::trim)
        .filter(|descriptor| is_tcp_port(descriptor))
        .map(str::to_string)
        .collect()
}

fn session_key(kind: ResourceKind, row: &TableRow, descriptor: &str) -> String {
    match (kind, descriptor.split_once(':')) {
        (ResourceKind::Pods, Some((container, _))) => container_id(&row.id, container),
        _ => row.id.clone(),
    }
}

fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
