use crate::input::Action;
use crate::model::{NamespaceScope, ResourceKind};
use crate::view::actions::{KeyAction, KeyActions};
use crate::view::master_detail::{Drill, ExtraActionsFn, MasterDetail, ViewScope};
use crate::view::table::TableView;
use crossterm::event::KeyCode;

/// Builds the view for one resource kind with its bindings and drill-down.
pub fn resource_view(kind: ResourceKind, namespace: &NamespaceScope) -> MasterDetail {
    let scope = if kind.namespaced() {
        ViewScope::Namespaced(namespace.clone())
    } else {
        ViewScope::NotNamespaced
    };

    let mut view = MasterDetail::new(kind.title(), scope, Some(extra_actions(kind)));
    view.set_enter_fn(Box::new(move |selected: &str| enter(kind, selected)));
    if kind == ResourceKind::Aliases {
        // The first column holds the title; the row id is the command to run.
        view.set_selected_fn(Box::new(|table: &TableView, row: usize, _column: usize| {
            table
                .row(row)
                .map(|row| row.id.clone())
                .unwrap_or_default()
        }));
    }
    view
}

fn extra_actions(kind: ResourceKind) -> ExtraActionsFn {
    Box::new(move |actions: &mut KeyActions| {
        actions.insert(
            KeyCode::Enter,
            KeyAction::new(enter_label(kind), Action::EnterResource, true),
        );
        actions.insert(
            KeyCode::Char('d'),
            KeyAction::new("Describe", Action::ShowDetails, true),
        );
        actions.insert(
            KeyCode::Char('/'),
            KeyAction::new("Filter", Action::StartFilter, true),
        );
        actions.insert(
            KeyCode::Char(':'),
            KeyAction::new("Command", Action::StartCommand, false),
        );
        actions.insert(
            KeyCode::Char('r'),
            KeyAction::new("Refresh", Action::Refresh, false),
        );
        if matches!(kind, ResourceKind::Pods | ResourceKind::Services) {
            actions.insert(
                KeyCode::Char('F'),
                KeyAction::new("Port-Forward", Action::PortForward, true),
            );
        }
        if kind.local() {
            actions.remove(KeyCode::Char('d'));
        }
    })
}

fn enter_label(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Namespaces
        | ResourceKind::Deployments
        | ResourceKind::StatefulSets
        | ResourceKind::Services => "Pods",
        ResourceKind::Aliases => "Goto",
        _ => "View",
    }
}

fn enter(kind: ResourceKind, selected: &str) -> Drill {
    match kind {
        ResourceKind::Namespaces => Drill::Command {
            line: format!("{} {selected}", ResourceKind::Pods.command()),
            workload: None,
        },
        ResourceKind::Deployments | ResourceKind::StatefulSets | ResourceKind::Services => {
            let (namespace, name) = selected.rsplit_once('/').unwrap_or(("", selected));
            let line = if namespace.is_empty() {
                ResourceKind::Pods.command().to_string()
            } else {
                format!("{} {namespace}", ResourceKind::Pods.command())
            };
            Drill::Command {
                line,
                workload: Some(name.to_string()),
            }
        }
        ResourceKind::Aliases => Drill::Command {
            line: selected.to_string(),
            workload: None,
        },
        _ => Drill::Details,
    }
}
