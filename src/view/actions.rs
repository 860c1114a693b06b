use crate::input::{Action, key_label};
use crossterm::event::KeyCode;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAction {
    pub description: String,
    pub action: Action,
    pub visible: bool,
}

impl KeyAction {
    pub fn new(description: impl Into<String>, action: Action, visible: bool) -> Self {
        Self {
            description: description.into(),
            action,
            visible,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub key: String,
    pub description: String,
}

/// Key bindings of one page. A later insert for the same key replaces the
/// earlier binding.
#[derive(Debug, Clone, Default)]
pub struct KeyActions {
    bindings: HashMap<KeyCode, KeyAction>,
}

impl KeyActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: KeyCode, action: KeyAction) {
        self.bindings.insert(key, action);
    }

    pub fn get(&self, key: KeyCode) -> Option<&KeyAction> {
        self.bindings.get(&key)
    }

    pub fn remove(&mut self, key: KeyCode) -> Option<KeyAction> {
        self.bindings.remove(&key)
    }

    pub fn contains(&self, key: KeyCode) -> bool {
        self.bindings.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Visible bindings, sorted by key label.
    pub fn hints(&self) -> Vec<Hint> {
        self.collect_hints(false)
    }

    /// Every binding, hidden ones included, sorted by key label.
    pub fn all_hints(&self) -> Vec<Hint> {
        self.collect_hints(true)
    }

    fn collect_hints(&self, include_hidden: bool) -> Vec<Hint> {
        let mut hints = self
            .bindings
            .iter()
            .filter(|(_, action)| include_hidden || action.visible)
            .map(|(key, action)| Hint {
                key: key_label(*key),
                description: action.description.clone(),
            })
            .collect::<Vec<_>>();
        hints.sort_by(|left, right| left.key.cmp(&right.key));
        hints
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyAction, KeyActions};
    use crate::input::Action;
    use crossterm::event::KeyCode;

    #[test]
    fn later_binding_replaces_earlier_one() {
        let mut actions = KeyActions::new();
        actions.insert(
            KeyCode::Enter,
            KeyAction::new("Details", Action::ShowDetails, true),
        );
        actions.insert(
            KeyCode::Enter,
            KeyAction::new("Pods", Action::EnterResource, true),
        );

        assert_eq!(actions.len(), 1);
        let binding = actions.get(KeyCode::Enter).expect("binding");
        assert_eq!(binding.description, "Pods");
        assert_eq!(binding.action, Action::EnterResource);
    }

    #[test]
    fn hints_skip_hidden_bindings_and_sort_by_key() {
        let mut actions = KeyActions::new();
        actions.insert(
            KeyCode::Char('p'),
            KeyAction::new("Previous", Action::PreviousView, true),
        );
        actions.insert(
            KeyCode::Char('?'),
            KeyAction::new("Help", Action::ToggleHelp, true),
        );
        actions.insert(KeyCode::Char('j'), KeyAction::new("Down", Action::Down, false));

        let hints = actions.hints();
        let keys = hints.iter().map(|hint| hint.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["?", "p"]);
        assert_eq!(hints[1].description, "Previous");

        let all = actions.all_hints();
        let keys = all.iter().map(|hint| hint.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["?", "j", "p"]);
        assert_eq!(all.len(), actions.len());
    }

    #[test]
    fn remove_drops_binding() {
        let mut actions = KeyActions::new();
        actions.insert(
            KeyCode::Char('d'),
            KeyAction::new("Describe", Action::ShowDetails, true),
        );
        assert!(actions.contains(KeyCode::Char('d')));
        assert!(actions.remove(KeyCode::Char('d')).is_some());
        assert!(actions.is_empty());
    }
}
