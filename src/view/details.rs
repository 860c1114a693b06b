use crate::input::Action;
use crate::view::actions::{Hint, KeyAction, KeyActions};
use crossterm::event::KeyCode;

/// Drill-down page showing the manifest of the selected resource.
#[derive(Debug, Clone)]
pub struct DetailsView {
    title: String,
    text: String,
    scroll: u16,
    actions: KeyActions,
}

impl Default for DetailsView {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailsView {
    pub fn new() -> Self {
        let mut actions = KeyActions::new();
        actions.insert(KeyCode::Esc, KeyAction::new("Back", Action::Back, true));
        actions.insert(KeyCode::Char('j'), KeyAction::new("Down", Action::Down, true));
        actions.insert(KeyCode::Char('k'), KeyAction::new("Up", Action::Up, true));
        actions.insert(KeyCode::Char('g'), KeyAction::new("Top", Action::Top, true));

        Self {
            title: String::new(),
            text: String::new(),
            scroll: 0,
            actions,
        }
    }

    pub fn set_content(&mut self, title: impl Into<String>, text: impl Into<String>) {
        self.title = title.into();
        self.text = text.into();
        self.scroll = 0;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.line_count().saturating_sub(1).min(u16::MAX as usize) as isize;
        self.scroll = (self.scroll as isize).saturating_add(delta).clamp(0, max) as u16;
    }

    pub fn scroll_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.scroll_by(isize::MAX);
    }

    pub fn actions(&self) -> &KeyActions {
        &self.actions
    }

    pub fn hints(&self) -> Vec<Hint> {
        self.actions.hints()
    }
}
