use serde::{Deserialize, Serialize};

use histomap_io::ButtonPalette;

/// Visual state of one feature button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonState {
    Idle,
    Selected,
    Failed,
}

impl ButtonState {
    pub fn background<'p>(&self, palette: &'p ButtonPalette) -> &'p str {
        match self {
            ButtonState::Idle => &palette.idle,
            ButtonState::Selected => &palette.selected,
            ButtonState::Failed => &palette.failed,
        }
    }
}

/// Identifies one click, in click order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SelectionTicket(u64);

/// Button states plus the single "currently selected" pointer.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    buttons: Vec<(String, ButtonState)>,
    selected: Option<String>,
    issued: u64,
}

impl SelectionState {
    pub fn new<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            buttons: paths
                .into_iter()
                .map(|p| (p, ButtonState::Idle))
                .collect(),
            selected: None,
            issued: 0,
        }
    }

    /// Hand out the ticket for a new click.
    pub fn begin(&mut self) -> SelectionTicket {
        self.issued += 1;
        SelectionTicket(self.issued)
    }

    pub fn is_latest(&self, ticket: SelectionTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Highlight `path` and clear the previous highlight.
    pub fn mark_success(&mut self, path: &str) {
        if let Some(previous) = self.selected.take() {
            if previous != path {
                self.set(&previous, ButtonState::Idle);
            }
        }
        self.set(path, ButtonState::Selected);
        self.selected = Some(path.to_string());
    }

    /// Flag `path` as failed. The selected pointer is left alone.
    pub fn mark_failure(&mut self, path: &str) {
        self.set(path, ButtonState::Failed);
    }

    pub fn state(&self, path: &str) -> Option<ButtonState> {
        self.buttons
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, s)| *s)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().map(|(p, _)| p.as_str())
    }

    fn set(&mut self, path: &str, state: ButtonState) {
        match self.buttons.iter_mut().find(|(p, _)| p == path) {
            Some((_, s)) => *s = state,
            None => self.buttons.push((path.to_string(), state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SelectionState {
        SelectionState::new(["a", "b", "c"].map(String::from))
    }

    #[test]
    fn test_initial_state() {
        let s = state();
        assert_eq!(s.paths().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(s.state("b"), Some(ButtonState::Idle));
        assert_eq!(s.selected(), None);
        assert_eq!(s.state("zzz"), None);
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut s = state();
        s.mark_success("a");
        s.mark_success("b");
        assert_eq!(s.state("a"), Some(ButtonState::Idle));
        assert_eq!(s.state("b"), Some(ButtonState::Selected));
        assert_eq!(s.selected(), Some("b"));

        s.mark_success("b");
        assert_eq!(s.state("b"), Some(ButtonState::Selected));
    }

    #[test]
    fn test_failure_keeps_previous_selection() {
        let mut s = state();
        s.mark_success("a");
        s.mark_failure("c");
        assert_eq!(s.state("a"), Some(ButtonState::Selected));
        assert_eq!(s.state("c"), Some(ButtonState::Failed));
        assert_eq!(s.selected(), Some("a"));
    }

    #[test]
    fn test_unknown_path_registered_on_demand() {
        let mut s = state();
        s.mark_failure("features/extra.geojson");
        assert_eq!(s.state("features/extra.geojson"), Some(ButtonState::Failed));
        assert_eq!(s.paths().count(), 4);
    }

    #[test]
    fn test_tickets() {
        let mut s = state();
        let first = s.begin();
        let second = s.begin();
        assert!(first < second);
        assert!(!s.is_latest(first));
        assert!(s.is_latest(second));
    }

    #[test]
    fn test_background_colours() {
        let palette = ButtonPalette::default();
        assert_eq!(ButtonState::Idle.background(&palette), "transparent");
        assert_eq!(ButtonState::Failed.background(&palette), palette.failed);
    }
}
