//! Host UI seams: dialogs, the account picker, and open document views.
//!
//! The session never draws anything itself; it asks the host through
//! [`UserInterface`]. Document views are exposed only through the minimal
//! [`DocumentView`] surface needed for the annotation-refresh nudge.

use crate::session::EmulatorState;

/// Column far past any realistic line end, used by the edit nudge so the
/// insert always lands at the end of the last line.
const REFRESH_EDIT_COLUMN: usize = 1000;

/// One option in the account picker. Selections resolve through `target`,
/// never by comparing labels, so duplicate labels stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub label: String,
    /// Registry index of the account this option stands for
    pub target: usize,
}

/// Session state the host renders into its status surface after a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub emulator_state: EmulatorState,
    /// Full label of the active account, if one is set
    pub active_account: Option<String>,
}

/// Everything the session needs from the host editor's UI.
pub trait UserInterface {
    fn show_info(&mut self, message: &str);
    fn show_warning(&mut self, message: &str);
    fn show_error(&mut self, message: &str);

    /// Single-choice picker. Returns the `target` of the chosen item, or
    /// `None` if the picker was dismissed.
    fn pick(&mut self, options: &[PickItem]) -> Option<usize>;

    /// Currently visible document views
    fn visible_documents(&mut self) -> Vec<&mut dyn DocumentView>;

    /// Re-render the host's status surface from the given snapshot
    fn render(&mut self, status: &StatusSnapshot);
}

/// Minimal edit surface over one open document view.
pub trait DocumentView {
    fn line_count(&self) -> usize;

    /// Whether the given line is empty or whitespace-only
    fn is_line_blank(&self, line: usize) -> bool;

    /// Insert text at a line/column position. Columns past the end of the
    /// line clamp to the end; a `"\n"` starts a new line after the insertion
    /// point.
    fn insert(&mut self, line: usize, column: usize, text: &str);

    /// Delete the column range `start_column..end_column` on one line,
    /// clamped to the line length.
    fn delete(&mut self, line: usize, start_column: usize, end_column: usize);

    /// Ask the host to recompute inline annotations for this view. Returns
    /// false if the host has no such notification, in which case the caller
    /// falls back to the edit nudge.
    fn request_refresh(&mut self) -> bool;
}

/// Force every visible view to recompute its inline annotations after the
/// active account changed.
pub fn refresh_document_views(ui: &mut dyn UserInterface) {
    for view in ui.visible_documents() {
        nudge_view(view);
    }
}

/// Refresh a single view. Hosts with an explicit invalidation hook get that;
/// otherwise fall back to a no-op edit that dirties the document: re-insert
/// a space on a blank last line and delete it again, or append one newline
/// when the last line has content. Neither variant changes any existing text.
pub(crate) fn nudge_view(view: &mut dyn DocumentView) {
    if view.request_refresh() {
        return;
    }
    let line_count = view.line_count();
    if line_count == 0 {
        return;
    }
    let last_line = line_count - 1;
    if view.is_line_blank(last_line) {
        view.insert(last_line, 0, " ");
        view.delete(last_line, 0, REFRESH_EDIT_COLUMN);
    } else {
        view.insert(last_line, REFRESH_EDIT_COLUMN, "\n");
    }
}
