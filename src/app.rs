use time::{Date, OffsetDateTime};
use time::macros::format_description;

use crate::domain::task::{Task, TaskId};
use crate::store::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    EditingText,
    EditingDue,
    Detail,
}

/// Transient UI state over the injected task store. Adding a task runs in
/// two steps: the text line, then an optional due-date line.
pub struct App {
    store: TaskStore,
    pub selected: usize,
    pub mode: Mode,
    pub input: String,
    draft: String,
    pub status: Option<String>,
}

impl App {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            selected: 0,
            mode: Mode::Normal,
            input: String::new(),
            draft: String::new(),
            status: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks().get(self.selected)
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.selected_task().map(|t| t.id.clone())
    }

    pub fn select_next(&mut self) {
        if !self.tasks().is_empty() {
            self.selected = (self.selected + 1).min(self.tasks().len() - 1);
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.store.toggle_complete(id);
            self.set_status("Toggled completion");
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.store.remove(id);
            if self.selected >= self.tasks().len() && self.selected > 0 {
                self.selected -= 1;
            }
            self.set_status("Deleted");
        }
    }

    pub fn begin_add(&mut self) {
        self.mode = Mode::EditingText;
        self.input.clear();
        self.set_status("Type new task and press Enter");
    }

    /// First step of the add flow: accept the text and move on to the due
    /// prompt. Blank text keeps the prompt open.
    pub fn submit_text(&mut self) {
        if self.input.trim().is_empty() {
            self.set_status("Cannot add an empty task");
            return;
        }
        self.draft = self.input.trim().to_owned();
        self.input.clear();
        self.mode = Mode::EditingDue;
        self.set_status("Due date YYYY-MM-DD, or Enter to skip");
    }

    /// Second step: an empty line means no due date, anything else must be
    /// a plain YYYY-MM-DD day, taken as midnight UTC.
    pub fn submit_due(&mut self) {
        let raw = self.input.trim();
        let due = if raw.is_empty() {
            None
        } else if let Some(due) = parse_due_date(raw) {
            Some(due)
        } else {
            self.set_status("Could not read that date; use YYYY-MM-DD");
            return;
        };

        match self.store.add(&self.draft, due) {
            Some(_ticket) => {
                // The ticket is dropped: the UI never waits on a save.
                self.selected = self.tasks().len() - 1;
                self.set_status("Added");
            }
            None => self.set_status("Cannot add an empty task"),
        }
        self.input.clear();
        self.draft.clear();
        self.mode = Mode::Normal;
    }

    pub fn cancel_add(&mut self) {
        self.input.clear();
        self.draft.clear();
        self.mode = Mode::Normal;
        self.set_status("Canceled");
    }

    pub fn open_detail(&mut self) {
        if self.selected_task().is_some() {
            self.mode = Mode::Detail;
        }
    }

    pub fn close_detail(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status = Some(msg.to_string());
    }
}

fn parse_due_date(raw: &str) -> Option<OffsetDateTime> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .ok()
        .map(|day| day.midnight().assume_utc())
}
