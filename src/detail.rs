use crossterm::event::{KeyCode, KeyEvent};

use crate::error::FleetError;
use crate::model::{Service, Task};

/// What the detail screen asks of the controller.
#[derive(Clone, Debug, PartialEq)]
pub enum DetailAction {
    None,
    Back,
    Refresh,
    Shell(Task),
    Deploy,
    Logs,
    Traffic,
}

#[derive(Clone, Debug)]
pub struct DetailState {
    pub session: u64,
    pub service: Service,
    pub tasks: Vec<Task>,
    pub task_cursor: usize,
    pub loading: bool,
    pub error: Option<String>,
}

impl DetailState {
    pub fn new(session: u64, service: Service) -> Self {
        Self {
            session,
            service,
            tasks: Vec::new(),
            task_cursor: 0,
            loading: true,
            error: None,
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.get(self.task_cursor)
    }

    pub fn tasks_loaded(&mut self, result: Result<Vec<Task>, FleetError>) {
        self.loading = false;
        match result {
            Err(e) => self.error = Some(e.to_string()),
            Ok(tasks) => {
                self.tasks = tasks;
                self.task_cursor = 0;
                self.error = None;
            }
        }
    }

    /// Apply a manual refresh: the re-described service (if still present)
    /// and its current tasks.
    pub fn refreshed(&mut self, result: Result<(Option<Service>, Vec<Task>), FleetError>) {
        self.loading = false;
        match result {
            Err(e) => self.error = Some(e.to_string()),
            Ok((service, tasks)) => {
                if let Some(service) = service {
                    self.service = service;
                }
                self.tasks = tasks;
                self.task_cursor = self.task_cursor.min(self.tasks.len().saturating_sub(1));
                self.error = None;
            }
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> DetailAction {
        match key.code {
            KeyCode::Esc => DetailAction::Back,
            KeyCode::Up | KeyCode::Char('k') => {
                self.task_cursor = self.task_cursor.saturating_sub(1);
                DetailAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.task_cursor + 1 < self.tasks.len() {
                    self.task_cursor += 1;
                }
                DetailAction::None
            }
            KeyCode::Char('s') => match self.selected_task() {
                Some(task) => DetailAction::Shell(task.clone()),
                None => DetailAction::None,
            },
            KeyCode::Char('d') => DetailAction::Deploy,
            KeyCode::Char('l') => DetailAction::Logs,
            KeyCode::Char('t') => DetailAction::Traffic,
            KeyCode::Char('r') => {
                self.loading = true;
                self.error = None;
                DetailAction::Refresh
            }
            _ => DetailAction::None,
        }
    }
}
