// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FormKind, RecordId, TableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    /// Add or edit draft open on the active table.
    Draft,
    Filter,
    Form(FormKind),
    /// Waiting for a yes/no answer to a pending destructive action.
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteRecord(RecordId),
    DeleteColumn(String),
    DiscardDraft,
}

impl PendingAction {
    pub fn prompt(&self, table: TableKind) -> String {
        match self {
            Self::DeleteRecord(id) => format!("delete {} {id}? (y/n)", table.noun()),
            Self::DeleteColumn(key) => {
                format!("delete column `{key}` and its values on every {}? (y/n)", table.noun())
            }
            Self::DiscardDraft => "discard unsaved changes? (y/n)".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_tab: TableKind,
    pub status_line: Option<String>,
    pub pending: Option<PendingAction>,
    resume: AppMode,
}

impl Default for AppState {
    fn default() -> Self {
        Self::starting_at(TableKind::Clients)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    SelectTab(TableKind),
    OpenDraft,
    OpenFilter,
    OpenForm(FormKind),
    ExitToNav,
    RequestConfirm(PendingAction),
    Confirm,
    Decline,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TabChanged(TableKind),
    ConfirmRequested(PendingAction),
    /// The caller performs the action on receipt.
    Confirmed(PendingAction),
    Declined(PendingAction),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn starting_at(tab: TableKind) -> Self {
        Self {
            mode: AppMode::Nav,
            active_tab: tab,
            status_line: None,
            pending: None,
            resume: AppMode::Nav,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::SelectTab(tab) => {
                if self.mode != AppMode::Nav || self.active_tab == tab {
                    return Vec::new();
                }
                self.active_tab = tab;
                vec![AppEvent::TabChanged(tab)]
            }
            AppCommand::OpenDraft => self.enter(AppMode::Draft),
            AppCommand::OpenFilter => self.enter(AppMode::Filter),
            AppCommand::OpenForm(kind) => self.enter(AppMode::Form(kind)),
            AppCommand::ExitToNav => {
                self.pending = None;
                self.enter(AppMode::Nav)
            }
            AppCommand::RequestConfirm(action) => {
                let prompt = action.prompt(self.active_tab);
                if self.mode != AppMode::Confirm {
                    self.resume = self.mode;
                }
                self.mode = AppMode::Confirm;
                self.pending = Some(action.clone());
                vec![
                    AppEvent::ModeChanged(self.mode),
                    AppEvent::ConfirmRequested(action),
                    self.set_status(&prompt),
                ]
            }
            AppCommand::Confirm => {
                let Some(action) = self.pending.take() else {
                    return Vec::new();
                };
                self.mode = AppMode::Nav;
                self.resume = AppMode::Nav;
                self.status_line = None;
                vec![
                    AppEvent::ModeChanged(self.mode),
                    AppEvent::Confirmed(action),
                    AppEvent::StatusCleared,
                ]
            }
            AppCommand::Decline => {
                let Some(action) = self.pending.take() else {
                    return Vec::new();
                };
                self.mode = self.resume;
                self.resume = AppMode::Nav;
                vec![
                    AppEvent::ModeChanged(self.mode),
                    AppEvent::Declined(action),
                    self.set_status("cancelled"),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn enter(&mut self, mode: AppMode) -> Vec<AppEvent> {
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        if self.mode != AppMode::Nav {
            return Vec::new();
        }
        let tabs = TableKind::ALL;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_tab = tabs[next];
        vec![AppEvent::TabChanged(self.active_tab)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppMode, AppState, PendingAction};
    use crate::{FormKind, RecordId, TableKind};

    #[test]
    fn tab_rotation_wraps() {
        let mut state = AppState::starting_at(TableKind::Resources);

        let events = state.dispatch(AppCommand::NextTab);
        assert_eq!(state.active_tab, TableKind::Clients);
        assert_eq!(events, vec![AppEvent::TabChanged(TableKind::Clients)]);

        state.dispatch(AppCommand::PrevTab);
        assert_eq!(state.active_tab, TableKind::Resources);
    }

    #[test]
    fn tabs_stay_put_outside_nav() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::OpenDraft);

        assert!(state.dispatch(AppCommand::NextTab).is_empty());
        assert!(
            state
                .dispatch(AppCommand::SelectTab(TableKind::Agents))
                .is_empty()
        );
        assert_eq!(state.active_tab, TableKind::Clients);
    }

    #[test]
    fn confirm_hands_back_the_pending_action() {
        let mut state = AppState::starting_at(TableKind::Agents);
        let action = PendingAction::DeleteRecord(RecordId::new(4));

        let requested = state.dispatch(AppCommand::RequestConfirm(action.clone()));
        assert_eq!(state.mode, AppMode::Confirm);
        assert_eq!(
            requested,
            vec![
                AppEvent::ModeChanged(AppMode::Confirm),
                AppEvent::ConfirmRequested(action.clone()),
                AppEvent::StatusUpdated("delete agent 4? (y/n)".to_owned()),
            ]
        );

        let confirmed = state.dispatch(AppCommand::Confirm);
        assert!(confirmed.contains(&AppEvent::Confirmed(action)));
        assert_eq!(state.mode, AppMode::Nav);
        assert!(state.pending.is_none());
    }

    #[test]
    fn decline_returns_to_the_interrupted_mode() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::OpenDraft);
        state.dispatch(AppCommand::RequestConfirm(PendingAction::DiscardDraft));

        let declined = state.dispatch(AppCommand::Decline);
        assert_eq!(state.mode, AppMode::Draft);
        assert!(declined.contains(&AppEvent::Declined(PendingAction::DiscardDraft)));
        assert_eq!(state.status_line.as_deref(), Some("cancelled"));

        assert!(state.dispatch(AppCommand::Confirm).is_empty());
    }

    #[test]
    fn mode_transitions() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::OpenFilter);
        assert_eq!(state.mode, AppMode::Filter);

        state.dispatch(AppCommand::OpenForm(FormKind::AddProject));
        assert_eq!(state.mode, AppMode::Form(FormKind::AddProject));

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn column_prompt_names_the_key() {
        let prompt = PendingAction::DeleteColumn("priority".to_owned()).prompt(TableKind::Agents);
        assert!(prompt.contains("`priority`"));
        assert!(prompt.contains("every agent"));
    }
}
