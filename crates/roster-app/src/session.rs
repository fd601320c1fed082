// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::table::Table;
use crate::{CellValue, Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Viewing,
    Editing,
    Adding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Created(RecordId),
    Updated(RecordId),
    /// The add draft had nothing populated; the draft stays open.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Draft {
    #[default]
    None,
    Editing {
        original: Record,
        draft: Record,
    },
    Adding {
        fields: BTreeMap<String, CellValue>,
    },
}

/// At most one in-progress draft per table, either an edit of a committed
/// record or a fresh add.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditSession {
    draft: Draft,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match self.draft {
            Draft::None => SessionState::Viewing,
            Draft::Editing { .. } => SessionState::Editing,
            Draft::Adding { .. } => SessionState::Adding,
        }
    }

    pub fn editing_id(&self) -> Option<RecordId> {
        match &self.draft {
            Draft::Editing { original, .. } => Some(original.id),
            Draft::None | Draft::Adding { .. } => None,
        }
    }

    /// True when the draft holds input that would be lost by discarding it.
    pub fn is_dirty(&self) -> bool {
        match &self.draft {
            Draft::None => false,
            Draft::Editing { original, draft } => original != draft,
            Draft::Adding { fields } => fields.values().any(CellValue::is_populated),
        }
    }

    pub fn field(&self, key: &str) -> Option<&CellValue> {
        match &self.draft {
            Draft::None => None,
            Draft::Editing { draft, .. } => draft.get(key),
            Draft::Adding { fields } => fields.get(key),
        }
    }

    pub fn begin_edit(&mut self, table: &Table, id: RecordId) -> Result<()> {
        self.guard_unsaved()?;
        let Some(record) = table.record(id) else {
            bail!("{} {id} no longer exists", table.kind().noun());
        };
        let mut draft = record.clone();
        for column in table.columns() {
            draft
                .fields
                .entry(column.key.clone())
                .or_insert_with(|| column.default_value());
        }
        self.draft = Draft::Editing {
            original: draft.clone(),
            draft,
        };
        debug!(table = table.kind().as_str(), %id, "edit started");
        Ok(())
    }

    pub fn begin_add(&mut self, table: &Table) -> Result<()> {
        self.guard_unsaved()?;
        self.draft = Draft::Adding {
            fields: table.blank_fields(),
        };
        debug!(table = table.kind().as_str(), "add started");
        Ok(())
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: CellValue) -> Result<()> {
        match &mut self.draft {
            Draft::None => bail!("no draft is open -- press e to edit or a to add"),
            Draft::Editing { draft, .. } => draft.set(key, value),
            Draft::Adding { fields } => {
                fields.insert(key.into(), value);
            }
        }
        Ok(())
    }

    /// Forgets a field whose column was deleted while the draft was open.
    pub fn drop_field(&mut self, key: &str) {
        match &mut self.draft {
            Draft::None => {}
            Draft::Editing { original, draft } => {
                original.remove(key);
                draft.remove(key);
            }
            Draft::Adding { fields } => {
                fields.remove(key);
            }
        }
    }

    /// Closes an edit whose record has just been deleted.
    pub fn forget_record(&mut self, id: RecordId) {
        if self.editing_id() == Some(id) {
            self.draft = Draft::None;
        }
    }

    pub fn commit(&mut self, table: &mut Table, now: OffsetDateTime) -> Result<CommitOutcome> {
        let outcome = match &self.draft {
            Draft::None => bail!("no draft is open -- nothing to save"),
            Draft::Editing { draft, .. } => {
                table.update(draft)?;
                CommitOutcome::Updated(draft.id)
            }
            Draft::Adding { fields } => match table.create(fields, now) {
                Some(id) => CommitOutcome::Created(id),
                None => return Ok(CommitOutcome::Rejected),
            },
        };
        self.draft = Draft::None;
        debug!(table = table.kind().as_str(), ?outcome, "draft committed");
        Ok(outcome)
    }

    pub fn cancel(&mut self) {
        self.draft = Draft::None;
    }

    fn guard_unsaved(&self) -> Result<()> {
        if self.is_dirty() {
            bail!("unsaved draft is open -- save or discard it first");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CommitOutcome, EditSession, SessionState};
    use crate::forms::ColumnFormInput;
    use crate::table::Table;
    use crate::{CellValue, ColumnType, TableKind};
    use anyhow::Result;
    use time::macros::datetime;

    #[test]
    fn edit_commit_replaces_committed_record() -> Result<()> {
        let mut table = Table::with_defaults(TableKind::Agents);
        let id = table.records()[3].id;
        let mut session = EditSession::new();

        session.begin_edit(&table, id)?;
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.editing_id(), Some(id));

        session.set_field("demoReady", CellValue::Bool(true))?;
        session.set_field("estimatedTimeline", CellValue::text("Ready"))?;
        assert_eq!(table.records()[3].flag("demoReady"), false);

        let outcome = session.commit(&mut table, datetime!(2025-01-01 00:00:00 UTC))?;
        assert_eq!(outcome, CommitOutcome::Updated(id));
        assert_eq!(session.state(), SessionState::Viewing);
        assert!(table.records()[3].flag("demoReady"));
        assert_eq!(table.records()[3].text("estimatedTimeline"), "Ready");
        Ok(())
    }

    #[test]
    fn cancel_discards_without_mutation() -> Result<()> {
        let table = Table::with_defaults(TableKind::Clients);
        let id = table.records()[0].id;
        let mut session = EditSession::new();

        session.begin_edit(&table, id)?;
        session.set_field("clientName", CellValue::text("Changed"))?;
        session.cancel();

        assert_eq!(session.state(), SessionState::Viewing);
        assert_eq!(table.records()[0].text("clientName"), "ADIB");
        Ok(())
    }

    #[test]
    fn add_commit_creates_and_rejection_keeps_draft_open() -> Result<()> {
        let mut table = Table::with_defaults(TableKind::Clients);
        let now = datetime!(2024-09-01 00:00:00 UTC);
        let mut session = EditSession::new();

        session.begin_add(&table)?;
        assert_eq!(session.state(), SessionState::Adding);
        assert_eq!(session.commit(&mut table, now)?, CommitOutcome::Rejected);
        assert_eq!(session.state(), SessionState::Adding);
        assert_eq!(table.len(), 1);

        session.set_field("clientName", CellValue::text("Acme"))?;
        let CommitOutcome::Created(id) = session.commit(&mut table, now)? else {
            panic!("expected a created record");
        };
        assert_eq!(table.len(), 2);
        assert_eq!(table.record(id).map(|r| r.text("clientName")), Some("Acme"));
        Ok(())
    }

    #[test]
    fn modified_draft_blocks_starting_another() -> Result<()> {
        let table = Table::with_defaults(TableKind::Agents);
        let first = table.records()[0].id;
        let second = table.records()[1].id;
        let mut session = EditSession::new();

        session.begin_edit(&table, first)?;
        session.begin_edit(&table, second)?;
        assert_eq!(session.editing_id(), Some(second));

        session.set_field("agentName", CellValue::text("Renamed"))?;
        let error = session
            .begin_edit(&table, first)
            .expect_err("dirty draft must be resolved first");
        assert!(error.to_string().contains("save or discard"));
        assert!(session.begin_add(&table).is_err());
        assert_eq!(session.editing_id(), Some(second));

        session.cancel();
        session.begin_edit(&table, first)?;
        assert_eq!(session.editing_id(), Some(first));
        Ok(())
    }

    #[test]
    fn edit_draft_includes_columns_added_after_the_record() -> Result<()> {
        let mut table = Table::with_defaults(TableKind::Clients);
        let id = table.records()[0].id;
        let mut record = table.records()[0].clone();
        table.add_column(&ColumnFormInput::new("Urgent", ColumnType::Boolean))?;
        record.remove("urgent");
        table.update(&record)?;

        let mut session = EditSession::new();
        session.begin_edit(&table, id)?;
        assert_eq!(session.field("urgent"), Some(&CellValue::Bool(false)));
        assert!(!session.is_dirty());
        Ok(())
    }

    #[test]
    fn deleting_the_edited_record_closes_the_draft() -> Result<()> {
        let mut table = Table::with_defaults(TableKind::Agents);
        let id = table.records()[0].id;
        let mut session = EditSession::new();
        session.begin_edit(&table, id)?;

        table.delete_record(id)?;
        session.forget_record(id);
        assert_eq!(session.state(), SessionState::Viewing);
        Ok(())
    }

    #[test]
    fn set_field_without_draft_fails() {
        let mut session = EditSession::new();
        assert!(session.set_field("x", CellValue::text("y")).is_err());
    }
}
