// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use roster_app::defaults;
use roster_app::{ColumnDef, Record, Table, TableKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::StoragePort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    pub records_written: bool,
    pub columns_written: bool,
}

impl SyncOutcome {
    pub fn wrote_anything(self) -> bool {
        self.records_written || self.columns_written
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Revisions {
    records: u64,
    columns: u64,
}

/// Mirrors tables into a [`StoragePort`]: hydrates them on load and writes a
/// full snapshot of whichever collection changed since the last sync.
pub struct PersistenceBridge<S> {
    storage: S,
    synced: BTreeMap<TableKind, Revisions>,
}

impl<S: StoragePort> PersistenceBridge<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            synced: BTreeMap::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Loads one table. A missing or unreadable payload falls back to the
    /// seed dataset, which is written back over the bad entry.
    pub fn hydrate(&mut self, kind: TableKind) -> Result<Table> {
        let columns = self.load_or_seed::<Vec<ColumnDef>>(kind.columns_key(), || {
            defaults::default_columns(kind)
        })?;
        let records = self.load_or_seed::<Vec<Record>>(kind.records_key(), || {
            defaults::default_records(kind)
        })?;
        info!(
            table = kind.as_str(),
            records = records.len(),
            columns = columns.len(),
            "table hydrated"
        );

        let table = Table::new(kind, columns, records);
        self.mark_synced(&table);
        Ok(table)
    }

    /// Writes the collections of `table` whose revision moved since the last
    /// hydrate or sync.
    pub fn sync(&mut self, table: &Table) -> Result<SyncOutcome> {
        let kind = table.kind();
        let last = self.synced.get(&kind).copied();
        let mut outcome = SyncOutcome::default();

        if last.is_none_or(|seen| seen.columns != table.columns_revision()) {
            self.write_json(kind.columns_key(), table.columns())?;
            outcome.columns_written = true;
        }
        if last.is_none_or(|seen| seen.records != table.records_revision()) {
            self.write_json(kind.records_key(), table.records())?;
            outcome.records_written = true;
        }
        if outcome.wrote_anything() {
            info!(
                table = kind.as_str(),
                records = outcome.records_written,
                columns = outcome.columns_written,
                "table persisted"
            );
        }
        self.mark_synced(table);
        Ok(outcome)
    }

    fn mark_synced(&mut self, table: &Table) {
        self.synced.insert(
            table.kind(),
            Revisions {
                records: table.records_revision(),
                columns: table.columns_revision(),
            },
        );
    }

    fn load_or_seed<T>(&mut self, key: &str, seed: impl FnOnce() -> T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.storage.read(key)? {
            Some(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!(key, %error, "stored payload is unreadable; restoring defaults");
                }
            },
            None => info!(key, "no stored payload; seeding defaults"),
        }

        let value = seed();
        self.write_json(key, &value)?;
        Ok(value)
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let payload =
            serde_json::to_string(value).with_context(|| format!("serialize payload for {key}"))?;
        self.storage.write(key, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::PersistenceBridge;
    use crate::{MemoryStorage, StoragePort};
    use anyhow::Result;
    use roster_app::{CellValue, ColumnFormInput, ColumnType, TableKind};
    use time::macros::datetime;

    #[test]
    fn first_hydrate_seeds_and_persists_defaults() -> Result<()> {
        let mut bridge = PersistenceBridge::new(MemoryStorage::new());
        let table = bridge.hydrate(TableKind::Agents)?;

        assert_eq!(table.len(), 4);
        assert_eq!(bridge.storage().writes(), 2);
        assert!(bridge.storage().get("roster.agents.records").is_some());
        assert!(bridge.storage().get("roster.agents.columns").is_some());
        Ok(())
    }

    #[test]
    fn corrupt_records_fall_back_and_self_heal() -> Result<()> {
        let storage = MemoryStorage::new().with_entry("roster.clients.records", "{not json");
        let mut bridge = PersistenceBridge::new(storage);

        let table = bridge.hydrate(TableKind::Clients)?;
        assert_eq!(table.records()[0].text("clientName"), "ADIB");

        let healed = bridge
            .storage()
            .read("roster.clients.records")?
            .unwrap_or_default();
        assert!(healed.starts_with('['));
        assert!(healed.contains("ADIB"));
        Ok(())
    }

    #[test]
    fn sync_writes_only_changed_collections() -> Result<()> {
        let mut bridge = PersistenceBridge::new(MemoryStorage::new());
        let mut table = bridge.hydrate(TableKind::Clients)?;
        let baseline = bridge.storage().writes();

        assert!(!bridge.sync(&table)?.wrote_anything());
        assert_eq!(bridge.storage().writes(), baseline);

        let mut record = table.records()[0].clone();
        record.set("clientName", CellValue::text("ADIB Group"));
        table.update(&record)?;
        let outcome = bridge.sync(&table)?;
        assert!(outcome.records_written);
        assert!(!outcome.columns_written);

        table.rename_column(&roster_app::RenameColumnInput {
            key: "clientName".to_owned(),
            label: "Client".to_owned(),
        })?;
        let outcome = bridge.sync(&table)?;
        assert!(outcome.columns_written);
        assert!(!outcome.records_written);
        Ok(())
    }

    #[test]
    fn persisted_state_round_trips_through_hydrate() -> Result<()> {
        let mut bridge = PersistenceBridge::new(MemoryStorage::new());
        let mut table = bridge.hydrate(TableKind::Agents)?;
        table.add_column(&ColumnFormInput::new("Priority", ColumnType::Boolean))?;
        let mut values = table.blank_fields();
        values.insert("agentName".to_owned(), CellValue::text("Treasury Copilot"));
        table.create(&values, datetime!(2025-03-01 12:00:00 UTC));
        bridge.sync(&table)?;

        let mut reopened = PersistenceBridge::new(bridge.into_storage());
        let restored = reopened.hydrate(TableKind::Agents)?;
        assert_eq!(restored.columns(), table.columns());
        assert_eq!(restored.records(), table.records());
        Ok(())
    }

    #[test]
    fn deleted_project_column_stays_out_of_the_group_after_reload() -> Result<()> {
        let mut bridge = PersistenceBridge::new(MemoryStorage::new());
        let mut table = bridge.hydrate(TableKind::Resources)?;
        table.delete_column("project2")?;
        bridge.sync(&table)?;

        let mut reopened = PersistenceBridge::new(bridge.into_storage());
        let mut restored = reopened.hydrate(TableKind::Resources)?;
        let members = restored
            .group("project")
            .map(|group| group.members.clone())
            .unwrap_or_default();
        assert_eq!(members, vec!["project1", "project3"]);

        assert_eq!(restored.add_group_option("project", "Project Omega")?, 2);
        for key in ["project1", "project3"] {
            assert!(
                restored
                    .select_options(key)
                    .contains(&"Project Omega".to_owned())
            );
        }
        assert!(reopened.sync(&restored)?.columns_written);
        Ok(())
    }
}
