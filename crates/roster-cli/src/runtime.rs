// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use roster_app::{Table, TableKind};
use roster_db::{PersistenceBridge, StoragePort, write_export};
use roster_testkit::DashboardFaker;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::info;

const DEMO_ROWS_PER_TABLE: usize = 12;

pub struct DbRuntime<S> {
    bridge: PersistenceBridge<S>,
    export_dir: PathBuf,
}

impl<S: StoragePort> DbRuntime<S> {
    pub fn new(storage: S, export_dir: PathBuf) -> Self {
        Self {
            bridge: PersistenceBridge::new(storage),
            export_dir,
        }
    }

    /// Hydrates every table so seeding and self-healing happen before the
    /// first frame. Returns the record count per table.
    pub fn check(&mut self) -> Result<Vec<(TableKind, usize)>> {
        let mut counts = Vec::with_capacity(TableKind::ALL.len());
        for kind in TableKind::ALL {
            counts.push((kind, self.bridge.hydrate(kind)?.len()));
        }
        Ok(counts)
    }

    /// Appends generated rows to every table on top of the defaults.
    pub fn seed_demo(&mut self, seed: u64, now: OffsetDateTime) -> Result<()> {
        let mut faker = DashboardFaker::new(seed);
        for kind in TableKind::ALL {
            let mut table = self.bridge.hydrate(kind)?;
            let added = faker.fill(&mut table, DEMO_ROWS_PER_TABLE, now);
            self.bridge.sync(&table)?;
            info!(table = kind.as_str(), rows = added.len(), "demo rows added");
        }
        Ok(())
    }

    pub fn export(&mut self, kind: TableKind, target: Option<PathBuf>) -> Result<PathBuf> {
        let table = self.bridge.hydrate(kind)?;
        let target = target.unwrap_or_else(|| self.export_dir.clone());
        write_export(&table, &target)
    }

    pub fn into_storage(self) -> S {
        self.bridge.into_storage()
    }
}

impl<S: StoragePort> roster_tui::AppRuntime for DbRuntime<S> {
    fn load_table(&mut self, kind: TableKind) -> Result<Table> {
        self.bridge.hydrate(kind)
    }

    fn save_table(&mut self, table: &Table) -> Result<()> {
        self.bridge.sync(table)?;
        Ok(())
    }

    fn export_table(&mut self, table: &Table) -> Result<PathBuf> {
        write_export(table, &self.export_dir)
    }
}
