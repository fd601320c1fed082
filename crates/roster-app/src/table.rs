// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::defaults;
use crate::filter::ColumnGroup;
use crate::forms::{ColumnFormInput, RenameColumnInput};
use crate::{CellValue, ColumnDef, ColumnType, CreatePolicy, Record, RecordId, TableKind};

/// One dashboard table: the ordered record store and its column registry.
///
/// Every mutation bumps the revision counter of the collection it touched so
/// the persistence layer can tell which payloads need to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    kind: TableKind,
    columns: Vec<ColumnDef>,
    records: Vec<Record>,
    derived_option_keys: Vec<String>,
    groups: Vec<ColumnGroup>,
    create_policy: CreatePolicy,
    records_revision: u64,
    columns_revision: u64,
}

impl Table {
    /// Groups and derived-option keys are taken from the table kind, narrowed
    /// to the columns actually present in the registry.
    pub fn new(kind: TableKind, columns: Vec<ColumnDef>, records: Vec<Record>) -> Self {
        let registered = |key: &str| columns.iter().any(|column| column.key == key);
        let derived_option_keys = defaults::derived_option_keys(kind)
            .iter()
            .filter(|key| registered(**key))
            .map(|key| (*key).to_owned())
            .collect();
        let mut groups = defaults::column_groups(kind);
        for group in &mut groups {
            group.members.retain(|member| registered(member.as_str()));
        }
        groups.retain(|group| !group.members.is_empty());

        Self {
            kind,
            columns,
            records,
            derived_option_keys,
            groups,
            create_policy: CreatePolicy::AnyField,
            records_revision: 0,
            columns_revision: 0,
        }
    }

    pub fn with_defaults(kind: TableKind) -> Self {
        Self::new(
            kind,
            defaults::default_columns(kind),
            defaults::default_records(kind),
        )
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    pub fn group(&self, key: &str) -> Option<&ColumnGroup> {
        self.groups.iter().find(|group| group.key == key)
    }

    pub fn create_policy(&self) -> &CreatePolicy {
        &self.create_policy
    }

    pub fn set_create_policy(&mut self, policy: CreatePolicy) {
        self.create_policy = policy;
    }

    pub fn records_revision(&self) -> u64 {
        self.records_revision
    }

    pub fn columns_revision(&self) -> u64 {
        self.columns_revision
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.key == key)
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Value of `key` on `record`, falling back to the column's default when
    /// the record predates the column.
    pub fn value(&self, record: &Record, key: &str) -> CellValue {
        if let Some(value) = record.get(key) {
            return value.clone();
        }
        self.column(key)
            .map(ColumnDef::default_value)
            .unwrap_or_else(|| CellValue::text(""))
    }

    pub fn has_derived_options(&self, key: &str) -> bool {
        self.derived_option_keys.iter().any(|derived| derived == key)
    }

    /// Choices offered for a select column. Derived columns, and select
    /// columns with no registered options, collect the distinct non-empty
    /// values present on records in first-seen order.
    pub fn select_options(&self, key: &str) -> Vec<String> {
        let registered = self
            .column(key)
            .map(|column| column.options.clone())
            .unwrap_or_default();
        if !self.has_derived_options(key) && !registered.is_empty() {
            return registered;
        }

        let mut seen = Vec::<String>::new();
        for record in &self.records {
            let value = record.text(key).trim();
            if !value.is_empty() && !seen.iter().any(|known| known == value) {
                seen.push(value.to_owned());
            }
        }
        seen
    }

    /// Registry keys mapped to their type defaults; the starting point of an
    /// add draft.
    pub fn blank_fields(&self) -> BTreeMap<String, CellValue> {
        self.columns
            .iter()
            .map(|column| (column.key.clone(), column.default_value()))
            .collect()
    }

    /// Appends a record built from `values`. Returns `None` without touching
    /// the store when the create policy rejects the input.
    pub fn create(
        &mut self,
        values: &BTreeMap<String, CellValue>,
        now: OffsetDateTime,
    ) -> Option<RecordId> {
        let mut fields = self.blank_fields();
        for (key, value) in values {
            if let Some(slot) = fields.get_mut(key) {
                *slot = value.clone();
            }
        }
        if !self.create_policy.admits(&fields) {
            debug!(table = self.kind.as_str(), "create rejected by policy");
            return None;
        }

        let id = RecordId::generate(now, self.records.iter().map(|record| record.id));
        self.records.push(Record { id, fields });
        self.records_revision += 1;
        debug!(table = self.kind.as_str(), %id, "record created");
        Some(id)
    }

    /// Commits `draft` over the stored record with the same id. Fields the
    /// draft does not carry keep their stored value (or the column default),
    /// and keys that are no longer registered are dropped.
    pub fn update(&mut self, draft: &Record) -> Result<()> {
        let blank = self.blank_fields();
        let Some(record) = self.records.iter_mut().find(|record| record.id == draft.id) else {
            bail!(
                "{} {} no longer exists -- reload and retry",
                self.kind.noun(),
                draft.id
            );
        };

        let mut merged = blank;
        for (key, slot) in &mut merged {
            if let Some(value) = draft.get(key).or_else(|| record.get(key)) {
                *slot = value.clone();
            }
        }
        record.fields = merged;
        self.records_revision += 1;
        debug!(table = self.kind.as_str(), id = %draft.id, "record updated");
        Ok(())
    }

    pub fn delete_record(&mut self, id: RecordId) -> Result<Record> {
        let position = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| anyhow!("{} {id} no longer exists", self.kind.noun()))?;
        let removed = self.records.remove(position);
        self.records_revision += 1;
        debug!(table = self.kind.as_str(), %id, "record deleted");
        Ok(removed)
    }

    /// Strips `key` from every record; returns how many records carried it.
    pub fn remove_field(&mut self, key: &str) -> usize {
        let removed = self
            .records
            .iter_mut()
            .filter_map(|record| record.remove(key))
            .count();
        if removed > 0 {
            self.records_revision += 1;
        }
        removed
    }

    /// Registers a new column and back-fills every record with its default.
    /// Returns the derived key.
    pub fn add_column(&mut self, input: &ColumnFormInput) -> Result<String> {
        input.validate()?;
        let key = input.key();
        if self.column(&key).is_some() {
            bail!("column key `{key}` already exists -- choose a different label");
        }

        let column = ColumnDef::new(key.clone(), input.label.trim(), input.column_type);
        let default = column.default_value();
        for record in &mut self.records {
            record.set(key.clone(), default.clone());
        }
        self.columns.push(column);
        self.columns_revision += 1;
        if !self.records.is_empty() {
            self.records_revision += 1;
        }
        debug!(table = self.kind.as_str(), key = %key, "column added");
        Ok(key)
    }

    pub fn rename_column(&mut self, input: &RenameColumnInput) -> Result<()> {
        input.validate()?;
        let column = self
            .columns
            .iter_mut()
            .find(|column| column.key == input.key)
            .ok_or_else(|| anyhow!("column `{}` does not exist", input.key))?;
        column.label = input.label.trim().to_owned();
        self.columns_revision += 1;
        Ok(())
    }

    /// Removes the column definition and the field from every record.
    pub fn delete_column(&mut self, key: &str) -> Result<ColumnDef> {
        let position = self
            .columns
            .iter()
            .position(|column| column.key == key)
            .ok_or_else(|| anyhow!("column `{key}` does not exist"))?;
        let removed = self.columns.remove(position);
        self.columns_revision += 1;
        self.remove_field(key);
        self.derived_option_keys.retain(|derived| derived != key);
        for group in &mut self.groups {
            group.members.retain(|member| member != key);
        }
        self.groups.retain(|group| !group.members.is_empty());
        debug!(table = self.kind.as_str(), key, "column deleted");
        Ok(removed)
    }

    /// Appends `option` to a select column. Returns `false` when it was
    /// already offered.
    pub fn add_option(&mut self, key: &str, option: &str) -> Result<bool> {
        let option = option.trim();
        if option.is_empty() {
            bail!("option is required -- enter a value and retry");
        }
        if self.has_derived_options(key) {
            bail!("options for `{key}` come from existing records -- set the value on a row instead");
        }
        let column = self
            .columns
            .iter_mut()
            .find(|column| column.key == key)
            .ok_or_else(|| anyhow!("column `{key}` does not exist"))?;
        if column.column_type != ColumnType::Select {
            bail!("column `{key}` is not a select column");
        }
        if column.options.iter().any(|known| known == option) {
            return Ok(false);
        }
        column.options.push(option.to_owned());
        self.columns_revision += 1;
        Ok(true)
    }

    /// Appends `option` to every select member of a column group. Returns the
    /// number of columns that gained it.
    pub fn add_group_option(&mut self, group_key: &str, option: &str) -> Result<usize> {
        let members = self
            .group(group_key)
            .map(|group| group.members.clone())
            .ok_or_else(|| anyhow!("{} table has no `{group_key}` group", self.kind.noun()))?;
        if option.trim().is_empty() {
            bail!("option is required -- enter a value and retry");
        }
        for member in &members {
            match self.column(member) {
                Some(column) if column.column_type == ColumnType::Select => {}
                Some(_) => bail!("column `{member}` is not a select column"),
                None => bail!("column `{member}` does not exist"),
            }
            if self.has_derived_options(member) {
                bail!("options for `{member}` come from existing records");
            }
        }

        let mut added = 0;
        for member in members {
            if self.add_option(&member, option)? {
                added += 1;
            }
        }
        Ok(added)
    }
}
