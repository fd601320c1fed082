// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use tracing::debug;

use crate::table::Table;
use crate::{CellValue, ColumnDef, ColumnType, Record, display_date};

/// Several columns filtered as one: a needle matches when any member
/// contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    pub key: String,
    pub label: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    #[default]
    All,
    Yes,
    No,
}

impl TriState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::All => Self::Yes,
            Self::Yes => Self::No,
            Self::No => Self::All,
        }
    }

    fn admits(self, value: bool) -> bool {
        match self {
            Self::All => true,
            Self::Yes => value,
            Self::No => !value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Case-insensitive substring.
    Contains(String),
    /// Exact match against one of a select column's options.
    Equals(String),
    Flag(TriState),
}

impl FilterValue {
    /// Blank filter of the kind that suits `column`.
    pub fn blank_for(column: &ColumnDef) -> Self {
        match column.column_type {
            ColumnType::Boolean => Self::Flag(TriState::All),
            ColumnType::Select => Self::Equals(String::new()),
            ColumnType::Text | ColumnType::Textarea | ColumnType::Date => {
                Self::Contains(String::new())
            }
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Contains(needle) | Self::Equals(needle) => !needle.is_empty(),
            Self::Flag(state) => *state != TriState::All,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Contains(needle) | Self::Equals(needle) => needle.clone(),
            Self::Flag(state) => state.label().to_owned(),
        }
    }
}

/// Current filter criteria for one table. Keys are column keys or column
/// group keys; an inactive value matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSet {
    global: String,
    values: BTreeMap<String, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &str {
        &self.global
    }

    pub fn set_global(&mut self, needle: impl Into<String>) {
        self.global = needle.into();
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: FilterValue) {
        self.values.insert(key.into(), value);
    }

    pub fn set_contains(&mut self, key: impl Into<String>, needle: impl Into<String>) {
        self.set(key, FilterValue::Contains(needle.into()));
    }

    pub fn set_equals(&mut self, key: impl Into<String>, option: impl Into<String>) {
        self.set(key, FilterValue::Equals(option.into()));
    }

    pub fn set_flag(&mut self, key: impl Into<String>, state: TriState) {
        self.set(key, FilterValue::Flag(state));
    }

    pub fn clear(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn clear_all(&mut self) {
        self.global.clear();
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && !self.values.values().any(FilterValue::is_active)
    }

    pub fn active_count(&self) -> usize {
        usize::from(!self.global.is_empty())
            + self
                .values
                .values()
                .filter(|value| value.is_active())
                .count()
    }

    /// Drops criteria whose column or group no longer exists.
    pub fn retain_known(&mut self, table: &Table) {
        self.values
            .retain(|key, _| table.column(key).is_some() || table.group(key).is_some());
    }

    pub fn matches(&self, table: &Table, record: &Record) -> bool {
        if !self.global.is_empty() && !matches_global(table, record, &self.global) {
            return false;
        }
        self.values
            .iter()
            .filter(|(_, value)| value.is_active())
            .all(|(key, value)| matches_value(table, record, key, value))
    }

    /// Visible subset of `table`, in store order.
    pub fn apply<'a>(&self, table: &'a Table) -> Vec<&'a Record> {
        let visible = table
            .records()
            .iter()
            .filter(|record| self.matches(table, record))
            .collect::<Vec<_>>();
        debug!(
            table = table.kind().as_str(),
            total = table.len(),
            visible = visible.len(),
            "filter applied"
        );
        visible
    }
}

fn matches_value(table: &Table, record: &Record, key: &str, value: &FilterValue) -> bool {
    if let Some(group) = table.group(key) {
        let (FilterValue::Contains(needle) | FilterValue::Equals(needle)) = value else {
            return true;
        };
        let needle = needle.to_lowercase();
        return group
            .members
            .iter()
            .any(|member| contains_ci(record.text(member), &needle));
    }

    let Some(column) = table.column(key) else {
        return true;
    };
    match (value, table.value(record, key)) {
        (FilterValue::Flag(state), CellValue::Bool(flag)) => state.admits(flag),
        (FilterValue::Flag(state), CellValue::Text(_)) => state.admits(false),
        (FilterValue::Contains(needle), cell) => {
            text_matches(column, &cell.display(), &needle.to_lowercase())
        }
        (FilterValue::Equals(option), cell) => cell.display() == *option,
    }
}

fn matches_global(table: &Table, record: &Record, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    table.columns().iter().any(|column| {
        matches!(
            table.value(record, &column.key),
            CellValue::Text(ref text) if text_matches(column, text, &needle)
        )
    })
}

/// Date cells match on both the stored `YYYY-MM-DD` and the rendered form.
fn text_matches(column: &ColumnDef, text: &str, lowered_needle: &str) -> bool {
    contains_ci(text, lowered_needle)
        || (column.column_type == ColumnType::Date
            && contains_ci(&display_date(text), lowered_needle))
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

#[cfg(test)]
mod tests {
    use super::{FilterSet, FilterValue, TriState};
    use crate::forms::ColumnFormInput;
    use crate::table::Table;
    use crate::{CellValue, ColumnDef, ColumnType, TableKind};
    use anyhow::Result;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn clients_with_acme() -> Table {
        let adib = crate::Record::new(crate::RecordId::new(1))
            .with_field("clientName", CellValue::text("ADIB"))
            .with_field("agentsProposed", CellValue::text("CxO Concierge"))
            .with_field("lastMeetingDate", CellValue::text("2024-08-12"));
        let mut table = Table::new(
            TableKind::Clients,
            crate::defaults::default_columns(TableKind::Clients),
            vec![adib],
        );
        let values = BTreeMap::from([
            ("clientName".to_owned(), CellValue::text("Acme")),
            ("agentsProposed".to_owned(), CellValue::text("PFM")),
            ("lastMeetingDate".to_owned(), CellValue::text("2024-09-01")),
        ]);
        table.create(&values, datetime!(2024-09-01 12:00:00 UTC));
        table
    }

    fn names<'a>(records: &[&'a crate::Record], key: &str) -> Vec<&'a str> {
        records.iter().copied().map(|record| record.text(key)).collect()
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let table = Table::with_defaults(TableKind::Resources);
        let filters = FilterSet::new();
        assert!(filters.is_empty());

        let visible = filters.apply(&table);
        let all = table.records().iter().collect::<Vec<_>>();
        assert_eq!(visible, all);
    }

    #[test]
    fn client_name_and_agents_filters_are_case_insensitive() {
        let table = clients_with_acme();

        let mut by_name = FilterSet::new();
        by_name.set_contains("clientName", "ad");
        assert_eq!(names(&by_name.apply(&table), "clientName"), vec!["ADIB"]);

        let mut by_agents = FilterSet::new();
        by_agents.set_contains("agentsProposed", "pfm");
        assert_eq!(names(&by_agents.apply(&table), "clientName"), vec!["Acme"]);
    }

    #[test]
    fn substring_filter_matches_exactly_the_containing_records() {
        let table = Table::with_defaults(TableKind::Resources);
        for needle in ["eng", "ENGINEER", "data", "zzz", "a"] {
            let mut filters = FilterSet::new();
            filters.set_contains("role", needle);
            let visible = filters.apply(&table);
            for record in table.records() {
                let expected = record
                    .text("role")
                    .to_lowercase()
                    .contains(&needle.to_lowercase());
                assert_eq!(
                    visible.iter().any(|shown| shown.id == record.id),
                    expected,
                    "needle {needle:?} record {}",
                    record.text("fullName")
                );
            }
        }
    }

    #[test]
    fn criteria_combine_with_and() {
        let table = Table::with_defaults(TableKind::Resources);
        let mut filters = FilterSet::new();
        filters.set_equals("stream", "Engineering");
        filters.set_contains("role", "data");

        let visible = filters.apply(&table);
        assert!(!visible.is_empty());
        assert!(visible.iter().all(|record| {
            record.text("stream") == "Engineering"
                && record.text("role").to_lowercase().contains("data")
        }));
        assert_eq!(filters.active_count(), 2);
    }

    #[test]
    fn select_filter_requires_exact_option() {
        let table = Table::with_defaults(TableKind::Resources);
        let mut filters = FilterSet::new();
        filters.set_equals("stream", "Engineer");
        assert!(filters.apply(&table).is_empty());
    }

    #[test]
    fn tri_state_boolean_filter() -> Result<()> {
        let mut table = Table::with_defaults(TableKind::Agents);
        table.add_column(&ColumnFormInput::new("Priority", ColumnType::Boolean))?;
        let column = table.column("priority").expect("added").clone();
        assert_eq!(
            FilterValue::blank_for(&column),
            FilterValue::Flag(TriState::All)
        );

        let mut filters = FilterSet::new();
        filters.set_flag("priority", TriState::No);
        assert_eq!(filters.apply(&table).len(), 4);
        filters.set_flag("priority", TriState::Yes);
        assert!(filters.apply(&table).is_empty());

        filters.set_flag("priority", TriState::All);
        filters.set_flag("demoReady", TriState::Yes);
        assert_eq!(
            names(&filters.apply(&table), "agentName"),
            vec![
                "CxO Concierge",
                "Personal Finance Assistant",
                "RM Wealth Assistant"
            ]
        );
        Ok(())
    }

    #[test]
    fn project_group_matches_any_member() -> Result<()> {
        let mut table = Table::with_defaults(TableKind::Resources);
        let mut second = table.records()[1].clone();
        second.set("project3", CellValue::text("Project Beta"));
        table.update(&second)?;

        let mut filters = FilterSet::new();
        filters.set_contains("project", "beta");
        let visible = filters.apply(&table);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, second.id);
        Ok(())
    }

    #[test]
    fn global_filter_searches_every_text_field() {
        let table = Table::with_defaults(TableKind::Agents);
        let mut filters = FilterSet::new();
        filters.set_global("integration");
        assert_eq!(
            names(&filters.apply(&table), "agentName"),
            vec!["CFO Earnings Analyst"]
        );

        filters.set_global("yes");
        assert!(filters.apply(&table).is_empty());
    }

    #[test]
    fn criteria_for_deleted_columns_are_ignored_and_pruned() -> Result<()> {
        let mut table = Table::with_defaults(TableKind::Agents);
        let mut filters = FilterSet::new();
        filters.set_contains("dependencies", "pending");
        assert_eq!(filters.apply(&table).len(), 1);

        table.delete_column("dependencies")?;
        assert_eq!(filters.apply(&table).len(), 4);
        filters.retain_known(&table);
        assert!(filters.get("dependencies").is_none());
        Ok(())
    }

    #[test]
    fn date_columns_filter_by_substring() {
        let columns = vec![ColumnDef::new("met", "Met", ColumnType::Date)];
        let mut table = Table::new(TableKind::Clients, columns, Vec::new());
        let now = datetime!(2024-01-01 00:00:00 UTC);
        for date in ["2024-08-12", "2023-02-01"] {
            table.create(
                &BTreeMap::from([("met".to_owned(), CellValue::text(date))]),
                now,
            );
        }
        let mut filters = FilterSet::new();
        filters.set_contains("met", "2024-");
        assert_eq!(names(&filters.apply(&table), "met"), vec!["2024-08-12"]);
    }

    #[test]
    fn date_columns_also_match_the_rendered_date() {
        let table = clients_with_acme();
        let mut filters = FilterSet::new();
        filters.set_contains("lastMeetingDate", "aug");
        assert_eq!(names(&filters.apply(&table), "clientName"), vec!["ADIB"]);

        filters.set_contains("lastMeetingDate", "sep 1,");
        assert_eq!(names(&filters.apply(&table), "clientName"), vec!["Acme"]);

        let mut global = FilterSet::new();
        global.set_global("aug 12");
        assert_eq!(names(&global.apply(&table), "clientName"), vec!["ADIB"]);
    }
}
