// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{ColumnType, ID_KEY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFormInput {
    pub label: String,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameColumnInput {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFormInput {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    AddColumn,
    RenameColumn,
    AddProject,
}

impl FormKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::AddColumn => "add column",
            Self::RenameColumn => "rename column",
            Self::AddProject => "add project",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    AddColumn(ColumnFormInput),
    RenameColumn(RenameColumnInput),
    AddProject(ProjectFormInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::AddColumn(_) => FormKind::AddColumn,
            Self::RenameColumn(_) => FormKind::RenameColumn,
            Self::AddProject(_) => FormKind::AddProject,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AddColumn(column) => column.validate(),
            Self::RenameColumn(rename) => rename.validate(),
            Self::AddProject(project) => project.validate(),
        }
    }
}

impl ColumnFormInput {
    pub fn new(label: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            label: label.into(),
            column_type,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            bail!("column label is required -- enter a label and retry");
        }
        if derive_column_key(&self.label) == ID_KEY {
            bail!("column key `{ID_KEY}` is reserved -- choose a different label");
        }
        Ok(())
    }

    pub fn key(&self) -> String {
        derive_column_key(&self.label)
    }
}

impl RenameColumnInput {
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            bail!("column label is required -- enter a label and retry");
        }
        Ok(())
    }
}

impl ProjectFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("project name is required -- enter a name and retry");
        }
        Ok(())
    }
}

/// Column key for a user-supplied label: trimmed, lowercased, and with each
/// whitespace run collapsed to `_`.
pub fn derive_column_key(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
