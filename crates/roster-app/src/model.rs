// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::Date;
use time::macros::format_description;

use crate::ids::RecordId;

/// Reserved record field holding the identifier.
pub const ID_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Clients,
    Agents,
    Resources,
}

impl TableKind {
    pub const ALL: [Self; 3] = [Self::Clients, Self::Agents, Self::Resources];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Agents => "agents",
            Self::Resources => "resources",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clients" => Some(Self::Clients),
            "agents" => Some(Self::Agents),
            "resources" => Some(Self::Resources),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Clients => "Client Overview",
            Self::Agents => "Agent Tracker",
            Self::Resources => "Resources",
        }
    }

    /// Singular noun used in prompts and status messages.
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Clients => "client",
            Self::Agents => "agent",
            Self::Resources => "resource",
        }
    }

    pub const fn records_key(self) -> &'static str {
        match self {
            Self::Clients => "roster.clients.records",
            Self::Agents => "roster.agents.records",
            Self::Resources => "roster.resources.records",
        }
    }

    pub const fn columns_key(self) -> &'static str {
        match self {
            Self::Clients => "roster.clients.columns",
            Self::Agents => "roster.agents.columns",
            Self::Resources => "roster.resources.columns",
        }
    }

    pub const fn supports_export(self) -> bool {
        matches!(self, Self::Resources)
    }

    pub const fn export_file_name(self) -> &'static str {
        match self {
            Self::Clients => "clients.json",
            Self::Agents => "agents.json",
            Self::Resources => "resources.json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Boolean,
    Textarea,
    Date,
    Select,
}

impl ColumnType {
    pub const ALL: [Self; 5] = [
        Self::Text,
        Self::Boolean,
        Self::Textarea,
        Self::Date,
        Self::Select,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Textarea => "textarea",
            Self::Date => "date",
            Self::Select => "select",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "boolean" => Some(Self::Boolean),
            "textarea" => Some(Self::Textarea),
            "date" => Some(Self::Date),
            "select" => Some(Self::Select),
            _ => None,
        }
    }

    pub fn default_value(self) -> CellValue {
        match self {
            Self::Boolean => CellValue::Bool(false),
            Self::Text | Self::Textarea | Self::Date | Self::Select => {
                CellValue::Text(String::new())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// A value counts as populated when it carries user input: non-blank
    /// text or a set flag.
    pub fn is_populated(&self) -> bool {
        match self {
            Self::Text(value) => !value.trim().is_empty(),
            Self::Bool(value) => *value,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Bool(true) => "yes".to_owned(),
            Self::Bool(false) => "no".to_owned(),
            Self::Text(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            column_type,
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(&self) -> CellValue {
        self.column_type.default_value()
    }
}

/// Flat record: a fixed identifier plus an open set of column values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: CellValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: CellValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<CellValue> {
        self.fields.remove(key)
    }

    /// Text of `key`, empty when absent or not text.
    pub fn text(&self, key: &str) -> &str {
        self.fields
            .get(key)
            .and_then(CellValue::as_text)
            .unwrap_or("")
    }

    pub fn flag(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(CellValue::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePolicy {
    /// At least one registry column must carry a populated value.
    AnyField,
    /// Every listed key must carry a populated value.
    AllOf(Vec<String>),
}

impl CreatePolicy {
    pub fn admits(&self, fields: &BTreeMap<String, CellValue>) -> bool {
        match self {
            Self::AnyField => fields.values().any(CellValue::is_populated),
            Self::AllOf(keys) => keys
                .iter()
                .all(|key| fields.get(key).is_some_and(CellValue::is_populated)),
        }
    }
}

/// Renders a stored `YYYY-MM-DD` value as `Aug 12, 2024`; anything else is
/// shown verbatim.
pub fn display_date(raw: &str) -> String {
    let layout = format_description!("[year]-[month]-[day]");
    let display = format_description!("[month repr:short] [day padding:none], [year]");
    Date::parse(raw.trim(), &layout)
        .ok()
        .and_then(|date| date.format(&display).ok())
        .unwrap_or_else(|| raw.to_owned())
}
