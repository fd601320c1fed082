// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use roster_app::Table;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Pretty-printed JSON array of every record in `table`, in store order.
pub fn export_records_json(table: &Table) -> Result<String> {
    serde_json::to_string_pretty(table.records())
        .with_context(|| format!("serialize {} for export", table.kind().as_str()))
}

/// Writes the export for `table` to `target`. A directory target receives
/// the table's default export file name.
pub fn write_export(table: &Table, target: &Path) -> Result<PathBuf> {
    let kind = table.kind();
    if !kind.supports_export() {
        bail!(
            "{} cannot be exported -- switch to the resources table",
            kind.label()
        );
    }

    let path = if target.is_dir() {
        target.join(kind.export_file_name())
    } else {
        target.to_path_buf()
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create export directory {}", parent.display()))?;
    }

    let json = export_records_json(table)?;
    fs::write(&path, json).with_context(|| format!("write export to {}", path.display()))?;
    info!(table = kind.as_str(), records = table.len(), path = %path.display(), "export written");
    Ok(path)
}
