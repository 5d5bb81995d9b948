//! deployment.toml editing for the newer product generation.
//!
//! The document is held as a format-preserving [`toml_edit::DocumentMut`]:
//! untouched keys, comments and key order survive the round trip.
//! Mutations are deep merges at dotted key paths; keys are created on
//! demand, so there is no not-found case on this path.
//!
//! TOML has no in-document audit comment equivalent to the XML trail, so
//! every mutation also appends one marker line to a `*.changes` side-log
//! next to the document.

use anyhow::{bail, Context, Result};
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use toml_edit::{ArrayOfTables, DocumentMut, Item, Table};

use super::MARKER;

/// A parsed deployment.toml plus the change lines accrued against it.
#[derive(Debug)]
pub struct TomlDocument {
    doc: DocumentMut,
    path: PathBuf,
    changes: Vec<String>,
}

/// Parse a TOML artifact from disk.
pub fn parse_toml(path: &Path) -> Result<TomlDocument> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading TOML artifact '{}'", path.display()))?;
    let doc: DocumentMut = raw
        .parse()
        .with_context(|| format!("parsing TOML artifact '{}'", path.display()))?;
    Ok(TomlDocument {
        doc,
        path: path.to_path_buf(),
        changes: Vec::new(),
    })
}

fn ensure_table<'a>(table: &'a mut Table, key: &str, dotted: &str) -> Result<&'a mut Table> {
    let item = table.entry(key).or_insert_with(|| {
        let mut t = Table::new();
        t.set_implicit(true);
        Item::Table(t)
    });
    match item {
        Item::Table(t) => Ok(t),
        _ => bail!("key '{}' along '{}' is not a table", key, dotted),
    }
}

fn deep_merge(dst: &mut Table, src: &Table) {
    for (key, item) in src.iter() {
        match (dst.get_mut(key), item) {
            (Some(Item::Table(existing)), Item::Table(incoming)) => deep_merge(existing, incoming),
            _ => {
                dst.insert(key, item.clone());
            }
        }
    }
}

impl TomlDocument {
    /// Deep-merge a value or table at a dotted key path, creating
    /// intermediate tables on demand.
    pub fn merge_value(&mut self, dotted: &str, item: Item, desc: &str) -> Result<()> {
        let segments: Vec<&str> = dotted.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            bail!("empty TOML key path");
        };
        let mut table = self.doc.as_table_mut();
        for segment in parents {
            table = ensure_table(table, segment, dotted)?;
        }
        match item {
            Item::Table(incoming) => {
                let dst = ensure_table(table, last, dotted)?;
                dst.set_implicit(false);
                deep_merge(dst, &incoming);
            }
            other => {
                table.insert(last, other);
            }
        }
        self.changes.push(format!("{}{} ({})", MARKER, desc, dotted));
        Ok(())
    }

    /// Append a table to an array-of-tables key, e.g. one gateway
    /// environment entry.
    pub fn push_array_table(&mut self, dotted: &str, entry: Table, desc: &str) -> Result<()> {
        let segments: Vec<&str> = dotted.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            bail!("empty TOML key path");
        };
        let mut table = self.doc.as_table_mut();
        for segment in parents {
            table = ensure_table(table, segment, dotted)?;
        }
        let item = table
            .entry(last)
            .or_insert_with(|| Item::ArrayOfTables(ArrayOfTables::new()));
        match item {
            Item::ArrayOfTables(array) => array.push(entry),
            _ => bail!("key '{}' is not an array of tables", dotted),
        }
        self.changes.push(format!("{}{} ({})", MARKER, desc, dotted));
        Ok(())
    }

    /// Serialize without writing, for inspection.
    pub fn serialize(&self) -> String {
        self.doc.to_string()
    }

    /// Write the document back and append the accrued change lines to
    /// the side-log.
    pub fn write(&self) -> Result<()> {
        fs::write(&self.path, self.doc.to_string())
            .with_context(|| format!("writing TOML artifact '{}'", self.path.display()))?;
        if self.changes.is_empty() {
            return Ok(());
        }
        let log_path = change_log_path(&self.path);
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("opening change log '{}'", log_path.display()))?;
        for line in &self.changes {
            writeln!(log, "{}", line)
                .with_context(|| format!("appending to change log '{}'", log_path.display()))?;
        }
        Ok(())
    }
}

/// Side-log path for a TOML artifact: `deployment.toml` →
/// `deployment.toml.changes`.
pub fn change_log_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".changes");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use toml_edit::value;

    const SAMPLE: &str = r#"# product deployment descriptor
[server]
hostname = "localhost"
node_ip = "127.0.0.1"

[super_admin]
username = "admin"
password = "admin"
"#;

    fn sample_doc(temp: &TempDir) -> TomlDocument {
        let path = temp.path().join("deployment.toml");
        fs::write(&path, SAMPLE).unwrap();
        parse_toml(&path).unwrap()
    }

    #[test]
    fn merge_scalar_creates_nested_key_and_preserves_rest() {
        let temp = TempDir::new().unwrap();
        let mut doc = sample_doc(&temp);
        doc.merge_value("server.offset", value(3), "port offset 3").unwrap();

        let out = doc.serialize();
        assert!(out.contains("offset = 3"));
        // untouched keys and the stock comment survive
        assert!(out.contains("# product deployment descriptor"));
        assert!(out.contains("hostname = \"localhost\""));
        assert!(out.contains("[super_admin]"));
    }

    #[test]
    fn merge_table_deep_merges_into_existing_table() {
        let temp = TempDir::new().unwrap();
        let mut doc = sample_doc(&temp);

        let mut ds = Table::new();
        ds.insert("type", value("mysql"));
        ds.insert("url", value("jdbc:mysql://db:3306/apim"));
        doc.merge_value("database.apim_db", Item::Table(ds), "datasource added")
            .unwrap();

        let mut more = Table::new();
        more.insert("username", value("wso2"));
        doc.merge_value("database.apim_db", Item::Table(more), "credentials added")
            .unwrap();

        let out = doc.serialize();
        assert!(out.contains("[database.apim_db]"));
        assert!(out.contains("type = \"mysql\""));
        assert!(out.contains("username = \"wso2\""));
    }

    #[test]
    fn push_array_table_appends_entries_in_order() {
        let temp = TempDir::new().unwrap();
        let mut doc = sample_doc(&temp);

        let mut first = Table::new();
        first.insert("name", value("Production"));
        let mut second = Table::new();
        second.insert("name", value("Staging"));
        doc.push_array_table("apim.gateway.environment", first, "environment added")
            .unwrap();
        doc.push_array_table("apim.gateway.environment", second, "environment added")
            .unwrap();

        let out = doc.serialize();
        let prod = out.find("name = \"Production\"").unwrap();
        let staging = out.find("name = \"Staging\"").unwrap();
        assert!(out.contains("[[apim.gateway.environment]]"));
        assert!(prod < staging);
    }

    #[test]
    fn write_emits_side_log_with_marker_lines() {
        let temp = TempDir::new().unwrap();
        let mut doc = sample_doc(&temp);
        doc.merge_value("server.offset", value(2), "port offset 2").unwrap();
        doc.write().unwrap();

        let log = fs::read_to_string(temp.path().join("deployment.toml.changes")).unwrap();
        assert!(log.contains("HYDROGENERATED: port offset 2 (server.offset)"));
    }

    #[test]
    fn untouched_document_round_trips_verbatim() {
        let temp = TempDir::new().unwrap();
        let doc = sample_doc(&temp);
        assert_eq!(doc.serialize(), SAMPLE);
    }
}
