//! `calibredb` command-line catalog backend.
//!
//! Every operation is one invocation of Calibre's companion tool, pointed at
//! the library with `--library-path`. Listing uses the tool's JSON output
//! (`list --for-machine`); writes use `set_custom` and `set_metadata`.

use crate::backend::Catalog;
use crate::error::{ErrorKind, Result};
use crate::item::{CatalogItem, ItemId, ReadOrder};
use crate::tags;
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::instrument;

/// Name of the executable looked up in `PATH` when none is configured.
pub const EXECUTABLE: &str = "calibredb";

#[derive(Deserialize)]
struct ListedItem {
    id: u64,
    title: String,
    #[serde(default)]
    tags: Vec<String>,
    /// Custom columns are keyed by `*<label>`, and only present when set.
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

/// Catalog backend that shells out to `calibredb`.
#[derive(Debug, Clone)]
pub struct CalibredbCatalog {
    executable: PathBuf,
    library: PathBuf,
    column: String,
}
impl CalibredbCatalog {
    /// Locate `calibredb` and check that the library has the read-order
    /// custom column.
    ///
    /// Without an explicit `executable`, the tool is searched for in `PATH`.
    /// Fails with [`ErrorKind::Configuration`] if the tool cannot be found or
    /// the library has no custom column labelled `column`.
    pub async fn connect(
        executable: Option<PathBuf>,
        library: impl Into<PathBuf>,
        column: impl Into<String>,
    ) -> Result<Self> {
        let executable = match executable {
            Some(path) => path,
            None => Self::discover()?,
        };
        let catalog = Self { executable, library: library.into(), column: column.into() };
        catalog.check_column().await?;
        Ok(catalog)
    }

    fn discover() -> Result<PathBuf> {
        let path = which::which(EXECUTABLE)
            .or_raise(|| ErrorKind::Configuration(format!("`{EXECUTABLE}` not found in PATH")))?;
        tracing::debug!(path = %path.display(), "Discovered calibredb executable");
        Ok(path)
    }

    #[instrument(skip(self), fields(column = %self.column))]
    async fn check_column(&self) -> Result<()> {
        let output = self
            .run(["custom_columns"])
            .await
            .or_raise(|| ErrorKind::Configuration("could not list custom columns".to_string()))?;
        if !custom_column_labels(&output).any(|label| label == self.column) {
            exn::bail!(ErrorKind::Configuration(format!("custom column `{}` not found", self.column)));
        }
        Ok(())
    }

    /// Run `calibredb` with `args` against the configured library, returning
    /// its standard output.
    async fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = args.first().map(|a| a.as_ref().to_string_lossy().into_owned()).unwrap_or_default();
        let output = Command::new(&self.executable)
            .args(&args)
            .arg(format!("--library-path={}", self.library.display()))
            .output()
            .await
            .or_raise(|| ErrorKind::Access(format!("could not run {}", self.executable.display())))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(command = %command, status = %output.status, output = %stdout, "calibredb finished");
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().map_or_else(|| "signal".to_string(), |code| code.to_string());
            exn::bail!(ErrorKind::Access(format!("calibredb {command} exited with {code}: {}", stderr.trim())));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl Catalog for CalibredbCatalog {
    fn name(&self) -> &str {
        EXECUTABLE
    }

    #[instrument(skip(self))]
    async fn list_items(&self) -> Result<Vec<CatalogItem>> {
        let fields = format!("title,tags,*{}", self.column);
        let output = self.run(["list", "--for-machine", "--sort-by", "title", "--ascending", "--fields", fields.as_str()]).await?;
        parse_listing(&output, &self.column)
    }

    #[instrument(skip(self))]
    async fn delete_read_order(&self, id: ItemId) -> Result<()> {
        // An empty value removes the custom field.
        let id = id.to_string();
        self.run(["set_custom", self.column.as_str(), id.as_str(), ""]).await?;
        Ok(())
    }

    #[instrument(skip(self, tags), fields(tag_count = tags.len()))]
    async fn replace_tags(&self, id: ItemId, tags: &[String]) -> Result<()> {
        let (id, field) = (id.to_string(), format!("tags:{}", tags::join(tags)));
        self.run(["set_metadata", id.as_str(), "--field", field.as_str()]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_title(&self, id: ItemId, title: &str) -> Result<()> {
        let (id, field) = (id.to_string(), format!("title:{title}"));
        self.run(["set_metadata", id.as_str(), "--field", field.as_str()]).await?;
        Ok(())
    }
}

/// Labels from the output of `calibredb custom_columns` (`label (id)` lines).
fn custom_column_labels(output: &str) -> impl Iterator<Item = &str> {
    output.lines().filter_map(|line| line.split_whitespace().next())
}

/// Parse the JSON array printed by `calibredb list --for-machine`.
fn parse_listing(json: &str, column: &str) -> Result<Vec<CatalogItem>> {
    let listed: Vec<ListedItem> =
        serde_json::from_str(json).or_raise(|| ErrorKind::InvalidData("calibredb list output"))?;
    let key = format!("*{column}");
    listed
        .into_iter()
        .map(|mut item| {
            let read_order = match item.fields.remove(&key) {
                None => ReadOrder::Unset,
                Some(value) => ReadOrder::from_field(field_text(value)?),
            };
            Ok(CatalogItem::new(item.id, item.title, item.tags, read_order))
        })
        .collect()
}

/// Textual form of a custom field value.
///
/// Float columns arrive as JSON numbers; their textual form is kept as
/// printed (`2.0` stays `"2.0"`) so it compares equal to `readorder:2.0`.
fn field_text(value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        _ => exn::bail!(ErrorKind::InvalidData("read order value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LISTING: &str = r#"[
        {"id": 3, "title": "Anathem: A Novel", "tags": ["format:audiobook", "scifi"]},
        {"id": 7, "title": "Children of Time", "tags": [], "*readorder": 0.0},
        {"id": 1, "title": "Dune", "tags": ["scifi", "readorder:2.0"], "*readorder": 2.0}
    ]"#;

    #[test]
    fn test_parse_listing() {
        let items = parse_listing(LISTING, "readorder").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, ItemId(3));
        assert!(items[0].is_audiobook());
        assert_eq!(items[0].read_order, ReadOrder::Unset);
        assert!(items[1].read_order.is_clear_instruction());
        assert_eq!(items[2].tags, vec!["scifi", "readorder:2.0"]);
        assert_eq!(items[2].read_order, ReadOrder::Value("2.0".to_string()));
    }

    #[test]
    fn test_parse_listing_without_tags_field() {
        let items = parse_listing(r#"[{"id": 1, "title": "Dune"}]"#, "readorder").unwrap();
        assert!(items[0].tags.is_empty());
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        let err = parse_listing("Traceback (most recent call last):", "readorder").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("calibredb list output"));
    }

    #[rstest]
    #[case(Value::Null, None)]
    #[case(Value::from(2.0), Some("2.0"))]
    #[case(Value::from(3.5), Some("3.5"))]
    #[case(Value::from(4), Some("4"))]
    #[case(Value::from("first"), Some("first"))]
    fn test_field_text(#[case] value: Value, #[case] expected: Option<&str>) {
        assert_eq!(field_text(value).unwrap().as_deref(), expected);
    }

    #[test]
    fn test_field_text_rejects_lists() {
        assert!(field_text(Value::from(vec![1, 2])).is_err());
    }

    #[test]
    fn test_custom_column_labels() {
        let labels: Vec<_> = custom_column_labels("notes (1)\nreadorder (2)\n\n").collect();
        assert_eq!(labels, vec!["notes", "readorder"]);
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// A stand-in `calibredb` that logs its arguments next to itself and
        /// fails `set_metadata` for item 13.
        const SCRIPT: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
case "$1" in
    custom_columns)
        echo "notes (1)"
        echo "readorder (2)"
        ;;
    list)
        echo '[{"id": 1, "title": "Dune", "tags": ["scifi", "readorder:2.0"], "*readorder": 2.0}]'
        ;;
    set_metadata)
        if [ "$2" = "13" ]; then
            echo "database is locked" >&2
            exit 1
        fi
        ;;
esac
"#;

        fn install() -> (TempDir, PathBuf) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("calibredb");
            std::fs::write(&path, SCRIPT).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            (dir, path)
        }

        fn calls(dir: &TempDir) -> Vec<String> {
            std::fs::read_to_string(dir.path().join("calls.log")).unwrap().lines().map(str::to_string).collect()
        }

        #[tokio::test]
        async fn test_operations_build_expected_commands() {
            let (dir, tool) = install();
            let catalog = CalibredbCatalog::connect(Some(tool), "/library", "readorder").await.unwrap();

            let items = catalog.list_items().await.unwrap();
            assert_eq!(items[0].read_order, ReadOrder::Value("2.0".to_string()));

            catalog.delete_read_order(ItemId(1)).await.unwrap();
            catalog.replace_tags(ItemId(1), &["scifi".to_string(), "readorder:2.0".to_string()]).await.unwrap();
            catalog.update_title(ItemId(1), "Dune (audiobook)").await.unwrap();

            assert_eq!(
                calls(&dir),
                vec![
                    "custom_columns --library-path=/library",
                    "list --for-machine --sort-by title --ascending --fields title,tags,*readorder --library-path=/library",
                    "set_custom readorder 1  --library-path=/library",
                    "set_metadata 1 --field tags:scifi,readorder:2.0 --library-path=/library",
                    "set_metadata 1 --field title:Dune (audiobook) --library-path=/library",
                ]
            );
        }

        #[tokio::test]
        async fn test_non_zero_exit_is_access_error() {
            let (_dir, tool) = install();
            let catalog = CalibredbCatalog::connect(Some(tool), "/library", "readorder").await.unwrap();
            let err = catalog.update_title(ItemId(13), "Unlucky").await.unwrap_err();
            assert_eq!(
                *err,
                ErrorKind::Access("calibredb set_metadata exited with 1: database is locked".to_string())
            );
        }

        #[tokio::test]
        async fn test_missing_column_is_configuration_error() {
            let (_dir, tool) = install();
            let err = CalibredbCatalog::connect(Some(tool), "/library", "series_order").await.unwrap_err();
            assert_eq!(*err, ErrorKind::Configuration("custom column `series_order` not found".to_string()));
        }

        #[tokio::test]
        async fn test_missing_executable_is_configuration_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = CalibredbCatalog::connect(Some(dir.path().join("nope")), "/library", "readorder")
                .await
                .unwrap_err();
            assert!(err.is_configuration());
        }
    }
}
