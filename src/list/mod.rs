//! Listing the store: an entry tree rendered as a tree, a flat list or
//! a details table.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::errors::{StrongboxError, Result};
use crate::store::paths::{is_secret_file, SECRET_SUFFIX};

/// One node of the listing tree.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Leaf name, without the `.enc` suffix for secrets.
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    /// Blob size in bytes (0 for directories).
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub children: Vec<Entry>,
}

/// How `list` should present the store.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Print full secret names, one per line.
    pub flat: bool,
    /// Print a table with size and modification time.
    pub details: bool,
    /// Stop descending below this depth (1 = top level only).
    pub max_depth: Option<usize>,
    /// Keep only secrets whose full name contains this text (case-insensitive).
    pub filter: Option<String>,
}

/// Build the entry tree below `dir`, skipping hidden entries and
/// non-secret files.  Directories sort first, then by name.
pub fn build_tree(dir: &Path, max_depth: Option<usize>) -> Result<Vec<Entry>> {
    read_level(dir, 1, max_depth)
}

fn read_level(dir: &Path, depth: usize, max_depth: Option<usize>) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();

    for item in fs::read_dir(dir)? {
        let item = item?;
        let file_name = item.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }

        let metadata = item.metadata()?;
        let modified = metadata.modified().ok().map(DateTime::<Local>::from);
        let path = item.path();

        if metadata.is_dir() {
            let children = if max_depth.is_some_and(|max| depth >= max) {
                Vec::new()
            } else {
                read_level(&path, depth + 1, max_depth)?
            };
            entries.push(Entry {
                name: file_name,
                path,
                is_dir: true,
                size: 0,
                modified,
                children,
            });
        } else if is_secret_file(&file_name) {
            let name = file_name
                .strip_suffix(SECRET_SUFFIX)
                .unwrap_or(&file_name)
                .to_string();
            entries.push(Entry {
                name,
                path,
                is_dir: false,
                size: metadata.len(),
                modified,
                children: Vec::new(),
            });
        }
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Drop secrets whose full name does not contain `needle`, and the
/// directories left with nothing to show.
pub fn filter_entries(entries: Vec<Entry>, needle: &str) -> Vec<Entry> {
    let needle = needle.to_lowercase();
    filter_level(entries, "", &needle)
}

fn filter_level(entries: Vec<Entry>, prefix: &str, needle: &str) -> Vec<Entry> {
    entries
        .into_iter()
        .filter_map(|mut entry| {
            let full = join_name(prefix, &entry.name);
            if entry.is_dir {
                entry.children = filter_level(std::mem::take(&mut entry.children), &full, needle);
                (!entry.children.is_empty()).then_some(entry)
            } else {
                full.to_lowercase().contains(needle).then_some(entry)
            }
        })
        .collect()
}

/// Full names of every secret in the tree, in display order.
pub fn flatten(entries: &[Entry]) -> Vec<(String, &Entry)> {
    let mut out = Vec::new();
    flatten_into(entries, "", &mut out);
    out
}

fn flatten_into<'a>(entries: &'a [Entry], prefix: &str, out: &mut Vec<(String, &'a Entry)>) {
    for entry in entries {
        let full = join_name(prefix, &entry.name);
        if entry.is_dir {
            flatten_into(&entry.children, &full, out);
        } else {
            out.push((full, entry));
        }
    }
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Render the tree with box-drawing connectors.
pub fn render_tree(title: &str, entries: &[Entry]) -> String {
    let mut out = format!("{}\n", style(title).bold());
    render_tree_level(entries, "", &mut out);
    out
}

fn render_tree_level(entries: &[Entry], indent: &str, out: &mut String) {
    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let connector = if last { "└── " } else { "├── " };
        let name = if entry.is_dir {
            style(&entry.name).blue().bold().to_string()
        } else {
            entry.name.clone()
        };
        out.push_str(&format!("{indent}{connector}{name}\n"));

        if entry.is_dir {
            let child_indent = format!("{indent}{}", if last { "    " } else { "│   " });
            render_tree_level(&entry.children, &child_indent, out);
        }
    }
}

/// Render full secret names, one per line.
pub fn render_flat(entries: &[Entry]) -> String {
    flatten(entries)
        .into_iter()
        .map(|(name, _)| format!("{name}\n"))
        .collect()
}

/// Render a table of secrets with size and modification time.
pub fn render_details(entries: &[Entry]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Size", "Modified"]);

    for (name, entry) in flatten(entries) {
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![name, format!("{} B", entry.size), modified]);
    }

    format!("{table}\n")
}

/// Build, filter and render the listing for `dir` according to `opts`.
///
/// Returns `None` when there is nothing to show.
pub fn render(dir: &Path, title: &str, opts: &ListOptions) -> Result<Option<String>> {
    if !dir.is_dir() {
        return Err(StrongboxError::SecretNotFound(title.to_string()));
    }

    let mut entries = build_tree(dir, opts.max_depth)?;
    if let Some(needle) = opts.filter.as_deref().filter(|n| !n.is_empty()) {
        entries = filter_entries(entries, needle);
    }
    if entries.is_empty() {
        return Ok(None);
    }

    let rendered = if opts.details {
        render_details(&entries)
    } else if opts.flat {
        render_flat(&entries)
    } else {
        render_tree(title, &entries)
    };
    Ok(Some(rendered))
}
