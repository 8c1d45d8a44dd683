//! The scanned document tree.
//!
//! `Node` identity lives in an arena (`Site::nodes`) addressed by
//! `NodeId` rather than through owning pointers, so that a folder's
//! `parent` back-reference is a plain lookup and never implies
//! ownership (see the design notes on weak back-references).

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::slug::{self, FileMetadata};
use crate::{Error, Result};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub enum NodeKind {
    File,
    Folder {
        children: Vec<NodeId>,
        has_index: bool,
        index_path: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub file_name: String,
    pub h1_title: String,
    /// Path relative to the input root, forward-slash separated.
    pub path: String,
    pub source_path: PathBuf,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn has_index(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { has_index: true, .. })
    }

    pub fn index_path(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Folder { index_path, .. } => index_path.as_deref(),
            NodeKind::File => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder { children, .. } => children,
            NodeKind::File => &[],
        }
    }

    pub fn is_index_file(&self) -> bool {
        !self.is_folder() && is_index_leaf(&self.file_name)
    }

    pub fn file_metadata(&self) -> FileMetadata {
        FileMetadata::from_file_name(&self.file_name)
    }
}

/// The fully scanned tree plus a flat list of every file `Node`,
/// including root-level indexes. Immutable once built.
#[derive(Debug)]
pub struct Site {
    nodes: Vec<Node>,
    root: NodeId,
    all_pages: Vec<NodeId>,
}

impl Site {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn all_pages(&self) -> &[NodeId] {
        &self.all_pages
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// Every node reachable from the root, in a depth-first (pre-order)
    /// traversal, root included.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.node(id).children();
            for &child in children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Every folder reachable from the root, root included.
    pub fn all_folders(&self) -> Vec<NodeId> {
        self.walk()
            .into_iter()
            .filter(|&id| self.node(id).is_folder())
            .collect()
    }

    /// Every path from the active node up to (and including) the root.
    pub fn ancestors(&self, mut id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        while let Some(parent) = self.node(id).parent {
            out.push(parent);
            id = parent;
        }
        out
    }

    /// The root-level index file, if any. It is not a child of the root
    /// in the tree, so it never appears in `walk`; callers that need the
    /// full page sequence must special-case it.
    pub fn root_index_page(&self) -> Option<NodeId> {
        let root_children = self.node(self.root).children();
        self.all_pages
            .iter()
            .copied()
            .find(|&id| self.node(id).parent == Some(self.root) && !root_children.contains(&id))
    }

    /// Linear `all_pages` traversal in nav order (see `sort`), used for
    /// prev/next page navigation and wiki-link disambiguation. The
    /// root-level index, if any, leads the sequence as the homepage.
    pub fn pages_in_nav_order(&self) -> Vec<NodeId> {
        let mut pages: Vec<NodeId> = self
            .walk()
            .into_iter()
            .filter(|&id| !self.node(id).is_folder())
            .collect();

        if let Some(root_index) = self.root_index_page() {
            pages.insert(0, root_index);
        }

        pages
    }
}

fn is_index_leaf(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower == "index.md" || lower == "index.markdown" || lower == "readme.md" || lower == "readme.markdown"
}

fn is_markdown_leaf(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".md") || lower.ends_with(".markdown")
}

fn is_hidden(leaf: &str) -> bool {
    leaf.starts_with('.')
}

fn is_draft(leaf: &str) -> bool {
    leaf.starts_with('_')
}

/// An intermediate, unpruned, unsorted representation built during the
/// filesystem walk. Converted into the arena-backed `Site` once pruning
/// and sorting have run.
enum RawEntry {
    File(RawFile),
    Folder(RawFolder),
}

struct RawFile {
    file_name: String,
    path: String,
    source_path: PathBuf,
    h1_title: String,
}

struct RawFolder {
    file_name: String,
    path: String,
    source_path: PathBuf,
    children: Vec<RawEntry>,
    index_path: Option<String>,
}

/// Walks `input_dir`, builds the full tree, extracts H1 titles, prunes
/// folders with no markdown descendants, and sorts siblings.
pub fn scan(input_dir: &Path) -> Result<Site> {
    let root_raw = walk_dir(input_dir, input_dir, "")?;

    let mut nodes = Vec::new();
    let mut all_pages = Vec::new();

    let root_index_path = root_raw.index_path.clone();
    let root_id = build_arena(root_raw, None, &mut nodes, &mut all_pages, true);

    // Root-level index files are not children of the root node, but they
    // still belong to all_pages and must be reachable for the "/" URL.
    if let Some(index_rel) = root_index_path {
        let source_path = input_dir.join(&index_rel);
        let h1_title = extract_h1(&source_path)?;
        let file_name = Path::new(&index_rel)
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(&index_rel)
            .to_string();

        let name = if h1_title.is_empty() {
            slug::clean_label(&slug::FileMetadata::from_file_name(&file_name).display_name)
        } else {
            h1_title.clone()
        };

        nodes.push(Node {
            name,
            file_name,
            h1_title,
            path: index_rel,
            source_path,
            parent: Some(root_id),
            kind: NodeKind::File,
        });
        all_pages.push(nodes.len() - 1);
    }

    Ok(Site {
        nodes,
        root: root_id,
        all_pages,
    })
}

fn walk_dir(dir: &Path, root: &Path, rel_prefix: &str) -> Result<RawFolder> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|e| Error::scan(dir, e))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut children = Vec::new();
    let mut index_path = None;

    for entry in entries {
        let file_name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&file_name) {
            continue;
        }

        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::scan(&entry_path, e))?;

        let rel_path = if rel_prefix.is_empty() {
            file_name.clone()
        } else {
            format!("{rel_prefix}/{file_name}")
        };

        if file_type.is_dir() {
            let sub = walk_dir(&entry_path, root, &rel_path)?;
            children.push(RawEntry::Folder(sub));
        } else if file_type.is_file() {
            if is_draft(&file_name) || !is_markdown_leaf(&file_name) {
                continue;
            }

            let h1_title = extract_h1(&entry_path)?;

            if is_index_leaf(&file_name) {
                index_path = Some(rel_path.clone());
            }

            children.push(RawEntry::File(RawFile {
                file_name,
                path: rel_path,
                source_path: entry_path,
                h1_title,
            }));
        }
    }

    let dir_name = dir
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_string();

    Ok(RawFolder {
        file_name: dir_name,
        path: rel_prefix.to_string(),
        source_path: dir.to_path_buf(),
        children,
        index_path,
    })
}

/// Returns true if this raw folder has any markdown file anywhere in its
/// subtree (after draft/hidden filtering, which already happened during
/// the walk).
fn has_markdown_descendant(folder: &RawFolder) -> bool {
    folder.children.iter().any(|c| match c {
        RawEntry::File(_) => true,
        RawEntry::Folder(f) => has_markdown_descendant(f),
    })
}

/// Converts a raw, unsorted folder into arena nodes, pruning empty
/// subfolders bottom-up and sorting siblings per the nav order.
fn build_arena(
    folder: RawFolder,
    parent: Option<NodeId>,
    nodes: &mut Vec<Node>,
    all_pages: &mut Vec<NodeId>,
    is_root: bool,
) -> NodeId {
    let folder_id = nodes.len();
    nodes.push(Node {
        name: String::new(),
        file_name: folder.file_name.clone(),
        h1_title: String::new(),
        path: folder.path.clone(),
        source_path: folder.source_path.clone(),
        parent,
        kind: NodeKind::Folder {
            children: Vec::new(),
            has_index: folder.index_path.is_some(),
            index_path: folder.index_path.clone(),
        },
    });

    let mut sortable: Vec<SortableEntry> = folder
        .children
        .into_iter()
        .filter(|c| match c {
            RawEntry::File(_) => true,
            RawEntry::Folder(f) => has_markdown_descendant(f),
        })
        .map(SortableEntry::from_raw)
        .collect();

    sortable.sort_by(compare_entries);

    let mut child_ids = Vec::new();
    for entry in sortable {
        match entry.raw {
            RawEntry::File(file) => {
                // Root-level index files are not children of the root;
                // `scan` adds them to `all_pages` on its own.
                if is_root && is_index_leaf(&file.file_name) {
                    continue;
                }

                let name = if !file.h1_title.is_empty() {
                    file.h1_title.clone()
                } else {
                    slug::clean_label(&slug::FileMetadata::from_file_name(&file.file_name).display_name)
                };

                nodes.push(Node {
                    name,
                    file_name: file.file_name,
                    h1_title: file.h1_title,
                    path: file.path,
                    source_path: file.source_path,
                    parent: Some(folder_id),
                    kind: NodeKind::File,
                });
                let file_id = nodes.len() - 1;
                all_pages.push(file_id);
                child_ids.push(file_id);
            }
            RawEntry::Folder(sub) => {
                let sub_id = build_arena(sub, Some(folder_id), nodes, all_pages, false);
                child_ids.push(sub_id);
            }
        }
    }

    if let NodeKind::Folder { children, .. } = &mut nodes[folder_id].kind {
        *children = child_ids;
    }

    let folder_name = if is_root {
        String::new()
    } else {
        slug::clean_label(&slug::FileMetadata::from_file_name(&nodes[folder_id].file_name).display_name)
    };
    nodes[folder_id].name = folder_name;

    folder_id
}

/// Wraps a raw entry with the fields the sort comparator needs, computed
/// once up front from the shared `FileMetadata` extractor.
struct SortableEntry {
    raw: RawEntry,
    is_folder: bool,
    metadata: FileMetadata,
    name_for_sort: String,
}

impl SortableEntry {
    fn from_raw(raw: RawEntry) -> Self {
        let (is_folder, file_name) = match &raw {
            RawEntry::File(f) => (false, f.file_name.clone()),
            RawEntry::Folder(d) => (true, d.file_name.clone()),
        };
        let metadata = FileMetadata::from_file_name(&file_name);
        SortableEntry {
            raw,
            is_folder,
            name_for_sort: metadata.display_name.clone(),
            metadata,
        }
    }
}

/// Total order: files before folders; within each group, dated entries
/// (newest first) precede undated ones, then numbered entries (lowest
/// first) precede unnumbered ones, with a case-insensitive name
/// tiebreaker. Uses filename-derived dates only, never mtimes, so that
/// builds stay deterministic.
fn compare_entries(a: &SortableEntry, b: &SortableEntry) -> Ordering {
    a.is_folder
        .cmp(&b.is_folder)
        .then_with(|| match (a.metadata.date, b.metadata.date) {
            (Some(da), Some(db)) => db.cmp(&da),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| {
            let sentinel = u64::MAX;
            let na = a.metadata.number.unwrap_or(sentinel);
            let nb = b.metadata.number.unwrap_or(sentinel);
            na.cmp(&nb)
        })
        .then_with(|| a.name_for_sort.to_lowercase().cmp(&b.name_for_sort.to_lowercase()))
}

fn extract_h1(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| Error::scan(path, e))?;
    Ok(extract_h1_from_str(&content))
}

/// Skips a leading YAML frontmatter block (`---` ... `---`) and blank
/// lines, then checks whether the next line is an ATX `# Heading`.
/// Inline links are resolved to their text; `*_~` and backticks are
/// stripped. Empty-after-stripping behaves as "no H1".
pub fn extract_h1_from_str(content: &str) -> String {
    let mut lines = content.lines().peekable();

    if lines.peek() == Some(&"---") {
        lines.next();
        for line in lines.by_ref() {
            if line.trim_end() == "---" {
                break;
            }
        }
    }

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('#') {
            if let Some(rest) = rest.strip_prefix(' ') {
                let cleaned = clean_h1_text(rest);
                return cleaned;
            }
        }
        break;
    }

    String::new()
}

static INLINE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());

fn clean_h1_text(raw: &str) -> String {
    let no_links = INLINE_LINK.replace_all(raw, "$1");
    let stripped: String = no_links
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '~' | '`'))
        .collect();
    stripped.trim().to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn extracts_h1_skipping_frontmatter() {
        let content = "---\ntitle: x\n---\n\n# Hello, World\n\nBody";
        assert_eq!(extract_h1_from_str(content), "Hello, World");
    }

    #[test]
    fn h1_resolves_inline_links_and_strips_markup() {
        let content = "# **Bold** [linked](/x) `code`";
        assert_eq!(extract_h1_from_str(content), "Bold linked code");
    }

    #[test]
    fn no_h1_when_first_line_is_not_heading() {
        let content = "Just a paragraph.\n\n# Too late";
        assert_eq!(extract_h1_from_str(content), "");
    }

    #[test]
    fn date_prefixed_post_scans_into_single_page_tree() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "posts/2024-01-15-hello-world.md",
            "# Hello, World\n",
        );

        let site = scan(tmp.path()).unwrap();
        assert_eq!(site.all_pages().len(), 1);
        let page = site.node(site.all_pages()[0]);
        assert_eq!(page.name, "Hello, World");
    }

    #[test]
    fn empty_folder_is_pruned() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        write(tmp.path(), "index.md", "# Home\n");

        let site = scan(tmp.path()).unwrap();
        let root = site.root_node();
        assert!(root.children().is_empty());
    }

    #[test]
    fn folder_with_only_draft_is_pruned() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "drafts/_secret.md", "# Secret\n");
        write(tmp.path(), "index.md", "# Home\n");

        let site = scan(tmp.path()).unwrap();
        assert!(site.root_node().children().is_empty());
        assert_eq!(site.all_pages().len(), 1);
    }

    #[test]
    fn root_level_readme_is_not_a_child_but_is_a_page() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "README.md", "# Welcome\n");
        write(tmp.path(), "other.md", "# Other\n");

        let site = scan(tmp.path()).unwrap();
        assert_eq!(site.all_pages().len(), 2);
        assert_eq!(site.root_node().children().len(), 1);
    }

    #[test]
    fn root_index_leads_nav_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "index.md", "# Home\n");
        write(tmp.path(), "a.md", "# A\n");
        write(tmp.path(), "b.md", "# B\n");

        let site = scan(tmp.path()).unwrap();
        let order = site.pages_in_nav_order();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], site.root_index_page().unwrap());
        assert_eq!(site.node(order[1]).name, "A");
        assert_eq!(site.node(order[2]).name, "B");
    }

    #[test]
    fn nested_index_is_a_child_of_its_folder() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "child/index.md", "# Child Index\n");
        write(tmp.path(), "child/other.md", "# Other\n");

        let site = scan(tmp.path()).unwrap();
        let root = site.root_node();
        assert_eq!(root.children().len(), 1);
        let child_folder = site.node(root.children()[0]);
        assert!(child_folder.has_index());
        assert_eq!(child_folder.children().len(), 2);
    }
}
