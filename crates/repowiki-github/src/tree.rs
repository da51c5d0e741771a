//! Nesting of flat git tree listings.

use crate::types::{TreeEntry, TreeEntryKind};
use repowiki_core::DirectoryNode;
use std::collections::HashMap;

/// Build the nested directory tree from a flat recursive listing.
///
/// Blobs become files of their parent directory and trees become
/// subdirectories; listing order is preserved. Submodule entries and entries
/// whose parent directory is not part of the listing are dropped.
pub fn build_tree(entries: &[TreeEntry]) -> DirectoryNode {
    let mut files: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut dirs: HashMap<&str, Vec<&str>> = HashMap::new();

    for entry in entries {
        let parent = parent_path(&entry.path);
        match entry.kind {
            TreeEntryKind::Blob => files.entry(parent).or_default().push(&entry.path),
            TreeEntryKind::Tree => dirs.entry(parent).or_default().push(&entry.path),
            TreeEntryKind::Commit => {}
        }
    }

    assemble("", &files, &dirs)
}

fn assemble(
    path: &str,
    files: &HashMap<&str, Vec<&str>>,
    dirs: &HashMap<&str, Vec<&str>>,
) -> DirectoryNode {
    DirectoryNode {
        path: path.to_string(),
        files: files
            .get(path)
            .map(|f| f.iter().map(|p| p.to_string()).collect())
            .unwrap_or_default(),
        subdirectories: dirs
            .get(path)
            .map(|d| d.iter().map(|p| assemble(p, files, dirs)).collect())
            .unwrap_or_default(),
    }
}

fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_nested_tree() {
        let entries = vec![
            TreeEntry::blob("README.md"),
            TreeEntry::tree("src"),
            TreeEntry::blob("src/main.rs"),
            TreeEntry::tree("src/net"),
            TreeEntry::blob("src/net/http.rs"),
            TreeEntry::blob("src/lib.rs"),
        ];

        let root = build_tree(&entries);
        assert_eq!(root.path, "");
        assert_eq!(root.files, vec!["README.md"]);
        assert_eq!(root.subdirectories.len(), 1);

        let src = &root.subdirectories[0];
        assert_eq!(src.path, "src");
        assert_eq!(src.files, vec!["src/main.rs", "src/lib.rs"]);
        assert_eq!(src.subdirectories[0].files, vec!["src/net/http.rs"]);
        assert_eq!(root.total_files(), 4);
    }

    #[test]
    fn test_submodules_and_orphans_dropped() {
        let entries = vec![
            TreeEntry {
                path: "vendor/lib".to_string(),
                kind: TreeEntryKind::Commit,
            },
            TreeEntry::blob("missing/parent.rs"),
            TreeEntry::blob("a.rs"),
        ];

        let root = build_tree(&entries);
        assert_eq!(root.files, vec!["a.rs"]);
        assert!(root.subdirectories.is_empty());
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(build_tree(&[]), DirectoryNode::new(""));
    }
}
