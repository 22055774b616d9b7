use crate::{FALLBACK_GROUP, METADATA_FILE_NAME, is_image};
use bookshelf_storage::RemoteFile;
use std::collections::HashMap;

/// Files of one top-level folder, before metadata has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub folder_name: String,
    /// The folder's metadata document, if the listing had one.
    pub metadata: Option<RemoteFile>,
    /// Page images, sorted by path.
    pub pages: Vec<RemoteFile>,
}
impl Group {
    fn new(folder_name: impl Into<String>) -> Self {
        Self { folder_name: folder_name.into(), metadata: None, pages: Vec::new() }
    }

    fn offer_metadata(&mut self, file: RemoteFile) {
        let Some(existing) = &self.metadata else {
            self.metadata = Some(file);
            return;
        };
        // A document directly inside the folder beats one nested deeper.
        if is_direct_child(&file) && !is_direct_child(existing) {
            tracing::debug!(folder = %self.folder_name, ignored = %existing.path, "Preferring top-level metadata document");
            self.metadata = Some(file);
        } else {
            tracing::debug!(folder = %self.folder_name, kept = %existing.path, ignored = %file.path, "Ignoring extra metadata document");
        }
    }
}

fn is_direct_child(file: &RemoteFile) -> bool {
    file.path.matches('/').count() <= 1
}

/// Group a listing into books.
///
/// Only page images and `metadata.json` documents are kept. Files are keyed
/// by their top-level folder (root-level files go to [`FALLBACK_GROUP`]),
/// pages are sorted by path byte-wise, and folders without a single page are
/// dropped. Groups come back in the order their folder was first seen.
///
/// When a folder holds several metadata documents, `<folder>/metadata.json`
/// wins; otherwise the first one listed is used.
pub fn group_files(files: impl IntoIterator<Item = RemoteFile>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for file in files {
        let is_metadata = file.file_name() == METADATA_FILE_NAME;
        if !is_metadata && !is_image(file.file_name()) {
            continue;
        }
        let folder = match file.path.split_once('/') {
            Some((top, _)) => top.to_string(),
            None => FALLBACK_GROUP.to_string(),
        };
        let position = match positions.get(&folder) {
            Some(position) => *position,
            None => {
                groups.push(Group::new(folder.clone()));
                positions.insert(folder, groups.len() - 1);
                groups.len() - 1
            },
        };
        let group = &mut groups[position];
        if is_metadata {
            group.offer_metadata(file);
        } else {
            group.pages.push(file);
        }
    }

    groups.retain_mut(|group| {
        if group.pages.is_empty() {
            tracing::debug!(folder = %group.folder_name, "Skipping folder without pages");
            return false;
        }
        group.pages.sort_by(|a, b| a.path.cmp(&b.path));
        true
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn files(paths: &[&str]) -> Vec<RemoteFile> {
        paths.iter().map(|path| RemoteFile::new(*path, format!("mock://resolve/{path}"))).collect()
    }

    fn page_paths(group: &Group) -> Vec<&str> {
        group.pages.iter().map(|page| page.path.as_str()).collect()
    }

    #[test]
    fn test_alpha_and_misc() {
        let groups = group_files(files(&[
            "Alpha/01.png",
            "Alpha/02.png",
            "Alpha/metadata.json",
            "cover.jpg",
            "readme.md",
        ]));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].folder_name, "Alpha");
        assert_eq!(page_paths(&groups[0]), vec!["Alpha/01.png", "Alpha/02.png"]);
        assert_eq!(groups[0].metadata.as_ref().map(|m| m.path.as_str()), Some("Alpha/metadata.json"));
        assert_eq!(groups[1].folder_name, "Misc");
        assert_eq!(page_paths(&groups[1]), vec!["cover.jpg"]);
        assert_eq!(groups[1].metadata, None);
    }

    #[test]
    fn test_insertion_order() {
        let groups = group_files(files(&["Zeta/01.png", "Alpha/01.png", "loose.png", "Zeta/02.png", "Beta/01.png"]));
        let names: Vec<&str> = groups.iter().map(|g| g.folder_name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Misc", "Beta"]);
    }

    #[test]
    fn test_pages_sorted_bytewise() {
        let groups = group_files(files(&["A/b.png", "A/10.png", "A/B.png", "A/2.png", "A/01.png"]));
        assert_eq!(page_paths(&groups[0]), vec!["A/01.png", "A/10.png", "A/2.png", "A/B.png", "A/b.png"]);
    }

    #[test]
    fn test_nested_files_belong_to_top_folder() {
        let groups = group_files(files(&["A/B/x.png", "A/y.png"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(page_paths(&groups[0]), vec!["A/B/x.png", "A/y.png"]);
    }

    #[rstest]
    #[case(&["A/metadata.json"])]
    #[case(&["A/notes.txt", "A/metadata.json"])]
    #[case(&["readme.md", "metadata.json"])]
    fn test_groups_without_pages_are_dropped(#[case] paths: &[&str]) {
        assert!(group_files(files(paths)).is_empty());
    }

    #[rstest]
    #[case(&["A/B/metadata.json", "A/metadata.json", "A/01.png"], "A/metadata.json")]
    #[case(&["A/metadata.json", "A/B/metadata.json", "A/01.png"], "A/metadata.json")]
    #[case(&["A/B/metadata.json", "A/C/metadata.json", "A/01.png"], "A/B/metadata.json")]
    fn test_metadata_preference(#[case] paths: &[&str], #[case] expected: &str) {
        let groups = group_files(files(paths));
        assert_eq!(groups[0].metadata.as_ref().map(|m| m.path.as_str()), Some(expected));
    }

    #[test]
    fn test_extension_case_insensitive() {
        let groups = group_files(files(&["A/01.PNG", "A/02.Jpeg", "A/03.tiff"]));
        assert_eq!(page_paths(&groups[0]), vec!["A/01.PNG", "A/02.Jpeg"]);
    }

    #[test]
    fn test_pages_never_empty() {
        let groups = group_files(files(&["A/01.png", "B/metadata.json", "C/x.txt", "d.gif"]));
        assert!(groups.iter().all(|g| !g.pages.is_empty()));
        assert_eq!(groups.len(), 2);
    }
}
