//! Live search over a directory listing

use crate::share::FileListItem;

/// Entries whose name contains `query`, ignoring case and surrounding whitespace
///
/// An empty query returns the listing unchanged.
pub fn filter_files(all: &[FileListItem], query: &str) -> Vec<FileListItem> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return all.to_vec();
    }

    all.iter()
        .filter(|f| f.file_name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{map_listing, parse_smb_path, RemoteEntry};

    fn listing() -> Vec<FileListItem> {
        map_listing(
            &parse_smb_path("smb://user:pw@host/share/movies"),
            vec![
                RemoteEntry::new("a.mp4", false),
                RemoteEntry::new("sub", true),
                RemoteEntry::new("Alien (1979).mkv", false),
                RemoteEntry::new("notes.txt", false),
            ],
        )
    }

    fn names(items: &[FileListItem]) -> Vec<&str> {
        items.iter().map(|i| i.file_name.as_str()).collect()
    }

    #[test]
    fn test_empty_query_is_identity() {
        let all = listing();
        assert_eq!(filter_files(&all, ""), all);
        assert_eq!(filter_files(&all, "   "), all);
    }

    #[test]
    fn test_case_insensitive_substring() {
        let all = listing();
        assert_eq!(names(&filter_files(&all, "ALIEN")), vec!["Alien (1979).mkv"]);
        assert_eq!(names(&filter_files(&all, "mkv")), vec!["Alien (1979).mkv"]);
        assert!(filter_files(&all, "zzz").is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let all = listing();
        for query in ["a", "S", ".", "x"] {
            let once = filter_files(&all, query);
            assert_eq!(filter_files(&once, query), once);
        }
    }

    #[test]
    fn test_two_entry_scenario() {
        let all = map_listing(
            &parse_smb_path("smb://user:pw@host/share/movies"),
            vec![RemoteEntry::new("a.mp4", false), RemoteEntry::new("sub", true)],
        );
        assert_eq!(all.len(), 2);
        assert_eq!(names(&filter_files(&all, "a")), vec!["a.mp4"]);
    }
}
