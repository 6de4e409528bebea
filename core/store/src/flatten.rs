//! Recursive flattening of drive-style folder trees into file lists.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use debridgate_common::{Error, Result, StoreName};

use crate::locked_link::LockedFileLink;
use crate::models::MagnetFile;

/// Deepest folder nesting followed before a listing is considered corrupt.
pub const MAX_FOLDER_DEPTH: usize = 32;

/// A child of a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEntry {
    Folder { id: String, name: String },
    File { id: String, name: String, size: i64 },
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct FolderPage {
    pub entries: Vec<FolderEntry>,
    /// Token for the next page, `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Paginated folder listing offered by a drive-style backend.
#[async_trait]
pub trait FolderSource: Send + Sync {
    async fn list_folder(&self, folder_id: &str, page_token: Option<&str>) -> Result<FolderPage>;
}

/// Files found below a root folder.
#[derive(Debug, Clone, Default)]
pub struct FlattenedFolder {
    pub files: Vec<MagnetFile>,
    /// Sum of all known file sizes.
    pub size: i64,
}

struct Walk<'a> {
    source: &'a dyn FolderSource,
    store: StoreName,
    root_id: &'a str,
    cancel: &'a CancellationToken,
}

/// Walk `root_id` depth first and collect every file below it.
///
/// Paths are absolute from the root (`/sub/file.mkv`) and every link is a
/// [`LockedFileLink`] carrying `root_id`.
///
/// # Errors
/// - `CorruptListing` if nesting exceeds [`MAX_FOLDER_DEPTH`]
/// - `Cancelled` if `cancel` fires between folder fetches
pub async fn flatten_folder(
    source: &dyn FolderSource,
    store: StoreName,
    root_id: &str,
    cancel: &CancellationToken,
) -> Result<FlattenedFolder> {
    let walk = Walk {
        source,
        store,
        root_id,
        cancel,
    };

    let mut out = FlattenedFolder::default();
    walk.folder(root_id.to_string(), String::new(), 0, &mut out)
        .await?;
    debug!(store = %store, root = root_id, files = out.files.len(), "flattened folder");
    Ok(out)
}

impl<'a> Walk<'a> {
    fn folder<'b>(
        &'b self,
        folder_id: String,
        parent_path: String,
        depth: usize,
        out: &'b mut FlattenedFolder,
    ) -> BoxFuture<'b, Result<()>> {
        async move {
            if depth > MAX_FOLDER_DEPTH {
                return Err(Error::CorruptListing(format!(
                    "folder {} nested deeper than {} levels",
                    self.root_id, MAX_FOLDER_DEPTH
                )));
            }

            let mut page_token: Option<String> = None;
            loop {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled("folder listing cancelled".to_string()));
                }

                let page = self
                    .source
                    .list_folder(&folder_id, page_token.as_deref())
                    .await?;

                for entry in page.entries {
                    match entry {
                        FolderEntry::Folder { id, name } => {
                            let path = format!("{}/{}", parent_path, name);
                            self.folder(id, path, depth + 1, out).await?;
                        }
                        FolderEntry::File { id, name, size } => {
                            if size > 0 {
                                out.size += size;
                            }
                            out.files.push(MagnetFile {
                                idx: -1,
                                path: format!("{}/{}", parent_path, name),
                                name,
                                size,
                                link: LockedFileLink::new(self.root_id, id).encode(self.store),
                                source: self.store.code().to_string(),
                            });
                        }
                    }
                }

                match page.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => return Ok(()),
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Folder tree keyed by folder id, each folder split into pages.
    struct FakeTree {
        folders: HashMap<String, Vec<Vec<FolderEntry>>>,
    }

    impl FakeTree {
        fn new() -> Self {
            Self {
                folders: HashMap::new(),
            }
        }

        fn with_pages(mut self, id: &str, pages: Vec<Vec<FolderEntry>>) -> Self {
            self.folders.insert(id.to_string(), pages);
            self
        }

        fn with(self, id: &str, entries: Vec<FolderEntry>) -> Self {
            self.with_pages(id, vec![entries])
        }
    }

    #[async_trait]
    impl FolderSource for FakeTree {
        async fn list_folder(
            &self,
            folder_id: &str,
            page_token: Option<&str>,
        ) -> Result<FolderPage> {
            let pages = self
                .folders
                .get(folder_id)
                .ok_or_else(|| Error::NotFound(folder_id.to_string()))?;
            let index: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let next = index + 1;
            Ok(FolderPage {
                entries: pages[index].clone(),
                next_page_token: (next < pages.len()).then(|| next.to_string()),
            })
        }
    }

    fn folder(id: &str, name: &str) -> FolderEntry {
        FolderEntry::Folder {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn file(id: &str, name: &str, size: i64) -> FolderEntry {
        FolderEntry::File {
            id: id.to_string(),
            name: name.to_string(),
            size,
        }
    }

    #[tokio::test]
    async fn test_nested_paths_and_root_links() {
        let tree = FakeTree::new()
            .with("root", vec![file("f1", "a.txt", 10), folder("d1", "sub")])
            .with("d1", vec![file("f2", "b.txt", 5)]);

        let flat = flatten_folder(&tree, StoreName::Seedr, "root", &CancellationToken::new())
            .await
            .unwrap();

        let paths: Vec<_> = flat.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["/a.txt", "/sub/b.txt"]);
        assert_eq!(flat.size, 15);

        let nested = &flat.files[1];
        assert_eq!(nested.idx, -1);
        assert_eq!(nested.name, "b.txt");
        assert_eq!(nested.source, "sd");
        let link = LockedFileLink::decode(StoreName::Seedr, &nested.link).unwrap();
        assert_eq!(link, LockedFileLink::new("root", "f2"));
    }

    #[tokio::test]
    async fn test_unknown_sizes_not_summed() {
        let tree = FakeTree::new().with("root", vec![file("f1", "a", -1), file("f2", "b", 7)]);

        let flat = flatten_folder(&tree, StoreName::PikPak, "root", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(flat.size, 7);
        assert_eq!(flat.files[0].size, -1);
    }

    #[tokio::test]
    async fn test_follows_pagination() {
        let tree = FakeTree::new().with_pages(
            "root",
            vec![vec![file("f1", "one", 1)], vec![file("f2", "two", 2)]],
        );

        let flat = flatten_folder(&tree, StoreName::PikPak, "root", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(flat.files.len(), 2);
        assert_eq!(flat.files[1].path, "/two");
    }

    #[tokio::test]
    async fn test_depth_bound() {
        // Each folder contains the next one, deeper than the bound allows.
        let mut tree = FakeTree::new();
        for level in 0..=MAX_FOLDER_DEPTH + 1 {
            let id = format!("d{}", level);
            let child = format!("d{}", level + 1);
            tree = tree.with(&id, vec![folder(&child, &child)]);
        }

        let result = flatten_folder(&tree, StoreName::Seedr, "d0", &CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::CorruptListing(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let tree = FakeTree::new().with("root", vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = flatten_folder(&tree, StoreName::Seedr, "root", &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }
}
