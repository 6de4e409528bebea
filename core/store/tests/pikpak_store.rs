//! PikPak store behaviour against an in-memory drive.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use debridgate_common::{Error, Result, StoreName};
use debridgate_store::pikpak::types::{
    File, FileList, FileParams, ListFilesParams, Media, MediaLink, Task, UserInfo,
    FILE_KIND_FILE, FILE_KIND_FOLDER, PHASE_COMPLETE, PHASE_RUNNING,
};
use debridgate_store::pikpak::{PikPakApi, PikPakStore};
use debridgate_store::{
    AddMagnetInput, DriveBrowser, DriveItemKind, ListFilesQuery, ListMagnetsParams, ListingCache,
    LockedFileLink, MagnetStatus, MagnetSummary, MemoryCache, PollPolicy, Store, StoreContext,
    SubscriptionStatus,
};

const HASH_A: &str = "c9e15763f722f23e98a29decdfae341b98d53056";
const HASH_B: &str = "dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c";

#[derive(Default)]
struct Drive {
    /// Children by parent id, `""` is the drive root.
    children: HashMap<String, Vec<File>>,
    tasks: Vec<Task>,
    trashed: Vec<String>,
    added_urls: Vec<String>,
}

/// In-memory PikPak backend.
struct FakePikPak {
    drive: Mutex<Drive>,
    /// Phase of tasks created by `add_url`.
    new_task_phase: String,
    list_calls: AtomicU32,
}

impl FakePikPak {
    fn new() -> Self {
        let mut drive = Drive::default();
        drive
            .children
            .insert(String::new(), vec![folder("pack", "My Pack", "")]);
        Self {
            drive: Mutex::new(drive),
            new_task_phase: PHASE_RUNNING.to_string(),
            list_calls: AtomicU32::new(0),
        }
    }

    fn with_new_task_phase(mut self, phase: &str) -> Self {
        self.new_task_phase = phase.to_string();
        self
    }

    fn put(&self, parent: &str, file: File) {
        let mut drive = self.drive.lock().unwrap();
        drive.children.entry(parent.to_string()).or_default().push(file);
    }

    fn find(&self, id: &str) -> Option<File> {
        let drive = self.drive.lock().unwrap();
        drive
            .children
            .values()
            .flatten()
            .find(|f| f.id == id)
            .cloned()
    }
}

#[async_trait]
impl PikPakApi for FakePikPak {
    async fn list_files(&self, _api_key: &str, params: &ListFilesParams) -> Result<FileList> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let drive = self.drive.lock().unwrap();
        let matching: Vec<File> = drive
            .children
            .get(&params.parent_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|f| !drive.trashed.contains(&f.id))
            .filter(|f| !params.completed_only || f.phase == PHASE_COMPLETE)
            .filter(|f| params.kind.as_ref().map_or(true, |k| &f.kind == k))
            .filter(|f| params.mime_type.as_ref().map_or(true, |m| &f.mime_type == m))
            .collect();

        // Page tokens are offsets.
        let start: usize = params
            .page_token
            .as_deref()
            .map_or(0, |t| t.parse().unwrap());
        let end = (start + params.limit as usize).min(matching.len());
        Ok(FileList {
            files: matching[start..end].to_vec(),
            next_page_token: if end < matching.len() {
                end.to_string()
            } else {
                String::new()
            },
        })
    }

    async fn get_file(&self, _api_key: &str, file_id: &str) -> Result<File> {
        self.find(file_id)
            .ok_or_else(|| Error::NotFound(file_id.to_string()))
    }

    async fn add_url(&self, _api_key: &str, url: &str) -> Result<Task> {
        let mut drive = self.drive.lock().unwrap();
        drive.added_urls.push(url.to_string());
        let task = Task {
            id: format!("task-{}", drive.added_urls.len()),
            name: String::new(),
            file_id: "new-file".to_string(),
            phase: self.new_task_phase.clone(),
        };
        drive.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, _api_key: &str, _limit: u32) -> Result<Vec<Task>> {
        Ok(self.drive.lock().unwrap().tasks.clone())
    }

    async fn trash(&self, _api_key: &str, ids: &[String]) -> Result<()> {
        self.drive.lock().unwrap().trashed.extend_from_slice(ids);
        Ok(())
    }

    async fn get_user(&self, _api_key: &str) -> Result<UserInfo> {
        Ok(UserInfo {
            sub: "user-1".to_string(),
            email: "user@example.com".to_string(),
        })
    }

    async fn get_vip_type(&self, _api_key: &str) -> Result<String> {
        Ok("platinum".to_string())
    }
}

fn folder(id: &str, name: &str, url: &str) -> File {
    File {
        id: id.to_string(),
        kind: FILE_KIND_FOLDER.to_string(),
        name: name.to_string(),
        phase: PHASE_COMPLETE.to_string(),
        params: FileParams {
            url: url.to_string(),
        },
        ..Default::default()
    }
}

fn file(id: &str, name: &str, size: i64) -> File {
    File {
        id: id.to_string(),
        kind: FILE_KIND_FILE.to_string(),
        name: name.to_string(),
        size: size.to_string(),
        phase: PHASE_COMPLETE.to_string(),
        ..Default::default()
    }
}

fn magnet(hash: &str) -> String {
    format!("magnet:?xt=urn:btih:{}", hash)
}

fn store(api: Arc<FakePikPak>) -> PikPakStore {
    let listing = ListingCache::new(
        StoreName::PikPak,
        Arc::new(MemoryCache::<Vec<MagnetSummary>>::new()),
        ListingCache::DEFAULT_TTL,
    );
    PikPakStore::new(api, listing)
        .with_api_key("token")
        .with_poll_policy(PollPolicy::new(2).with_retry_interval(Duration::from_millis(5)))
}

/// Drive with one downloaded magnet folder: `/a.mkv`, `/extras/b.srt`.
fn populated() -> Arc<FakePikPak> {
    let api = FakePikPak::new();
    let mut show = folder("show", "Show", &magnet(HASH_A));
    show.created_time = "2024-02-01T00:00:00Z".to_string();
    api.put("pack", show);
    let mut a = file("a", "a.mkv", 100);
    a.mime_type = "video/x-matroska".to_string();
    api.put("show", a);
    api.put("show", folder("extras", "extras", ""));
    api.put("extras", file("b", "b.srt", 2));
    Arc::new(api)
}

#[tokio::test]
async fn test_get_magnet_flattens_folder() {
    let store = store(populated());
    let item = store.get_magnet(&StoreContext::new(), "show").await.unwrap();

    assert_eq!(item.hash, HASH_A);
    assert_eq!(item.status, MagnetStatus::Downloaded);
    assert_eq!(item.size, 102);

    let paths: Vec<_> = item.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["/a.mkv", "/extras/b.srt"]);

    for f in &item.files {
        let link = LockedFileLink::decode(StoreName::PikPak, &f.link).unwrap();
        assert_eq!(link.root_id, "show");
        assert_eq!(f.source, "pp");
    }
}

#[tokio::test]
async fn test_generate_link_prefers_media_url() {
    let api = populated();
    let mut b = file("media", "c.mkv", 1);
    b.medias = vec![Media {
        link: MediaLink {
            url: "https://cdn.example/c.mkv".to_string(),
        },
    }];
    b.web_content_link = "https://dl.example/c.mkv".to_string();
    api.put("show", b);
    let mut d = file("web", "d.mkv", 1);
    d.web_content_link = "https://dl.example/d.mkv".to_string();
    api.put("show", d);

    let store = store(api);
    let ctx = StoreContext::new();

    let link = LockedFileLink::new("show", "media").encode(StoreName::PikPak);
    assert_eq!(
        store.generate_link(&ctx, &link).await.unwrap(),
        "https://cdn.example/c.mkv"
    );

    let link = LockedFileLink::new("show", "web").encode(StoreName::PikPak);
    assert_eq!(
        store.generate_link(&ctx, &link).await.unwrap(),
        "https://dl.example/d.mkv"
    );

    let link = LockedFileLink::new("show", "a").encode(StoreName::PikPak);
    assert!(matches!(
        store.generate_link(&ctx, &link).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_generate_link_rejects_foreign_link() {
    let store = store(populated());
    let link = LockedFileLink::new("show", "a").encode(StoreName::Seedr);
    let result = store.generate_link(&StoreContext::new(), &link).await;
    assert!(matches!(result, Err(Error::InvalidLink(_))));
}

#[tokio::test]
async fn test_listing_sorted_cached_and_invalidated_by_remove() {
    let api = populated();
    let mut newer = folder("newer", "Newer", &magnet(HASH_B));
    newer.created_time = "2024-03-01T00:00:00Z".to_string();
    api.put("pack", newer);
    api.put("pack", folder("plain", "Not a magnet", "https://example.com/x"));

    let store = store(api.clone());
    let ctx = StoreContext::new();

    let page = store
        .list_magnets(&ctx, ListMagnetsParams::default())
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["newer", "show"]);

    let calls = api.list_calls.load(Ordering::SeqCst);
    store
        .list_magnets(&ctx, ListMagnetsParams::new(1, 1))
        .await
        .unwrap();
    assert_eq!(api.list_calls.load(Ordering::SeqCst), calls);

    assert_eq!(store.remove_magnet(&ctx, "newer").await.unwrap(), "newer");

    let page = store
        .list_magnets(&ctx, ListMagnetsParams::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 1);
    assert!(page.items.iter().all(|i| i.id != "newer"));
}

#[tokio::test]
async fn test_add_existing_magnet_reuses_item() {
    let api = populated();
    let store = store(api.clone());

    let item = store
        .add_magnet(&StoreContext::new(), AddMagnetInput::Magnet(magnet(HASH_A)))
        .await
        .unwrap();

    assert_eq!(item.id, "show");
    assert_eq!(item.files.len(), 2);
    assert!(api.drive.lock().unwrap().added_urls.is_empty());
}

#[tokio::test]
async fn test_add_magnet_pending_after_poll_budget() {
    let api = populated();
    let store = store(api.clone());
    let ctx = StoreContext::new();

    // Warm the listing cache so invalidation is observable.
    store
        .list_magnets(&ctx, ListMagnetsParams::default())
        .await
        .unwrap();

    let item = store
        .add_magnet(&ctx, AddMagnetInput::Magnet(magnet(HASH_B)))
        .await
        .unwrap();

    assert_eq!(item.id, "new-file");
    assert_eq!(item.hash, HASH_B);
    assert_eq!(item.status, MagnetStatus::Downloading);
    assert_eq!(api.drive.lock().unwrap().added_urls, vec![magnet(HASH_B)]);

    let calls = api.list_calls.load(Ordering::SeqCst);
    store
        .list_magnets(&ctx, ListMagnetsParams::default())
        .await
        .unwrap();
    assert!(api.list_calls.load(Ordering::SeqCst) > calls);
}

#[tokio::test]
async fn test_listing_fetched_while_polling_is_dropped() {
    let api = populated();
    let store = store(api.clone());
    let ctx = StoreContext::new();

    // The listing runs while add_magnet sleeps between task fetches.
    let (added, _) = tokio::join!(
        store.add_magnet(&ctx, AddMagnetInput::Magnet(magnet(HASH_B))),
        async {
            store
                .list_magnets(&ctx, ListMagnetsParams::default())
                .await
                .unwrap()
        }
    );
    assert_eq!(added.unwrap().status, MagnetStatus::Downloading);

    let calls = api.list_calls.load(Ordering::SeqCst);
    store
        .list_magnets(&ctx, ListMagnetsParams::default())
        .await
        .unwrap();
    assert!(api.list_calls.load(Ordering::SeqCst) > calls);
}

#[tokio::test]
async fn test_add_magnet_completes() {
    let api = FakePikPak::new().with_new_task_phase(PHASE_COMPLETE);
    // Outside My Pack, so the hash lookup misses it.
    api.put("staging", folder("new-file", "Fresh", &magnet(HASH_B)));
    api.put("new-file", file("x", "x.mkv", 9));
    let api = Arc::new(api);
    let store = store(api.clone());

    let item = store
        .add_magnet(&StoreContext::new(), AddMagnetInput::Magnet(magnet(HASH_B)))
        .await
        .unwrap();

    assert_eq!(item.id, "new-file");
    assert_eq!(item.name, "Fresh");
    assert_eq!(item.status, MagnetStatus::Downloaded);
    assert_eq!(item.files.len(), 1);
    assert_eq!(item.size, 9);
    assert_eq!(api.drive.lock().unwrap().added_urls.len(), 1);
}

#[tokio::test]
async fn test_add_torrent_unsupported() {
    let store = store(populated());
    let result = store
        .add_magnet(&StoreContext::new(), AddMagnetInput::Torrent(vec![1, 2, 3]))
        .await;
    assert!(matches!(
        result,
        Err(Error::Unsupported {
            store: StoreName::PikPak,
            ..
        })
    ));
}

#[tokio::test]
async fn test_add_magnet_cancelled() {
    let store = store(populated());
    let ctx = StoreContext::new();
    ctx.cancel.cancel();

    let result = store
        .add_magnet(&ctx, AddMagnetInput::Magnet(magnet(HASH_B)))
        .await;
    assert!(matches!(result, Err(Error::Cancelled(_))));
}

#[tokio::test]
async fn test_get_user_platinum_is_premium() {
    let store = store(populated());
    let user = store.get_user(&StoreContext::new()).await.unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.subscription_status, SubscriptionStatus::Premium);
}

#[tokio::test]
async fn test_check_magnet_reports_unknown() {
    let store = store(populated());
    let items = store
        .check_magnet(&StoreContext::new(), &[magnet(HASH_A), HASH_B.to_string()])
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.status == MagnetStatus::Unknown));
    assert_eq!(items[1].hash, HASH_B);
}

#[tokio::test]
async fn test_missing_credential() {
    let listing = ListingCache::new(
        StoreName::PikPak,
        Arc::new(MemoryCache::<Vec<MagnetSummary>>::new()),
        ListingCache::DEFAULT_TTL,
    );
    let store = PikPakStore::new(populated(), listing);
    let result = store.get_user(&StoreContext::new()).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    let ctx = StoreContext::new().with_api_key("request-token");
    assert!(store.get_user(&ctx).await.is_ok());
}

#[tokio::test]
async fn test_browse_includes_unfinished_downloads() {
    let api = populated();
    let mut running = folder("running", "Still going", &magnet(HASH_B));
    running.phase = PHASE_RUNNING.to_string();
    api.put("pack", running);
    let store = store(api);
    let ctx = StoreContext::new();
    let browser = store.browser().unwrap();

    let page = browser
        .list_files(&ctx, &ListFilesQuery::new("pack"))
        .await
        .unwrap();
    let ids: Vec<_> = page.files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["show", "running"]);
    assert!(!page.has_more);

    // The content listing only sees finished ones.
    let magnets = store
        .list_magnets(&ctx, ListMagnetsParams::default())
        .await
        .unwrap();
    assert_eq!(magnets.total_items, 1);
}

#[tokio::test]
async fn test_browse_pages_and_kind_filter() {
    let store = store(populated());
    let ctx = StoreContext::new();
    let browser = store.browser().unwrap();

    let first = browser
        .list_files(&ctx, &ListFilesQuery::new("show").with_page_size(1))
        .await
        .unwrap();
    assert_eq!(first.files[0].name, "a.mkv");
    assert!(first.has_more);

    let second = browser
        .list_files(
            &ctx,
            &ListFilesQuery::new("show")
                .with_page_size(1)
                .with_page_token(first.next_page_token),
        )
        .await
        .unwrap();
    assert_eq!(second.files[0].name, "extras");
    assert!(!second.has_more);

    let folders = browser
        .list_files(
            &ctx,
            &ListFilesQuery::new("show").with_kind(DriveItemKind::Folder),
        )
        .await
        .unwrap();
    assert_eq!(folders.files.len(), 1);
    assert!(folders.files[0].is_folder());

    let videos = browser
        .list_files(
            &ctx,
            &ListFilesQuery::new("show").with_mime_type("video/x-matroska"),
        )
        .await
        .unwrap();
    assert_eq!(videos.files.len(), 1);
    assert_eq!(videos.files[0].id, "a");
}

#[tokio::test]
async fn test_browse_walks_drive() {
    let store = store(populated());
    let ctx = StoreContext::new();
    let browser = store.browser().unwrap();

    let all = browser.list_files_recursive(&ctx, "").await.unwrap();
    let paths: Vec<_> = all.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "/My Pack",
            "/My Pack/Show",
            "/My Pack/Show/a.mkv",
            "/My Pack/Show/extras",
            "/My Pack/Show/extras/b.srt",
        ]
    );

    let flat = browser.list_files_flat(&ctx, "show").await.unwrap();
    let paths: Vec<_> = flat.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["/a.mkv", "/extras/b.srt"]);

    let videos = browser.list_video_files(&ctx, "show").await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].id, "a");
}

#[tokio::test]
async fn test_browse_lookups() {
    let api = populated();
    let store = store(api.clone());
    let ctx = StoreContext::new();
    let browser = store.browser().unwrap();

    let pack = browser.get_folder_by_name(&ctx, "", "My Pack").await.unwrap();
    assert_eq!(pack.id, "pack");
    let missing = browser.get_folder_by_name(&ctx, "", "Nope").await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    let found = browser.search_files(&ctx, "my pa", None).await.unwrap();
    assert_eq!(found.files.len(), 1);
    let blank = browser.search_files(&ctx, "", None).await;
    assert!(matches!(blank, Err(Error::InvalidInput(_))));

    let details = browser.get_file_details(&ctx, "a").await.unwrap();
    assert_eq!(details.size, 100);
    assert!(details.is_video());

    // Trashed files drop out of browsing too.
    store.remove_magnet(&ctx, "a").await.unwrap();
    let flat = browser.list_files_flat(&ctx, "show").await.unwrap();
    assert_eq!(flat.len(), 1);
    assert_eq!(flat[0].name, "b.srt");
}
