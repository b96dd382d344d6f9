use std::fs;
use std::sync::mpsc;

use tempfile::TempDir;
use treesync::store::{LocalDirStore, MemoryStore, RemoteStore};
use treesync::{Direction, RemoteEntry, StoreError, TransferEvent, TreeWalker};

fn sample_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .add_file("/a.txt", vec![b'a'; 10])
        .add_dir("/sub")
        .add_file("/sub/b.txt", vec![b'b'; 5]);
    store
}

fn deep_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .add_dir("/music")
        .add_file("/music/intro.mp3", vec![0u8; 100])
        .add_dir("/music/live")
        .add_file("/music/live/set1.mp3", vec![0u8; 250])
        .add_dir("/music/live/empty")
        .add_file("/readme.md", vec![0u8; 3])
        .add_dir("/photos")
        .add_file("/photos/cat.jpg", vec![0u8; 42]);
    store
}

#[test]
fn test_sample_tree_listing_and_size() {
    let walker = TreeWalker::new(sample_store());

    assert_eq!(walker.tree_size("/").unwrap(), 15);

    let entries = walker.list_tree("/").unwrap();
    assert_eq!(entries.len(), 3);
    assert!(matches!(&entries[0], RemoteEntry::File { name, size: 10, .. } if name == "a.txt"));
    assert!(matches!(&entries[1], RemoteEntry::Directory { name, .. } if name == "sub"));
    assert!(matches!(&entries[2], RemoteEntry::File { path, size: 5, .. } if path == "/sub/b.txt"));
}

#[test]
fn test_list_tree_directories_precede_their_contents() {
    let walker = TreeWalker::new(deep_store());
    let entries = walker.list_tree("/").unwrap();

    // every entry in the tree except the root itself
    assert_eq!(entries.len(), 8);

    for (idx, entry) in entries.iter().enumerate() {
        let Some(parent) = treesync::remote_path::parent(entry.path()) else {
            panic!("root listed as an entry");
        };
        if parent != "/" {
            let parent_idx = entries
                .iter()
                .position(|e| e.path() == parent)
                .expect("parent directory listed");
            assert!(parent_idx < idx, "{} listed before its parent", entry.path());
        }
    }
}

#[test]
fn test_tree_size_matches_sum_of_files() {
    let walker = TreeWalker::new(deep_store());
    let listed: u64 = walker
        .list_tree("/")
        .unwrap()
        .iter()
        .map(|e| match e {
            RemoteEntry::File { size, .. } => *size,
            RemoteEntry::Directory { .. } => 0,
        })
        .sum();

    assert_eq!(walker.tree_size("/").unwrap(), listed);
    assert_eq!(walker.tree_size("/music").unwrap(), 350);
    assert_eq!(walker.tree_size("/music/live/empty").unwrap(), 0);
    assert_eq!(walker.tree_size("/photos/cat.jpg").unwrap(), 42);
}

#[test]
fn test_list_tree_on_file_fails() {
    let walker = TreeWalker::new(sample_store());
    let err = walker.list_tree("a.txt").unwrap_err();
    assert!(matches!(err, StoreError::NotADirectory(ref p) if p == "/a.txt"));
}

#[test]
fn test_second_download_transfers_nothing() {
    let dir = TempDir::new().unwrap();
    let (tx, rx) = mpsc::channel::<TransferEvent>();
    let walker = TreeWalker::with_listener(deep_store(), tx);

    let first = walker.download_tree("/", dir.path()).unwrap();
    assert!(first.is_clean());
    assert_eq!(first.transferred.len(), 4);
    assert!(dir.path().join("music/live/empty").is_dir());
    assert_eq!(rx.try_iter().count(), 4);

    let second = walker.download_tree("/", dir.path()).unwrap();
    assert!(second.transferred.is_empty());
    assert_eq!(rx.try_iter().count(), 0);
}

#[test]
fn test_download_creates_missing_local_root() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a").join("b");
    let walker = TreeWalker::new(sample_store());

    walker.download_tree("/sub", &target).unwrap();
    assert_eq!(fs::read(target.join("b.txt")).unwrap(), vec![b'b'; 5]);
}

#[test]
fn test_download_of_missing_remote_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let walker = TreeWalker::new(sample_store());
    assert!(walker
        .download_tree("/nope", dir.path())
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_failed_subdirectory_is_isolated() {
    let dir = TempDir::new().unwrap();
    let store = deep_store();
    store.inject_failure("/music/live");
    let walker = TreeWalker::new(store);

    let report = walker.download_tree("/", dir.path()).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "/music/live");
    assert!(dir.path().join("music/intro.mp3").exists());
    assert!(dir.path().join("photos/cat.jpg").exists());
    assert!(dir.path().join("readme.md").exists());
}

#[test]
fn test_upload_tree_to_local_dir_store_twice() {
    let src = TempDir::new().unwrap();
    let remote_root = TempDir::new().unwrap();
    let album = src.path().join("album");
    fs::create_dir_all(album.join("disc1")).unwrap();
    fs::write(album.join("cover.png"), "png").unwrap();
    fs::write(album.join("disc1").join("track01.flac"), "flac").unwrap();

    let walker = TreeWalker::new(LocalDirStore::new(remote_root.path()));

    let first = walker.upload_tree(&album, true, "/").unwrap();
    assert!(first.is_clean());
    let second = walker.upload_tree(&album, true, "").unwrap();
    assert!(second.is_clean());
    assert_eq!(second.transferred.len(), 2);

    assert_eq!(
        fs::read_to_string(remote_root.path().join("album/disc1/track01.flac")).unwrap(),
        "flac"
    );
    assert_eq!(walker.tree_size("/album").unwrap(), 7);
}

#[test]
fn test_upload_events_only_with_listener() {
    let src = TempDir::new().unwrap();
    let docs = src.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.txt"), "a").unwrap();
    fs::write(docs.join("b.txt"), "bb").unwrap();

    let mut walker = TreeWalker::new(MemoryStore::new());
    let report = walker.upload_tree(&docs, true, "/").unwrap();
    assert_eq!(report.transferred.len(), 2);

    let (tx, rx) = mpsc::channel::<TransferEvent>();
    walker.set_listener(tx);
    walker.upload_tree(&docs, true, "/").unwrap();
    let events: Vec<TransferEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.direction == Direction::Upload));
    assert_eq!(events[1].remote_path, "/docs/b.txt");
    assert_eq!(events[1].bytes, 2);

    walker.clear_listener();
    walker.upload_file(&docs.join("a.txt"), true, "/docs").unwrap();
    assert_eq!(rx.try_iter().count(), 0);
}

#[test]
fn test_round_trip_through_local_dir_store() {
    let src = TempDir::new().unwrap();
    let remote_root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let project = src.path().join("project");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::write(project.join("Cargo.toml"), "[package]").unwrap();
    fs::write(project.join("src").join("main.rs"), "fn main() {}").unwrap();

    let walker = TreeWalker::new(LocalDirStore::new(remote_root.path()));
    walker.upload_tree(&project, true, "/").unwrap();
    let report = walker.download_tree("/project", out.path()).unwrap();

    assert!(report.is_clean());
    assert_eq!(
        treesync::tree::local_size(out.path()).unwrap(),
        treesync::tree::local_size(&project).unwrap()
    );
    assert!(walker.store().describe().starts_with("local:"));
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_is_walked_as_a_directory() {
    use std::os::unix::fs::symlink;

    let remote_root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::create_dir(remote_root.path().join("real")).unwrap();
    fs::write(remote_root.path().join("real").join("x.txt"), "hello").unwrap();
    symlink(remote_root.path().join("real"), remote_root.path().join("link")).unwrap();
    symlink(remote_root.path().join("gone"), remote_root.path().join("dangling")).unwrap();

    let walker = TreeWalker::new(LocalDirStore::new(remote_root.path()));

    let children = walker.store().list_children("/").unwrap();
    let link = children.iter().find(|e| e.name() == "link").unwrap();
    assert!(link.is_dir());
    assert!(walker.store().get_metadata("/link").unwrap().is_dir());
    assert!(children.iter().all(|e| e.name() != "dangling"));

    assert_eq!(walker.tree_size("/").unwrap(), 10);

    let report = walker.download_tree("/", out.path()).unwrap();
    assert!(report.is_clean());
    assert_eq!(fs::read_to_string(out.path().join("link").join("x.txt")).unwrap(), "hello");
}

#[test]
fn test_dot_dot_paths_stay_inside_store_root() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(outer.path().join("secret.txt"), "0123456789").unwrap();
    fs::write(root.join("inside.txt"), "abc").unwrap();

    let walker = TreeWalker::new(LocalDirStore::new(&root));
    assert!(walker.tree_size("/../secret.txt").unwrap_err().is_not_found());
    assert_eq!(walker.tree_size("/../inside.txt").unwrap(), 3);
    assert_eq!(walker.tree_size("/a/../..").unwrap(), 3);
}
