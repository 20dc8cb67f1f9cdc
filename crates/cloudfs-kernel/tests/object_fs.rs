//! Integration tests for the object-store filesystem.
//!
//! Everything runs against `MemoryStore`, which counts calls and can fail
//! the next request of a given kind.

use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::AsyncWrite;

use cloudfs_kernel::{
    CloudFsConfig, FileProvider, FileSystem, FsFlow, MemoryStore, ObjectStoreFs, Presence,
    StoreOp, VfsError, READ_CHUNK_SIZE,
};

fn config() -> CloudFsConfig {
    CloudFsConfig::new("AKIA", "secret", "cms-media", "us-east-1")
}

fn setup() -> (Arc<MemoryStore>, ObjectStoreFs) {
    let store = Arc::new(MemoryStore::new("cms-media"));
    let fs = ObjectStoreFs::new(store.clone(), &config());
    (store, fs)
}

async fn write(fs: &ObjectStoreFs, path: &str, data: &[u8]) {
    fs.write_file(path, Bytes::copy_from_slice(data))
        .await
        .unwrap();
}

/// Sink that counts what it is given and throws it away.
#[derive(Default)]
struct CountingSink {
    bytes: u64,
    flushed: bool,
}

impl AsyncWrite for CountingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.get_mut().bytes += buf.len() as u64;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.get_mut().flushed = true;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_created_directory_is_listed_but_sentinel_is_not() {
    let (_store, fs) = setup();
    fs.create_directory("~/upload/28").await.unwrap();

    let dirs = fs.get_directories("~/upload").await.unwrap();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs[0].name, "28");
    assert_eq!(dirs[0].virtual_path, "~/upload/28");

    assert!(fs.get_files("~/upload/28").await.unwrap().is_empty());
    assert!(fs.directory_exists("~/upload/28").await);
    assert!(!fs.directory_exists("~/upload/29").await);
}

#[tokio::test]
async fn test_get_files_skips_zero_byte_objects() {
    let (_store, fs) = setup();
    write(&fs, "~/docs/report.pdf", b"%PDF-1.7").await;
    write(&fs, "~/docs/placeholder.txt", b"").await;
    write(&fs, "~/docs/nested/deep.txt", b"deep").await;

    let files = fs.get_files("~/docs/").await.unwrap();
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["report.pdf"]);
    assert_eq!(files[0].virtual_path, "~/docs/report.pdf");
    assert_eq!(files[0].length, 8);

    let dirs = fs.get_directories("~/docs").await.unwrap();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs[0].virtual_path, "~/docs/nested");
}

#[tokio::test]
async fn test_root_listing() {
    let (_store, fs) = setup();
    write(&fs, "~/top.txt", b"top").await;
    fs.create_directory("~/upload").await.unwrap();

    let files = fs.get_files("~/").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].virtual_path, "~/top.txt");

    let dirs = fs.get_directories("~").await.unwrap();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs[0].name, "upload");
}

#[tokio::test]
async fn test_listed_entries_are_addressable() {
    let (store, fs) = setup();
    for name in ["photo[1].jpg", "100%.png", "~me.txt", "a#b c.txt"] {
        write(&fs, &format!("~/upload/{name}"), b"data").await;
    }

    let files = fs.get_files("~/upload").await.unwrap();
    assert_eq!(files.len(), 4);
    for file in &files {
        assert_eq!(fs.get_file(&file.virtual_path).await.unwrap(), *file);
        assert!(fs.file_exists(&file.virtual_path).await);
        assert!(fs.public_url(&file.virtual_path).ends_with(&format!("/upload/{}", file.name)));
    }

    for file in &files {
        fs.delete_file(&file.virtual_path).await.unwrap();
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_list_failure_carries_context() {
    let (store, fs) = setup();
    store.fail_next(StoreOp::List);
    let err = fs.get_files("~/upload").await.unwrap_err();
    match err {
        VfsError::Store { op, key, bucket, .. } => {
            assert_eq!(op, StoreOp::List);
            assert_eq!(key, "upload/");
            assert_eq!(bucket, "cms-media");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Existence
// ============================================================================

#[tokio::test]
async fn test_exists_reports_false_on_store_failure() {
    let (store, fs) = setup();
    write(&fs, "~/a.txt", b"a").await;
    assert!(fs.file_exists("~/a.txt").await);

    store.fail_next(StoreOp::HeadObject);
    assert!(!fs.file_exists("~/a.txt").await);

    store.fail_next(StoreOp::HeadObject);
    assert!(fs.probe_file("~/a.txt").await.is_err());

    assert_eq!(fs.probe_file("~/a.txt").await.unwrap(), Presence::Present);
}

// ============================================================================
// Mutations and events
// ============================================================================

#[tokio::test]
async fn test_write_publishes_normalized_path() {
    let (_store, fs) = setup();
    let mut sub = fs.subscribe("file.*");

    write(&fs, "/upload/a.png", b"png").await;

    let msg = sub.try_recv().unwrap();
    assert_eq!(msg.subject, "file.written");
    assert_eq!(
        msg.payload,
        FsFlow::Written {
            path: "~/upload/a.png".into()
        }
    );
}

#[tokio::test]
async fn test_failed_write_publishes_nothing() {
    let (store, fs) = setup();
    let mut sub = fs.subscribe(">");

    store.fail_next(StoreOp::PutObject);
    let err = fs
        .write_file("~/a.txt", Bytes::from_static(b"a"))
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::Store { op: StoreOp::PutObject, .. }));
    assert!(sub.drain().is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_delete_event_carries_caller_path() {
    let (store, fs) = setup();
    write(&fs, "~/upload/old.jpg", b"jpg").await;
    let mut sub = fs.subscribe("file.deleted");

    fs.delete_file("upload/old.jpg").await.unwrap();

    assert!(store.is_empty());
    let msg = sub.try_recv().unwrap();
    assert_eq!(
        msg.payload,
        FsFlow::Deleted {
            path: "upload/old.jpg".into()
        }
    );
}

#[tokio::test]
async fn test_copy_applies_upload_headers() {
    let (store, fs) = setup();
    write(&fs, "~/a/logo.svg", b"<svg/>").await;
    let mut sub = fs.subscribe("file.copied");

    fs.copy_file("~/a/logo.svg", "/b/logo.svg").await.unwrap();

    let copy = store.object("b/logo.svg").unwrap();
    assert_eq!(copy.data, Bytes::from_static(b"<svg/>"));
    assert_eq!(copy.options.content_type.as_deref(), Some("image/svg+xml"));
    assert_eq!(
        copy.options.cache_control.as_deref(),
        Some("public, max-age=31536000")
    );
    assert!(store.object("a/logo.svg").is_some());

    assert_eq!(
        sub.try_recv().unwrap().payload,
        FsFlow::Copied {
            from: "~/a/logo.svg".into(),
            to: "~/b/logo.svg".into()
        }
    );
}

#[tokio::test]
async fn test_copy_missing_source_is_not_found() {
    let (_store, fs) = setup();
    let err = fs.copy_file("~/nope.txt", "~/dst.txt").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_move_publishes_only_moved() {
    let (store, fs) = setup();
    write(&fs, "~/in/a.txt", b"a").await;
    let mut sub = fs.subscribe(">");

    fs.move_file("~/in/a.txt", "~/out/a.txt").await.unwrap();

    assert_eq!(store.keys(), vec!["out/a.txt"]);
    let events: Vec<_> = sub.drain().into_iter().map(|m| m.payload).collect();
    assert_eq!(
        events,
        vec![FsFlow::Moved {
            from: "~/in/a.txt".into(),
            to: "~/out/a.txt".into()
        }]
    );
}

#[tokio::test]
async fn test_move_is_not_atomic_but_retry_converges() {
    let (store, fs) = setup();
    write(&fs, "~/in/a.txt", b"payload").await;
    let mut sub = fs.subscribe("file.moved");

    store.fail_next(StoreOp::DeleteObject);
    let err = fs.move_file("~/in/a.txt", "~/out/a.txt").await.unwrap_err();
    assert!(matches!(err, VfsError::Store { op: StoreOp::DeleteObject, .. }));

    // Copy landed, delete did not: both exist and no event went out.
    assert_eq!(store.keys(), vec!["in/a.txt", "out/a.txt"]);
    assert!(sub.drain().is_empty());

    fs.move_file("~/in/a.txt", "~/out/a.txt").await.unwrap();
    assert_eq!(store.keys(), vec!["out/a.txt"]);
    assert_eq!(
        store.object("out/a.txt").unwrap().data,
        Bytes::from_static(b"payload")
    );
    assert_eq!(sub.drain().len(), 1);
}

#[tokio::test]
async fn test_create_directory_writes_sentinel() {
    let (store, fs) = setup();
    let mut sub = fs.subscribe("directory.created");

    fs.create_directory("~/upload/28/").await.unwrap();

    let sentinel = store.object("upload/28/__empty").unwrap();
    assert!(sentinel.data.is_empty());
    assert_eq!(store.len(), 1);
    assert!(fs.directory_exists("~/upload/28").await);
    assert_eq!(
        sub.try_recv().unwrap().payload,
        FsFlow::DirectoryCreated {
            path: "~/upload/28".into()
        }
    );
}

// ============================================================================
// Directory removal
// ============================================================================

#[tokio::test]
async fn test_delete_directory_removes_whole_tree() {
    let (store, fs) = setup();
    fs.create_directory("~/site").await.unwrap();
    fs.create_directory("~/site/img").await.unwrap();
    fs.create_directory("~/site/img/thumbs").await.unwrap();
    write(&fs, "~/site/index.html", b"<html/>").await;
    write(&fs, "~/site/img/a.png", b"png").await;
    write(&fs, "~/site/img/empty.bin", b"").await;
    write(&fs, "~/site/img/thumbs/a.png", b"small").await;
    // Directory implied by a file, with no sentinel of its own.
    write(&fs, "~/site/css/main.css", b"body{}").await;
    write(&fs, "~/sitemap.xml", b"<urlset/>").await;
    write(&fs, "~/other/keep.txt", b"keep").await;

    let mut sub = fs.subscribe(">");
    fs.delete_directory("~/site").await.unwrap();

    assert_eq!(store.keys(), vec!["other/keep.txt", "sitemap.xml"]);
    let events: Vec<_> = sub.drain().into_iter().map(|m| m.payload).collect();
    assert_eq!(
        events,
        vec![FsFlow::DirectoryDeleted {
            path: "~/site".into()
        }]
    );
}

#[tokio::test]
async fn test_delete_directory_stops_on_failure() {
    let (store, fs) = setup();
    fs.create_directory("~/d").await.unwrap();
    write(&fs, "~/d/a.txt", b"a").await;
    let mut sub = fs.subscribe(">");

    store.fail_next(StoreOp::DeleteObject);
    assert!(fs.delete_directory("~/d").await.is_err());
    assert!(sub.drain().is_empty());

    fs.delete_directory("~/d").await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_move_directory_is_unsupported() {
    let (store, fs) = setup();
    fs.create_directory("~/a").await.unwrap();
    let mut sub = fs.subscribe(">");
    let calls = store.call_count();

    let err = fs.move_directory("~/a", "~/b").await.unwrap_err();
    assert!(matches!(err, VfsError::Unsupported("move_directory")));
    assert_eq!(store.call_count(), calls);
    assert!(sub.drain().is_empty());
}

// ============================================================================
// Reading
// ============================================================================

#[tokio::test]
async fn test_streaming_read_chunks() {
    for size in [0usize, 1, 32_768, 32_769, 10_000_000] {
        let store = Arc::new(MemoryStore::new("cms-media").with_max_read(1000));
        let fs = ObjectStoreFs::new(store.clone(), &config());
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        fs.write_file("~/blob.bin", Bytes::from(data)).await.unwrap();

        let mut sink = CountingSink::default();
        let stats = fs.read_file_contents("~/blob.bin", &mut sink).await.unwrap();

        let expected_chunks = size.div_ceil(READ_CHUNK_SIZE) as u64;
        assert_eq!(stats.bytes, size as u64, "size {size}");
        assert_eq!(stats.chunks, expected_chunks, "size {size}");
        assert_eq!(sink.bytes, size as u64, "size {size}");
        assert!(sink.flushed);
    }
}

#[tokio::test]
async fn test_streaming_read_preserves_content() {
    let (_store, fs) = setup();
    let data: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect();
    fs.write_file("~/x.bin", Bytes::from(data.clone()))
        .await
        .unwrap();

    let mut out: Vec<u8> = Vec::new();
    fs.read_file_contents("~/x.bin", &mut out).await.unwrap();
    assert_eq!(out, data);
}

#[tokio::test]
async fn test_streaming_read_missing_object() {
    let (_store, fs) = setup();
    let mut sink = CountingSink::default();
    let err = fs
        .read_file_contents("~/missing.bin", &mut sink)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("cms-media/missing.bin"));
    assert_eq!(sink.bytes, 0);
}

#[tokio::test]
async fn test_open_file_is_seekable() {
    use std::io::{Read, Seek, SeekFrom};

    let (_store, fs) = setup();
    write(&fs, "~/notes.txt", b"hello world").await;

    let mut cursor = fs.open_file("~/notes.txt").await.unwrap();
    cursor.seek(SeekFrom::Start(6)).unwrap();
    let mut rest = String::new();
    cursor.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "world");
}

#[tokio::test]
async fn test_write_from_reader() {
    let (store, fs) = setup();
    let mut reader: &[u8] = b"streamed upload";
    let written = fs.write_from_reader("~/up.txt", &mut reader).await.unwrap();
    assert_eq!(written, 15);
    assert_eq!(
        store.object("up.txt").unwrap().options.content_type.as_deref(),
        Some("text/plain")
    );
}

#[tokio::test]
async fn test_search_is_empty() {
    let (_store, fs) = setup();
    write(&fs, "~/findme.txt", b"x").await;
    let scopes = vec!["~/".to_string()];
    assert!(fs.search_files("findme", &scopes).await.is_empty());
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_config_file_drives_uploads() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
access_key_id = "AKIA"
secret_access_key = "secret"
bucket = "cms-media"
region = "eu-central-1"
public_read = false
cache_max_age_secs = 600
public_base_url = "https://cdn.example.com/"
"#
    )
    .unwrap();

    let provider = FileProvider::load(file.path()).unwrap();
    let config = CloudFsConfig::from_provider(&provider).unwrap();
    let store = Arc::new(MemoryStore::new("cms-media"));
    let fs = ObjectStoreFs::new(store.clone(), &config);

    write(&fs, "~/a.css", b"a{}").await;
    let object = store.object("a.css").unwrap();
    assert_eq!(object.options.acl, cloudfs_kernel::ObjectAcl::Private);
    assert_eq!(object.options.cache_control.as_deref(), Some("public, max-age=600"));
    assert_eq!(fs.public_url("~/a.css"), "https://cdn.example.com/a.css");
}

#[test]
fn test_missing_config_fails_fast() {
    let provider = FileProvider::parse("bucket = \"b\"\nregion = \"r\"").unwrap();
    let err = ObjectStoreFs::from_provider(&provider).unwrap_err();
    assert!(matches!(err, VfsError::Config(_)));
    assert!(err.to_string().contains("access_key_id"));
}
