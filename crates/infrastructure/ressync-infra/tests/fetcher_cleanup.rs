use axum::http::StatusCode;
use axum::{body::Body, routing::get, Router};
use camino::Utf8PathBuf;
use ressync_infra::net::{default_http_client, DownloadEvent, FetchError, Fetcher};
use std::net::SocketAddr;
use tempfile::tempdir;

const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/ok/file.jar", get(|| async { Body::from("hello") }))
        .route(
            "/missing/file.jar",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn temp_dest() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempdir().unwrap();
    let dest = Utf8PathBuf::from_path_buf(dir.path().join("mods").join("file.jar")).unwrap();
    (dir, dest)
}

#[tokio::test]
async fn fetch_writes_verified_file() {
    let (addr, server) = start_server().await;
    let (_dir, dest) = temp_dest();
    let fetcher = Fetcher::new(default_http_client().unwrap());

    let written = fetcher
        .fetch(0, &format!("http://{addr}/ok/file.jar"), &dest, HELLO_MD5, None)
        .await
        .unwrap();

    assert_eq!(written, 5);
    assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    assert!(!dest.with_extension("part").exists());
    server.abort();
}

#[tokio::test]
async fn fetch_without_expected_hash_skips_verification() {
    let (addr, server) = start_server().await;
    let (_dir, dest) = temp_dest();
    let fetcher = Fetcher::new(default_http_client().unwrap());

    fetcher
        .fetch(0, &format!("http://{addr}/ok/file.jar"), &dest, "", None)
        .await
        .unwrap();

    assert!(dest.exists());
    server.abort();
}

#[tokio::test]
async fn non_200_leaves_destination_absent() {
    let (addr, server) = start_server().await;
    let (_dir, dest) = temp_dest();
    let fetcher = Fetcher::new(default_http_client().unwrap());

    let err = fetcher
        .fetch(
            0,
            &format!("http://{addr}/missing/file.jar"),
            &dest,
            HELLO_MD5,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status(404, _)));
    assert!(!dest.exists());
    assert!(!dest.with_extension("part").exists());
    server.abort();
}

#[tokio::test]
async fn hash_mismatch_deletes_download() {
    let (addr, server) = start_server().await;
    let (_dir, dest) = temp_dest();
    let fetcher = Fetcher::new(default_http_client().unwrap());

    let err = fetcher
        .fetch(
            0,
            &format!("http://{addr}/ok/file.jar"),
            &dest,
            "ffffffffffffffffffffffffffffffff",
            None,
        )
        .await
        .unwrap_err();

    match err {
        FetchError::HashMismatch { actual, .. } => assert_eq!(actual, HELLO_MD5),
        other => panic!("expected hash mismatch, got {other:?}"),
    }
    assert!(!dest.exists());
    assert!(!dest.with_extension("part").exists());
    server.abort();
}

#[tokio::test]
async fn progress_events_are_ordered_and_terminal() {
    let (addr, server) = start_server().await;
    let (_dir, dest) = temp_dest();
    let fetcher = Fetcher::new(default_http_client().unwrap());
    let (tx, mut rx) = tokio::sync::mpsc::channel(64);

    fetcher
        .fetch(
            42,
            &format!("http://{addr}/ok/file.jar"),
            &dest,
            HELLO_MD5,
            Some(&tx),
        )
        .await
        .unwrap();
    drop(tx);

    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }

    assert!(matches!(
        events.first(),
        Some(DownloadEvent::Started { id: 42, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(DownloadEvent::Completed {
            id: 42,
            success: true
        })
    ));

    let mut last = 0u64;
    for ev in &events {
        if let DownloadEvent::Progress { bytes_read, .. } = ev {
            assert!(*bytes_read >= last, "progress must be cumulative");
            last = *bytes_read;
        }
    }
    assert_eq!(last, 5);
    server.abort();
}
