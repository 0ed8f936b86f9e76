use chanarch::cli::Cli;
use chanarch::prelude::*;
use clap::Parser;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints::custom(
        &format!("{}/api", server.uri()),
        &format!("{}/media", server.uri()),
    )
    .unwrap()
}

async fn mount_thread(server: &MockServer, board: &str, id: u64, files: &[(&str, &str, usize)]) {
    let posts: Vec<_> = files
        .iter()
        .enumerate()
        .map(|(i, (tim, ext, size))| json!({"no": id + i as u64, "tim": tim, "ext": ext, "fsize": size}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/{board}/thread/{id}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "posts": posts })))
        .mount(server)
        .await;
    for (tim, ext, size) in files {
        Mock::given(method("GET"))
            .and(path(format!("/media/{board}/{tim}{ext}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x5au8; *size]))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn single_thread_end_to_end() {
    let server = MockServer::start().await;
    mount_thread(&server, "wg", 12345, &[("a", ".jpg", 500), ("b", ".png", 1000)]).await;

    let tmp = tempfile::tempdir().unwrap();
    let mut config = RunConfiguration::new(tmp.path());
    config.input_urls = vec!["https://boards.example.org/wg/thread/12345".into()];
    config.endpoints = endpoints(&server);

    let summary = chanarch::run(config).await.unwrap();

    let dir = tmp.path().join("wg_12345");
    assert_eq!(std::fs::metadata(dir.join("a.jpg")).unwrap().len(), 500);
    assert_eq!(std::fs::metadata(dir.join("b.png")).unwrap().len(), 1000);
    assert_eq!(
        summary,
        RunSummary {
            threads_processed: 1,
            threads_skipped: 0,
            files_downloaded: 2,
            files_skipped: 0,
            files_failed: 0,
        }
    );
}

#[tokio::test]
async fn second_run_skips_everything() {
    let server = MockServer::start().await;
    mount_thread(&server, "wg", 12345, &[("a", ".jpg", 500), ("b", ".png", 1000)]).await;

    let tmp = tempfile::tempdir().unwrap();
    let mut config = RunConfiguration::new(tmp.path());
    config.input_urls = vec!["https://boards.example.org/wg/thread/12345".into()];
    config.endpoints = endpoints(&server);

    chanarch::run(config.clone()).await.unwrap();
    let summary = chanarch::run(config).await.unwrap();

    assert_eq!(summary.threads_processed, 1);
    assert_eq!(summary.files_downloaded, 0);
    assert_eq!(summary.files_skipped, 2);
}

#[tokio::test]
async fn failing_thread_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/wg/thread/1.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/wg/thread/2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gone</html>"))
        .mount(&server)
        .await;
    mount_thread(&server, "p", 3, &[("c", ".gif", 64), ("d", ".webm", 128)]).await;

    let tmp = tempfile::tempdir().unwrap();
    let mut config = RunConfiguration::new(tmp.path());
    config.input_urls = vec![
        "https://boards.example.org/wg/thread/1".into(),
        "https://boards.example.org/wg/thread/2".into(),
        "https://boards.example.org/p/thread/3".into(),
    ];
    config.endpoints = endpoints(&server);

    let summary = chanarch::run(config).await.unwrap();

    assert_eq!(summary.threads_skipped, 2);
    assert_eq!(summary.threads_processed, 1);
    assert_eq!(summary.files_downloaded, 2);
    assert!(!tmp.path().join("wg_1").exists());
    assert_eq!(std::fs::metadata(tmp.path().join("p_3/d.webm")).unwrap().len(), 128);
}

#[tokio::test]
async fn failing_file_does_not_stop_the_thread() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/wg/thread/7.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [
                {"no": 7, "tim": 100, "ext": ".jpg", "fsize": 10},
                {"no": 8, "tim": 200, "ext": ".jpg", "fsize": 20}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/wg/100.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/wg/200.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 20]))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let mut config = RunConfiguration::new(tmp.path());
    config.input_urls = vec!["http://boards.example.org/wg/thread/7".into()];
    config.endpoints = endpoints(&server);

    let summary = chanarch::run(config).await.unwrap();

    assert_eq!(summary.threads_processed, 1);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_downloaded, 1);
    assert_eq!(std::fs::metadata(tmp.path().join("wg_7/200.jpg")).unwrap().len(), 20);
}

#[tokio::test]
async fn list_file_blank_lines_add_nothing() {
    let server = MockServer::start().await;
    mount_thread(&server, "wg", 10, &[("x", ".jpg", 8)]).await;
    mount_thread(&server, "wg", 11, &[("y", ".jpg", 16)]).await;

    let tmp = tempfile::tempdir().unwrap();
    let list = tmp.path().join("threads.txt");
    std::fs::write(
        &list,
        "https://boards.example.org/wg/thread/10\n\nhttps://boards.example.org/wg/thread/11\n",
    )
    .unwrap();
    let out = tmp.path().join("out");

    let cli = Cli::try_parse_from([
        "chanarch",
        "-f",
        list.to_str().unwrap(),
        "-d",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let mut config = cli.into_config();
    config.endpoints = endpoints(&server);

    let urls = chanarch::manager::collect_thread_urls(&config).await.unwrap();
    assert_eq!(urls.len(), 2);

    let summary = chanarch::run(config).await.unwrap();
    assert_eq!(summary.threads_processed, 2);
    assert_eq!(summary.threads_skipped, 0);
    assert_eq!(summary.files_downloaded, 2);
    assert!(out.join("wg_10/x.jpg").is_file());
    assert!(out.join("wg_11/y.jpg").is_file());
}

#[tokio::test]
async fn unwritable_base_directory_aborts_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let mut config = RunConfiguration::new(blocker.join("out"));
    config.input_urls = vec!["https://boards.example.org/wg/thread/1".into()];

    let err = chanarch::run(config).await.unwrap_err();
    assert!(matches!(err, RunError::BaseDirectory(_)));
}
