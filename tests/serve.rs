// End-to-end tests over real sockets: bind on an ephemeral port, speak raw
// HTTP/1.1, stop the server through its shutdown future.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use dirhost::{Config, Server, ServerError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

struct RawResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

fn config_for(root: &Path, port: u16) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;
    config.server.root = Some(root.to_string_lossy().into_owned());
    config.logging.access_log = false;
    config
}

fn start(root: &Path) -> Running {
    start_with(config_for(root, 0))
}

fn start_with(config: Config) -> Running {
    let server = Server::bind(config).unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run(async move {
        let _ = stopped.await;
    }));
    Running { addr, stop, handle }
}

async fn fetch(addr: SocketAddr, method: &str, target: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request =
        format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    parse_response(&raw)
}

fn parse_response(raw: &[u8]) -> RawResponse {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = std::str::from_utf8(&raw[..split]).unwrap();
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap();
    let status = status_line
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: raw[split + 4..].to_vec(),
    }
}

/// `<tmp>/root` is served, `<tmp>/secret` sits next to it
fn layout() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(dir.path().join("secret"), "do not serve").unwrap();
    std::fs::write(root.join("index.html"), "<h1>hi</h1>").unwrap();
    (dir, root)
}

#[tokio::test]
async fn serves_file_with_content_type() {
    let (_dir, root) = layout();
    let server = start(&root);

    let resp = fetch(server.addr, "GET", "/index.html").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.headers["content-type"], "text/html");
    assert_eq!(resp.headers["content-length"], "11");
    assert_eq!(resp.body, b"<h1>hi</h1>");
}

#[tokio::test]
async fn missing_file_is_404() {
    let (_dir, root) = layout();
    let server = start(&root);

    let resp = fetch(server.addr, "GET", "/does-not-exist").await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn traversal_is_refused() {
    let (_dir, root) = layout();
    let server = start(&root);

    for target in ["/../secret", "/%2e%2e/secret", "/a/../../secret"] {
        let resp = fetch(server.addr, "GET", target).await;
        assert_eq!(resp.status, 403, "{target}");
        assert!(!resp.body.windows(12).any(|w| w == b"do not serve"));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_out_of_root_is_refused() {
    let (dir, root) = layout();
    std::os::unix::fs::symlink(dir.path().join("secret"), root.join("escape")).unwrap();
    let server = start(&root);

    let resp = fetch(server.addr, "GET", "/escape").await;
    assert_eq!(resp.status, 403);
}

#[tokio::test]
async fn head_has_get_headers_and_no_body() {
    let (_dir, root) = layout();
    let server = start(&root);

    let get = fetch(server.addr, "GET", "/index.html").await;
    let head = fetch(server.addr, "HEAD", "/index.html").await;
    assert_eq!(head.status, 200);
    assert_eq!(head.headers["content-type"], get.headers["content-type"]);
    assert_eq!(head.headers["content-length"], get.headers["content-length"]);
    assert!(head.body.is_empty());
}

#[tokio::test]
async fn directory_without_index_is_listed() {
    let (_dir, root) = layout();
    std::fs::create_dir(root.join("docs")).unwrap();
    std::fs::write(root.join("docs").join("a b.txt"), "a").unwrap();
    std::fs::create_dir(root.join("docs").join("sub")).unwrap();
    let server = start(&root);

    let resp = fetch(server.addr, "GET", "/docs/").await;
    assert_eq!(resp.status, 200);
    assert!(resp.headers["content-type"].starts_with("text/html"));
    let body = String::from_utf8(resp.body).unwrap();
    assert!(body.contains("Directory listing for /docs/"));
    assert!(body.contains("href=\"a%20b.txt\""));
    assert!(body.contains("href=\"sub/\""));
}

#[tokio::test]
async fn root_without_index_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "n").unwrap();
    std::fs::create_dir(dir.path().join("pics")).unwrap();
    let server = start(dir.path());

    let resp = fetch(server.addr, "GET", "/").await;
    assert_eq!(resp.status, 200);
    assert!(resp.headers["content-type"].starts_with("text/html"));
    let body = String::from_utf8(resp.body).unwrap();
    assert!(body.contains("Directory listing for /"));
    assert!(body.contains("href=\"notes.txt\""));
    assert!(body.contains("href=\"pics/\""));
}

#[tokio::test]
async fn slow_download_outlives_idle_timeout() {
    let (_dir, root) = layout();
    let data: Vec<u8> = (0..4 * 1024 * 1024).map(|i: u32| (i % 251) as u8).collect();
    std::fs::write(root.join("big.bin"), &data).unwrap();

    let mut config = config_for(&root, 0);
    config.performance.connection_timeout = 1;
    let server = start_with(config);

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /big.bin HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let started = Instant::now();
    let mut raw = Vec::new();
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    assert!(started.elapsed() > Duration::from_secs(1));

    let resp = parse_response(&raw);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.headers["content-length"], data.len().to_string());
    assert_eq!(resp.body.len(), data.len());
    assert!(resp.body == data);
}

#[tokio::test]
async fn idle_connection_is_closed() {
    let (_dir, root) = layout();
    let mut config = config_for(&root, 0);
    config.performance.connection_timeout = 1;
    let server = start_with(config);

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let mut buf = Vec::new();
    let closed = tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut buf)).await;
    assert!(closed.is_ok(), "idle connection was left open");
}

#[tokio::test]
async fn unsupported_method_is_501() {
    let (_dir, root) = layout();
    let server = start(&root);

    let resp = fetch(server.addr, "DELETE", "/index.html").await;
    assert_eq!(resp.status, 501);
    assert!(root.join("index.html").exists());
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let (_dir, root) = layout();
    for i in 0..16 {
        std::fs::write(root.join(format!("file{i}.txt")), format!("content {i}")).unwrap();
    }
    let server = start(&root);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let addr = server.addr;
            tokio::spawn(async move { (i, fetch(addr, "GET", &format!("/file{i}.txt")).await) })
        })
        .collect();

    for task in tasks {
        let (i, resp) = task.await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, format!("content {i}").into_bytes());
    }
}

#[tokio::test]
async fn port_in_use_fails_to_bind() {
    let (_dir, root) = layout();
    let server = start(&root);

    let result = Server::bind(config_for(&root, server.addr.port()));
    assert!(matches!(result, Err(ServerError::Bind { .. })));
}

#[tokio::test]
async fn missing_root_fails_to_bind() {
    let dir = tempfile::tempdir().unwrap();
    let result = Server::bind(config_for(&dir.path().join("nope"), 0));
    assert!(matches!(result, Err(ServerError::Root { .. })));
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let (_dir, root) = layout();
    let server = start(&root);

    assert_eq!(fetch(server.addr, "GET", "/").await.status, 200);

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
    assert!(TcpStream::connect(server.addr).await.is_err());
}
