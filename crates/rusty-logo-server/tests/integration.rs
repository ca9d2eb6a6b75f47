//! Server integration tests: start a real listener and talk to it over TCP.
//!
//! Run with: `cargo test -p rusty-logo-server --test integration`

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rusty_logo_core::config::{Config, ServerConfig};

async fn start_test_server(config: Config) -> (SocketAddr, CancellationToken, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move {
        rusty_logo_server::serve(listener, config, token)
            .await
            .expect("server failed");
    });
    (addr, shutdown, handle)
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    /// Next line without its CRLF, or `None` at EOF.
    async fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = tokio::time::timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        if n == 0 {
            return None;
        }
        assert!(line.ends_with("\r\n"), "line not CRLF-terminated: {line:?}");
        line.truncate(line.len() - 2);
        Some(line)
    }

    async fn recv_n(&mut self, n: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(n);
        for _ in 0..n {
            lines.push(self.recv().await.expect("unexpected EOF"));
        }
        lines
    }
}

#[tokio::test]
async fn test_hello_and_coord() {
    let (addr, shutdown, _handle) = start_test_server(Config::default()).await;

    let mut client = Client::connect(addr).await;
    assert_eq!(client.recv().await.as_deref(), Some("hello"));

    client.send("coord").await;
    client.send("invalid").await;
    client.send("coord").await;
    assert_eq!(client.recv_n(2).await, vec!["(15,15)", "(15,15)"]);

    client.send("quit").await;
    assert_eq!(client.recv().await, None);

    shutdown.cancel();
}

#[tokio::test]
async fn test_pipelined_commands_keep_order() {
    let (addr, shutdown, _handle) = start_test_server(Config::default()).await;

    let mut client = Client::connect(addr).await;
    client
        .writer
        .write_all(b"coord\r\nright\r\nsteps 3\r\ncoord\r\nrender\r\ncoord\r\nquit\r\n")
        .await
        .unwrap();

    assert_eq!(client.recv().await.as_deref(), Some("hello"));
    assert_eq!(client.recv().await.as_deref(), Some("(15,15)"));
    assert_eq!(client.recv().await.as_deref(), Some("(18,15)"));
    let render = client.recv_n(31).await;
    assert_eq!(render[15], format!("{}###{}", ".".repeat(15), ".".repeat(13)));
    assert_eq!(client.recv().await.as_deref(), Some("(18,15)"));
    assert_eq!(client.recv().await, None);

    shutdown.cancel();
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (addr, shutdown, _handle) = start_test_server(Config::default()).await;

    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    a.recv().await;
    b.recv().await;

    a.send("steps 7").await;
    a.send("coord").await;
    assert_eq!(a.recv().await.as_deref(), Some("(15,8)"));

    // b starts from a blank canvas regardless of what a drew
    b.send("render").await;
    let blank = b.recv_n(31).await;
    assert!(blank.iter().all(|row| row == &".".repeat(31)));

    // identical command sequences give identical renderings
    b.send("steps 7").await;
    a.send("render").await;
    b.send("render").await;
    assert_eq!(a.recv_n(31).await, b.recv_n(31).await);

    shutdown.cancel();
}

#[tokio::test]
async fn test_framed_canvas_from_config() {
    let config: Config = serde_json::from_str(
        r#"{ "canvas": { "width": 4, "height": 2, "style": "framed" } }"#,
    )
    .unwrap();
    let (addr, shutdown, _handle) = start_test_server(config).await;

    let mut client = Client::connect(addr).await;
    client.recv().await;
    client.send("coord").await;
    client.send("steps").await;
    client.send("render").await;
    assert_eq!(
        client.recv_n(6).await,
        vec!["(2,1)", "╔════╗", "║    ║", "║  * ║", "╚════╝", ""]
    );

    shutdown.cancel();
}

#[tokio::test]
async fn test_connection_limit_per_ip() {
    let config = Config {
        server: Some(ServerConfig {
            max_connections_per_ip: Some(1),
            ..ServerConfig::default()
        }),
        ..Config::default()
    };
    let (addr, shutdown, _handle) = start_test_server(config).await;

    let mut first = Client::connect(addr).await;
    assert_eq!(first.recv().await.as_deref(), Some("hello"));

    let mut second = Client::connect(addr).await;
    assert_eq!(second.recv().await, None, "second connection should be refused");

    first.send("quit").await;
    assert_eq!(first.recv().await, None);

    // the slot is released once the first session task finishes
    let mut greeted = false;
    for _ in 0..50 {
        let mut retry = Client::connect(addr).await;
        if retry.recv().await.as_deref() == Some("hello") {
            greeted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(greeted, "slot was never released");

    shutdown.cancel();
}

#[tokio::test]
async fn test_shutdown_closes_open_sessions() {
    let (addr, shutdown, handle) = start_test_server(Config::default()).await;

    let mut client = Client::connect(addr).await;
    assert_eq!(client.recv().await.as_deref(), Some("hello"));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();

    let mut rest = Vec::new();
    client.reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}
