//! Integration tests over a real local channel
//!
//! Each test binds its own channel (a socket inside a temp dir on Unix, a
//! uniquely named pipe on Windows) and drives a `PipeSession` against a
//! `FrameServer` or a hand-rolled host.

use std::path::Path;
use std::process::{Command as Process, Stdio};
use std::time::{Duration, Instant};

use interprocess::local_socket::traits::tokio::Listener as _;
use resource_pipe::ipc::{framer, transport, FrameServer, RequestHandler};
use resource_pipe::{Error, PipeSession, SessionState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Channel string unique to one test
fn channel_for(dir: &TempDir, name: &str) -> String {
    #[cfg(unix)]
    {
        dir.path()
            .join(format!("{}.sock", name))
            .to_string_lossy()
            .into_owned()
    }

    #[cfg(windows)]
    {
        let _ = dir;
        format!("resource-pipe-test-{}-{}", name, std::process::id())
    }
}

/// A running `FrameServer`; `stop` shuts it down and waits for it
struct TestHost {
    channel: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<resource_pipe::Result<()>>>,
    _dir: TempDir,
}

impl TestHost {
    async fn start<H: RequestHandler>(name: &str, handler: H) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let channel = channel_for(&dir, name);

        let server = FrameServer::bind(&channel)
            .await
            .expect("Failed to bind channel");
        let (shutdown, stop) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(handler, async move {
            let _ = stop.await;
        }));

        Self {
            channel,
            shutdown: Some(shutdown),
            task: Some(task),
            _dir: dir,
        }
    }

    async fn connect(&self) -> PipeSession {
        let mut session: PipeSession = PipeSession::new(&self.channel);
        session
            .connect(Duration::from_secs(5))
            .await
            .expect("Failed to connect to test host");
        session
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.unwrap().unwrap();
        }
    }
}

fn echo(request: Value) -> Option<Value> {
    Some(request)
}

#[tokio::test]
async fn test_sequential_requests_match_their_responses() {
    let host = TestHost::start("echo", echo).await;
    let mut session = host.connect().await;
    assert_eq!(session.state(), SessionState::Connected);

    let listed = session.list_resources().await.unwrap().unwrap();
    let executed = session
        .execute_in_resource("myresource", "C:\\x\\y.dll")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(listed, json!({"cmd": "list_resources_with_runtimes"}));
    assert_eq!(
        executed,
        json!({
            "cmd": "execute_in_resource",
            "resource": "myresource",
            "scriptFilePath": "C:\\x\\y.dll"
        })
    );

    session.close();
    host.stop().await;
}

#[tokio::test]
async fn test_listing_from_handler() {
    let host = TestHost::start("listing", |request: Value| {
        match request["cmd"].as_str() {
            Some("list_resources_with_runtimes") => {
                Some(json!([{"resource": "spawner", "runtime": "mono"}, {"resource": "chat"}]))
            }
            _ => Some(json!({"error": "unsupported"})),
        }
    })
    .await;
    let mut session = host.connect().await;

    let response = session.list_resources().await.unwrap().unwrap();
    assert_eq!(
        resource_pipe::ipc::protocol::resource_names(&response),
        vec!["spawner", "chat"]
    );

    session.close();
    host.stop().await;
}

#[tokio::test]
async fn test_many_round_trips_on_one_session() {
    let host = TestHost::start("many", echo).await;
    let mut session = host.connect().await;

    for i in 0..50 {
        let resource = format!("resource-{}", i);
        let response = session
            .execute_in_resource(&resource, "/srv/script.dll")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response["resource"], resource.as_str());
    }

    session.close();
    host.stop().await;
}

#[tokio::test]
async fn test_shared_session_serializes_callers() {
    let host = TestHost::start("shared", echo).await;
    let shared = host.connect().await.into_shared();

    let mut tasks = Vec::new();
    for caller in 0..4 {
        let shared = shared.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..10 {
                let resource = format!("caller-{}-{}", caller, i);
                let response = shared
                    .lock()
                    .await
                    .execute_in_resource(&resource, "/srv/a.dll")
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(response["resource"], resource.as_str());
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    shared.lock().await.close();
    host.stop().await;
}

#[tokio::test]
async fn test_two_sessions_on_one_host() {
    let host = TestHost::start("two", echo).await;
    let mut first = host.connect().await;
    let mut second = host.connect().await;

    let a = first.execute_in_resource("a", "/a.dll").await.unwrap().unwrap();
    let b = second.execute_in_resource("b", "/b.dll").await.unwrap().unwrap();

    assert_eq!(a["resource"], "a");
    assert_eq!(b["resource"], "b");

    first.close();
    second.close();
    host.stop().await;
}

#[tokio::test]
async fn test_connect_times_out_when_channel_missing() {
    let dir = tempfile::tempdir().unwrap();
    let mut session: PipeSession = PipeSession::new(&channel_for(&dir, "absent"));

    let started = Instant::now();
    let err = session
        .connect(Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectTimeout(100)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_connect_waits_for_late_host() {
    let dir = tempfile::tempdir().unwrap();
    let channel = channel_for(&dir, "late");

    let host_channel = channel.clone();
    let host = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let server = FrameServer::bind(&host_channel).await.unwrap();
        let (_keep, stop) = oneshot::channel::<()>();
        // Serve until the client below is done with us
        let _ = tokio::time::timeout(
            Duration::from_secs(5),
            server.serve(echo, async move {
                let _ = stop.await;
            }),
        )
        .await;
    });

    let mut session: PipeSession = PipeSession::new(&channel);
    session.connect(Duration::from_secs(5)).await.unwrap();
    let response = session.list_resources().await.unwrap();
    assert_eq!(response, Some(json!({"cmd": "list_resources_with_runtimes"})));

    session.close();
    host.abort();
}

#[cfg(unix)]
#[tokio::test]
async fn test_connect_error_on_stale_socket() {
    let dir = tempfile::tempdir().unwrap();
    let channel = channel_for(&dir, "stale");

    // Binding and dropping a std listener leaves the socket file behind
    drop(std::os::unix::net::UnixListener::bind(&channel).unwrap());
    assert!(Path::new(&channel).exists());

    let mut session: PipeSession = PipeSession::new(&channel);
    let err = session.connect(Duration::from_secs(1)).await.unwrap_err();

    assert!(matches!(err, Error::ConnectError(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let host = TestHost::start("twice", echo).await;
    let mut session = host.connect().await;

    let err = session.connect(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyConnected));
    assert_eq!(session.state(), SessionState::Connected);

    session.close();
    let err = session.connect(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed));

    host.stop().await;
}

#[tokio::test]
async fn test_host_hangup_yields_none() {
    // Handler declines to answer, so the host drops the client
    let host = TestHost::start("hangup", |_request: Value| None).await;
    let mut session = host.connect().await;

    assert_eq!(session.list_resources().await.unwrap(), None);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(
        session.list_resources().await,
        Err(Error::SessionClosed)
    ));

    host.stop().await;
}

#[tokio::test]
async fn test_request_timeout_against_silent_host() {
    let dir = tempfile::tempdir().unwrap();
    let channel = channel_for(&dir, "silent");
    let listener = transport::bind(&channel).await.unwrap();

    let host = tokio::spawn(async move {
        let stream = listener.accept().await.unwrap();
        let (mut reader, _writer) = tokio::io::split(stream);
        let request = framer::read_frame(&mut reader).await.unwrap();
        // Hold the connection open without answering
        tokio::time::sleep(Duration::from_millis(500)).await;
        request
    });

    let mut session: PipeSession = PipeSession::new(&channel)
        .with_request_timeout(Some(Duration::from_millis(100)));
    session.connect(Duration::from_secs(5)).await.unwrap();

    let err = session.list_resources().await.unwrap_err();
    assert!(matches!(err, Error::RequestTimeout(100)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Closed);

    let seen = host.await.unwrap();
    assert_eq!(seen, Some(json!({"cmd": "list_resources_with_runtimes"})));
}

#[tokio::test]
async fn test_malformed_response_is_protocol_error() {
    let dir = tempfile::tempdir().unwrap();
    let channel = channel_for(&dir, "garbage");
    let listener = transport::bind(&channel).await.unwrap();

    let host = tokio::spawn(async move {
        let stream = listener.accept().await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(stream);
        framer::read_frame(&mut reader).await.unwrap();
        framer::write_frame(&mut writer, b"not json at all").await.unwrap();
    });

    let mut session: PipeSession = PipeSession::new(&channel);
    session.connect(Duration::from_secs(5)).await.unwrap();

    let err = session.list_resources().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Closed);
    host.await.unwrap();
}

// === CLI against the mock host binary ===

/// Wait until the mock host's socket file shows up
fn wait_for_channel(channel: &str) {
    if !cfg!(unix) {
        return;
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while !Path::new(channel).exists() {
        assert!(Instant::now() < deadline, "mock host never created {}", channel);
        std::thread::sleep(Duration::from_millis(20));
    }
    // Socket file exists before listen() returns
    std::thread::sleep(Duration::from_millis(100));
}

fn run_cli(channel: &str, config_dir: &Path, args: &[&str]) -> std::process::Output {
    Process::new(env!("CARGO_BIN_EXE_resource-pipe"))
        .args(["--channel", channel, "--connect-timeout-ms", "10000"])
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run resource-pipe")
}

#[test]
fn test_cli_against_mock_host() {
    let dir = tempfile::tempdir().unwrap();
    let channel = channel_for(&dir, "cli");
    let config_dir = dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();

    let mut host = Process::new(env!("CARGO_BIN_EXE_mock-host"))
        .args(["--channel", &channel, "--resource", "alpha", "--resource", "beta"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn mock-host");
    wait_for_channel(&channel);

    let listed = run_cli(&channel, &config_dir, &["list"]);
    assert!(listed.status.success(), "list failed: {:?}", listed);
    let stdout = String::from_utf8_lossy(&listed.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["alpha", "beta"]);

    let script = dir.path().join("spawn.dll");
    std::fs::write(&script, b"MZ").unwrap();
    let script = script.to_str().unwrap();

    let executed = run_cli(&channel, &config_dir, &["exec", "alpha", script]);
    assert!(executed.status.success(), "exec failed: {:?}", executed);
    let response: Value = serde_json::from_slice(&executed.stdout).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["resource"], "alpha");

    let unknown = run_cli(&channel, &config_dir, &["exec", "gamma", script]);
    assert!(unknown.status.success());
    let response: Value = serde_json::from_slice(&unknown.stdout).unwrap();
    assert_eq!(response["success"], false);

    let missing = run_cli(&channel, &config_dir, &["exec", "alpha", "/definitely/not/here.dll"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Error:"));

    host.kill().ok();
    host.wait().ok();
}

#[test]
fn test_cli_reports_connect_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let channel = channel_for(&dir, "nobody");

    let output = Process::new(env!("CARGO_BIN_EXE_resource-pipe"))
        .args(["--channel", &channel, "--connect-timeout-ms", "100", "list"])
        .env("XDG_CONFIG_HOME", dir.path())
        .output()
        .expect("Failed to run resource-pipe");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Timed out after 100 ms"), "stderr: {}", stderr);
}
