use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use termtv::config::AppConfig;
use termtv::http::{bind, serve, BuildRegistry};
use termtv::lifecycle::{BuildLifecycle, RecordingLifecycle};
use termtv::runtime::FakeFileSystem;
use termtv::types::{BuildContext, RecordingName};

fn get(url: &str) -> (u16, Option<String>, Vec<u8>) {
    match ureq::get(url).call() {
        Ok(response) => {
            let status = response.status();
            let length = response.header("Content-Length").map(str::to_string);
            let mut body = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut body)
                .expect("read body");
            (status, length, body)
        }
        Err(ureq::Error::Status(status, _)) => (status, None, Vec::new()),
        Err(err) => panic!("request to {url} failed: {err}"),
    }
}

#[test]
fn server_streams_recording_bytes_through_the_build_lifecycle() {
    let fs = FakeFileSystem::with_file("/ws/session1", b"\x00live\xff".to_vec());
    let lifecycle = RecordingLifecycle::new(Arc::new(fs.clone()), AppConfig::default());
    let handle = lifecycle
        .on_build_start(
            BuildContext {
                build_id: "5".to_string(),
                workspace_dir: "/ws".into(),
                artifacts_dir: "/art".into(),
            },
            &RecordingName::parse("session1").expect("name"),
        )
        .expect("setup");

    let registry = Arc::new(BuildRegistry::new());
    registry.register(handle.clone());
    let server = Arc::new(bind("127.0.0.1:0").expect("bind"));
    let port = server.server_addr().to_ip().expect("ip addr").port();
    let base = format!("http://127.0.0.1:{port}");

    let worker = {
        let server = Arc::clone(&server);
        let registry = Arc::clone(&registry);
        thread::spawn(move || serve(&server, &registry, None))
    };

    let (status, length, body) = get(&format!("{base}/builds/5/termtv"));
    assert_eq!(status, 200);
    assert_eq!(length.as_deref(), Some("6"));
    assert_eq!(body, b"\x00live\xff");

    assert!(lifecycle.on_build_end(&handle).is_archived());
    fs.remove_file(Path::new("/ws/session1"));
    let (status, _, body) = get(&format!("{base}/builds/5/termtv/ignored/tail"));
    assert_eq!(status, 200);
    assert_eq!(body, b"\x00live\xff");

    let (status, _, _) = get(&format!("{base}/builds/6/termtv"));
    assert_eq!(status, 404);

    server.unblock();
    worker.join().expect("server thread");
}

#[test]
fn missing_recording_yields_empty_success_response() {
    let lifecycle =
        RecordingLifecycle::new(Arc::new(FakeFileSystem::default()), AppConfig::default());
    let registry = Arc::new(BuildRegistry::new());
    registry.register(
        lifecycle
            .on_build_start(
                BuildContext {
                    build_id: "8".to_string(),
                    workspace_dir: "/ws".into(),
                    artifacts_dir: "/art".into(),
                },
                &RecordingName::parse("session1").expect("name"),
            )
            .expect("setup"),
    );
    let server = Arc::new(bind("127.0.0.1:0").expect("bind"));
    let port = server.server_addr().to_ip().expect("ip addr").port();

    let worker = {
        let server = Arc::clone(&server);
        let registry = Arc::clone(&registry);
        thread::spawn(move || serve(&server, &registry, None))
    };

    let (status, _, body) = get(&format!("http://127.0.0.1:{port}/builds/8/termtv"));
    assert_eq!(status, 200);
    assert!(body.is_empty());

    server.unblock();
    worker.join().expect("server thread");
}
