#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub front: PathBuf,
    pub side: PathBuf,
    cargo_home: PathBuf,
    rustup_home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create isolated home");

        let front = tmp.path().join("front.png");
        let side = tmp.path().join("side.png");
        fs::write(&front, b"\x89PNG\r\n\x1a\nfront").expect("write front fixture");
        fs::write(&side, b"\x89PNG\r\n\x1a\nside").expect("write side fixture");

        let orig_home = std::env::var("HOME").unwrap_or_default();
        let cargo_home = PathBuf::from(&orig_home).join(".cargo");
        let rustup_home = PathBuf::from(&orig_home).join(".rustup");

        Self {
            _tmp: tmp,
            home,
            front,
            side,
            cargo_home,
            rustup_home,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("faceai");
        cmd.env("HOME", &self.home)
            .env("CARGO_HOME", &self.cargo_home)
            .env("RUSTUP_HOME", &self.rustup_home)
            .env_remove("FACEAI_API_URL")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn write_config(&self, raw: &str) {
        let dir = self.home.join(".config/faceai");
        fs::create_dir_all(&dir).expect("create config dir");
        fs::write(dir.join("config.toml"), raw).expect("write config");
    }

    pub fn front_arg(&self) -> &str {
        self.front.to_str().expect("front path utf8")
    }

    pub fn side_arg(&self) -> &str {
        self.side.to_str().expect("side path utf8")
    }

    pub fn analyze(&self, api_url: &str, extra: &[&str]) -> Command {
        let mut cmd = self.cmd();
        cmd.args(["--api-url", api_url, "analyze"])
            .args(["--front", self.front_arg(), "--side", self.side_arg()])
            .args(extra);
        cmd
    }

    pub fn run_json(&self, mut cmd: Command) -> Value {
        let out = cmd
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }
}

/// One multipart field as seen by the mock service.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct RecordedRequest {
    pub fields: Vec<Field>,
}

impl RecordedRequest {
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name)
            .map(|f| String::from_utf8_lossy(&f.data).to_string())
    }
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<(u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    delay: Duration,
}

pub struct MockService {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    /// Serves `/api/analyze` with the scripted `(status, body)` replies, in order.
    pub fn start(replies: Vec<(u16, String)>) -> Self {
        Self::start_delayed(replies, Duration::ZERO)
    }

    /// Like [`MockService::start`], but each analysis reply is held back for `delay`.
    pub fn start_delayed(replies: Vec<(u16, String)>, delay: Duration) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay,
        };
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock");
        listener.set_nonblocking(true).expect("nonblocking mock");
        let addr = listener.local_addr().expect("mock addr");
        let app = Router::new()
            .route("/api/analyze", post(analyze))
            .route("/api/health", get(health))
            .with_state(state.clone());

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock runtime");
            rt.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("serve mock");
            });
        });

        Self {
            url: format!("http://{}", addr),
            requests: state.requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

async fn analyze(State(state): State<MockState>, mut multipart: Multipart) -> (StatusCode, String) {
    let mut recorded = RecordedRequest::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        recorded.fields.push(Field {
            name,
            content_type,
            data,
        });
    }
    state.requests.lock().expect("requests lock").push(recorded);
    tokio::time::sleep(state.delay).await;
    let (status, body) = state
        .replies
        .lock()
        .expect("replies lock")
        .pop_front()
        .unwrap_or((500, "no scripted reply".to_string()));
    (
        StatusCode::from_u16(status).expect("valid status"),
        body,
    )
}

async fn health() -> &'static str {
    r#"{"ok": true}"#
}

/// A port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn analysis_body(warnings: &[&str]) -> String {
    json!({
        "ok": true,
        "all_landmarks_count": 478,
        "gender": "female",
        "mandatory_landmarks": [
            {"label": "Tr_R", "index": null, "pixel": null, "normalized": null},
            {"label": "N", "index": 168, "pixel": {"x": 210.0, "y": 190.5},
             "normalized": {"x": 0.5, "y": 0.31, "z": -0.02}}
        ],
        "measurements": [
            {"id": "nose_width", "label": "Al-Al", "image": "front",
             "points": ["Al_R", "Al_L"], "value": 41.267, "unit": "px"},
            {"id": "face_height", "label": "Tr-Me", "image": "front",
             "points": ["Tr_R", "Me"], "value": null, "unit": "px", "note": "Tr unavailable"}
        ],
        "ratios": [
            {"id": "nose_to_face", "numerator": "nose_width", "denominator": "face_height",
             "value": null, "note": null}
        ],
        "annotated_images": {
            "front": "data:image/png;base64,AAAA",
            "side": "data:image/png;base64,BBBB",
            "front_all": "data:image/png;base64,CCCC",
            "side_all": "data:image/png;base64,DDDD",
            "tr_hair_mask": "data:image/png;base64,EEEE",
            "tr_custom_step": "data:image/png;base64,FFFF"
        },
        "warnings": warnings
    })
    .to_string()
}

pub const NO_TRICHION: &str =
    "Trichion (Tr) unavailable; hairline segmentation did not return a result.";
pub const MANUAL_TRICHION: &str = "Trichion (Tr) set manually.";
