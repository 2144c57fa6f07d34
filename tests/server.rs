//! HTTP round-trip tests for the upload / ask API.
//!
//! The router runs on a real socket with in-process embedding and
//! generation providers.

mod common;

use common::{engine_with, KeywordEmbedder, ScriptedGenerator};
use docsage::config::ServerConfig;
use docsage::server::build_router;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tempfile::TempDir;

const QA_REPLY: &str = r#"```json
{"mode": "qa", "answer": "The office is in Lyon.", "sources": [{"snippet": "head office is in Lyon"}]}
```"#;

async fn start_server(server: ServerConfig) -> String {
    let engine = engine_with(
        KeywordEmbedder::new("primary"),
        ScriptedGenerator::new(QA_REPLY),
    );
    let app = build_router(engine, &server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn upload(base: &str, filename: &str, body: &str) -> (u16, Value) {
    let part = Part::bytes(body.as_bytes().to_vec()).file_name(filename.to_string());
    let form = Form::new().part("file", part);
    let resp = reqwest::Client::new()
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn ask(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let base = start_server(ServerConfig::default()).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_upload_then_ask() {
    let base = start_server(ServerConfig::default()).await;

    let (status, body) = upload(
        &base,
        "report.txt",
        "Acme head office is in Lyon.\nEmployees: 40.",
    )
    .await;
    assert_eq!(status, 200, "upload failed: {}", body);
    assert_eq!(body["message"], "Document processed successfully");
    assert_eq!(body["filename"], "report.txt");
    assert_eq!(body["stats"]["chunks"], 1);
    assert!(body["stats"]["process_time_seconds"].as_f64().unwrap() >= 0.0);
    let doc_id = body["doc_id"].as_str().unwrap().to_string();

    // Without doc_id the most recent upload is used.
    let (status, body) = ask(&base, json!({ "question": "Where is the office?" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["mode"], "qa");
    assert_eq!(body["answer"], "The office is in Lyon.");
    assert_eq!(body["sources"][0]["snippet"], "head office is in Lyon");

    let (status, body) = ask(
        &base,
        json!({ "question": "Where is the office?", "doc_id": doc_id }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["mode"], "qa");
}

#[tokio::test]
async fn test_upload_errors() {
    let base = start_server(ServerConfig::default()).await;

    let (status, body) = upload(&base, "slides.docx", "binary").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Unsupported file type");

    let (status, body) = upload(&base, "blank.txt", "  \n\n  ").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Document is empty or scanned image.");

    let form = Form::new().text("note", "no file here");
    let resp = reqwest::Client::new()
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_ask_errors() {
    let base = start_server(ServerConfig::default()).await;

    let (status, body) = ask(&base, json!({ "question": "   " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing question");

    let (status, body) = ask(&base, json!({ "question": "Anything?" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["answer"], "Please upload a document first!");

    let (status, body) = ask(
        &base,
        json!({ "question": "Anything?", "doc_id": "no-such-doc" }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Document ID not found.");
}

#[tokio::test]
async fn test_static_frontend_served() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("index.html"), "<h1>DocSage</h1>").unwrap();
    let server = ServerConfig {
        static_dir: Some(tmp.path().to_path_buf()),
        ..ServerConfig::default()
    };
    let base = start_server(server).await;

    let resp = reqwest::get(format!("{}/", base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.text().await.unwrap().contains("DocSage"));

    // API routes still win over the static fallback.
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}
