use axum::body::Body;
use axum::http::Request;
use clip_core::ClipConfig;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "recorder-boundary";

fn upload_body(nonce: &str, storage: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"upload_nonce\"\r\n\r\n{nonce}\r\n"
    )
    .into_bytes();
    if let Some(storage) = storage {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"requested_storage\"\r\n\r\n{storage}\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\nstandups\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"note.webm\"\r\nContent-Type: audio/webm\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/uploads")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-user-id", "7")
        .body(Body::from(body))
        .unwrap()
}

async fn json(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn build_requires_a_nonce() {
    let media = tempfile::tempdir().unwrap();
    let mut config = ClipConfig::new();
    config.set("store.root", media.path().to_string_lossy());

    assert!(voice_recorder::build_with(config).await.is_err());
}

#[tokio::test]
async fn uploaded_clip_is_served_from_its_locator() {
    let media = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let mut config = ClipConfig::new();
    config.set("auth.nonce", "s3cret");
    config.set("store.root", media.path().to_string_lossy());
    config.set("upload.staging_dir", staging.path().to_string_lossy());
    config.set("http.port", "4040");

    let recorder = voice_recorder::build_with(config).await.unwrap();
    assert_eq!(recorder.addr(), "127.0.0.1:4040");
    let router = recorder.app.into_router();

    let res = router
        .clone()
        .oneshot(upload(upload_body("s3cret", None, b"fake-webm")))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body = json(res).await;
    assert_eq!(body["storage"]["provider"], "default");
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/"));

    let res = router
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"fake-webm");
}

#[tokio::test]
async fn archive_handler_claims_requested_uploads() {
    let media = tempfile::tempdir().unwrap();
    let archive = tempfile::tempdir().unwrap();
    let mut config = ClipConfig::new();
    config.set("auth.nonce", "s3cret");
    config.set("store.root", media.path().to_string_lossy());
    config.set("archive.root", archive.path().to_string_lossy());

    let router = voice_recorder::build_with(config)
        .await
        .unwrap()
        .app
        .into_router();

    let res = router
        .oneshot(upload(upload_body("s3cret", Some("archive"), b"clip")))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let body = json(res).await;
    assert_eq!(body["storage"]["provider"], "archive");
    assert!(body["attachment_id"].is_null());
    assert!(body["url"].as_str().unwrap().starts_with("/archive/standups/"));
}

#[tokio::test]
async fn stored_files_are_served_under_configured_base_url() {
    let media = tempfile::tempdir().unwrap();
    let mut config = ClipConfig::new();
    config.set("auth.nonce", "s3cret");
    config.set("store.root", media.path().to_string_lossy());
    config.set("store.base_url", "/files/");

    let router = voice_recorder::build_with(config)
        .await
        .unwrap()
        .app
        .into_router();

    let res = router
        .clone()
        .oneshot(upload(upload_body("s3cret", None, b"relocated")))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let url = json(res).await["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/files/"));

    let res = router
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"relocated");
}

#[tokio::test]
async fn base_url_clashing_with_intake_is_rejected() {
    let media = tempfile::tempdir().unwrap();
    let mut config = ClipConfig::new();
    config.set("auth.nonce", "s3cret");
    config.set("store.root", media.path().to_string_lossy());
    config.set("store.base_url", "/uploads");

    assert!(voice_recorder::build_with(config).await.is_err());
}
