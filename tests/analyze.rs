//! Whole-run tests: upload → extraction stub → geocoder stub → report.

mod support;

use edgequake_docverify::{
    analyze, analyze_file, AnalyzerConfig, Credentials, DocVerifyError, DocumentKind,
    RawDocument,
};
use support::{geocode_body, local_client, png_bytes, StubServer};

fn config(vision: &StubServer, geocoder: &StubServer) -> AnalyzerConfig {
    AnalyzerConfig::builder()
        .extraction_base_url(vision.base_url.as_str())
        .geocode_url(geocoder.base_url.as_str())
        .http_client(local_client())
        .build()
        .unwrap()
}

fn creds() -> Credentials {
    Credentials::new("sk-test", "geo-test")
}

#[tokio::test]
async fn png_upload_end_to_end() {
    let vision = StubServer::chat_reply(
        "Here you go:\n```json\n{\"is_bank_statement\": true, \"name\": \"Jane Q. Public\", \"address\": \"10 Downing Street, London SW1A 2AA\", \"document_date\": \"2024-03-31\"}\n```",
    )
    .await;
    let geocoder = StubServer::start(200, geocode_body(0.97)).await;

    let doc = RawDocument::new(png_bytes(64, 48), "statement.png");
    let report = analyze(doc, &creds(), &config(&vision, &geocoder))
        .await
        .expect("analysis succeeds");

    assert_eq!(report.file_name, "statement.png");
    assert_eq!(report.document, DocumentKind::Raster);
    assert_eq!(report.extraction.name(), "Jane Q. Public");
    assert_eq!((report.stats.image_width, report.stats.image_height), (64, 48));
    assert!(report.stats.jpeg_bytes > 0);

    let validation = report.validation.as_ref().expect("address was validated");
    assert!(validation.is_valid());
    assert_eq!(validation.confidence(), 0.97);

    let geo_requests = geocoder.requests();
    assert_eq!(geo_requests.len(), 1);
    assert_eq!(
        geo_requests[0].query("text").as_deref(),
        Some("10 Downing Street, London SW1A 2AA")
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["document"]["kind"], "raster");
    assert_eq!(json["validation"]["is_valid"], true);
    assert!(json["extraction"].get("error").is_none());
}

#[tokio::test]
async fn failed_extraction_skips_the_geocoder() {
    let vision = StubServer::start(500, r#"{"error": {"message": "The server had an error"}}"#).await;
    let geocoder = StubServer::start(200, geocode_body(0.97)).await;

    let doc = RawDocument::new(png_bytes(10, 10), "bill.jpg");
    let report = analyze(doc, &creds(), &config(&vision, &geocoder))
        .await
        .expect("stage failures are not fatal");

    assert!(report.extraction.error().is_some());
    assert!(report.validation.is_none());
    assert!(geocoder.requests().is_empty());
}

#[tokio::test]
async fn analyze_file_reads_from_disk() {
    let vision = StubServer::chat_reply("{\"name\": \"A. Person\", \"address\": \"\"}").await;
    let geocoder = StubServer::start(200, geocode_body(0.9)).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("SCAN.PNG");
    std::fs::write(&path, png_bytes(20, 20)).unwrap();

    let report = analyze_file(&path, &creds(), &config(&vision, &geocoder))
        .await
        .unwrap();
    assert_eq!(report.file_name, "SCAN.PNG");
    assert_eq!(report.extraction.name(), "A. Person");
}

#[tokio::test]
async fn unsupported_extension_is_rejected_before_any_request() {
    let vision = StubServer::chat_reply("{}").await;
    let geocoder = StubServer::start(200, geocode_body(0.9)).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.tiff");
    std::fs::write(&path, b"II*\0").unwrap();

    let err = analyze_file(&path, &creds(), &config(&vision, &geocoder))
        .await
        .unwrap_err();
    assert!(matches!(err, DocVerifyError::UnsupportedFileType { .. }));
    assert!(vision.requests().is_empty());
}

#[tokio::test]
async fn missing_file_is_reported() {
    let vision = StubServer::chat_reply("{}").await;
    let geocoder = StubServer::start(200, geocode_body(0.9)).await;

    let err = analyze_file("/definitely/not/here.png", &creds(), &config(&vision, &geocoder))
        .await
        .unwrap_err();
    assert!(matches!(err, DocVerifyError::FileNotFound { .. }));
}
