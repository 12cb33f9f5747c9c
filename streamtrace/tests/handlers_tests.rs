use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use streamtrace::handlers::*;
use streamtrace::{DiagramFormat, ResolveOptions};
use tempfile::NamedTempFile;

const INLINE_HAR: &str = r#"{"log": {"entries": [
    {
        "request": {"method": "GET", "url": "https://site.test/watch", "headers": []},
        "response": {"status": 200, "headers": [], "content": {
            "mimeType": "text/html",
            "text": "<video src=\"https://cdn.test/v.mp4?k=zz99\"></video>"
        }}
    },
    {
        "request": {"method": "GET", "url": "https://cdn.test/v.mp4?k=zz99", "headers": []},
        "response": {"status": 206, "headers": [], "content": {"mimeType": "video/mp4"}}
    }
]}}"#;

const ARCHIVED_HAR: &str = r#"{"log": {"entries": [
    {
        "request": {"method": "GET", "url": "https://site.test/watch", "headers": []},
        "response": {"status": 200, "headers": [], "content": {"mimeType": "text/html", "_file": "0000.html"}}
    },
    {
        "request": {"method": "GET", "url": "https://api.test/play?id=clip-31", "headers": []},
        "response": {"status": 200, "headers": [], "content": {"mimeType": "application/json", "_file": "0001.json"}}
    },
    {
        "request": {"method": "GET", "url": "https://cdn.test/seg.ts?sig=sig-8080", "headers": []},
        "response": {"status": 200, "headers": [], "content": {"mimeType": "video/mp2t"}}
    },
    {
        "request": {"method": "GET", "url": "https://cdn.test/seg2.ts?sig=sig-8080", "headers": []},
        "response": {"status": 200, "headers": [], "content": {"mimeType": "video/mp2t"}}
    }
]}}"#;

fn stored_entry(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut entry = Vec::new();
    entry.extend_from_slice(&0x04034b50u32.to_le_bytes());
    entry.extend_from_slice(&10u16.to_le_bytes());
    entry.extend_from_slice(&0u16.to_le_bytes());
    entry.extend_from_slice(&0u16.to_le_bytes());
    entry.extend_from_slice(&[0u8; 8]); // time, date, crc32
    entry.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    entry.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    entry.extend_from_slice(&(name.len() as u16).to_le_bytes());
    entry.extend_from_slice(&0u16.to_le_bytes());
    entry.extend_from_slice(name.as_bytes());
    entry.extend_from_slice(payload);
    entry
}

fn write_archive() -> NamedTempFile {
    let mut zip = stored_entry("har.har", ARCHIVED_HAR.as_bytes());
    zip.extend(stored_entry("0000.html", b"<script src=\"/main.js\"></script> clip-31"));
    zip.extend(stored_entry("0001.json", br#"{"signature":"sig-8080","host":"cdn.test"}"#));

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&zip).unwrap();
    file
}

fn write_har(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// ============================================================================
// Argument Handling Tests
// ============================================================================

#[test]
fn test_expand_path_plain() {
    assert_eq!(expand_path("/tmp/capture.har"), PathBuf::from("/tmp/capture.har"));
}

#[test]
fn test_expand_path_tilde() {
    let expanded = expand_path("~/capture.har");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("capture.har"));
}

#[test]
fn test_capture_source_from_args() {
    let har = "/tmp/a.har".to_string();
    let zip = "/tmp/a.zip".to_string();

    assert_eq!(
        CaptureSource::from_args(Some(&har), None).unwrap(),
        CaptureSource::Har(PathBuf::from("/tmp/a.har"))
    );
    assert_eq!(
        CaptureSource::from_args(None, Some(&zip)).unwrap(),
        CaptureSource::Archive(PathBuf::from("/tmp/a.zip"))
    );
    assert!(CaptureSource::from_args(Some(&har), Some(&zip)).is_err());

    let err = CaptureSource::from_args(None, None).unwrap_err();
    assert!(err.to_string().contains("--har or --archive"));
}

#[test]
fn test_resolve_options_from_flags() {
    let options = resolve_options(false, false);
    assert!(options.registry.skip_static_assets);
    assert!(options.match_direct_urls);

    let options = resolve_options(true, true);
    assert!(!options.registry.skip_static_assets);
    assert!(!options.match_direct_urls);
}

// ============================================================================
// Loading Tests
// ============================================================================

#[test]
fn test_load_har_capture() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_har(INLINE_HAR);
    let capture = load_capture(&CaptureSource::Har(file.path().to_path_buf()))?;

    assert_eq!(capture.exchanges.len(), 2);
    Ok(())
}

#[test]
fn test_load_missing_har() {
    let source = CaptureSource::Har(PathBuf::from("/nonexistent/capture.har"));
    let err = load_capture(&source).err().unwrap();
    assert!(format!("{:#}", err).contains("Failed to read HAR file"));
}

#[test]
fn test_load_archive_capture() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_archive();
    let capture = load_capture(&CaptureSource::Archive(file.path().to_path_buf()))?;

    assert_eq!(capture.exchanges.len(), 4);
    assert_eq!(
        capture.bodies.body("0001.json"),
        Some(&br#"{"signature":"sig-8080","host":"cdn.test"}"#[..])
    );
    Ok(())
}

#[test]
fn test_list_targets() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_archive();
    let capture = load_capture(&CaptureSource::Archive(file.path().to_path_buf()))?;

    let targets = list_targets(&capture.exchanges);
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].0, 2);
    assert_eq!(targets[0].2.as_deref(), Some("video/mp2t"));
    Ok(())
}

// ============================================================================
// Rendering Tests
// ============================================================================

#[test]
fn test_render_har_direct_reference() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_har(INLINE_HAR);
    let capture = load_capture(&CaptureSource::Har(file.path().to_path_buf()))?;

    let json = render_capture(&capture, &ResolveOptions::default(), &DiagramFormat::Json)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;

    assert_eq!(value["summary"]["connected"], true);
    assert_eq!(value["edges"][0]["direct"], true);
    assert_eq!(value["edges"][0]["label"], "");
    Ok(())
}

#[test]
fn test_render_archive_chain() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_archive();
    let capture = load_capture(&CaptureSource::Archive(file.path().to_path_buf()))?;

    let text = render_capture(&capture, &ResolveOptions::default(), &DiagramFormat::Text)?;

    assert!(text.contains("Connected to root: yes"));
    assert!(text.contains("[1] -> [2]  cdn.test, sig-8080"));
    assert!(text.contains("[0] -> [1]  clip-31"));
    // later media request is not part of the registry
    assert!(!text.contains("seg2.ts"));
    Ok(())
}

#[test]
fn test_render_drawio_default() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_archive();
    let capture = load_capture(&CaptureSource::Archive(file.path().to_path_buf()))?;

    let drawio = render_capture(&capture, &ResolveOptions::default(), &DiagramFormat::DrawIo)?;
    assert!(drawio.contains(r#"id="arrow-1-2""#));
    assert!(drawio.contains(r#"id="label-0-1""#));
    Ok(())
}

#[test]
fn test_render_target_not_found() {
    let har = r#"{"log": {"entries": [
        {
            "request": {"method": "GET", "url": "https://site.test/", "headers": []},
            "response": {"status": 200, "headers": [], "content": {"mimeType": "text/html", "text": "hi"}}
        }
    ]}}"#;
    let file = write_har(har);
    let capture = load_capture(&CaptureSource::Har(file.path().to_path_buf())).unwrap();

    let err = render_capture(&capture, &ResolveOptions::default(), &DiagramFormat::Text)
        .err()
        .unwrap();
    assert!(err.to_string().contains("Target not found"));
}

// ============================================================================
// Binary Output Tests
// ============================================================================

#[test]
fn test_resolve_stdout_is_only_the_document() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_har(INLINE_HAR);
    let capture = load_capture(&CaptureSource::Har(file.path().to_path_buf()))?;
    let expected = render_capture(&capture, &ResolveOptions::default(), &DiagramFormat::Json)?;

    let output = Command::new(env!("CARGO_BIN_EXE_streamtrace"))
        .args(["resolve", "--har"])
        .arg(file.path())
        .args(["-f", "json"])
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, expected);
    serde_json::from_str::<serde_json::Value>(&stdout)?;

    // banner still shows, just not on stdout
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("streamtrace"));
    Ok(())
}

#[test]
fn test_resolve_drawio_stdout_starts_with_document() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_archive();

    let output = Command::new(env!("CARGO_BIN_EXE_streamtrace"))
        .args(["resolve", "--archive"])
        .arg(file.path())
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("<mxGraphModel>"));
    Ok(())
}
