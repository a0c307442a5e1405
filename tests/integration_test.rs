use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(args: &[&str]) -> Output {
    Command::new("cargo")
        .arg("run")
        .arg("--")
        .args(args)
        .env_remove("API_KEY")
        .env_remove("GEMINI_API_KEY")
        .output()
        .expect("Failed to execute command")
}

fn write_carousel(dir: &Path) -> String {
    let carousel_path = dir.join("carousel.json");
    let carousel = r##"{
        "aspectRatio": "1:1",
        "branding": { "displayBrandName": "Acme Bio", "footerText": "Acme | Careers" },
        "slides": [
            { "id": "intro", "title": "Hiring Now", "content": "Join <highlight color=\"#FFFF00\">our lab</highlight>" },
            { "title": "", "content": "   " },
            { "id": "perks", "title": "Perks", "content": "Remote friendly" }
        ]
    }"##;
    fs::write(&carousel_path, carousel).expect("Failed to write carousel file");
    carousel_path.to_str().unwrap().to_string()
}

#[test]
fn test_export_text_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let carousel_path = write_carousel(temp_dir.path());
    let out_dir = temp_dir.path().join("out");

    let output = run_command(&[
        "export-text",
        "-i",
        &carousel_path,
        "-o",
        out_dir.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "Command failed: {:?}", output);

    let export_path = out_dir.join("Hiring_Now_content.json");
    assert!(export_path.exists(), "Text export was not created");

    let text = fs::read_to_string(&export_path).expect("Failed to read export");
    let parsed: serde_json::Value = serde_json::from_str(&text).expect("Export should be JSON");
    let slides = parsed.as_array().expect("Export should be an array");

    // The blank slide is dropped before submission
    assert_eq!(slides.len(), 2);
    assert_eq!(slides[0]["title"], "Hiring Now");
    assert_eq!(slides[1]["title"], "Perks");
    assert_eq!(slides[0]["displayBrandName"], "Acme Bio");
    assert_eq!(slides[0]["footerText"], "Acme | Careers");
    assert!(slides[0]["imagePrompt"]
        .as_str()
        .unwrap()
        .contains("Aspect ratio: 1:1."));
}

#[test]
fn test_render_html_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let carousel_path = write_carousel(temp_dir.path());
    let out_dir = temp_dir.path().join("html");

    let output = run_command(&[
        "render-html",
        "-i",
        &carousel_path,
        "-o",
        out_dir.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "Command failed: {:?}", output);

    let first = fs::read_to_string(out_dir.join("slide_1.html")).expect("slide 1 missing");
    assert!(first.contains("<!DOCTYPE html>"));
    assert!(first.contains("Hiring Now"));
    assert!(first.contains("ACME BIO") || first.contains("Acme Bio"));
    assert!(first.contains("our lab"));
    assert!(out_dir.join("slide_2.html").exists());
    assert!(!out_dir.join("slide_3.html").exists());
}

#[test]
fn test_generate_without_api_key_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let carousel_path = write_carousel(temp_dir.path());
    let out_dir = temp_dir.path().join("out");

    let output = run_command(&[
        "generate",
        "-i",
        &carousel_path,
        "-o",
        out_dir.to_str().unwrap(),
    ]);

    assert!(!output.status.success(), "Command should fail without an API key");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("API Key not configured"),
        "Unexpected error output: {}",
        stderr
    );
    assert!(!out_dir.join("Hiring_Now_slides.zip").exists());
}

#[test]
fn test_missing_input_file_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_command(&[
        "export-text",
        "-i",
        temp_dir.path().join("nope.json").to_str().unwrap(),
        "-o",
        temp_dir.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_rejects_unknown_aspect_ratio() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let carousel_path = write_carousel(temp_dir.path());

    let output = run_command(&[
        "generate",
        "-i",
        &carousel_path,
        "-o",
        temp_dir.path().to_str().unwrap(),
        "--aspect-ratio",
        "3:2",
    ]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unsupported aspect ratio"));
}
