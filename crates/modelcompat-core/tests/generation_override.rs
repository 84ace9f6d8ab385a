//! The capability flag is write-once per process, so each forced generation
//! runs in its own child process (this test binary re-executed with a filter).

use std::process::Command;
use std::sync::Barrier;
use std::thread;

use modelcompat_core::capability::{self, linked_generations};
use modelcompat_core::{
    CompatError, DetectionSource, Extra, FieldSpec, FieldType, ModelBuilder, ModelConfig,
    ProbeOptions, OVERRIDE_ENV,
};
use serde_json::{json, Value};

const CHILD_ENV: &str = "MODELCOMPAT_TEST_CHILD";
const MARKER: &str = "REPORT ";
const INIT_THREADS: usize = 8;

/// Race the first use of the flag across threads, half through `init` and
/// half through `current`. Every caller must observe the same result.
fn concurrent_first_use_agrees() -> bool {
    let barrier = Barrier::new(INIT_THREADS);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..INIT_THREADS)
            .map(|index| {
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    if index % 2 == 0 {
                        capability::current()
                    } else {
                        ProbeOptions::from_env().and_then(capability::init)
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("init thread should not panic"))
            .collect()
    });

    results.windows(2).all(|pair| pair[0] == pair[1]) && results[0] == capability::current()
}

fn report() -> Value {
    let concurrent_init_agrees = concurrent_first_use_agrees();
    let cap = match capability::current() {
        Ok(cap) => cap,
        Err(err) => {
            let kind = match err {
                CompatError::InvalidOverride { .. } => "invalid_override",
                CompatError::UnsupportedLibraryVersion(_) => "unsupported",
                _ => "other",
            };
            return json!({ "error": kind, "concurrent_init_agrees": concurrent_init_agrees });
        }
    };

    let image = ModelBuilder::new("Image")
        .field(FieldSpec::new("url", FieldType::String))
        .config(ModelConfig::new().extra(Extra::Forbid))
        .build()
        .expect("image model should finalize");
    let message = ModelBuilder::new("Message")
        .field(FieldSpec::new("role", FieldType::String))
        .field(FieldSpec::new("content", FieldType::String))
        .build()
        .expect("message model should finalize");
    let history = ModelBuilder::new("History")
        .field(FieldSpec::new("messages", FieldType::array(FieldType::model(&message))))
        .build()
        .expect("history model should finalize");

    let dump = image
        .validate(&json!({ "url": "https://x/y.png" }))
        .expect("valid image")
        .dump();
    let missing: Vec<String> = image
        .validate(&json!({}))
        .expect_err("url is required")
        .as_validation()
        .expect("validation error")
        .failures()
        .iter()
        .map(|failure| failure.path.to_string())
        .collect();
    let extra_rejected = image
        .validate(&json!({ "url": "u", "other": 1 }))
        .is_err();

    json!({
        "generation": cap.generation().as_str(),
        "override": cap.source() == DetectionSource::Override,
        "image_schema": image.to_json_schema(),
        "history_schema": history.to_json_schema(),
        "dump": Value::Object(dump),
        "missing": missing,
        "extra_rejected": extra_rejected,
        "concurrent_init_agrees": concurrent_init_agrees,
    })
}

#[test]
fn child_report() {
    if std::env::var_os(CHILD_ENV).is_none() {
        return;
    }
    // libtest may print its own status on the same line first.
    println!("\n{MARKER}{}", report());
}

fn run_child(toggle: &str) -> Value {
    let exe = std::env::current_exe().expect("test binary path");
    let output = Command::new(exe)
        .args(["child_report", "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .env(OVERRIDE_ENV, toggle)
        .output()
        .expect("child test process should run");
    assert!(output.status.success(), "child failed for {toggle}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find_map(|line| line.split_once(MARKER).map(|(_, report)| report))
        .unwrap_or_else(|| panic!("no report from child for {toggle}: {stdout}"));
    serde_json::from_str(line).expect("report should be JSON")
}

#[test]
fn forced_generations_agree_across_processes() {
    if std::env::var_os(CHILD_ENV).is_some() {
        return;
    }

    let reports: Vec<(String, Value)> = linked_generations()
        .into_iter()
        .map(|generation| (generation.as_str().to_string(), run_child(generation.as_str())))
        .collect();

    for (generation, report) in &reports {
        assert_eq!(report["generation"], json!(generation));
        assert_eq!(report["override"], json!(true));
        assert_eq!(report["dump"], json!({ "url": "https://x/y.png" }));
        assert_eq!(report["missing"], json!(["url"]));
        assert_eq!(report["extra_rejected"], json!(true));
        assert_eq!(report["concurrent_init_agrees"], json!(true));
        assert_eq!(
            report["history_schema"]["properties"]["messages"]["type"],
            json!("array")
        );
    }

    let (_, first) = &reports[0];
    for (_, report) in &reports {
        assert_eq!(
            report["image_schema"].to_string(),
            first["image_schema"].to_string()
        );
        assert_eq!(
            report["history_schema"].to_string(),
            first["history_schema"].to_string()
        );
    }
}

#[test]
fn unparseable_toggle_fails_initialization() {
    if std::env::var_os(CHILD_ENV).is_some() {
        return;
    }
    let report = run_child("gen-c");
    assert_eq!(report["error"], json!("invalid_override"));
    assert_eq!(report["concurrent_init_agrees"], json!(true));
}
