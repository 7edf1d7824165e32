use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use detection_overlay::{Color, OverlayConfig, StrokeMode};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "OVERLAY_CONFIG",
        "OVERLAY_BACKEND",
        "OVERLAY_FIXTURE_PATH",
        "OVERLAY_LABELS_PATH",
        "OVERLAY_STROKE_WIDTH",
        "OVERLAY_PALETTE_SEED",
        "OVERLAY_FONT_PATH",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "labels": { "names": ["cat", "dog", "bird"] },
        "palette": { "colors": [[255, 0, 0], [0, 255, 0], [0, 0, 255]] },
        "render": {
            "stroke_width": 4,
            "font_scale_ratio": 0.2,
            "stroke_mode": "fixed",
            "fixed_color": [10, 20, 30]
        },
        "backend": { "name": "stub" }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("OVERLAY_CONFIG", file.path());
    std::env::set_var("OVERLAY_STROKE_WIDTH", "12");

    let cfg = OverlayConfig::load().expect("load config");

    assert_eq!(cfg.labels.len(), 3);
    assert_eq!(cfg.labels.index_of("dog"), Some(1));
    assert_eq!(cfg.palette.get(2), Some(Color::new(0, 0, 255)));
    assert_eq!(cfg.render.stroke_width, 12.0);
    assert_eq!(cfg.render.font_scale_ratio, 0.2);
    assert_eq!(cfg.render.text_offset_ratio, 0.01);
    assert_eq!(cfg.render.stroke_mode, StrokeMode::Fixed(Color::new(10, 20, 30)));
    assert_eq!(cfg.backend.name, "stub");
    assert!(cfg.initialize_model().is_ready());

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[palette]
seed = 42

[render]
stroke_mode = "per_label"
"#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("OVERLAY_CONFIG", file.path());

    let cfg = OverlayConfig::load().expect("load config");
    assert_eq!(cfg.labels.len(), 80);
    assert_eq!(cfg.render.stroke_mode, StrokeMode::PerLabel);

    // the seed fully determines the generated palette
    std::env::set_var("OVERLAY_CONFIG", "");
    std::env::set_var("OVERLAY_PALETTE_SEED", "42");
    let from_env = OverlayConfig::load().expect("load config");
    for index in 0..80 {
        assert_eq!(cfg.palette.get(index), from_env.palette.get(index));
    }

    clear_env();
}

#[test]
fn labels_file_override_replaces_inline_names() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut config = NamedTempFile::new().expect("temp config");
    config
        .write_all(br#"{"labels": {"names": ["cat"]}}"#)
        .expect("write config");
    let mut labels = NamedTempFile::new().expect("temp labels");
    labels
        .write_all(b"person\n\n  bicycle  \ncar\n")
        .expect("write labels");

    std::env::set_var("OVERLAY_CONFIG", config.path());
    std::env::set_var("OVERLAY_LABELS_PATH", labels.path());

    let cfg = OverlayConfig::load().expect("load config");
    assert_eq!(cfg.labels.len(), 3);
    assert_eq!(cfg.labels.index_of("bicycle"), Some(1));
    assert_eq!(cfg.palette.len(), 3);

    clear_env();
}

#[test]
fn rejects_bad_env_values_and_missing_files() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("OVERLAY_STROKE_WIDTH", "wide");
    assert!(OverlayConfig::load().is_err());
    clear_env();

    std::env::set_var("OVERLAY_STROKE_WIDTH", "-1");
    assert!(OverlayConfig::load().is_err());
    clear_env();

    std::env::set_var("OVERLAY_CONFIG", "/definitely/not/here.json");
    assert!(OverlayConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    std::env::set_var("OVERLAY_CONFIG", file.path());
    assert!(OverlayConfig::load().is_err());

    clear_env();
}

#[test]
fn unknown_backend_from_env_is_unavailable() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("OVERLAY_BACKEND", "tensorrt");
    let cfg = OverlayConfig::load().expect("load config");
    assert!(!cfg.initialize_model().is_ready());

    clear_env();
}
