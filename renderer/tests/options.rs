use std::io::Write;

use pretty_assertions::assert_eq;

use renderer::options::{MalformedPolicy, RawHtmlPolicy};
use renderer::{ConfigError, RenderOptions};

#[test]
fn empty_config_is_default() {
    let options = RenderOptions::from_toml_str("").expect("valid config");
    assert_eq!(options, RenderOptions::default());
    assert_eq!(options.max_depth, 5);
    assert_eq!(options.loading_height, "300px");
}

#[test]
fn full_config_parses() {
    let options = RenderOptions::from_toml_str(
        r#"
max_depth = 3
malformed_blocks = "drop"
raw_html = "escape"
loading_height = "240px"
hold_back_partial_marker = false
"#,
    )
    .expect("valid config");

    assert_eq!(
        options,
        RenderOptions {
            max_depth: 3,
            malformed_blocks: MalformedPolicy::Drop,
            raw_html: RawHtmlPolicy::Escape,
            loading_height: "240px".to_string(),
            hold_back_partial_marker: false,
        }
    );
}

#[test]
fn invalid_values_are_rejected() {
    let zero = RenderOptions::from_toml_str("max_depth = 0");
    assert!(matches!(zero, Err(ConfigError::Invalid(_))), "{:?}", zero);

    let auto = RenderOptions::from_toml_str(r#"loading_height = "auto""#);
    assert!(matches!(auto, Err(ConfigError::Invalid(_))), "{:?}", auto);

    let injected = RenderOptions::from_toml_str(r#"loading_height = "1px;color:red""#);
    assert!(matches!(injected, Err(ConfigError::Invalid(_))), "{:?}", injected);

    let policy = RenderOptions::from_toml_str(r#"malformed_blocks = "hide""#);
    assert!(matches!(policy, Err(ConfigError::Toml(_))), "{:?}", policy);

    let unknown = RenderOptions::from_toml_str("max_dept = 2");
    assert!(matches!(unknown, Err(ConfigError::Toml(_))), "{:?}", unknown);
}

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "raw_html = \"allow\"").expect("write config");

    let options = RenderOptions::from_path(file.path()).expect("valid config");
    assert_eq!(options.raw_html, RawHtmlPolicy::Allow);
    assert_eq!(options.malformed_blocks, MalformedPolicy::Show);
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");

    let err = RenderOptions::from_path(&path).expect_err("missing file");
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"), "{}", err);
}
