use pcode_cli::{load_settings, parse_address, parse_hex_data};
use tempfile::tempdir;

#[test]
fn hex_data_accepts_common_spellings() {
    assert_eq!(parse_hex_data("90 90 c3").unwrap(), vec![0x90, 0x90, 0xc3]);
    assert_eq!(parse_hex_data("9090C3").unwrap(), vec![0x90, 0x90, 0xc3]);
    assert_eq!(parse_hex_data("0x90, 0x90,0xc3").unwrap(), vec![0x90, 0x90, 0xc3]);
}

#[test]
fn hex_data_rejects_bad_input() {
    let err = parse_hex_data("9g").unwrap_err();
    assert!(err.to_string().contains("data is not a valid hex string"));
    assert!(parse_hex_data("909").is_err(), "odd digit count");
    assert!(parse_hex_data("   ").unwrap_err().to_string().contains("data is empty"));
}

#[test]
fn addresses_parse_hex_and_decimal() {
    assert_eq!(parse_address("0x401000").unwrap(), 0x401000);
    assert_eq!(parse_address("4096").unwrap(), 4096);
    assert!(parse_address("0xzz").unwrap_err().to_string().contains("invalid address '0xzz'"));
}

#[test]
fn explicit_processors_dir_wins_over_config_file() {
    let tmp = tempdir().unwrap();
    let config = tmp.path().join("pcode.json");
    std::fs::write(&config, r#"{ "processors_dir": "/from/file", "max_instructions": 8 }"#).unwrap();

    let settings = load_settings(Some(config.as_path()), Some(tmp.path())).unwrap();
    assert_eq!(settings.processors_dir, tmp.path());
    assert_eq!(settings.max_instructions, 8);
}

#[test]
fn missing_config_file_is_an_error() {
    let tmp = tempdir().unwrap();
    let err = load_settings(Some(tmp.path().join("absent.json").as_path()), None).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
