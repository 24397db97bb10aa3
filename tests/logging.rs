// tests/logging.rs

use manuallabour::logging::{LogLevel, effective_level};
use tracing::Level;

#[test]
fn explicit_level_wins_over_env() {
    assert_eq!(
        effective_level(Some(LogLevel::Debug), Some("error")),
        Level::DEBUG
    );
}

#[test]
fn env_value_is_used_when_no_level_is_given() {
    assert_eq!(effective_level(None, Some("trace")), Level::TRACE);
    assert_eq!(effective_level(None, Some(" Warning ")), Level::WARN);
}

#[test]
fn falls_back_to_info() {
    assert_eq!(effective_level(None, None), Level::INFO);
    assert_eq!(effective_level(None, Some("loud")), Level::INFO);
}

#[test]
fn log_level_parses_case_insensitively() {
    assert_eq!("ERROR".parse::<LogLevel>(), Ok(LogLevel::Error));
    assert!("verbose".parse::<LogLevel>().is_err());
}

#[test]
fn subscriber_can_only_be_installed_once() {
    use manuallabour::logging::init_logging;

    init_logging(Some(LogLevel::Warn)).unwrap();
    assert!(init_logging(Some(LogLevel::Debug)).is_err());
}
