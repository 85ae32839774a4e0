//! 설정 관리 — ampwatch.toml 파싱 및 런타임 설정
//!
//! [`AmpwatchConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`AMPWATCH_SMTP_RELAY_HOST=mail.example.com` 형식)
//! 3. 설정 파일 (`ampwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ampwatch_core::error::AmpwatchError> {
//! use ampwatch_core::config::AmpwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = AmpwatchConfig::load("ampwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = AmpwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AmpwatchError, ConfigError};

/// Ampwatch 통합 설정
///
/// `ampwatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmpwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 감시 설정
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// 메일 릴레이 설정
    #[serde(default)]
    pub smtp: SmtpConfig,
}

impl AmpwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AmpwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AmpwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AmpwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AmpwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, AmpwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            AmpwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `AMPWATCH_{SECTION}_{FIELD}`
    /// 예: `AMPWATCH_WATCHER_LOG_PATH=/var/log/esa/mail.log`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "AMPWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "AMPWATCH_GENERAL_LOG_FORMAT");

        // Watcher
        override_string(&mut self.watcher.log_path, "AMPWATCH_WATCHER_LOG_PATH");
        override_u64(
            &mut self.watcher.poll_interval_ms,
            "AMPWATCH_WATCHER_POLL_INTERVAL_MS",
        );
        override_usize(
            &mut self.watcher.max_line_length,
            "AMPWATCH_WATCHER_MAX_LINE_LENGTH",
        );

        // SMTP
        override_string(&mut self.smtp.relay_host, "AMPWATCH_SMTP_RELAY_HOST");
        override_u16(&mut self.smtp.relay_port, "AMPWATCH_SMTP_RELAY_PORT");
        override_string(&mut self.smtp.from_addr, "AMPWATCH_SMTP_FROM_ADDR");
        override_string(&mut self.smtp.helo_domain, "AMPWATCH_SMTP_HELO_DOMAIN");
        override_u64(
            &mut self.smtp.connect_timeout_secs,
            "AMPWATCH_SMTP_CONNECT_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AmpwatchError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.watcher.log_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "watcher.log_path".to_owned(),
                reason: "log path must not be empty".to_owned(),
            }
            .into());
        }

        if self.watcher.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watcher.poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.smtp.relay_host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "smtp.relay_host".to_owned(),
                reason: "relay host must not be empty".to_owned(),
            }
            .into());
        }

        if self.smtp.relay_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "smtp.relay_port".to_owned(),
                reason: "must not be 0".to_owned(),
            }
            .into());
        }

        if !self.smtp.from_addr.contains('@') {
            return Err(ConfigError::InvalidValue {
                field: "smtp.from_addr".to_owned(),
                reason: "must be a mail address containing '@'".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 로그 감시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// 감시할 어플라이언스 로그 파일 경로
    pub log_path: String,
    /// 새 라인이 없을 때의 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 최대 라인 길이 (바이트, 초과분은 잘림)
    pub max_line_length: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            log_path: "/var/log/esa/mail.log".to_owned(),
            poll_interval_ms: 1000,
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

/// 메일 릴레이 설정
///
/// 알림 전송에 사용하는 SMTP 릴레이입니다. 인증 없는 평문 SMTP를 가정하며,
/// 연결은 알림 전송마다 열고 닫습니다 (커넥션 풀 없음).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// 릴레이 호스트
    pub relay_host: String,
    /// 릴레이 포트
    pub relay_port: u16,
    /// 발신자 주소 (고정)
    pub from_addr: String,
    /// HELO에 사용할 도메인
    pub helo_domain: String,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            relay_host: "127.0.0.1".to_owned(),
            relay_port: 25,
            from_addr: "amp-notify@localhost".to_owned(),
            helo_domain: "ampwatch.local".to_owned(),
            connect_timeout_secs: 10,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = AmpwatchConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.watcher.log_path, "/var/log/esa/mail.log");
        assert_eq!(config.watcher.poll_interval_ms, 1000);
        assert_eq!(config.smtp.relay_port, 25);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = AmpwatchConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = AmpwatchConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.smtp.relay_port, 25);
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[watcher]
log_path = "/var/log/esa/mail.current"

[smtp]
relay_host = "relay.corp.example"
"#;
        let config = AmpwatchConfig::parse(toml).unwrap();
        assert_eq!(config.watcher.log_path, "/var/log/esa/mail.current");
        assert_eq!(config.smtp.relay_host, "relay.corp.example");
        // 나머지는 기본값 유지
        assert_eq!(config.watcher.poll_interval_ms, 1000);
        assert_eq!(config.smtp.relay_port, 25);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"

[watcher]
log_path = "/var/log/esa/mail.log"
poll_interval_ms = 500
max_line_length = 8192

[smtp]
relay_host = "10.0.0.5"
relay_port = 2525
from_addr = "amp_notify@test.com"
helo_domain = "notify.test.com"
connect_timeout_secs = 5
"#;
        let config = AmpwatchConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.watcher.poll_interval_ms, 500);
        assert_eq!(config.watcher.max_line_length, 8192);
        assert_eq!(config.smtp.relay_port, 2525);
        assert_eq!(config.smtp.from_addr, "amp_notify@test.com");
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = AmpwatchConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            AmpwatchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = AmpwatchConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = AmpwatchConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_empty_log_path() {
        let mut config = AmpwatchConfig::default();
        config.watcher.log_path = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_path"));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = AmpwatchConfig::default();
        config.watcher.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_relay_port() {
        let mut config = AmpwatchConfig::default();
        config.smtp.relay_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_from_addr_without_at() {
        let mut config = AmpwatchConfig::default();
        config.smtp.from_addr = "not-an-address".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("from_addr"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_AMPWATCH_STR", "overridden") };
        override_string(&mut val, "TEST_AMPWATCH_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_AMPWATCH_STR") };
    }

    #[test]
    fn env_override_u16_invalid_keeps_original() {
        let mut val: u16 = 25;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_AMPWATCH_PORT_BAD", "not-a-port") };
        override_u16(&mut val, "TEST_AMPWATCH_PORT_BAD");
        assert_eq!(val, 25); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_AMPWATCH_PORT_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_AMPWATCH_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = AmpwatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = AmpwatchConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.watcher.log_path, parsed.watcher.log_path);
        assert_eq!(config.smtp.relay_port, parsed.smtp.relay_port);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = AmpwatchConfig::from_file("/nonexistent/path/ampwatch.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            AmpwatchError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
