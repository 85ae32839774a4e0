//! 알림 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`AmpwatchConfig`](ampwatch_core::config::AmpwatchConfig)를
//! 기반으로 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use ampwatch_core::config::AmpwatchConfig;
//! use ampwatch_notify_pipeline::config::PipelineConfig;
//!
//! let core_config = AmpwatchConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::NotifyPipelineError;

/// 알림 파이프라인 설정
///
/// core 설정의 watcher/smtp 섹션에서 파생되며, 파이프라인 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 감시할 어플라이언스 로그 파일 경로
    pub log_path: String,
    /// 새 라인이 없을 때의 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 최대 라인 길이 (바이트, 초과분은 잘림)
    pub max_line_length: usize,
    /// 발신자 주소
    pub from_addr: String,
    /// 메일 릴레이 호스트
    pub relay_host: String,
    /// 메일 릴레이 포트
    pub relay_port: u16,
    /// HELO 도메인
    pub helo_domain: String,
    /// 릴레이 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 알림 완료 MID 기억 최대 개수 (초과 시 가장 오래된 것부터 제거)
    pub notified_capacity: usize,
    /// MID 재작성 체인 추적 최대 홉 수 (순환 방어)
    pub max_resolve_hops: usize,
    /// 수집기 -> 처리 루프 라인 채널 용량
    pub line_channel_capacity: usize,
    /// 알림 이벤트 채널 용량 (외부 채널 미사용 시)
    pub notification_channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_path: "/var/log/esa/mail.log".to_owned(),
            poll_interval_ms: 1000,
            max_line_length: 64 * 1024, // 64KB
            from_addr: "amp-notify@localhost".to_owned(),
            relay_host: "127.0.0.1".to_owned(),
            relay_port: 25,
            helo_domain: "ampwatch.local".to_owned(),
            connect_timeout_secs: 10,
            notified_capacity: 10_000,
            max_resolve_hops: 16,
            line_channel_capacity: 1024,
            notification_channel_capacity: 256,
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &ampwatch_core::config::AmpwatchConfig) -> Self {
        Self {
            log_path: core.watcher.log_path.clone(),
            poll_interval_ms: core.watcher.poll_interval_ms,
            max_line_length: core.watcher.max_line_length,
            from_addr: core.smtp.from_addr.clone(),
            relay_host: core.smtp.relay_host.clone(),
            relay_port: core.smtp.relay_port,
            helo_domain: core.smtp.helo_domain.clone(),
            connect_timeout_secs: core.smtp.connect_timeout_secs,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NotifyPipelineError> {
        const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1MB

        if self.log_path.is_empty() {
            return Err(NotifyPipelineError::Config {
                field: "log_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.poll_interval_ms == 0 {
            return Err(NotifyPipelineError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_line_length == 0 || self.max_line_length > MAX_LINE_LENGTH {
            return Err(NotifyPipelineError::Config {
                field: "max_line_length".to_owned(),
                reason: format!("must be 1-{}", MAX_LINE_LENGTH),
            });
        }

        if self.relay_port == 0 {
            return Err(NotifyPipelineError::Config {
                field: "relay_port".to_owned(),
                reason: "must not be 0".to_owned(),
            });
        }

        if !self.from_addr.contains('@') {
            return Err(NotifyPipelineError::Config {
                field: "from_addr".to_owned(),
                reason: "must be a mail address containing '@'".to_owned(),
            });
        }

        if self.notified_capacity == 0 {
            return Err(NotifyPipelineError::Config {
                field: "notified_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_resolve_hops == 0 {
            return Err(NotifyPipelineError::Config {
                field: "max_resolve_hops".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.line_channel_capacity == 0 || self.notification_channel_capacity == 0 {
            return Err(NotifyPipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: "channel capacities must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 감시할 로그 파일 경로를 설정합니다.
    pub fn log_path(mut self, path: impl Into<String>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// 폴링 주기(밀리초)를 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn max_line_length(mut self, bytes: usize) -> Self {
        self.config.max_line_length = bytes;
        self
    }

    /// 발신자 주소를 설정합니다.
    pub fn from_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.from_addr = addr.into();
        self
    }

    /// 릴레이 호스트를 설정합니다.
    pub fn relay_host(mut self, host: impl Into<String>) -> Self {
        self.config.relay_host = host.into();
        self
    }

    /// 릴레이 포트를 설정합니다.
    pub fn relay_port(mut self, port: u16) -> Self {
        self.config.relay_port = port;
        self
    }

    /// 알림 완료 MID 기억 용량을 설정합니다.
    pub fn notified_capacity(mut self, capacity: usize) -> Self {
        self.config.notified_capacity = capacity;
        self
    }

    /// 재작성 체인 최대 홉 수를 설정합니다.
    pub fn max_resolve_hops(mut self, hops: usize) -> Self {
        self.config.max_resolve_hops = hops;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, NotifyPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
