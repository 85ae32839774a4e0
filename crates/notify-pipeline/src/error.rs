//! 알림 파이프라인 에러 타입
//!
//! [`NotifyPipelineError`]는 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<NotifyPipelineError> for AmpwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use ampwatch_core::error::{AmpwatchError, PipelineError};

/// 알림 파이프라인 도메인 에러
///
/// 수집, 채널 통신, 설정, 메일 전송 등 파이프라인 내부의
/// 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum NotifyPipelineError {
    /// 수집기 에러 (파일 I/O 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (file 등)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 메일 전송 에러
    ///
    /// 전송 단계(connect, helo, mail, rcpt, data, quit)와 사유를 담습니다.
    /// Notifier 경계에서 흡수되며 이벤트 루프를 중단시키지 않습니다.
    #[error("transport error: {stage}: {reason}")]
    Transport {
        /// 실패한 SMTP 대화 단계
        stage: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<NotifyPipelineError> for AmpwatchError {
    fn from(err: NotifyPipelineError) -> Self {
        AmpwatchError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}
