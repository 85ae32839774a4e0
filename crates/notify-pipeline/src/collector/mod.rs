//! 로그 수집 모듈 -- 어플라이언스 로그 파일에서 원시 라인을 수집합니다.
//!
//! # 아키텍처
//! 수집기는 자체 tokio 태스크에서 실행되며, 수집된 원시 라인을
//! `tokio::mpsc::Sender<RawLine>` 채널을 통해 처리 루프로 전달합니다.

pub mod file;

pub use file::FileCollector;

use bytes::Bytes;

/// 수집된 원시 로그 라인
///
/// 수집기가 생성하고, 분류기가 소비하는 중간 데이터 형식입니다.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// 원시 라인 바이트 (줄바꿈 제외)
    pub data: Bytes,
    /// 수집 소스 식별자 (예: "file:/var/log/esa/mail.log")
    pub source: String,
    /// 수집 시각
    pub received_at: std::time::SystemTime,
}

impl RawLine {
    /// 새 RawLine을 생성합니다.
    pub fn new(data: Bytes, source: impl Into<String>) -> Self {
        Self {
            data,
            source: source.into(),
            received_at: std::time::SystemTime::now(),
        }
    }

    /// 라인을 UTF-8 문자열로 변환합니다. 잘못된 바이트는 대체 문자로 치환됩니다.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// 수집기 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorStatus {
    /// 실행 대기 중
    Idle,
    /// 실행 중
    Running,
    /// 에러로 중단됨
    Error(String),
    /// 정상 종료됨
    Stopped,
}
