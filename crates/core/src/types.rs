//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 메일 어플라이언스 로그의 메시지 식별자(MID)와
//! 격리 알림 결과를 나타내는 타입을 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 메시지 식별자 (MID)
///
/// 어플라이언스가 메시지 트랜잭션마다 부여하는 숫자 토큰입니다.
/// 트랜잭션 도중 내부적으로 재작성(rewrite)되어 새 MID로 바뀔 수 있으므로,
/// 알림 중복 제거는 재작성 체인의 끝(canonical MID)을 기준으로 합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mid(String);

impl Mid {
    /// 새 MID를 생성합니다.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// 내부 문자열 표현을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MID {}", self.0)
    }
}

impl From<&str> for Mid {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// 격리 알림 내용
///
/// 격리 이벤트가 수신자/첨부파일 정보와 결합되어 확정된 결과입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// 재작성 체인을 따라간 최종 MID
    pub canonical_mid: Mid,
    /// 원 발신자에게 알릴 수신 주소
    pub recipient: String,
    /// 격리된 첨부파일 이름 (미확인 시 대체 문구)
    pub attachment: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.canonical_mid, self.recipient, self.attachment,
        )
    }
}
