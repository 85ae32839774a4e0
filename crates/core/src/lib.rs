//! Ampwatch 공통 크레이트 — 타입, trait, 에러, 설정
//!
//! 메일 보안 어플라이언스 로그를 감시하여 AMP File Analysis 격리 시
//! 발신자에게 알림을 보내는 ampwatch 시스템의 공유 기반입니다.
//!
//! # 모듈 구성
//!
//! - [`types`]: MID, 알림 내용 등 도메인 타입
//! - [`event`]: 모듈 간 통신 이벤트 ([`NotificationEvent`] 등)
//! - [`error`]: 최상위 에러 타입
//! - [`config`]: `ampwatch.toml` 설정
//! - [`pipeline`]: 모듈 생명주기 trait

pub mod config;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{AmpwatchError, ConfigError, PipelineError};

// 설정
pub use config::AmpwatchConfig;

// 이벤트
pub use event::{Event, EventMetadata, NotificationEvent};

// 파이프라인 trait
pub use pipeline::{HealthStatus, Pipeline};

// 도메인 타입
pub use types::{Mid, Notification};
