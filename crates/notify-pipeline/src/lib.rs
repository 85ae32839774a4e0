//! 어플라이언스 메일 로그를 감시하여 AMP 격리 알림 메일을 전송하는 파이프라인
//!
//! # 모듈 구성
//!
//! - [`collector`]: 로그 파일 감시 및 원시 라인 수집 (tail -f 방식)
//! - [`classifier`]: 로그 라인을 수신자/첨부파일/재작성/격리 이벤트로 분류
//! - [`store`]: MID 기준 상관관계 저장소 및 재작성 체인 해소
//! - [`notifier`]: 알림 메일 구성 및 전송 결과 처리
//! - [`transport`]: 메일 전송 trait 및 SMTP 릴레이 구현
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! FileCollector -> LineClassifier -> CorrelationStore -> Notifier -> SMTP relay
//!      |                |                  |                 |
//!   tail -f        4개 패턴 매칭      MID 재작성 해소     1회 알림 보장
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod notifier;
pub mod pipeline;
pub mod store;
pub mod transport;

pub mod collector;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{Correlator, PipelineStats, WatchPipeline, WatchPipelineBuilder};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::NotifyPipelineError;

// 분류기
pub use classifier::{LineClassifier, MailLogEvent};

// 저장소
pub use store::CorrelationStore;

// 수집기
pub use collector::{FileCollector, RawLine};

// 알림
pub use notifier::Notifier;

// 전송
pub use transport::{MailTransport, OutboundMail, SmtpTransport};
