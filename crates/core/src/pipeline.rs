//! 파이프라인 trait — 모듈 생명주기 정의
//!
//! 데몬은 모든 모듈을 동일한 생명주기(start/stop/health_check)로 관리합니다.

use crate::error::AmpwatchError;

/// 모듈 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작 중이나 성능 저하 또는 경고 상태
    Degraded(String),
    /// 비정상 상태 (미시작, 정지, 에러)
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// 비정상 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

/// 모듈 생명주기 trait
///
/// 데몬에서 관리되는 모든 모듈은 이 trait을 구현합니다.
pub trait Pipeline {
    /// 모듈을 시작합니다. 이미 실행 중이면 에러를 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), AmpwatchError>> + Send;

    /// 모듈을 정지합니다. 실행 중이 아니면 에러를 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), AmpwatchError>> + Send;

    /// 현재 헬스 상태를 반환합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
