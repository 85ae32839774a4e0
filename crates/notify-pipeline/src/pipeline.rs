//! 파이프라인 오케스트레이션 -- 수집/분류/상관관계/알림의 전체 흐름을 관리합니다.
//!
//! [`WatchPipeline`]은 core의 [`Pipeline`](ampwatch_core::pipeline::Pipeline) trait을 구현하여
//! `ampwatch-daemon`에서 동일한 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! FileCollector -> mpsc -> Correlator(분류 -> 저장소 -> 알림) -> mpsc -> downstream
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ampwatch_core::error::AmpwatchError;
use ampwatch_core::event::NotificationEvent;
use ampwatch_core::pipeline::{HealthStatus, Pipeline};
use ampwatch_core::types::{Mid, Notification};

use crate::classifier::{LineClassifier, MailLogEvent};
use crate::collector::file::{FileCollector, FileCollectorConfig};
use crate::collector::RawLine;
use crate::config::PipelineConfig;
use crate::error::NotifyPipelineError;
use crate::notifier::Notifier;
use crate::store::CorrelationStore;
use crate::transport::MailTransport;

/// 첨부파일을 끝내 확인하지 못한 경우의 표시 이름
const UNKNOWN_ATTACHMENT: &str = "Unknown attachment";

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 파이프라인 처리 카운터
///
/// 처리 태스크와 소유자가 공유하는 원자 카운터 모음입니다.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// 수신한 라인 수
    pub lines_processed: AtomicU64,
    /// 분류되지 않은 라인 수
    pub parse_misses: AtomicU64,
    /// 전송에 성공한 알림 수
    pub notifications_sent: AtomicU64,
    /// 전송에 실패한 알림 시도 수
    pub send_failures: AtomicU64,
    /// 이미 알림 완료되어 건너뛴 격리 수
    pub duplicate_quarantines: AtomicU64,
    /// 수신자를 몰라 버린 격리 수
    pub dropped_quarantines: AtomicU64,
}

impl PipelineStats {
    /// 수신한 라인 수를 반환합니다.
    pub fn lines_processed(&self) -> u64 {
        self.lines_processed.load(Ordering::Relaxed)
    }

    /// 분류되지 않은 라인 수를 반환합니다.
    pub fn parse_misses(&self) -> u64 {
        self.parse_misses.load(Ordering::Relaxed)
    }

    /// 전송 성공 알림 수를 반환합니다.
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// 전송 실패 알림 시도 수를 반환합니다.
    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    /// 중복으로 건너뛴 격리 수를 반환합니다.
    pub fn duplicate_quarantines(&self) -> u64 {
        self.duplicate_quarantines.load(Ordering::Relaxed)
    }

    /// 수신자 미상으로 버린 격리 수를 반환합니다.
    pub fn dropped_quarantines(&self) -> u64 {
        self.dropped_quarantines.load(Ordering::Relaxed)
    }
}

/// 상관관계 처리기 -- 분류된 이벤트를 저장소에 반영하고 알림을 결정합니다.
///
/// 처리 태스크가 단독으로 소유하므로 저장소에 잠금이 필요 없습니다.
pub struct Correlator<T: MailTransport> {
    classifier: LineClassifier,
    store: CorrelationStore,
    notifier: Notifier<T>,
    notification_tx: mpsc::Sender<NotificationEvent>,
    stats: Arc<PipelineStats>,
}

impl<T: MailTransport> Correlator<T> {
    /// 새 상관관계 처리기를 생성합니다.
    pub fn new(
        classifier: LineClassifier,
        store: CorrelationStore,
        notifier: Notifier<T>,
        notification_tx: mpsc::Sender<NotificationEvent>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            classifier,
            store,
            notifier,
            notification_tx,
            stats,
        }
    }

    /// 라인 하나를 처리합니다.
    pub async fn handle_line(&mut self, line: &str) {
        self.stats.lines_processed.fetch_add(1, Ordering::Relaxed);

        match self.classifier.classify(line) {
            Some(MailLogEvent::Recipient { mid, recipient }) => {
                debug!(mid = %mid, recipient = %recipient, "recipient recorded");
                self.store.record_recipient(mid, recipient);
            }
            Some(MailLogEvent::Attachment { mid, filename }) => {
                debug!(mid = %mid, filename = %filename, "attachment recorded");
                self.store.record_attachment(mid, filename);
            }
            Some(MailLogEvent::Rewrite { old_mid, new_mid }) => {
                debug!(old = %old_mid, new = %new_mid, "mid rewrite recorded");
                self.store.record_rewrite(old_mid, new_mid);
            }
            Some(MailLogEvent::Quarantine { mid }) => {
                self.handle_quarantine(mid).await;
            }
            None => {
                self.stats.parse_misses.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// 격리 이벤트를 해소하고 필요하면 알림을 전송합니다.
    async fn handle_quarantine(&mut self, mid: Mid) {
        let canonical = self.store.resolve(&mid);

        if self.store.is_notified(&canonical) {
            debug!(mid = %canonical, "already notified, skipping");
            self.stats
                .duplicate_quarantines
                .fetch_add(1, Ordering::Relaxed);
            return;
        }

        let Some(recipient) = self.store.recipient(&canonical).map(str::to_owned) else {
            warn!(mid = %canonical, "quarantine without known recipient, dropping");
            self.stats
                .dropped_quarantines
                .fetch_add(1, Ordering::Relaxed);
            return;
        };
        let attachment = self
            .store
            .attachment(&canonical)
            .unwrap_or(UNKNOWN_ATTACHMENT)
            .to_owned();

        let notification = Notification {
            canonical_mid: canonical.clone(),
            recipient,
            attachment,
        };
        let delivered = self.notifier.notify(&notification).await;
        if delivered {
            self.stats
                .notifications_sent
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
        }

        // 전송 실패와 무관하게 알림 완료로 표시하여 재시도 폭주를 막음
        self.store.mark_notified(canonical.clone());
        self.store.cleanup(&canonical);
        self.store.remove_rewrite(&mid);

        let event = NotificationEvent::new(notification, delivered);
        if self.notification_tx.send(event).await.is_err() {
            warn!("notification event receiver closed");
        }
    }

    /// 현재 추적 중인 트랜잭션 수를 반환합니다.
    pub fn tracked_count(&self) -> usize {
        self.store.tracked_count()
    }
}

/// 로그 감시 파이프라인 -- 수집/분류/상관관계/알림의 전체 흐름을 관리합니다.
///
/// core의 `Pipeline` trait을 구현하여 `ampwatch-daemon`에서
/// start/stop/health_check 생명주기로 관리됩니다.
///
/// # 사용 예시
/// ```ignore
/// use ampwatch_notify_pipeline::{WatchPipeline, WatchPipelineBuilder};
///
/// let (pipeline, notification_rx) = WatchPipelineBuilder::new()
///     .config(config)
///     .transport(transport)
///     .build()?;
///
/// pipeline.start().await?;
/// ```
pub struct WatchPipeline<T: MailTransport> {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태
    state: PipelineState,
    /// start 시 처리 태스크로 이동하는 상관관계 처리기
    correlator: Option<Correlator<T>>,
    /// start 시 처리 태스크로 이동하는 라인 수신 채널
    line_rx: Option<mpsc::Receiver<RawLine>>,
    /// 수집기에 전달하는 라인 송신 채널
    line_tx: mpsc::Sender<RawLine>,
    /// 취소 토큰 (stop에서 발동)
    cancel: CancellationToken,
    /// 백그라운드 태스크 핸들
    tasks: Vec<tokio::task::JoinHandle<()>>,
    /// 처리 카운터
    stats: Arc<PipelineStats>,
}

impl<T: MailTransport> WatchPipeline<T> {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 처리 카운터를 반환합니다.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }
}

impl<T: MailTransport> Pipeline for WatchPipeline<T> {
    async fn start(&mut self) -> Result<(), AmpwatchError> {
        if self.state == PipelineState::Running {
            return Err(ampwatch_core::error::PipelineError::AlreadyRunning.into());
        }
        // 감시 대상 파일이 없으면 시작 자체가 실패해야 함
        tokio::fs::metadata(&self.config.log_path)
            .await
            .map_err(|e| {
                AmpwatchError::from(NotifyPipelineError::Collector {
                    source_type: "file".to_owned(),
                    reason: format!("{}: {}", self.config.log_path, e),
                })
            })?;

        let (Some(mut correlator), Some(mut line_rx)) =
            (self.correlator.take(), self.line_rx.take())
        else {
            // stop 이후 재시작은 지원하지 않음
            return Err(ampwatch_core::error::PipelineError::InitFailed(
                "pipeline cannot be restarted".to_owned(),
            )
            .into());
        };

        info!(path = %self.config.log_path, "starting watch pipeline");

        // 1. 수집기 태스크
        let collector_config = FileCollectorConfig {
            path: self.config.log_path.clone().into(),
            poll_interval_ms: self.config.poll_interval_ms,
            max_line_length: self.config.max_line_length,
        };
        let mut collector =
            FileCollector::new(collector_config, self.line_tx.clone(), self.cancel.clone());
        let collector_cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = collector.run().await {
                error!(error = %e, "file collector terminated");
                collector_cancel.cancel();
            }
        }));

        // 2. 처리 태스크
        let cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    line = line_rx.recv() => {
                        match line {
                            Some(raw) => correlator.handle_line(&raw.as_text()).await,
                            None => break,
                        }
                    }
                }
            }
            debug!("processing task finished");
        }));

        self.state = PipelineState::Running;
        info!("watch pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), AmpwatchError> {
        if self.state != PipelineState::Running {
            return Err(ampwatch_core::error::PipelineError::NotRunning.into());
        }

        info!("stopping watch pipeline");
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "pipeline task join failed");
                }
            }
        }

        self.state = PipelineState::Stopped;
        info!(
            lines = self.stats.lines_processed(),
            sent = self.stats.notifications_sent(),
            failed = self.stats.send_failures(),
            "watch pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                let failures = self.stats.send_failures();
                if failures > 0 {
                    HealthStatus::Degraded(format!("{failures} notification send failures"))
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 로그 감시 파이프라인 빌더
///
/// 파이프라인을 구성하고 필요한 채널을 생성합니다.
pub struct WatchPipelineBuilder<T: MailTransport> {
    config: PipelineConfig,
    transport: Option<Arc<T>>,
    notification_tx: Option<mpsc::Sender<NotificationEvent>>,
}

impl<T: MailTransport> WatchPipelineBuilder<T> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            transport: None,
            notification_tx: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 메일 전송 구현체를 지정합니다.
    pub fn transport(mut self, transport: Arc<T>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 외부 알림 이벤트 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn notification_sender(mut self, tx: mpsc::Sender<NotificationEvent>) -> Self {
        self.notification_tx = Some(tx);
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `WatchPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<NotificationEvent>>`: 알림 이벤트 수신 채널
    ///   (외부 notification_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<
        (WatchPipeline<T>, Option<mpsc::Receiver<NotificationEvent>>),
        NotifyPipelineError,
    > {
        self.config.validate()?;

        let transport = self.transport.ok_or_else(|| NotifyPipelineError::Config {
            field: "transport".to_owned(),
            reason: "mail transport is required".to_owned(),
        })?;

        let (line_tx, line_rx) = mpsc::channel(self.config.line_channel_capacity);
        let (notification_tx, notification_rx) = if let Some(tx) = self.notification_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.config.notification_channel_capacity);
            (tx, Some(rx))
        };

        let stats = Arc::new(PipelineStats::default());
        let correlator = Correlator::new(
            LineClassifier::new()?,
            CorrelationStore::new(self.config.notified_capacity, self.config.max_resolve_hops),
            Notifier::new(transport, self.config.from_addr.clone()),
            notification_tx,
            Arc::clone(&stats),
        );

        let pipeline = WatchPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            correlator: Some(correlator),
            line_rx: Some(line_rx),
            line_tx,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            stats,
        };

        Ok((pipeline, notification_rx))
    }
}

impl<T: MailTransport> Default for WatchPipelineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
