//! 파일 기반 로그 수집기
//!
//! 어플라이언스 로그 파일을 감시하며 새로 추가되는 라인을 수집합니다.
//! `tail -f`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 동작
//! - 시작 시 파일 끝으로 이동하여 기존 내용은 건너뜁니다.
//! - 주기적으로 새 바이트를 읽고 줄바꿈 단위로 잘라 전달합니다.
//! - 줄바꿈이 아직 없는 끝부분은 carry 버퍼에 보관했다가 다음 읽기와 잇습니다.
//! - 파일 크기가 줄어들면 (truncation) 처음부터 다시 읽습니다.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CollectorStatus, RawLine};
use crate::error::NotifyPipelineError;

/// 한 번의 폴링에서 읽는 청크 크기
const READ_CHUNK: usize = 8 * 1024;

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct FileCollectorConfig {
    /// 감시할 파일 경로
    pub path: PathBuf,
    /// 새 데이터가 없을 때의 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 최대 라인 길이 (바이트, 초과분은 잘림)
    pub max_line_length: usize,
}

impl Default for FileCollectorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/log/esa/mail.log"),
            poll_interval_ms: 1000,
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

/// 파일 기반 로그 수집기
///
/// 지정된 파일을 주기적으로 폴링하여 새로운 로그 라인을 수집합니다.
/// 파일이 열리지 않으면 `run`이 즉시 에러로 종료됩니다.
pub struct FileCollector {
    config: FileCollectorConfig,
    tx: mpsc::Sender<RawLine>,
    cancel: CancellationToken,
    status: CollectorStatus,
    /// 줄바꿈 미완성 끝부분 보관 버퍼
    carry: Vec<u8>,
}

impl FileCollector {
    /// 새 파일 수집기를 생성합니다.
    pub fn new(
        config: FileCollectorConfig,
        tx: mpsc::Sender<RawLine>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            tx,
            cancel,
            status: CollectorStatus::Idle,
            carry: Vec::new(),
        }
    }

    /// 수집기를 시작합니다.
    ///
    /// 취소 토큰이 취소될 때까지 실행됩니다.
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub async fn run(&mut self) -> Result<(), NotifyPipelineError> {
        let source = format!("file:{}", self.config.path.display());

        let mut file = File::open(&self.config.path).await.map_err(|e| {
            self.status = CollectorStatus::Error(e.to_string());
            NotifyPipelineError::Collector {
                source_type: "file".to_owned(),
                reason: format!("{}: {}", self.config.path.display(), e),
            }
        })?;

        // 기존 내용은 건너뛰고 끝에서부터 감시
        let mut offset = file.seek(SeekFrom::End(0)).await?;
        self.status = CollectorStatus::Running;
        info!(path = %self.config.path.display(), offset, "file collector started");

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let len = file.metadata().await?.len();
            if len < offset {
                // truncation: 처음부터 다시 읽음
                warn!(path = %self.config.path.display(), "file truncated, restarting from beginning");
                offset = file.seek(SeekFrom::Start(0)).await?;
                self.carry.clear();
            }

            let n = file.read(&mut chunk).await?;
            if n == 0 {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
                continue;
            }
            offset += n as u64;

            self.carry.extend_from_slice(&chunk[..n]);
            self.emit_complete_lines(&source).await?;
        }

        self.status = CollectorStatus::Stopped;
        info!(path = %self.config.path.display(), "file collector stopped");
        Ok(())
    }

    /// carry 버퍼에서 완성된 라인들을 잘라 채널로 전달합니다.
    async fn emit_complete_lines(&mut self, source: &str) -> Result<(), NotifyPipelineError> {
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.carry.drain(..=pos).collect();
            line.pop(); // '\n' 제거
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                continue;
            }
            if line.len() > self.config.max_line_length {
                warn!(
                    length = line.len(),
                    max = self.config.max_line_length,
                    "line exceeds maximum length, truncating"
                );
                line.truncate(self.config.max_line_length);
            }

            let raw = RawLine::new(Bytes::from(line), source);
            self.tx.send(raw).await.map_err(|_| {
                NotifyPipelineError::Channel("line receiver closed".to_owned())
            })?;
        }

        if !self.carry.is_empty() {
            debug!(pending = self.carry.len(), "partial line carried to next read");
        }
        Ok(())
    }

    /// 현재 상태를 반환합니다.
    pub fn status(&self) -> &CollectorStatus {
        &self.status
    }
}
