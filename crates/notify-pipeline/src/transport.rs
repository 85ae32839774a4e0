//! 메일 전송 계층
//!
//! [`MailTransport`] trait가 전송 경계를 정의하고, [`SmtpTransport`]가
//! 로컬 릴레이와의 최소 SMTP 대화를 구현합니다. 전송마다 새 연결을 열고
//! 대화 종료 후 닫으므로 연결 상태를 보관하지 않습니다.
//!
//! 테스트에서는 [`MockTransport`]로 전송 호출을 기록하고 성공/실패를
//! 시뮬레이션할 수 있습니다.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::NotifyPipelineError;

/// 발신 메일 한 통
///
/// 봉투 주소와 헤더/본문을 함께 담습니다. `render`가 DATA 구간에
/// 쓸 CRLF 본문을 생성합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    /// 봉투 발신자 (MAIL FROM)
    pub from: String,
    /// 봉투 수신자 (RCPT TO)
    pub to: String,
    /// Subject 헤더
    pub subject: String,
    /// 본문 (LF 줄바꿈, 렌더링 시 CRLF로 변환)
    pub body: String,
}

impl OutboundMail {
    /// DATA 구간에 쓸 메시지를 렌더링합니다.
    ///
    /// 헤더와 본문을 CRLF로 잇고, 점으로 시작하는 라인은
    /// dot-stuffing 규칙에 따라 이스케이프합니다.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str("\r\n");
        for line in self.body.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with('.') {
                out.push('.');
            }
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

/// 메일 전송 trait
///
/// 알림 생성과 실제 전송을 분리하는 경계입니다. 구현체는 한 통의
/// 메일을 전송하거나 단계별 에러를 반환합니다.
pub trait MailTransport: Send + Sync + 'static {
    /// 메일 한 통을 전송합니다.
    fn send(
        &self,
        mail: &OutboundMail,
    ) -> impl std::future::Future<Output = Result<(), NotifyPipelineError>> + Send;
}

/// 릴레이 접속 정보
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    relay_host: String,
    relay_port: u16,
    helo_domain: String,
    connect_timeout: Duration,
}

impl SmtpTransport {
    /// 새 SMTP 전송기를 생성합니다.
    pub fn new(
        relay_host: impl Into<String>,
        relay_port: u16,
        helo_domain: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            relay_host: relay_host.into(),
            relay_port,
            helo_domain: helo_domain.into(),
            connect_timeout,
        }
    }

    /// [`PipelineConfig`](crate::config::PipelineConfig)에서 전송기를 생성합니다.
    pub fn from_config(config: &crate::config::PipelineConfig) -> Self {
        Self::new(
            config.relay_host.clone(),
            config.relay_port,
            config.helo_domain.clone(),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    async fn connect(&self) -> Result<TcpStream, NotifyPipelineError> {
        let addr = format!("{}:{}", self.relay_host, self.relay_port);
        let connect = TcpStream::connect(&addr);
        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(NotifyPipelineError::Transport {
                stage: "connect".to_owned(),
                reason: format!("{}: {}", addr, e),
            }),
            Err(_) => Err(NotifyPipelineError::Transport {
                stage: "connect".to_owned(),
                reason: format!("{}: timeout after {:?}", addr, self.connect_timeout),
            }),
        }
    }
}

/// 릴레이 응답 한 개를 읽고 상태 코드를 반환합니다.
///
/// `250-`으로 시작하는 연속 라인은 마지막 라인(`250 `)까지 소비합니다.
async fn read_reply(
    reader: &mut BufReader<OwnedReadHalf>,
    stage: &str,
) -> Result<u16, NotifyPipelineError> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.map_err(|e| {
            NotifyPipelineError::Transport {
                stage: stage.to_owned(),
                reason: format!("read failed: {}", e),
            }
        })?;
        if n == 0 {
            return Err(NotifyPipelineError::Transport {
                stage: stage.to_owned(),
                reason: "connection closed by relay".to_owned(),
            });
        }

        let trimmed = line.trim_end();
        let code: u16 = trimmed
            .get(..3)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| NotifyPipelineError::Transport {
                stage: stage.to_owned(),
                reason: format!("malformed reply: {:?}", trimmed),
            })?;

        // 연속 라인 (예: "250-SIZE")은 계속 읽음
        if trimmed.as_bytes().get(3) == Some(&b'-') {
            continue;
        }
        return Ok(code);
    }
}

async fn send_command(
    writer: &mut OwnedWriteHalf,
    reader: &mut BufReader<OwnedReadHalf>,
    stage: &str,
    command: &str,
    expect: u16,
) -> Result<(), NotifyPipelineError> {
    writer
        .write_all(format!("{}\r\n", command).as_bytes())
        .await
        .map_err(|e| NotifyPipelineError::Transport {
            stage: stage.to_owned(),
            reason: format!("write failed: {}", e),
        })?;

    let code = read_reply(reader, stage).await?;
    if code != expect {
        return Err(NotifyPipelineError::Transport {
            stage: stage.to_owned(),
            reason: format!("unexpected reply code {} (expected {})", code, expect),
        });
    }
    Ok(())
}

impl MailTransport for SmtpTransport {
    fn send(
        &self,
        mail: &OutboundMail,
    ) -> impl std::future::Future<Output = Result<(), NotifyPipelineError>> + Send {
        let mail = mail.clone();
        async move {
            let stream = self.connect().await?;
            let (read_half, mut writer) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            // 릴레이 인사 (220)
            let greeting = read_reply(&mut reader, "greeting").await?;
            if greeting != 220 {
                return Err(NotifyPipelineError::Transport {
                    stage: "greeting".to_owned(),
                    reason: format!("unexpected greeting code {}", greeting),
                });
            }

            send_command(
                &mut writer,
                &mut reader,
                "helo",
                &format!("HELO {}", self.helo_domain),
                250,
            )
            .await?;
            send_command(
                &mut writer,
                &mut reader,
                "mail",
                &format!("MAIL FROM:<{}>", mail.from),
                250,
            )
            .await?;
            send_command(
                &mut writer,
                &mut reader,
                "rcpt",
                &format!("RCPT TO:<{}>", mail.to),
                250,
            )
            .await?;
            send_command(&mut writer, &mut reader, "data", "DATA", 354).await?;

            let message = mail.render();
            writer
                .write_all(message.as_bytes())
                .await
                .map_err(|e| NotifyPipelineError::Transport {
                    stage: "data".to_owned(),
                    reason: format!("write failed: {}", e),
                })?;
            send_command(&mut writer, &mut reader, "data", ".", 250).await?;

            // QUIT 실패는 무시 (메일은 이미 수락됨)
            let _ = writer.write_all(b"QUIT\r\n").await;

            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;

    use super::*;

    /// 전송 호출을 기록하는 테스트용 전송기
    pub struct MockTransport {
        /// 전송된 메일 기록
        pub sent: Mutex<Vec<OutboundMail>>,
        /// true면 모든 전송이 실패
        pub fail: bool,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl MailTransport for MockTransport {
        fn send(
            &self,
            mail: &OutboundMail,
        ) -> impl std::future::Future<Output = Result<(), NotifyPipelineError>> + Send {
            let mail = mail.clone();
            async move {
                if self.fail {
                    return Err(NotifyPipelineError::Transport {
                        stage: "connect".to_owned(),
                        reason: "mock failure".to_owned(),
                    });
                }
                self.sent.lock().unwrap().push(mail);
                Ok(())
            }
        }
    }
}
