//! 알림 생성기
//!
//! 격리 판정이 확정된 [`Notification`]을 발신 메일로 변환하여 전송 계층에
//! 넘깁니다. 전송 실패는 여기서 흡수됩니다. 이벤트 루프를 중단시키지 않고
//! 결과만 bool로 보고합니다.

use std::sync::Arc;

use tracing::{info, warn};

use ampwatch_core::types::Notification;

use crate::transport::{MailTransport, OutboundMail};

/// 수신자에게 보내는 안내문 본문을 생성합니다.
fn compose_body(recipient: &str, attachment: &str) -> String {
    format!(
        "Dear {recipient},\n\n\
         Your message with attachment '{attachment}' has been quarantined for AMP analysis.\n\
         It will be delivered automatically if found safe.\n\n\
         Thank you for your patience."
    )
}

/// 알림 생성기
///
/// 전송 구현체는 제네릭으로 주입되어 테스트에서 교체할 수 있습니다.
pub struct Notifier<T: MailTransport> {
    transport: Arc<T>,
    from_addr: String,
}

impl<T: MailTransport> Notifier<T> {
    /// 새 알림 생성기를 만듭니다.
    pub fn new(transport: Arc<T>, from_addr: impl Into<String>) -> Self {
        Self {
            transport,
            from_addr: from_addr.into(),
        }
    }

    /// 알림 메일을 구성합니다.
    pub fn compose(&self, notification: &Notification) -> OutboundMail {
        OutboundMail {
            from: self.from_addr.clone(),
            to: notification.recipient.clone(),
            subject: format!(
                "Email Held for Security Analysis ({})",
                notification.attachment
            ),
            body: compose_body(&notification.recipient, &notification.attachment),
        }
    }

    /// 알림 메일을 전송합니다.
    ///
    /// 성공 시 `true`, 실패 시 `false`를 반환합니다. 실패는 로그로
    /// 기록될 뿐 호출자에게 에러로 전파되지 않습니다.
    pub async fn notify(&self, notification: &Notification) -> bool {
        let mail = self.compose(notification);
        match self.transport.send(&mail).await {
            Ok(()) => {
                info!(
                    mid = %notification.canonical_mid,
                    recipient = %notification.recipient,
                    attachment = %notification.attachment,
                    "notification mail sent"
                );
                true
            }
            Err(e) => {
                warn!(
                    mid = %notification.canonical_mid,
                    recipient = %notification.recipient,
                    error = %e,
                    "notification mail failed"
                );
                false
            }
        }
    }
}
