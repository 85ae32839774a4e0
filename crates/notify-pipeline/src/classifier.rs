//! 라인 분류기 — 어플라이언스 로그 라인을 이벤트로 변환합니다.
//!
//! 로그 라인 하나를 네 가지 이벤트 형태와 대조하여 타입이 지정된 필드를
//! 추출합니다. 매칭은 부분 문자열 기준이라 타임스탬프나 프로세스 태그 등
//! 주변 메타데이터를 파싱할 필요가 없습니다.
//!
//! # 이벤트 우선순위
//! 한 라인은 고정된 순서로 검사되며 첫 매칭에서 종료합니다:
//! 1. 수신자 (`MID n ... To: <addr>`)
//! 2. 첨부파일 (`MID n attachment 'name'`)
//! 3. 재작성 (`MID n rewritten to MID m`)
//! 4. 격리 (`MID n quarantined to "File Analysis"`)
//!
//! 어느 것에도 해당하지 않는 라인은 이벤트를 만들지 않습니다 (parse miss).

use regex::Regex;

use ampwatch_core::types::Mid;

use crate::error::NotifyPipelineError;

/// 분류된 로그 이벤트
///
/// 분류기가 생성하고 상관관계 루프가 소비하는 중간 데이터 형식입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailLogEvent {
    /// 수신자 확인: `To:` 라인에서 추출
    Recipient {
        /// 메시지 식별자
        mid: Mid,
        /// 수신 주소 (꺾쇠괄호 내부)
        recipient: String,
    },
    /// 첨부파일 선언
    Attachment {
        /// 메시지 식별자
        mid: Mid,
        /// 첨부파일 이름 (따옴표 내부)
        filename: String,
    },
    /// MID 재작성: 어플라이언스 내부 재할당
    Rewrite {
        /// 원래 MID
        old_mid: Mid,
        /// 재작성된 MID
        new_mid: Mid,
    },
    /// File Analysis 격리
    Quarantine {
        /// 격리된 메시지의 MID
        mid: Mid,
    },
}

/// 라인 분류기
///
/// 네 개의 정규식을 생성 시 한 번 컴파일하여 보관합니다.
pub struct LineClassifier {
    recipient: Regex,
    attachment: Regex,
    rewrite: Regex,
    quarantine: Regex,
}

impl LineClassifier {
    /// 어플라이언스 로그 형식에 맞는 기본 패턴으로 분류기를 생성합니다.
    pub fn new() -> Result<Self, NotifyPipelineError> {
        Ok(Self {
            recipient: Regex::new(r"MID (\d+).*?To: <(\S+)>")?,
            attachment: Regex::new(r"MID (\d+) attachment '(\S+)'")?,
            rewrite: Regex::new(r"MID (\d+) rewritten to MID (\d+)")?,
            quarantine: Regex::new(r#"MID (\d+) quarantined to "File Analysis""#)?,
        })
    }

    /// 라인 하나를 분류합니다.
    ///
    /// 우선순위 순서로 검사하여 첫 매칭의 이벤트를 반환하며,
    /// 매칭이 없으면 `None`을 반환합니다.
    pub fn classify(&self, line: &str) -> Option<MailLogEvent> {
        if let Some(caps) = self.recipient.captures(line) {
            return Some(MailLogEvent::Recipient {
                mid: Mid::from(&caps[1]),
                recipient: caps[2].to_owned(),
            });
        }

        if let Some(caps) = self.attachment.captures(line) {
            return Some(MailLogEvent::Attachment {
                mid: Mid::from(&caps[1]),
                filename: caps[2].to_owned(),
            });
        }

        if let Some(caps) = self.rewrite.captures(line) {
            return Some(MailLogEvent::Rewrite {
                old_mid: Mid::from(&caps[1]),
                new_mid: Mid::from(&caps[2]),
            });
        }

        if let Some(caps) = self.quarantine.captures(line) {
            return Some(MailLogEvent::Quarantine {
                mid: Mid::from(&caps[1]),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LineClassifier {
        LineClassifier::new().unwrap()
    }

    #[test]
    fn classifies_recipient_line() {
        let event = classifier()
            .classify("Wed Aug 13 10:01:22 2025 Info: MID 100 ICID 5 To: <alice@x.com>")
            .unwrap();
        assert_eq!(
            event,
            MailLogEvent::Recipient {
                mid: Mid::from("100"),
                recipient: "alice@x.com".to_owned(),
            }
        );
    }

    #[test]
    fn classifies_attachment_line() {
        let event = classifier()
            .classify("Info: MID 100 attachment 'invoice.pdf'")
            .unwrap();
        assert_eq!(
            event,
            MailLogEvent::Attachment {
                mid: Mid::from("100"),
                filename: "invoice.pdf".to_owned(),
            }
        );
    }

    #[test]
    fn classifies_rewrite_line() {
        let event = classifier()
            .classify("Info: MID 100 rewritten to MID 200 by LDAP rewrite")
            .unwrap();
        assert_eq!(
            event,
            MailLogEvent::Rewrite {
                old_mid: Mid::from("100"),
                new_mid: Mid::from("200"),
            }
        );
    }

    #[test]
    fn classifies_quarantine_line() {
        let event = classifier()
            .classify(r#"Info: MID 200 quarantined to "File Analysis" (AMP verdict pending)"#)
            .unwrap();
        assert_eq!(
            event,
            MailLogEvent::Quarantine {
                mid: Mid::from("200"),
            }
        );
    }

    #[test]
    fn quarantine_requires_file_analysis_queue() {
        // 다른 격리 큐는 이 시스템의 대상이 아님
        let result = classifier().classify(r#"Info: MID 200 quarantined to "Policy""#);
        assert_eq!(result, None);
    }

    #[test]
    fn unmatched_line_yields_none() {
        assert_eq!(classifier().classify("Info: New SMTP ICID 5"), None);
        assert_eq!(classifier().classify(""), None);
    }

    #[test]
    fn recipient_takes_priority_over_later_shapes() {
        // 한 라인에 여러 형태가 섞여 있으면 우선순위가 높은 쪽이 이김
        let event = classifier()
            .classify("MID 100 To: <a@x.com> MID 100 rewritten to MID 200")
            .unwrap();
        assert!(matches!(event, MailLogEvent::Recipient { .. }));
    }

    #[test]
    fn tolerates_surrounding_metadata() {
        let line = "Aug 13 10:01:22 esa01 mail_logs: Info: MID 4521 attachment 'report_q3.xlsx'";
        let event = classifier().classify(line).unwrap();
        assert_eq!(
            event,
            MailLogEvent::Attachment {
                mid: Mid::from("4521"),
                filename: "report_q3.xlsx".to_owned(),
            }
        );
    }

    #[test]
    fn recipient_allows_text_between_mid_and_to() {
        let event = classifier()
            .classify("MID 7 From: <bob@y.com> To: <carol@z.com>")
            .unwrap();
        assert_eq!(
            event,
            MailLogEvent::Recipient {
                mid: Mid::from("7"),
                recipient: "carol@z.com".to_owned(),
            }
        );
    }
}
