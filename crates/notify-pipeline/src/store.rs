//! 상관관계 저장소 — MID별 트랜잭션 상태를 관리합니다.
//!
//! [`CorrelationStore`]는 비동기적으로 도착하는 로그 라인들에서 같은 메시지
//! 트랜잭션에 속하는 조각(수신자, 첨부파일, 재작성)을 MID 기준으로 모읍니다.
//! 전역 상태 없이 단일 소유 객체로 처리 루프에 전달되므로 테스트마다
//! 독립된 저장소를 쓸 수 있습니다.
//!
//! # 재작성 해소
//! `resolve`는 재작성 체인(A→B→C)을 끝까지 따라가 canonical MID를 반환합니다.
//! 잘못된 데이터로 인한 순환을 막기 위해 홉 수 상한을 둡니다.
//!
//! # 메모리 상한
//! 알림 완료 MID 집합은 용량 상한이 있으며, 초과 시 가장 오래된 엔트리부터
//! 제거됩니다. 상한을 넘긴 뒤 같은 MID의 격리 라인이 다시 오면 중복 알림이
//! 가능하지만, 상한(기본 10 000)은 운영상 재발 간격보다 훨씬 큽니다.

use std::collections::{HashMap, HashSet, VecDeque};

use ampwatch_core::types::Mid;

/// MID 상관관계 저장소
pub struct CorrelationStore {
    /// MID -> 수신자 주소
    recipients: HashMap<Mid, String>,
    /// MID -> 첨부파일 이름
    attachments: HashMap<Mid, String>,
    /// 원래 MID -> 재작성된 MID (방향 간선)
    rewrites: HashMap<Mid, Mid>,
    /// 알림 완료된 canonical MID 집합 (중복 알림 방지)
    notified: HashSet<Mid>,
    /// notified 삽입 순서 (용량 초과 시 FIFO 제거용)
    notified_order: VecDeque<Mid>,
    /// notified 집합 최대 용량
    notified_capacity: usize,
    /// 재작성 체인 추적 최대 홉 수
    max_resolve_hops: usize,
}

impl CorrelationStore {
    /// 새 저장소를 생성합니다.
    pub fn new(notified_capacity: usize, max_resolve_hops: usize) -> Self {
        Self {
            recipients: HashMap::new(),
            attachments: HashMap::new(),
            rewrites: HashMap::new(),
            notified: HashSet::new(),
            notified_order: VecDeque::new(),
            notified_capacity,
            max_resolve_hops,
        }
    }

    /// 수신자를 기록합니다 (upsert).
    pub fn record_recipient(&mut self, mid: Mid, recipient: impl Into<String>) {
        self.recipients.insert(mid, recipient.into());
    }

    /// 첨부파일 이름을 기록합니다 (upsert).
    pub fn record_attachment(&mut self, mid: Mid, filename: impl Into<String>) {
        self.attachments.insert(mid, filename.into());
    }

    /// MID 재작성을 기록하고 알려진 필드를 새 MID로 전파합니다.
    ///
    /// 원래 MID의 수신자/첨부파일 엔트리는 삭제하지 않습니다. 정리 전에
    /// 원래 MID가 다시 참조되어도 올바르게 해소되도록 하기 위함입니다.
    /// 재작성 시점에 아직 모르는 필드는 전파되지 않습니다 (순서 의존,
    /// 의도된 동작).
    pub fn record_rewrite(&mut self, old_mid: Mid, new_mid: Mid) {
        if let Some(recipient) = self.recipients.get(&old_mid).cloned() {
            self.recipients.insert(new_mid.clone(), recipient);
        }
        if let Some(filename) = self.attachments.get(&old_mid).cloned() {
            self.attachments.insert(new_mid.clone(), filename);
        }
        self.rewrites.insert(old_mid, new_mid);
    }

    /// 재작성 체인을 끝까지 따라가 canonical MID를 반환합니다.
    ///
    /// 재작성 엔트리가 없는 MID는 그대로 반환됩니다. 체인이 홉 수 상한을
    /// 넘으면 (잘못된 데이터로 인한 순환) 거기까지 도달한 MID를 반환합니다.
    pub fn resolve(&self, mid: &Mid) -> Mid {
        let mut current = mid;
        for _ in 0..self.max_resolve_hops {
            match self.rewrites.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// 해당 canonical MID가 이미 알림 완료되었는지 확인합니다.
    pub fn is_notified(&self, mid: &Mid) -> bool {
        self.notified.contains(mid)
    }

    /// canonical MID를 알림 완료로 표시합니다.
    ///
    /// 용량을 초과하면 가장 오래된 엔트리부터 제거하여 메모리 성장을
    /// 제한합니다.
    pub fn mark_notified(&mut self, mid: Mid) {
        if self.notified.insert(mid.clone()) {
            self.notified_order.push_back(mid);
        }
        while self.notified.len() > self.notified_capacity {
            if let Some(oldest) = self.notified_order.pop_front() {
                self.notified.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// 해당 MID의 수신자/첨부파일 엔트리를 제거합니다.
    ///
    /// 엔트리가 없으면 no-op이며, 실패하지 않습니다.
    pub fn cleanup(&mut self, mid: &Mid) {
        self.recipients.remove(mid);
        self.attachments.remove(mid);
    }

    /// 해당 원래 MID의 재작성 간선을 제거합니다.
    pub fn remove_rewrite(&mut self, mid: &Mid) {
        self.rewrites.remove(mid);
    }

    /// 수신자를 조회합니다.
    pub fn recipient(&self, mid: &Mid) -> Option<&str> {
        self.recipients.get(mid).map(String::as_str)
    }

    /// 첨부파일 이름을 조회합니다.
    pub fn attachment(&self, mid: &Mid) -> Option<&str> {
        self.attachments.get(mid).map(String::as_str)
    }

    /// 현재 추적 중인 트랜잭션 수 (수신자 엔트리 기준).
    pub fn tracked_count(&self) -> usize {
        self.recipients.len()
    }

    /// 알림 완료 MID 수.
    pub fn notified_count(&self) -> usize {
        self.notified.len()
    }

    /// 현재 재작성 간선 수.
    pub fn rewrite_count(&self) -> usize {
        self.rewrites.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CorrelationStore {
        CorrelationStore::new(100, 16)
    }

    #[test]
    fn records_and_reads_back_fields() {
        let mut s = store();
        s.record_recipient(Mid::from("100"), "alice@x.com");
        s.record_attachment(Mid::from("100"), "invoice.pdf");
        assert_eq!(s.recipient(&Mid::from("100")), Some("alice@x.com"));
        assert_eq!(s.attachment(&Mid::from("100")), Some("invoice.pdf"));
        assert_eq!(s.tracked_count(), 1);
    }

    #[test]
    fn resolve_without_rewrite_returns_same_mid() {
        let s = store();
        assert_eq!(s.resolve(&Mid::from("300")), Mid::from("300"));
    }

    #[test]
    fn resolve_follows_single_hop() {
        let mut s = store();
        s.record_rewrite(Mid::from("100"), Mid::from("200"));
        assert_eq!(s.resolve(&Mid::from("100")), Mid::from("200"));
    }

    #[test]
    fn resolve_follows_full_chain() {
        // A→B→C 체인은 C까지 따라감
        let mut s = store();
        s.record_rewrite(Mid::from("100"), Mid::from("200"));
        s.record_rewrite(Mid::from("200"), Mid::from("300"));
        assert_eq!(s.resolve(&Mid::from("100")), Mid::from("300"));
    }

    #[test]
    fn resolve_cycle_terminates() {
        // 잘못된 데이터로 순환이 생겨도 홉 상한에서 멈춤
        let mut s = store();
        s.rewrites.insert(Mid::from("1"), Mid::from("2"));
        s.rewrites.insert(Mid::from("2"), Mid::from("1"));
        let resolved = s.resolve(&Mid::from("1"));
        assert!(resolved == Mid::from("1") || resolved == Mid::from("2"));
    }

    #[test]
    fn rewrite_propagates_known_fields() {
        let mut s = store();
        s.record_recipient(Mid::from("100"), "alice@x.com");
        s.record_attachment(Mid::from("100"), "invoice.pdf");
        s.record_rewrite(Mid::from("100"), Mid::from("200"));

        assert_eq!(s.recipient(&Mid::from("200")), Some("alice@x.com"));
        assert_eq!(s.attachment(&Mid::from("200")), Some("invoice.pdf"));
        // 원래 MID 엔트리는 유지됨
        assert_eq!(s.recipient(&Mid::from("100")), Some("alice@x.com"));
    }

    #[test]
    fn rewrite_before_fields_propagates_nothing() {
        let mut s = store();
        s.record_rewrite(Mid::from("100"), Mid::from("200"));
        s.record_recipient(Mid::from("100"), "alice@x.com");

        // 재작성 시점에 몰랐던 필드는 새 MID로 전파되지 않음
        assert_eq!(s.recipient(&Mid::from("200")), None);
    }

    #[test]
    fn notified_set_is_idempotence_guard() {
        let mut s = store();
        assert!(!s.is_notified(&Mid::from("100")));
        s.mark_notified(Mid::from("100"));
        assert!(s.is_notified(&Mid::from("100")));
        // 중복 표시는 no-op
        s.mark_notified(Mid::from("100"));
        assert_eq!(s.notified_count(), 1);
    }

    #[test]
    fn notified_set_evicts_oldest_beyond_capacity() {
        let mut s = CorrelationStore::new(3, 16);
        for i in 0..5 {
            s.mark_notified(Mid::new(i.to_string()));
        }
        assert_eq!(s.notified_count(), 3);
        // 가장 오래된 0, 1이 제거되고 2, 3, 4가 남음
        assert!(!s.is_notified(&Mid::from("0")));
        assert!(!s.is_notified(&Mid::from("1")));
        assert!(s.is_notified(&Mid::from("2")));
        assert!(s.is_notified(&Mid::from("4")));
    }

    #[test]
    fn cleanup_removes_entries_and_never_fails() {
        let mut s = store();
        s.record_recipient(Mid::from("100"), "alice@x.com");
        s.cleanup(&Mid::from("100"));
        assert_eq!(s.recipient(&Mid::from("100")), None);
        // 없는 MID 정리도 no-op
        s.cleanup(&Mid::from("999"));
    }

    #[test]
    fn remove_rewrite_clears_edge() {
        let mut s = store();
        s.record_rewrite(Mid::from("100"), Mid::from("200"));
        assert_eq!(s.rewrite_count(), 1);
        s.remove_rewrite(&Mid::from("100"));
        assert_eq!(s.rewrite_count(), 0);
        assert_eq!(s.resolve(&Mid::from("100")), Mid::from("100"));
    }

    #[test]
    fn upsert_overwrites_previous_value() {
        let mut s = store();
        s.record_recipient(Mid::from("100"), "first@x.com");
        s.record_recipient(Mid::from("100"), "second@x.com");
        assert_eq!(s.recipient(&Mid::from("100")), Some("second@x.com"));
    }
}
