//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `poolwatch_`
//! - 모듈명: `watch_`, `notify_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(poolwatch_core::metrics::WATCH_LINES_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 알림 카테고리 레이블 키 (failover, error_rate)
pub const LABEL_KIND: &str = "kind";

/// 심각도 레이블 키 (info, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

// ─── Watch Pipeline 메트릭 ──────────────────────────────────────────

/// Watch Pipeline: 수집된 원시 라인 수 (counter)
pub const WATCH_LINES_COLLECTED_TOTAL: &str = "poolwatch_watch_lines_collected_total";

/// Watch Pipeline: 파싱에 성공해 처리된 라인 수 (counter)
pub const WATCH_LINES_PROCESSED_TOTAL: &str = "poolwatch_watch_lines_processed_total";

/// Watch Pipeline: 파싱 에러 수 (counter)
pub const WATCH_PARSE_ERRORS_TOTAL: &str = "poolwatch_watch_parse_errors_total";

/// Watch Pipeline: 테일러 재오픈 횟수 (counter) — 파일 부재/에러/로테이션
pub const WATCH_TAILER_REOPENS_TOTAL: &str = "poolwatch_watch_tailer_reopens_total";

/// Watch Pipeline: 생성된 알림 수 (counter, label: kind)
pub const WATCH_ALERTS_GENERATED_TOTAL: &str = "poolwatch_watch_alerts_generated_total";

/// Watch Pipeline: 쿨다운으로 억제된 알림 수 (counter, label: kind)
pub const WATCH_ALERTS_SUPPRESSED_TOTAL: &str = "poolwatch_watch_alerts_suppressed_total";

/// Watch Pipeline: 현재 롤링 윈도우 에러율, 퍼센트 (gauge)
pub const WATCH_ERROR_RATE_PERCENT: &str = "poolwatch_watch_error_rate_percent";

// ─── Notify 메트릭 ──────────────────────────────────────────────────

/// Notify: 전송에 성공한 알림 수 (counter)
pub const NOTIFY_ALERTS_DELIVERED_TOTAL: &str = "poolwatch_notify_alerts_delivered_total";

/// Notify: 전송에 실패한 알림 수 (counter)
pub const NOTIFY_DELIVERY_FAILURES_TOTAL: &str = "poolwatch_notify_delivery_failures_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`를 호출하여
/// Prometheus HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `poolwatch-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Watch Pipeline
    describe_counter!(
        WATCH_LINES_COLLECTED_TOTAL,
        "Total number of raw lines collected from the access log"
    );
    describe_counter!(
        WATCH_LINES_PROCESSED_TOTAL,
        "Total number of access records successfully parsed and classified"
    );
    describe_counter!(
        WATCH_PARSE_ERRORS_TOTAL,
        "Total number of undecodable log lines skipped"
    );
    describe_counter!(
        WATCH_TAILER_REOPENS_TOTAL,
        "Total number of times the tailer reopened the access log"
    );
    describe_counter!(
        WATCH_ALERTS_GENERATED_TOTAL,
        "Total number of alert events generated per alert kind"
    );
    describe_counter!(
        WATCH_ALERTS_SUPPRESSED_TOTAL,
        "Total number of alerts suppressed by the cooldown gate per alert kind"
    );
    describe_gauge!(
        WATCH_ERROR_RATE_PERCENT,
        "Current 5xx error rate over the rolling window, in percent"
    );

    // Notify
    describe_counter!(
        NOTIFY_ALERTS_DELIVERED_TOTAL,
        "Total number of alerts delivered to the webhook endpoint"
    );
    describe_counter!(
        NOTIFY_DELIVERY_FAILURES_TOTAL,
        "Total number of failed alert delivery attempts"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_follow_convention() {
        let names = [
            WATCH_LINES_COLLECTED_TOTAL,
            WATCH_LINES_PROCESSED_TOTAL,
            WATCH_PARSE_ERRORS_TOTAL,
            WATCH_TAILER_REOPENS_TOTAL,
            WATCH_ALERTS_GENERATED_TOTAL,
            WATCH_ALERTS_SUPPRESSED_TOTAL,
            NOTIFY_ALERTS_DELIVERED_TOTAL,
            NOTIFY_DELIVERY_FAILURES_TOTAL,
        ];
        for name in names {
            assert!(name.starts_with("poolwatch_"), "bad prefix: {name}");
            assert!(name.ends_with("_total"), "counter must end in _total: {name}");
        }
        assert!(WATCH_ERROR_RATE_PERCENT.starts_with("poolwatch_"));
    }

    #[test]
    fn describe_all_does_not_panic_without_recorder() {
        // 전역 레코더가 없으면 describe는 no-op이어야 함
        describe_all();
    }
}
