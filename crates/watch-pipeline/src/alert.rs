//! 알림 생성 및 쿨다운 억제 — 탐지 결과를 AlertEvent로 변환합니다.
//!
//! [`AlertGenerator`]는 탐지기 출력([`PoolTransition`], [`ErrorRateBreach`])을
//! 받아 쿨다운 게이트를 통과한 경우에만 [`AlertEvent`]를 생성합니다.
//! 쿨다운은 알림 생성 결정 시점에 기록됩니다 — 전송 성공 여부와
//! 무관합니다 (억제는 탐지 빈도에 대한 것이지 전송 신뢰성에 대한
//! 것이 아님).

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use chrono::Local;
use metrics::counter;

use poolwatch_core::event::AlertEvent;
use poolwatch_core::metrics as metric_names;
use poolwatch_core::types::{Alert, AlertKind, Severity};

use crate::detector::{ErrorRateBreach, PoolTransition};

/// 카테고리별 쿨다운 게이트
///
/// 카테고리당 마지막 발화 시각을 기록하고, 쿨다운 간격이 엄격하게
/// 지난 경우에만 다음 알림을 허용합니다. 엔트리는 만료되지 않고
/// 비교에만 사용됩니다.
#[derive(Debug)]
pub struct CooldownGate {
    /// 쿨다운 간격 (카테고리 간 공유)
    cooldown: Duration,
    /// 카테고리별 마지막 발화 시각
    last_fired: HashMap<AlertKind, Instant>,
}

impl CooldownGate {
    /// 지정한 쿨다운 간격으로 새 게이트를 생성합니다.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
        }
    }

    /// 이 카테고리의 쿨다운이 만료되었는지 확인합니다.
    ///
    /// 한 번도 발화하지 않았거나 `now - last_fired > cooldown`(엄격)이면
    /// true입니다.
    pub fn is_expired(&self, kind: AlertKind) -> bool {
        match self.last_fired.get(&kind) {
            None => true,
            Some(fired_at) => fired_at.elapsed() > self.cooldown,
        }
    }

    /// 이 카테고리의 발화 시각을 지금으로 기록합니다.
    pub fn mark_fired(&mut self, kind: AlertKind) {
        self.last_fired.insert(kind, Instant::now());
    }
}

/// 알림 생성기
///
/// 탐지 결과를 `AlertEvent`로 변환하며, 쿨다운 억제를 적용하고
/// 생성/억제 카운터를 유지합니다.
pub struct AlertGenerator {
    /// 쿨다운 게이트
    cooldown: CooldownGate,
    /// 생성된 총 알림 수
    total_generated: u64,
    /// 쿨다운으로 억제된 알림 수
    suppressed: u64,
}

impl AlertGenerator {
    /// 쿨다운 간격(초)으로 새 생성기를 만듭니다.
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: CooldownGate::new(Duration::from_secs(cooldown_secs)),
            total_generated: 0,
            suppressed: 0,
        }
    }

    /// 풀 전환에서 failover 알림을 생성합니다.
    ///
    /// 쿨다운이 활성이면 `None` — 전환 자체는 탐지기에서 이미
    /// 기록되었으므로 여기서는 알림만 억제됩니다.
    pub fn failover(&mut self, transition: &PoolTransition) -> Option<AlertEvent> {
        if !self.check_gate(AlertKind::Failover) {
            return None;
        }

        let from = transition.from.to_uppercase();
        let to = transition.to.to_uppercase();
        tracing::warn!(
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            "pool failover detected"
        );

        let title = format!("🔄 Pool Failover: {from} → {to}");
        let body = format!(
            "🚨 *Failover Detected*\n\
             • From: *{from}*\n\
             • To: *{to}*\n\
             • Time: {}\n\n\
             *Action Required:*\n\
             Check {} app health and logs.",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            transition.from,
        );

        Some(self.emit(AlertKind::Failover, title, body, Severity::Medium))
    }

    /// 에러율 초과에서 error-rate 알림을 생성합니다.
    pub fn error_rate(&mut self, breach: &ErrorRateBreach) -> Option<AlertEvent> {
        if !self.check_gate(AlertKind::ErrorRate) {
            return None;
        }

        tracing::warn!(
            rate = format_args!("{:.2}", breach.rate),
            threshold = breach.threshold,
            errors = breach.error_count,
            "error rate threshold exceeded"
        );

        let title = format!("⚠️ High Error Rate: {:.2}%", breach.rate);
        let body = format!(
            "🔴 *High Error Rate Detected*\n\
             • Current Rate: *{:.2}%*\n\
             • Threshold: {}%\n\
             • Window: Last {} requests\n\
             • 5xx Errors: {}\n\
             • Time: {}\n\n\
             *Action Required:*\n\
             Investigate upstream application logs and consider rollback.",
            breach.rate,
            breach.threshold,
            breach.window_size,
            breach.error_count,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
        );

        Some(self.emit(AlertKind::ErrorRate, title, body, Severity::High))
    }

    /// 생성된 총 알림 수를 반환합니다.
    pub fn total_generated(&self) -> u64 {
        self.total_generated
    }

    /// 쿨다운으로 억제된 알림 수를 반환합니다.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// 쿨다운 게이트를 확인합니다. 억제 시 false.
    fn check_gate(&mut self, kind: AlertKind) -> bool {
        if self.cooldown.is_expired(kind) {
            return true;
        }
        self.suppressed += 1;
        counter!(
            metric_names::WATCH_ALERTS_SUPPRESSED_TOTAL,
            metric_names::LABEL_KIND => kind.as_str()
        )
        .increment(1);
        tracing::debug!(kind = kind.as_str(), "alert suppressed by cooldown");
        false
    }

    /// 알림을 구성하고 쿨다운을 기록합니다.
    fn emit(
        &mut self,
        kind: AlertKind,
        title: String,
        body: String,
        severity: Severity,
    ) -> AlertEvent {
        let alert = Alert {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title,
            body,
            severity,
            created_at: SystemTime::now(),
        };

        // 전송 결과와 무관하게 생성 결정 즉시 쿨다운 기록
        self.cooldown.mark_fired(kind);
        self.total_generated += 1;
        counter!(
            metric_names::WATCH_ALERTS_GENERATED_TOTAL,
            metric_names::LABEL_KIND => kind.as_str()
        )
        .increment(1);

        AlertEvent::new(alert, severity)
    }
}
