//! Slack 웹훅 채널 — 알림을 수신 웹훅 호환 페이로드로 전송합니다.
//!
//! 페이로드는 첨부(attachment) 하나로 구성됩니다: 심각도에서 유도한
//! 색상, 제목, 본문, 푸터 라벨, Unix 타임스탬프. 웹훅 URL이 설정되지
//! 않으면 채널은 비활성 상태이며 알림은 경고 로그로만 기록됩니다.

use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, warn};

use poolwatch_core::config::NotifyConfig;
use poolwatch_core::event::AlertEvent;
use poolwatch_core::types::Severity;

use crate::error::NotifyError;

/// Slack 웹훅 페이로드
#[derive(Debug, Serialize)]
pub struct SlackPayload {
    /// 첨부 목록 (항상 1개)
    pub attachments: Vec<SlackAttachment>,
}

/// Slack 첨부
#[derive(Debug, Serialize)]
pub struct SlackAttachment {
    /// 색상 태그 (good, warning, danger)
    pub color: String,
    /// 알림 제목
    pub title: String,
    /// 포맷된 본문 (Slack 강조 마크업)
    pub text: String,
    /// 푸터 라벨
    pub footer: String,
    /// Unix 타임스탬프 (초)
    pub ts: i64,
}

/// 심각도를 Slack 첨부 색상으로 변환합니다.
fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "good",
        Severity::Low | Severity::Medium => "warning",
        Severity::High | Severity::Critical => "danger",
    }
}

/// SystemTime을 Unix 초로 변환합니다.
fn unix_secs(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Slack 웹훅 알림 채널
#[derive(Debug, Clone)]
pub struct SlackChannel {
    /// 웹훅 엔드포인트. None이면 비활성 (로그로만 기록)
    webhook_url: Option<String>,
    /// 첨부 푸터 라벨
    footer: String,
    /// 요청 타임아웃이 적용된 HTTP 클라이언트
    client: reqwest::Client,
}

impl SlackChannel {
    /// 설정에서 채널을 생성합니다.
    ///
    /// 빈 웹훅 URL은 비활성 채널을 의미합니다 — 생성은 성공하고
    /// 전송은 로그로 대체됩니다.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let webhook_url = if config.webhook_url.is_empty() {
            None
        } else {
            Some(config.webhook_url.clone())
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::ClientBuild(e.to_string()))?;

        Ok(Self {
            webhook_url,
            footer: config.footer.clone(),
            client,
        })
    }

    /// 채널이 실제 전송을 수행하는지 확인합니다.
    pub fn enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// 알림 이벤트를 페이로드로 변환합니다.
    pub fn format_payload(&self, event: &AlertEvent) -> SlackPayload {
        SlackPayload {
            attachments: vec![SlackAttachment {
                color: severity_color(event.severity).to_owned(),
                title: event.alert.title.clone(),
                text: event.alert.body.clone(),
                footer: self.footer.clone(),
                ts: unix_secs(event.alert.created_at),
            }],
        }
    }

    /// 알림 이벤트를 전송합니다.
    ///
    /// 비활성 채널이면 알림을 경고 로그로 기록하고 성공을 반환합니다.
    /// 비성공 응답과 전송 에러는 [`NotifyError`]로 반환되며, 호출자가
    /// 로깅 후 계속 진행합니다.
    pub async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let Some(webhook_url) = self.webhook_url.as_ref() else {
            warn!(
                title = event.alert.title.as_str(),
                "webhook url not set, alert logged only"
            );
            warn!(body = event.alert.body.as_str(), "alert body");
            return Ok(());
        };

        let payload = self.format_payload(event);
        debug!(
            kind = event.alert.kind.as_str(),
            title = event.alert.title.as_str(),
            "sending webhook notification"
        );

        let response = self.client.post(webhook_url).json(&payload).send().await?;

        if response.status().is_success() {
            debug!(
                kind = event.alert.kind.as_str(),
                "webhook notification sent"
            );
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::UnexpectedStatus { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use poolwatch_core::types::{Alert, AlertKind};

    fn sample_event(severity: Severity) -> AlertEvent {
        let alert = Alert {
            id: "alert-001".to_owned(),
            kind: AlertKind::ErrorRate,
            title: "⚠️ High Error Rate: 2.50%".to_owned(),
            body: "🔴 *High Error Rate Detected*".to_owned(),
            severity,
            created_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        };
        AlertEvent::new(alert, severity)
    }

    fn channel_with(webhook_url: &str) -> SlackChannel {
        let config = NotifyConfig {
            webhook_url: webhook_url.to_owned(),
            ..Default::default()
        };
        SlackChannel::from_config(&config).unwrap()
    }

    #[test]
    fn empty_url_disables_channel() {
        let channel = channel_with("");
        assert!(!channel.enabled());
    }

    #[test]
    fn set_url_enables_channel() {
        let channel = channel_with("https://hooks.slack.com/services/T0/B0/X");
        assert!(channel.enabled());
    }

    #[tokio::test]
    async fn disabled_channel_send_succeeds_by_logging() {
        let channel = channel_with("");
        let result = channel.send(&sample_event(Severity::High)).await;
        assert!(result.is_ok());
    }

    #[test]
    fn payload_carries_alert_fields() {
        let channel = channel_with("https://hooks.slack.com/services/T0/B0/X");
        let payload = channel.format_payload(&sample_event(Severity::High));
        assert_eq!(payload.attachments.len(), 1);
        let attachment = &payload.attachments[0];
        assert_eq!(attachment.color, "danger");
        assert_eq!(attachment.title, "⚠️ High Error Rate: 2.50%");
        assert_eq!(attachment.footer, "Blue/Green Monitoring");
        assert_eq!(attachment.ts, 1_700_000_000);
    }

    #[test]
    fn payload_serializes_to_webhook_shape() {
        let channel = channel_with("https://hooks.slack.com/services/T0/B0/X");
        let payload = channel.format_payload(&sample_event(Severity::Medium));
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["attachments"].is_array());
        assert_eq!(json["attachments"][0]["color"], "warning");
        assert!(json["attachments"][0]["ts"].is_i64());
    }

    #[test]
    fn severity_color_mapping() {
        assert_eq!(severity_color(Severity::Info), "good");
        assert_eq!(severity_color(Severity::Low), "warning");
        assert_eq!(severity_color(Severity::Medium), "warning");
        assert_eq!(severity_color(Severity::High), "danger");
        assert_eq!(severity_color(Severity::Critical), "danger");
    }

    #[test]
    fn unix_secs_before_epoch_is_zero() {
        assert_eq!(unix_secs(SystemTime::UNIX_EPOCH), 0);
    }
}
