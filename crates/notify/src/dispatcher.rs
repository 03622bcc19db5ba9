//! 알림 디스패처 — 알림 채널을 소비 루프로 감쌉니다.
//!
//! [`AlertDispatcher`]는 core의 [`Pipeline`](poolwatch_core::pipeline::Pipeline)
//! trait을 구현하여 `poolwatch-daemon`에서 감시 파이프라인과 동일한
//! 생명주기로 관리됩니다. 감시 파이프라인의 알림 채널을 수신측으로
//! 연결하면, 수신된 모든 `AlertEvent`가 Slack 채널로 전송됩니다.
//!
//! 전송 실패는 로깅되고 루프는 계속됩니다 — 탐지 주기는 전송
//! 신뢰성과 무관하게 진행됩니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use poolwatch_core::config::NotifyConfig;
use poolwatch_core::error::{PipelineError, PoolwatchError};
use poolwatch_core::event::AlertEvent;
use poolwatch_core::metrics as metric_names;
use poolwatch_core::pipeline::{HealthStatus, Pipeline};

use crate::error::NotifyError;
use crate::slack::SlackChannel;

/// 디스패처 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum DispatcherState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 알림 디스패처
///
/// 알림 채널을 소비하며 각 이벤트를 전송 채널로 전달합니다.
pub struct AlertDispatcher {
    /// 전송 채널
    channel: SlackChannel,
    /// 알림 수신 채널 (start 시 소비 태스크로 이동)
    alert_rx: Option<mpsc::Receiver<AlertEvent>>,
    /// 현재 상태
    state: DispatcherState,
    /// 전송 성공 카운터 (소비 태스크와 공유)
    delivered: Arc<AtomicU64>,
    /// 전송 실패 카운터 (소비 태스크와 공유)
    failed: Arc<AtomicU64>,
    /// 소비 태스크 종료 토큰
    cancel: CancellationToken,
    /// 소비 태스크 핸들
    task: Option<tokio::task::JoinHandle<()>>,
}

impl AlertDispatcher {
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            DispatcherState::Initialized => "initialized",
            DispatcherState::Running => "running",
            DispatcherState::Stopped => "stopped",
        }
    }

    /// 전송에 성공한 알림 수를 반환합니다.
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// 전송에 실패한 알림 수를 반환합니다.
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// 전송 채널이 활성인지 확인합니다 (웹훅 URL 설정 여부).
    pub fn delivery_enabled(&self) -> bool {
        self.channel.enabled()
    }
}

impl Pipeline for AlertDispatcher {
    async fn start(&mut self) -> Result<(), PoolwatchError> {
        if self.state == DispatcherState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        let Some(mut alert_rx) = self.alert_rx.take() else {
            return Err(PipelineError::InitFailed(
                "alert receiver already consumed".to_owned(),
            )
            .into());
        };

        tracing::info!(
            delivery_enabled = self.channel.enabled(),
            "starting alert dispatcher"
        );

        self.cancel = CancellationToken::new();
        let channel = self.channel.clone();
        let delivered = Arc::clone(&self.delivered);
        let failed = Arc::clone(&self.failed);
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = alert_rx.recv() => {
                        let Some(event) = received else { break };
                        tracing::info!(%event, "dispatching alert");
                        match channel.send(&event).await {
                            Ok(()) => {
                                delivered.fetch_add(1, Ordering::Relaxed);
                                counter!(metric_names::NOTIFY_ALERTS_DELIVERED_TOTAL)
                                    .increment(1);
                            }
                            Err(e) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                counter!(metric_names::NOTIFY_DELIVERY_FAILURES_TOTAL)
                                    .increment(1);
                                tracing::error!(
                                    error = %e,
                                    title = event.alert.title.as_str(),
                                    "alert delivery failed"
                                );
                            }
                        }
                    }
                }
            }
            tracing::debug!("alert dispatcher loop terminated");
        }));

        self.state = DispatcherState::Running;
        tracing::info!("alert dispatcher started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PoolwatchError> {
        if self.state != DispatcherState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping alert dispatcher");

        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "dispatcher task terminated abnormally");
        }

        self.state = DispatcherState::Stopped;
        tracing::info!(
            delivered = self.delivered.load(Ordering::Relaxed),
            failed = self.failed.load(Ordering::Relaxed),
            "alert dispatcher stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            DispatcherState::Running => HealthStatus::Healthy,
            DispatcherState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            DispatcherState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 알림 디스패처 빌더
pub struct AlertDispatcherBuilder {
    config: NotifyConfig,
    alert_rx: Option<mpsc::Receiver<AlertEvent>>,
}

impl AlertDispatcherBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: NotifyConfig::default(),
            alert_rx: None,
        }
    }

    /// 전송 설정을 지정합니다.
    pub fn config(mut self, config: NotifyConfig) -> Self {
        self.config = config;
        self
    }

    /// 감시 파이프라인의 알림 채널 수신측을 연결합니다.
    pub fn alert_receiver(mut self, rx: mpsc::Receiver<AlertEvent>) -> Self {
        self.alert_rx = Some(rx);
        self
    }

    /// 디스패처를 빌드합니다.
    ///
    /// 알림 수신 채널이 연결되지 않았으면 에러입니다.
    pub fn build(self) -> Result<AlertDispatcher, NotifyError> {
        if self.alert_rx.is_none() {
            return Err(NotifyError::NotConfigured(
                "alert receiver not connected".to_owned(),
            ));
        }

        let channel = SlackChannel::from_config(&self.config)?;

        Ok(AlertDispatcher {
            channel,
            alert_rx: self.alert_rx,
            state: DispatcherState::Initialized,
            delivered: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
            task: None,
        })
    }
}

impl Default for AlertDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
