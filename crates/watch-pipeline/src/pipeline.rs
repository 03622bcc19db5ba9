//! 파이프라인 오케스트레이션 -- 수집/파싱/탐지/알림 생성의 전체 흐름을 관리합니다.
//!
//! [`WatchPipeline`]은 core의 [`Pipeline`](poolwatch_core::pipeline::Pipeline) trait을
//! 구현하여 `poolwatch-daemon`에서 다른 모듈과 동일한 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! FileTailer -> mpsc -> LineProcessor -> mpsc -> downstream (notify)
//!                        |- AccessLogParser
//!                        |- FailoverDetector
//!                        |- ErrorRateDetector
//!                        '- AlertGenerator (cooldown)
//! ```
//!
//! 라인 처리는 채널 순서대로 한 번에 하나씩 수행됩니다 — 한 라인의
//! 파싱/분류/평가가 끝난 뒤에야 다음 라인을 읽습니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use poolwatch_core::error::{PipelineError, PoolwatchError};
use poolwatch_core::event::AlertEvent;
use poolwatch_core::metrics as metric_names;
use poolwatch_core::pipeline::{HealthStatus, Pipeline};

use crate::alert::AlertGenerator;
use crate::collector::FileTailer;
use crate::config::PipelineConfig;
use crate::detector::{ErrorRateDetector, FailoverDetector};
use crate::error::WatchError;
use crate::parser::AccessLogParser;

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

/// 라인 프로세서 — 한 라인을 파싱하고 두 탐지기를 거쳐 알림을 생성합니다.
///
/// 모든 탐지 상태(롤링 윈도우, 풀 기준선, 쿨다운 맵)를 배타적으로
/// 소유합니다. 파이프라인의 처리 태스크로 이동되어 단일 흐름에서만
/// 접근되므로 잠금이 필요 없습니다.
pub struct LineProcessor {
    /// 라인 파서
    parser: AccessLogParser,
    /// 풀 전환 탐지기
    failover: FailoverDetector,
    /// 에러율 탐지기 (롤링 윈도우 소유)
    error_rate: ErrorRateDetector,
    /// 알림 생성기 (쿨다운 게이트 소유)
    alerts: AlertGenerator,
    /// 파싱에 성공해 처리된 라인 수 (관찰용)
    processed: Arc<AtomicU64>,
    /// 파싱 에러 수 (관찰용)
    parse_errors: Arc<AtomicU64>,
    /// 주기적 상태 요약 간격
    status_report_every: u64,
}

impl LineProcessor {
    /// 설정에서 새 프로세서를 생성합니다.
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_counters(
            config,
            Arc::new(AtomicU64::new(0)),
            Arc::new(AtomicU64::new(0)),
        )
    }

    /// 외부에서 공유하는 카운터로 프로세서를 생성합니다.
    fn with_counters(
        config: &PipelineConfig,
        processed: Arc<AtomicU64>,
        parse_errors: Arc<AtomicU64>,
    ) -> Self {
        Self {
            parser: AccessLogParser::new(),
            failover: FailoverDetector::new(),
            error_rate: ErrorRateDetector::new(config.window_size, config.error_rate_threshold),
            alerts: AlertGenerator::new(config.cooldown_secs),
            processed,
            parse_errors,
            status_report_every: config.status_report_every,
        }
    }

    /// 한 라인을 처리하고 생성된 알림 이벤트를 반환합니다.
    ///
    /// 디코딩 불가능한 라인은 스킵되며 처리 카운터를 올리지 않습니다.
    pub fn process_line(&mut self, line: &str) -> Vec<AlertEvent> {
        let record = match self.parser.parse(line) {
            Ok(record) => record,
            Err(e) => {
                self.parse_errors.fetch_add(1, Ordering::Relaxed);
                counter!(metric_names::WATCH_PARSE_ERRORS_TOTAL).increment(1);
                tracing::debug!(error = %e, "skipping undecodable line");
                return Vec::new();
            }
        };

        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        counter!(metric_names::WATCH_LINES_PROCESSED_TOTAL).increment(1);

        let status = record.resolved_status();
        self.error_rate.record(status);

        let mut events = Vec::new();

        if let Some(transition) = self.failover.observe(&record.pool)
            && let Some(event) = self.alerts.failover(&transition)
        {
            events.push(event);
        }

        if let Some(breach) = self.error_rate.evaluate()
            && let Some(event) = self.alerts.error_rate(&breach)
        {
            events.push(event);
        }

        if processed % self.status_report_every == 0 {
            let rate = self.error_rate.window().observed_rate();
            gauge!(metric_names::WATCH_ERROR_RATE_PERCENT).set(rate);
            tracing::info!(
                requests = processed,
                pool = record.pool.as_str(),
                error_rate = format_args!("{rate:.2}"),
                "status summary"
            );
        }

        events
    }

    /// 처리된 라인 수를 반환합니다.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// 파싱 에러 수를 반환합니다.
    pub fn parse_error_count(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }
}

/// 감시 파이프라인 -- 수집/파싱/탐지/알림 생성의 전체 흐름을 관리합니다.
///
/// # 사용 예시
/// ```ignore
/// use poolwatch_core::pipeline::Pipeline;
/// use poolwatch_pipeline::{WatchPipeline, WatchPipelineBuilder};
///
/// let (mut pipeline, alert_rx) = WatchPipelineBuilder::new()
///     .config(config)
///     .build()?;
///
/// pipeline.start().await?;
/// ```
pub struct WatchPipeline {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태
    state: PipelineState,
    /// 알림 전송 채널 (파이프라인 -> downstream)
    alert_tx: mpsc::Sender<AlertEvent>,
    /// 처리된 라인 카운터 (처리 태스크와 공유)
    processed: Arc<AtomicU64>,
    /// 파싱 에러 카운터 (처리 태스크와 공유)
    parse_errors: Arc<AtomicU64>,
    /// 백그라운드 태스크 종료 토큰
    cancel: CancellationToken,
    /// 백그라운드 태스크 핸들
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl WatchPipeline {
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 처리된 라인 수를 반환합니다.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// 파싱 에러 수를 반환합니다.
    pub fn parse_error_count(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }
}

impl Pipeline for WatchPipeline {
    async fn start(&mut self) -> Result<(), PoolwatchError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tracing::info!("starting watch pipeline");

        self.cancel = CancellationToken::new();
        let (line_tx, mut line_rx) = mpsc::channel::<String>(self.config.line_channel_capacity);

        // 1. 테일러 태스크 스폰
        let tailer = FileTailer::new(
            PathBuf::from(&self.config.access_log),
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_secs(self.config.retry_interval_secs),
            line_tx,
            self.cancel.clone(),
        );
        self.tasks.push(tokio::spawn(tailer.run()));

        // 2. 라인 처리 태스크 스폰 — 탐지 상태 전체가 이 태스크로 이동
        let mut processor = LineProcessor::with_counters(
            &self.config,
            Arc::clone(&self.processed),
            Arc::clone(&self.parse_errors),
        );
        let alert_tx = self.alert_tx.clone();
        let cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = line_rx.recv() => {
                        let Some(line) = received else { break };
                        for event in processor.process_line(&line) {
                            if alert_tx.send(event).await.is_err() {
                                tracing::error!("alert channel closed, stopping line processor");
                                return;
                            }
                        }
                    }
                }
            }
            tracing::debug!("line processor terminated");
        }));

        self.state = PipelineState::Running;
        tracing::info!(
            path = self.config.access_log.as_str(),
            window_size = self.config.window_size,
            threshold = self.config.error_rate_threshold,
            cooldown_secs = self.config.cooldown_secs,
            "watch pipeline started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PoolwatchError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping watch pipeline");

        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "pipeline task terminated abnormally");
            }
        }

        self.state = PipelineState::Stopped;
        tracing::info!(
            processed = self.processed.load(Ordering::Relaxed),
            parse_errors = self.parse_errors.load(Ordering::Relaxed),
            "watch pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => HealthStatus::Healthy,
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 감시 파이프라인 빌더
///
/// 파이프라인을 구성하고 필요한 채널을 생성합니다.
pub struct WatchPipelineBuilder {
    config: PipelineConfig,
    alert_tx: Option<mpsc::Sender<AlertEvent>>,
    alert_channel_capacity: usize,
}

impl WatchPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            alert_tx: None,
            alert_channel_capacity: 256,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 외부 알림 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn alert_sender(mut self, tx: mpsc::Sender<AlertEvent>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    /// 알림 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn alert_channel_capacity(mut self, capacity: usize) -> Self {
        self.alert_channel_capacity = capacity;
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `WatchPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<AlertEvent>>`: 알림 수신 채널
    ///   (외부 alert_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(WatchPipeline, Option<mpsc::Receiver<AlertEvent>>), WatchError> {
        self.config.validate()?;

        let (alert_tx, alert_rx) = if let Some(tx) = self.alert_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.alert_channel_capacity);
            (tx, Some(rx))
        };

        let pipeline = WatchPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            alert_tx,
            processed: Arc::new(AtomicU64::new(0)),
            parse_errors: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        };

        Ok((pipeline, alert_rx))
    }
}

impl Default for WatchPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
