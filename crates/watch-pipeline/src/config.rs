//! 감시 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`WatchConfig`](poolwatch_core::config::WatchConfig)를
//! 기반으로 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```
//! use poolwatch_core::config::PoolwatchConfig;
//! use poolwatch_pipeline::config::PipelineConfig;
//!
//! let core_config = PoolwatchConfig::default();
//! let config = PipelineConfig::from_core(&core_config.watch);
//! assert_eq!(config.window_size, 200);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// 감시 파이프라인 설정
///
/// core의 `WatchConfig`에서 파생되며, 파이프라인 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 감시할 액세스 로그 파일 경로
    pub access_log: String,
    /// 롤링 에러 윈도우 크기 (요청 수)
    pub window_size: usize,
    /// 에러율 알림 임계치 (퍼센트, 초과 시에만 알림)
    pub error_rate_threshold: f64,
    /// 알림 쿨다운 간격 (초)
    pub cooldown_secs: u64,
    /// 새 라인 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 파일 부재/읽기 에러 시 재시도 간격 (초)
    pub retry_interval_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 수집기 -> 프로세서 라인 채널 용량
    pub line_channel_capacity: usize,
    /// 주기적 상태 요약 로그 간격 (처리 라인 수)
    pub status_report_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            access_log: "/var/log/nginx/access.log".to_owned(),
            window_size: 200,
            error_rate_threshold: 2.0,
            cooldown_secs: 300,
            poll_interval_ms: 100,
            retry_interval_secs: 2,
            line_channel_capacity: 1024,
            status_report_every: 50,
        }
    }
}

impl PipelineConfig {
    /// core의 `WatchConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &poolwatch_core::config::WatchConfig) -> Self {
        Self {
            access_log: core.access_log.clone(),
            window_size: core.window_size,
            error_rate_threshold: core.error_rate_threshold,
            cooldown_secs: core.cooldown_secs,
            poll_interval_ms: core.poll_interval_ms,
            retry_interval_secs: core.retry_interval_secs,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), WatchError> {
        const MAX_WINDOW_SIZE: usize = 1_000_000;

        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(WatchError::Config {
                field: "window_size".to_owned(),
                reason: format!("must be 1-{MAX_WINDOW_SIZE}"),
            });
        }

        if !(0.0..=100.0).contains(&self.error_rate_threshold) {
            return Err(WatchError::Config {
                field: "error_rate_threshold".to_owned(),
                reason: "must be a percentage between 0 and 100".to_owned(),
            });
        }

        if self.poll_interval_ms == 0 {
            return Err(WatchError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.retry_interval_secs == 0 {
            return Err(WatchError::Config {
                field: "retry_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.access_log.is_empty() {
            return Err(WatchError::Config {
                field: "access_log".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if !Path::new(&self.access_log).is_absolute() {
            return Err(WatchError::Config {
                field: "access_log".to_owned(),
                reason: format!("'{}' must be an absolute path", self.access_log),
            });
        }

        if self.line_channel_capacity == 0 {
            return Err(WatchError::Config {
                field: "line_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.status_report_every == 0 {
            return Err(WatchError::Config {
                field: "status_report_every".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
///
/// 테스트와 임베딩에서 개별 필드를 오버라이드할 때 사용합니다.
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 액세스 로그 경로를 설정합니다.
    pub fn access_log(mut self, path: impl Into<String>) -> Self {
        self.config.access_log = path.into();
        self
    }

    /// 롤링 윈도우 크기를 설정합니다.
    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    /// 에러율 임계치(퍼센트)를 설정합니다.
    pub fn error_rate_threshold(mut self, percent: f64) -> Self {
        self.config.error_rate_threshold = percent;
        self
    }

    /// 쿨다운 간격(초)을 설정합니다.
    pub fn cooldown_secs(mut self, secs: u64) -> Self {
        self.config.cooldown_secs = secs;
        self
    }

    /// 폴링 주기(밀리초)를 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 재시도 간격(초)을 설정합니다.
    pub fn retry_interval_secs(mut self, secs: u64) -> Self {
        self.config.retry_interval_secs = secs;
        self
    }

    /// 라인 채널 용량을 설정합니다.
    pub fn line_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.line_channel_capacity = capacity;
        self
    }

    /// 상태 요약 간격(처리 라인 수)을 설정합니다.
    pub fn status_report_every(mut self, lines: u64) -> Self {
        self.config.status_report_every = lines;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, WatchError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
