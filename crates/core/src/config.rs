//! 설정 관리 — poolwatch.toml 파싱 및 런타임 설정
//!
//! [`PoolwatchConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`POOLWATCH_WATCH_WINDOW_SIZE=500` 형식)
//! 3. 설정 파일 (`poolwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), poolwatch_core::error::PoolwatchError> {
//! use poolwatch_core::config::PoolwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PoolwatchConfig::load("poolwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PoolwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PoolwatchError};

/// Poolwatch 통합 설정
///
/// `poolwatch.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 액세스 로그 감시 설정
    #[serde(default)]
    pub watch: WatchConfig,
    /// 알림 전송 설정
    #[serde(default)]
    pub notify: NotifyConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PoolwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PoolwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드하되, 파일이 없으면 기본값을 사용합니다.
    ///
    /// 두 경우 모두 환경변수 오버라이드가 적용됩니다. 데몬이 기본 경로로
    /// 기동할 때 사용하며, 설정 파일 없이 환경변수만으로 운영할 수 있습니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, PoolwatchError> {
        let path = path.as_ref();
        match Self::from_file(path).await {
            Ok(mut config) => {
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            Err(PoolwatchError::Config(ConfigError::FileNotFound { .. })) => {
                warn!(
                    path = %path.display(),
                    "config file not found, using defaults with env overrides"
                );
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(e),
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PoolwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PoolwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PoolwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PoolwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            PoolwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `POOLWATCH_{SECTION}_{FIELD}`
    /// 예: `POOLWATCH_WATCH_WINDOW_SIZE=500`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "POOLWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "POOLWATCH_GENERAL_LOG_FORMAT");

        // Watch
        override_string(&mut self.watch.access_log, "POOLWATCH_WATCH_ACCESS_LOG");
        override_usize(&mut self.watch.window_size, "POOLWATCH_WATCH_WINDOW_SIZE");
        override_f64(
            &mut self.watch.error_rate_threshold,
            "POOLWATCH_WATCH_ERROR_RATE_THRESHOLD",
        );
        override_u64(&mut self.watch.cooldown_secs, "POOLWATCH_WATCH_COOLDOWN_SECS");
        override_u64(
            &mut self.watch.poll_interval_ms,
            "POOLWATCH_WATCH_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.watch.retry_interval_secs,
            "POOLWATCH_WATCH_RETRY_INTERVAL_SECS",
        );

        // Notify
        override_string(&mut self.notify.webhook_url, "POOLWATCH_NOTIFY_WEBHOOK_URL");
        override_u64(&mut self.notify.timeout_secs, "POOLWATCH_NOTIFY_TIMEOUT_SECS");
        override_string(&mut self.notify.footer, "POOLWATCH_NOTIFY_FOOTER");

        // Metrics
        override_bool(&mut self.metrics.enabled, "POOLWATCH_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "POOLWATCH_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "POOLWATCH_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PoolwatchError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        const MAX_WINDOW_SIZE: usize = 1_000_000;
        if self.watch.window_size == 0 || self.watch.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "watch.window_size".to_owned(),
                reason: format!("must be 1-{MAX_WINDOW_SIZE}"),
            }
            .into());
        }

        if !(0.0..=100.0).contains(&self.watch.error_rate_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "watch.error_rate_threshold".to_owned(),
                reason: "must be a percentage between 0 and 100".to_owned(),
            }
            .into());
        }

        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watch.poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.watch.retry_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watch.retry_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.watch.access_log.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "watch.access_log".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if !Path::new(&self.watch.access_log).is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: "watch.access_log".to_owned(),
                reason: format!("'{}' must be an absolute path", self.watch.access_log),
            }
            .into());
        }

        // webhook_url은 비어있으면 전송 비활성화, 비어있지 않으면 http(s)여야 함
        if !self.notify.webhook_url.is_empty()
            && !self.notify.webhook_url.starts_with("http://")
            && !self.notify.webhook_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "notify.webhook_url".to_owned(),
                reason: "must start with http:// or https:// when set".to_owned(),
            }
            .into());
        }

        if self.notify.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notify.timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 액세스 로그 감시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// 감시할 액세스 로그 파일 경로
    pub access_log: String,
    /// 롤링 에러 윈도우 크기 (요청 수)
    pub window_size: usize,
    /// 에러율 알림 임계치 (퍼센트)
    pub error_rate_threshold: f64,
    /// 알림 쿨다운 간격 (초, 카테고리별로 추적)
    pub cooldown_secs: u64,
    /// 새 라인 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 파일 부재/읽기 에러 시 재시도 간격 (초)
    pub retry_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            access_log: "/var/log/nginx/access.log".to_owned(),
            window_size: 200,
            error_rate_threshold: 2.0,
            cooldown_secs: 300,
            poll_interval_ms: 100,
            retry_interval_secs: 2,
        }
    }
}

/// 알림 전송 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// 웹훅 엔드포인트 URL (비어있으면 전송 비활성화, 알림은 로그로만 기록)
    pub webhook_url: String,
    /// HTTP 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 알림 푸터 라벨
    pub footer: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_secs: 10,
            footer: "Blue/Green Monitoring".to_owned(),
        }
    }
}

/// 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9187,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = PoolwatchConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.watch.access_log, "/var/log/nginx/access.log");
        assert_eq!(config.watch.window_size, 200);
        assert!((config.watch.error_rate_threshold - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.watch.cooldown_secs, 300);
        assert_eq!(config.watch.poll_interval_ms, 100);
        assert_eq!(config.watch.retry_interval_secs, 2);
        assert!(config.notify.webhook_url.is_empty());
        assert_eq!(config.notify.timeout_secs, 10);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = PoolwatchConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = PoolwatchConfig::parse("").unwrap();
        assert_eq!(config.watch.window_size, 200);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[watch]
window_size = 500
error_rate_threshold = 5.0
"#;
        let config = PoolwatchConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.watch.window_size, 500);
        assert!((config.watch.error_rate_threshold - 5.0).abs() < f64::EPSILON);
        // 쿨다운은 기본값 유지
        assert_eq!(config.watch.cooldown_secs, 300);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"

[watch]
access_log = "/var/log/nginx/bluegreen.log"
window_size = 1000
error_rate_threshold = 1.5
cooldown_secs = 600
poll_interval_ms = 250
retry_interval_secs = 5

[notify]
webhook_url = "https://hooks.slack.com/services/T00/B00/XYZ"
timeout_secs = 15
footer = "Edge Monitoring"

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9200
"#;
        let config = PoolwatchConfig::parse(toml).unwrap();
        assert_eq!(config.watch.access_log, "/var/log/nginx/bluegreen.log");
        assert_eq!(config.watch.window_size, 1000);
        assert_eq!(config.watch.cooldown_secs, 600);
        assert_eq!(
            config.notify.webhook_url,
            "https://hooks.slack.com/services/T00/B00/XYZ"
        );
        assert_eq!(config.notify.footer, "Edge Monitoring");
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9200);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = PoolwatchConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            PoolwatchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = PoolwatchConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = PoolwatchConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_window_size() {
        let mut config = PoolwatchConfig::default();
        config.watch.window_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("window_size"));
    }

    #[test]
    fn validate_rejects_threshold_over_100() {
        let mut config = PoolwatchConfig::default();
        config.watch.error_rate_threshold = 250.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("error_rate_threshold"));
    }

    #[test]
    fn validate_accepts_zero_cooldown() {
        // 쿨다운 0은 억제 비활성화를 의미하므로 허용
        let mut config = PoolwatchConfig::default();
        config.watch.cooldown_secs = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_relative_access_log() {
        let mut config = PoolwatchConfig::default();
        config.watch.access_log = "logs/access.log".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access_log"));
    }

    #[test]
    fn validate_rejects_non_http_webhook() {
        let mut config = PoolwatchConfig::default();
        config.notify.webhook_url = "ftp://example.com/hook".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("webhook_url"));
    }

    #[test]
    fn validate_accepts_empty_webhook() {
        // 비어있는 웹훅 URL은 전송 비활성화
        let config = PoolwatchConfig::default();
        assert!(config.notify.webhook_url.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_POOLWATCH_STR", "overridden") };
        override_string(&mut val, "TEST_POOLWATCH_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_POOLWATCH_STR") };
    }

    #[test]
    fn env_override_f64_valid() {
        let mut val = 2.0;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_POOLWATCH_F64", "7.5") };
        override_f64(&mut val, "TEST_POOLWATCH_F64");
        assert!((val - 7.5).abs() < f64::EPSILON);
        unsafe { std::env::remove_var("TEST_POOLWATCH_F64") };
    }

    #[test]
    fn env_override_invalid_keeps_original() {
        let mut val = 100u64;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_POOLWATCH_U64_BAD", "not-a-number") };
        override_u64(&mut val, "TEST_POOLWATCH_U64_BAD");
        assert_eq!(val, 100); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_POOLWATCH_U64_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_POOLWATCH_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = PoolwatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = PoolwatchConfig::parse(&toml_str).unwrap();
        assert_eq!(config.watch.window_size, parsed.watch.window_size);
        assert_eq!(config.watch.access_log, parsed.watch.access_log);
        assert_eq!(config.notify.timeout_secs, parsed.notify.timeout_secs);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = PoolwatchConfig::from_file("/nonexistent/path/poolwatch.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            PoolwatchError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn load_or_default_falls_back_on_missing_file() {
        let config = PoolwatchConfig::load_or_default("/nonexistent/path/poolwatch.toml")
            .await
            .unwrap();
        assert_eq!(config.watch.window_size, 200);
    }

    #[tokio::test]
    async fn load_or_default_propagates_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poolwatch.toml");
        tokio::fs::write(&path, "broken = [[[toml").await.unwrap();
        let result = PoolwatchConfig::load_or_default(&path).await;
        assert!(result.is_err());
    }
}
