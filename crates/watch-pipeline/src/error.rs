//! 감시 파이프라인 에러 타입
//!
//! [`WatchError`]는 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<WatchError> for PoolwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use poolwatch_core::error::{PipelineError, PoolwatchError};

/// 감시 파이프라인 도메인 에러
///
/// 라인 파싱, 파일 수집, 설정, 채널 통신 등 파이프라인 내부의
/// 에러 상황을 포괄합니다. 파싱 에러와 수집기 I/O 에러는 파이프라인
/// 내부에서 복구되며 상위로 전파되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// 로그 라인 디코딩 실패 (해당 라인은 스킵됨)
    #[error("parse error: {reason}")]
    Parse {
        /// 실패 사유
        reason: String,
    },

    /// 수집기 에러 (파일 I/O 등)
    #[error("collector error: {reason}")]
    Collector {
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WatchError> for PoolwatchError {
    fn from(err: WatchError) -> Self {
        PoolwatchError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}
