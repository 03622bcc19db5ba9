//! 알림 전송 에러 타입

use poolwatch_core::error::{PipelineError, PoolwatchError};

/// 알림 전송 도메인 에러
///
/// 전송 실패는 호출자(디스패처 루프)가 로깅하고 계속 진행합니다 —
/// 탐지 파이프라인까지 전파되는 전송 에러는 없습니다.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// 채널이 비활성 상태 (웹훅 URL 미설정)
    #[error("notify channel not configured: {0}")]
    NotConfigured(String),

    /// HTTP 클라이언트 구성 실패
    #[error("failed to build http client: {0}")]
    ClientBuild(String),

    /// HTTP 요청 실패 (연결 실패, 타임아웃 등)
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 엔드포인트가 비성공 응답을 반환
    #[error("webhook returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문 (진단용)
        body: String,
    },
}

impl From<NotifyError> for PoolwatchError {
    fn from(err: NotifyError) -> Self {
        PoolwatchError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_display() {
        let err = NotifyError::UnexpectedStatus {
            status: 404,
            body: "no_service".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("no_service"));
    }

    #[test]
    fn converts_to_poolwatch_error() {
        let err = NotifyError::NotConfigured("webhook_url".to_owned());
        let top: PoolwatchError = err.into();
        assert!(matches!(top, PoolwatchError::Pipeline(_)));
    }
}
