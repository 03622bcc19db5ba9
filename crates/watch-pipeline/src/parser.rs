//! 액세스 로그 파서 — JSON 라인을 액세스 레코드로 디코딩
//!
//! 리버스 프록시가 한 줄에 하나씩 기록하는 JSON 객체를 파싱합니다.
//! 알 수 없는 필드는 무시하고, 누락된 필드는 기본값으로 채웁니다.
//! 디코딩 불가능한 라인은 에러로 반환되며, 파이프라인이 해당 라인을
//! 스킵합니다 (상위로 전파되지 않음).
//!
//! # 상태 코드 해석
//!
//! 업스트림(백엔드)이 보고한 상태 코드가 엣지(프록시) 상태 코드보다
//! 애플리케이션 건강 상태를 더 정확히 반영하므로, `upstream_status`가
//! 존재하면 우선합니다. [`AccessRecord::resolved_status`] 참고.

use serde::Deserialize;

use crate::error::WatchError;

/// 필드 파싱 실패 시의 기본 상태 코드
const DEFAULT_STATUS: u16 = 200;

/// 풀 필드 누락 시의 센티널 값
pub const UNKNOWN_POOL: &str = "unknown";

/// 정수 또는 숫자 문자열로 기록될 수 있는 상태 코드 필드
///
/// 프록시 설정에 따라 `"status": 502`와 `"status": "502"` 두 형태가
/// 모두 나타나므로 둘 다 허용합니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    /// JSON 정수로 기록된 상태 코드
    Number(i64),
    /// 숫자 문자열로 기록된 상태 코드
    Text(String),
    /// 그 외 JSON 값 (null, 불리언 등) — 해석 시 기본값으로 대체
    Other(serde_json::Value),
}

impl StatusValue {
    /// 상태 코드를 `u16`으로 파싱합니다. 실패 시 `None`.
    fn as_u16(&self) -> Option<u16> {
        match self {
            Self::Number(n) => u16::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse::<u16>().ok(),
            Self::Other(_) => None,
        }
    }
}

impl Default for StatusValue {
    fn default() -> Self {
        Self::Number(i64::from(DEFAULT_STATUS))
    }
}

/// 파싱된 액세스 레코드
///
/// 한 라인에서 디코딩되며, 분류가 끝나면 폐기됩니다.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessRecord {
    /// 요청을 처리한 백엔드 풀 (예: "blue", "green")
    #[serde(default = "default_pool")]
    pub pool: String,
    /// 업스트림이 보고한 상태 코드 — 비어있거나 `"-"`일 수 있음
    #[serde(default)]
    pub upstream_status: String,
    /// 프록시가 클라이언트에 반환한 상태 코드
    #[serde(default)]
    pub status: StatusValue,
    /// 요청 경로
    #[serde(default)]
    pub path: String,
}

fn default_pool() -> String {
    UNKNOWN_POOL.to_owned()
}

impl AccessRecord {
    /// 이 레코드의 정식 HTTP 상태 코드를 결정합니다.
    ///
    /// 해석 순서:
    /// 1. `upstream_status`가 비어있지 않고 `"-"`가 아니면 정수로 파싱
    /// 2. 그 외에는 `status`를 파싱
    /// 3. 선택된 필드의 파싱이 실패하면 200
    pub fn resolved_status(&self) -> u16 {
        let parsed = if !self.upstream_status.is_empty() && self.upstream_status != "-" {
            self.upstream_status.trim().parse::<u16>().ok()
        } else {
            self.status.as_u16()
        };
        parsed.unwrap_or(DEFAULT_STATUS)
    }
}

/// 액세스 로그 라인 파서
///
/// JSON 한 줄을 [`AccessRecord`]로 변환합니다.
#[derive(Debug)]
pub struct AccessLogParser {
    /// 최대 허용 입력 크기 (바이트)
    max_line_length: usize,
}

impl AccessLogParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_line_length: 64 * 1024, // 64KB
        }
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// 한 라인을 액세스 레코드로 파싱합니다.
    ///
    /// 앞뒤 공백을 제거한 뒤 JSON 객체로 디코딩합니다.
    /// 실패한 라인은 호출자가 스킵합니다.
    pub fn parse(&self, line: &str) -> Result<AccessRecord, WatchError> {
        if line.len() > self.max_line_length {
            return Err(WatchError::Parse {
                reason: format!(
                    "line too long: {} bytes (max: {})",
                    line.len(),
                    self.max_line_length
                ),
            });
        }

        let trimmed = line.trim();
        serde_json::from_str::<AccessRecord>(trimmed).map_err(|e| WatchError::Parse {
            reason: e.to_string(),
        })
    }
}

impl Default for AccessLogParser {
    fn default() -> Self {
        Self::new()
    }
}
