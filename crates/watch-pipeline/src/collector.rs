//! 파일 수집기 — 액세스 로그를 `tail -f` 방식으로 따라갑니다.
//!
//! 파일 끝에서 시작하여 새로 추가되는 라인만 수집합니다 (과거 내용은
//! 재생하지 않음). 파일 부재와 읽기 에러는 재시도 대기 후 재오픈으로
//! 내부에서 복구되며, 상위로 전파되는 I/O 실패는 없습니다. 이 루프는
//! 프로세스 수명 동안 실행되도록 설계되었고 최대 재시도 횟수가
//! 없습니다.
//!
//! # 로테이션 감지
//! - inode 변경 감지 (logrotate 등, Unix 전용)
//! - 파일 크기 축소 감지 (truncation)
//! - 로테이션된 새 파일은 처음부터 읽어 라인 유실을 방지

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use metrics::counter;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use poolwatch_core::metrics as metric_names;

/// 로테이션 확인 결과
#[derive(Debug, PartialEq, Eq)]
enum Rotation {
    /// 변화 없음
    None,
    /// 파일 교체됨 (inode 변경 또는 경로 소멸)
    Rotated,
    /// 파일이 읽기 위치보다 짧아짐
    Truncated,
}

/// 팔로우 루프 종료 사유
enum FollowExit {
    /// 로테이션/절단 감지 — 새 파일을 처음부터 읽어야 함
    Reopen,
    /// 읽기 에러 — 재시도 대기 후 끝에서 다시 시작
    ReadError,
    /// 취소되었거나 수신측이 닫힘
    Shutdown,
}

/// 파일 기반 라인 수집기
///
/// 하나의 로그 파일을 폴링하며 완성된 라인(개행으로 끝난)을
/// `mpsc::Sender<String>` 채널로 전달합니다.
pub struct FileTailer {
    /// 감시할 파일 경로
    path: PathBuf,
    /// 새 라인 폴링 주기
    poll_interval: Duration,
    /// 파일 부재/에러 시 재시도 간격
    retry_interval: Duration,
    /// 수집된 라인 전송 채널
    tx: mpsc::Sender<String>,
    /// 협조적 종료 토큰
    cancel: CancellationToken,
}

impl FileTailer {
    /// 새 파일 수집기를 생성합니다.
    pub fn new(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        retry_interval: Duration,
        tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            retry_interval,
            tx,
            cancel,
        }
    }

    /// 수집기를 실행합니다. 취소될 때까지 반환하지 않습니다.
    ///
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub async fn run(self) {
        // 로테이션 직후에는 새 파일을 처음부터, 그 외에는 끝에서 시작
        let mut read_from_start = false;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let mut file = match File::open(&self.path).await {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(path = %self.path.display(), "log file not found, waiting");
                    if self.wait(self.retry_interval).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to open log file, retrying"
                    );
                    if self.wait(self.retry_interval).await {
                        break;
                    }
                    continue;
                }
            };

            let position = if read_from_start {
                0
            } else {
                match file.seek(SeekFrom::End(0)).await {
                    Ok(pos) => pos,
                    Err(e) => {
                        warn!(error = %e, "failed to seek to end of log file, retrying");
                        if self.wait(self.retry_interval).await {
                            break;
                        }
                        continue;
                    }
                }
            };
            read_from_start = false;

            let inode = file.metadata().await.ok().as_ref().and_then(inode_of);
            counter!(metric_names::WATCH_TAILER_REOPENS_TOTAL).increment(1);
            info!(
                path = %self.path.display(),
                position,
                "started tailing"
            );

            match self.follow(file, inode, position).await {
                FollowExit::Reopen => {
                    read_from_start = true;
                }
                FollowExit::ReadError => {
                    if self.wait(self.retry_interval).await {
                        break;
                    }
                }
                FollowExit::Shutdown => break,
            }
        }

        debug!("tailer loop terminated");
    }

    /// 열린 파일을 따라가며 완성된 라인을 전송합니다.
    async fn follow(&self, file: File, inode: Option<u64>, mut position: u64) -> FollowExit {
        let mut reader = BufReader::new(file);
        let mut line = String::new();

        loop {
            if self.cancel.is_cancelled() {
                return FollowExit::Shutdown;
            }

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    // 새 데이터 없음 — 로테이션 확인 후 대기
                    match self.check_rotation(inode, position).await {
                        Rotation::Rotated => {
                            info!(path = %self.path.display(), "log rotation detected, reopening");
                            return FollowExit::Reopen;
                        }
                        Rotation::Truncated => {
                            info!(path = %self.path.display(), "log truncation detected, reopening");
                            return FollowExit::Reopen;
                        }
                        Rotation::None => {}
                    }
                    if self.wait(self.poll_interval).await {
                        return FollowExit::Shutdown;
                    }
                }
                Ok(n) => {
                    position += n as u64;
                    // 개행이 아직 없으면 다음 읽기에서 이어붙임
                    if line.ends_with('\n') {
                        let text = line.trim_end_matches(['\n', '\r']).to_owned();
                        line.clear();
                        counter!(metric_names::WATCH_LINES_COLLECTED_TOTAL).increment(1);
                        if self.tx.send(text).await.is_err() {
                            debug!("line receiver dropped, stopping tailer");
                            return FollowExit::Shutdown;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "error reading log file, reopening");
                    return FollowExit::ReadError;
                }
            }
        }
    }

    /// 경로를 다시 stat하여 로테이션/절단 여부를 확인합니다.
    async fn check_rotation(&self, opened_inode: Option<u64>, position: u64) -> Rotation {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            // 경로가 사라짐 — 재생성을 기다리도록 오픈 경로로 되돌림
            Err(_) => return Rotation::Rotated,
        };

        if let (Some(opened), Some(current)) = (opened_inode, inode_of(&meta))
            && opened != current
        {
            return Rotation::Rotated;
        }

        if meta.len() < position {
            return Rotation::Truncated;
        }

        Rotation::None
    }

    /// 취소 가능하게 대기합니다. 취소되었으면 true를 반환합니다.
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

#[cfg(unix)]
fn inode_of(meta: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn inode_of(_meta: &std::fs::Metadata) -> Option<u64> {
    None
}
