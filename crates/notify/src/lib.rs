#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`slack`]: Slack 웹훅 호환 페이로드 포맷과 HTTP 전송 채널
//! - [`dispatcher`]: 알림 채널 소비 루프 (Pipeline trait 구현)
//! - [`error`]: 도메인 에러 타입

pub mod dispatcher;
pub mod error;
pub mod slack;

// --- 주요 타입 re-export ---

pub use dispatcher::{AlertDispatcher, AlertDispatcherBuilder};
pub use error::NotifyError;
pub use slack::{SlackAttachment, SlackChannel, SlackPayload};
