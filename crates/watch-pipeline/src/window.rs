//! 롤링 에러 윈도우 — 최근 N개 상태 코드의 링 버퍼
//!
//! [`ErrorWindow`]는 해석된 상태 코드를 고정 용량으로 보관하며,
//! 용량을 초과하면 가장 오래된 항목을 제거합니다.
//!
//! # 불변식
//! - 길이는 용량을 절대 초과하지 않습니다.
//! - 에러율은 윈도우가 가득 찼을 때만 정의됩니다 (불완전한 표본으로
//!   알림을 내지 않기 위함).

use std::collections::VecDeque;

/// 에러로 간주되는 상태 코드 하한 (5xx)
const ERROR_STATUS_FLOOR: u16 = 500;

/// 롤링 에러 윈도우
///
/// 가장 최근에 관찰된 `capacity`개의 상태 코드를 유지합니다.
#[derive(Debug, Clone)]
pub struct ErrorWindow {
    /// 윈도우 내부 저장소
    buf: VecDeque<u16>,
    /// 고정 용량
    capacity: usize,
}

impl ErrorWindow {
    /// 지정한 용량의 새 윈도우를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
        }
    }

    /// 상태 코드를 윈도우에 추가합니다.
    ///
    /// 용량에 도달한 상태면 가장 오래된 항목이 먼저 제거됩니다.
    pub fn push(&mut self, status: u16) {
        if self.buf.len() >= self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(status);
    }

    /// 현재 윈도우에 저장된 항목 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// 윈도우가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// 윈도우 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 윈도우가 가득 찼는지 확인합니다.
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    /// 윈도우 내 5xx 상태 코드 수를 반환합니다.
    pub fn error_count(&self) -> usize {
        self.buf
            .iter()
            .filter(|&&status| status >= ERROR_STATUS_FLOOR)
            .count()
    }

    /// 윈도우가 가득 찼을 때의 에러율(퍼센트)을 반환합니다.
    ///
    /// 길이가 용량 미만이면 `None` — 표본이 부족한 동안에는
    /// 에러율이 정의되지 않습니다.
    pub fn error_rate(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.rate_over(self.capacity))
    }

    /// 현재 채워진 만큼에 대한 관찰 에러율(퍼센트)을 반환합니다.
    ///
    /// 주기적 상태 요약용입니다. 비어있으면 0.
    pub fn observed_rate(&self) -> f64 {
        if self.buf.is_empty() {
            return 0.0;
        }
        self.rate_over(self.buf.len())
    }

    /// 오래된 것부터 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &u16> {
        self.buf.iter()
    }

    fn rate_over(&self, denominator: usize) -> f64 {
        let errors = u32::try_from(self.error_count()).unwrap_or(u32::MAX);
        let total = u32::try_from(denominator).unwrap_or(u32::MAX);
        f64::from(errors) / f64::from(total) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn push_below_capacity_keeps_all() {
        let mut window = ErrorWindow::new(5);
        window.push(200);
        window.push(404);
        window.push(500);
        assert_eq!(window.len(), 3);
        assert!(!window.is_full());
    }

    #[test]
    fn push_past_capacity_evicts_oldest() {
        let mut window = ErrorWindow::new(3);
        window.push(500);
        window.push(200);
        window.push(201);
        window.push(202); // 500이 밀려남
        assert_eq!(window.len(), 3);
        assert_eq!(window.error_count(), 0);
        let contents: Vec<u16> = window.iter().copied().collect();
        assert_eq!(contents, vec![200, 201, 202]);
    }

    #[test]
    fn error_rate_undefined_until_full() {
        let mut window = ErrorWindow::new(4);
        window.push(500);
        window.push(500);
        window.push(500);
        assert_eq!(window.error_rate(), None);
        window.push(500);
        assert_eq!(window.error_rate(), Some(100.0));
    }

    #[test]
    fn error_rate_counts_only_5xx() {
        let mut window = ErrorWindow::new(4);
        window.push(200);
        window.push(404); // 4xx는 에러가 아님
        window.push(499);
        window.push(503);
        assert_eq!(window.error_count(), 1);
        assert_eq!(window.error_rate(), Some(25.0));
    }

    #[test]
    fn spec_rate_example_200_window() {
        // 용량 200, 5xx 5건이면 2.5%
        let mut window = ErrorWindow::new(200);
        for _ in 0..5 {
            window.push(502);
        }
        for _ in 0..195 {
            window.push(200);
        }
        assert!(window.is_full());
        let rate = window.error_rate().unwrap();
        assert!((rate - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn observed_rate_over_partial_fill() {
        let mut window = ErrorWindow::new(10);
        assert!((window.observed_rate() - 0.0).abs() < f64::EPSILON);
        window.push(500);
        window.push(200);
        // 2건 중 1건이 5xx
        assert!((window.observed_rate() - 50.0).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity_and_keeps_most_recent(
            capacity in 1usize..64,
            codes in proptest::collection::vec(100u16..600, 0..256),
        ) {
            let mut window = ErrorWindow::new(capacity);
            for &code in &codes {
                window.push(code);
                prop_assert!(window.len() <= capacity);
            }
            // 정확히 마지막 capacity개(또는 전부)를 순서대로 유지
            let expected: Vec<u16> = codes
                .iter()
                .copied()
                .skip(codes.len().saturating_sub(capacity))
                .collect();
            let actual: Vec<u16> = window.iter().copied().collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn error_rate_none_unless_full(
            capacity in 2usize..32,
            fill in 0usize..64,
        ) {
            let mut window = ErrorWindow::new(capacity);
            for _ in 0..fill.min(capacity.saturating_sub(1)) {
                window.push(500);
            }
            prop_assert_eq!(window.error_rate(), None);
        }
    }
}
