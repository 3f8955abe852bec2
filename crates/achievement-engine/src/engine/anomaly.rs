//! 打卡频率异常检测
//!
//! 滚动窗口内统计每个用户的打卡事件次数，达到阈值时发出审计信号。
//! 信号是非阻塞的：只记录结构化警告日志并在事件结果中置位，
//! 本次打卡触发的成就检查照常进行，不拦截任何授予。

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::warn;

/// 打卡频率异常检测器
///
/// 进程内滚动窗口计数，按用户维护时间戳队列。
/// 默认阈值 10 次/小时（正常打卡在地点间有物理移动时间）。
pub struct AnomalyDetector {
    threshold: usize,
    window: Duration,
    visits: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl AnomalyDetector {
    pub fn new(threshold: usize, window_seconds: i64) -> Self {
        Self {
            threshold,
            window: Duration::seconds(window_seconds),
            visits: DashMap::new(),
        }
    }

    /// 记录一次打卡事件，返回是否触发异常信号
    ///
    /// 窗口外的旧时间戳在记录时惰性淘汰
    pub fn record(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        let mut entry = self.visits.entry(user_id.to_string()).or_default();
        let cutoff = now - self.window;
        while entry.front().is_some_and(|t| *t <= cutoff) {
            entry.pop_front();
        }
        entry.push_back(now);

        if entry.len() >= self.threshold {
            warn!(
                user_id = %user_id,
                visits_in_window = entry.len(),
                window_seconds = self.window.num_seconds(),
                "Suspicious visit frequency detected"
            );
            true
        } else {
            false
        }
    }

    /// 当前窗口内某用户的记录条数（测试用）
    #[cfg(test)]
    pub fn window_count(&self, user_id: &str) -> usize {
        self.visits.get(user_id).map(|q| q.len()).unwrap_or(0)
    }
}
