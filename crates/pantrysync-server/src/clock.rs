//! 服务端时间戳分配 - household 维度单调
//!
//! 变更排序只依赖服务端分配的时间戳，绝不信任客户端时钟。
//! 同一毫秒内连续分配时按插入顺序 +1，保证严格递增。

use std::collections::HashMap;

use parking_lot::Mutex;

/// household -> 最近分配的毫秒时间戳
pub struct HouseholdClock {
    last: Mutex<HashMap<u64, i64>>,
}

impl HouseholdClock {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(HashMap::new()),
        }
    }

    /// 进程启动后首次接触某个 household 时，用日志中已持久化的
    /// 最大 server_ts 作为下限
    pub fn seed_if_absent(&self, household_id: u64, persisted_max: i64) {
        let mut last = self.last.lock();
        last.entry(household_id).or_insert(persisted_max);
    }

    /// 分配一个严格大于该 household 此前所有分配值的时间戳
    pub fn allocate(&self, household_id: u64) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last.lock();
        let entry = last.entry(household_id).or_insert(0);
        let next = now.max(*entry + 1);
        *entry = next;
        next
    }
}

impl Default for HouseholdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_strictly_increasing() {
        let clock = HouseholdClock::new();
        let mut prev = 0;
        for _ in 0..100 {
            let ts = clock.allocate(1);
            assert!(ts > prev);
            prev = ts;
        }
    }

    #[test]
    fn seed_sets_the_floor() {
        let clock = HouseholdClock::new();
        let far_future = chrono::Utc::now().timestamp_millis() + 60_000;
        clock.seed_if_absent(1, far_future);
        assert_eq!(clock.allocate(1), far_future + 1);
        // 已 seed 过的 household 不会被覆盖
        clock.seed_if_absent(1, 0);
        assert!(clock.allocate(1) > far_future + 1);
    }

    #[test]
    fn households_have_independent_clocks() {
        let clock = HouseholdClock::new();
        clock.seed_if_absent(1, chrono::Utc::now().timestamp_millis() + 60_000);
        let a = clock.allocate(1);
        let b = clock.allocate(2);
        assert!(a > b);
    }
}
