//! 同步协调器 - 决定「是否 / 何时」同步
//!
//! 职责：
//! - 触发原因分级：用户操作防抖（2.5s，新触发取消旧计时）、
//!   前台激活节流（15s 内已成功则跳过）、下拉刷新 / 切换 household /
//!   bootstrap 立即执行
//! - 全局单飞行：同一时刻最多一次同步在途，后来者直接让路
//! - 游标推进权：只有整轮成功才持久化新游标，失败保持原游标
//!
//! Coordinator 自身不碰网络和落库，全部委托 SyncEngine。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sync::cursor_store::CursorStore;
use crate::sync::engine::SyncEngine;

/// 同步触发原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    /// App 回到前台
    AppActive,
    /// 用户本地操作之后（走防抖）
    AfterAction,
    /// 下拉刷新（立即）
    PullToRefresh,
    /// 切换 household（立即）
    HouseholdSwitch,
    /// 首次 / 无游标（立即）
    Bootstrap,
}

impl SyncReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncReason::AppActive => "app_active",
            SyncReason::AfterAction => "after_action",
            SyncReason::PullToRefresh => "pull_to_refresh",
            SyncReason::HouseholdSwitch => "household_switch",
            SyncReason::Bootstrap => "bootstrap",
        }
    }
}

/// 一次同步请求的结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 整轮成功，游标已推进
    Completed { cursor: String },
    /// 已有同步在途，本次让路
    AlreadyInFlight,
    /// 节流窗口内已成功同步过，本次跳过
    Throttled,
}

/// 协调器参数
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// 用户操作后的防抖窗口
    pub after_action_debounce: Duration,
    /// 前台激活的最小同步间隔
    pub app_active_min_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            after_action_debounce: Duration::from_millis(2500),
            app_active_min_interval: Duration::from_secs(15),
        }
    }
}

/// 同步协调器
pub struct SyncCoordinator {
    engine: Arc<SyncEngine>,
    cursor_store: CursorStore,
    config: CoordinatorConfig,
    in_flight: AtomicBool,
    last_success: parking_lot::Mutex<HashMap<u64, Instant>>,
    // 防抖槽位带代数标记：计时任务只有在槽位仍是自己时才生效，
    // 被替换后即使 abort 尚未落地也不会误删新任务或多触发一次同步
    debounce: parking_lot::Mutex<HashMap<u64, (u64, JoinHandle<()>)>>,
    debounce_generation: AtomicU64,
}

/// 飞行标志守卫：任何退出路径（含 Err 和 panic 展开）都释放标志
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncCoordinator {
    pub fn new(engine: Arc<SyncEngine>, cursor_store: CursorStore, config: CoordinatorConfig) -> Arc<Self> {
        Arc::new(Self {
            engine,
            cursor_store,
            config,
            in_flight: AtomicBool::new(false),
            last_success: parking_lot::Mutex::new(HashMap::new()),
            debounce: parking_lot::Mutex::new(HashMap::new()),
            debounce_generation: AtomicU64::new(0),
        })
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn cursor_store(&self) -> &CursorStore {
        &self.cursor_store
    }

    /// 发起同步请求（fire-and-forget），按 reason 决定立即 / 防抖 / 节流。
    /// 后台任务里的失败只记日志，交给下一个触发点自然恢复。
    pub fn request_sync(self: &Arc<Self>, household_id: u64, reason: SyncReason) {
        match reason {
            SyncReason::AfterAction => {
                let this = Arc::clone(self);
                let delay = self.config.after_action_debounce;
                let generation = self.debounce_generation.fetch_add(1, Ordering::Relaxed);
                let mut debounce = self.debounce.lock();
                // 新触发取消旧计时，只有最后一次操作真正落地
                if let Some((_, old)) = debounce.remove(&household_id) {
                    old.abort();
                }
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    {
                        let mut slots = this.debounce.lock();
                        match slots.get(&household_id) {
                            // 槽位仍是自己：摘下后落地
                            Some((current, _)) if *current == generation => {
                                slots.remove(&household_id);
                            }
                            // 已被更新的触发取代：静默退出，abort 随后生效
                            _ => return,
                        }
                    }
                    this.run_logged(household_id, reason).await;
                });
                debounce.insert(household_id, (generation, handle));
            }
            SyncReason::AppActive => {
                if self.recently_synced(household_id) {
                    debug!(
                        "节流窗口内已同步，跳过: household_id={}, reason={}",
                        household_id,
                        reason.as_str()
                    );
                    return;
                }
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    this.run_logged(household_id, reason).await;
                });
            }
            SyncReason::PullToRefresh | SyncReason::HouseholdSwitch | SyncReason::Bootstrap => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    this.run_logged(household_id, reason).await;
                });
            }
        }
    }

    /// 同步执行一轮并返回结局（供调用方拿到新游标 / 被让路的事实）
    pub async fn sync_now(&self, household_id: u64, reason: SyncReason) -> Result<SyncOutcome> {
        if reason == SyncReason::AppActive && self.recently_synced(household_id) {
            return Ok(SyncOutcome::Throttled);
        }
        self.run_sync(household_id, reason).await
    }

    fn recently_synced(&self, household_id: u64) -> bool {
        self.last_success
            .lock()
            .get(&household_id)
            .is_some_and(|at| at.elapsed() < self.config.app_active_min_interval)
    }

    async fn run_logged(&self, household_id: u64, reason: SyncReason) {
        match self.run_sync(household_id, reason).await {
            Ok(SyncOutcome::Completed { cursor }) => {
                debug!(
                    "同步完成: household_id={}, reason={}, cursor={}",
                    household_id,
                    reason.as_str(),
                    cursor
                );
            }
            Ok(outcome) => {
                debug!(
                    "同步未执行: household_id={}, reason={}, outcome={:?}",
                    household_id,
                    reason.as_str(),
                    outcome
                );
            }
            Err(e) => {
                warn!(
                    "同步失败（游标未推进）: household_id={}, reason={}, error={}",
                    household_id,
                    reason.as_str(),
                    e
                );
            }
        }
    }

    /// 执行一轮完整同步：先上行 outbox，再按有无游标选择增量 / bootstrap
    async fn run_sync(&self, household_id: u64, reason: SyncReason) -> Result<SyncOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(
                "已有同步在途，让路: household_id={}, reason={}",
                household_id,
                reason.as_str()
            );
            return Ok(SyncOutcome::AlreadyInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.engine.push_outbox(household_id).await?;

        let cursor = match self.cursor_store.get(household_id).await? {
            Some(since) => self.engine.sync_changes(household_id, &since).await?,
            None => {
                info!(
                    "无游标，执行 bootstrap: household_id={}, reason={}",
                    household_id,
                    reason.as_str()
                );
                self.engine.sync_from_remote(household_id).await?
            }
        };

        self.cursor_store.set(household_id, &cursor).await?;
        self.last_success.lock().insert(household_id, Instant::now());
        Ok(SyncOutcome::Completed { cursor })
    }
}
