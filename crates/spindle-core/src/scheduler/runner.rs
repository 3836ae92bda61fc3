//! TaskRunner - ready queue と実行中タスク
//!
//! # 実行モデル
//! - ready queue（VecDeque）は登録フェーズが終わってから初めて drain される
//!   → すべての購読が揃う前にタスクが完了することはない
//! - 実行中の future は FuturesUnordered に入れ、リクエストの driver だけが poll する
//!   → タスク同士は交互に進むが、並列には走らない
//! - panic は catch_unwind で捕まえて TaskError::Panicked に変換する

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tracing::{debug, warn};

use crate::domain::{TaskError, TaskName, TaskResult};

use super::registry::TaskRegistry;

type Running = BoxFuture<'static, (TaskName, TaskResult)>;

#[derive(Default)]
pub struct TaskRunner {
    ready: VecDeque<TaskName>,
    /// Tasks that were queued at least once. Guards against double starts.
    scheduled: HashSet<TaskName>,
    in_flight: FuturesUnordered<Running>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every task without dependencies, in registration order.
    pub fn seed(&mut self, registry: &mut TaskRegistry) {
        let roots: Vec<TaskName> = registry
            .records()
            .filter(|record| record.dependencies().is_empty())
            .map(|record| record.name().clone())
            .collect();
        for name in roots {
            self.schedule(registry, name);
        }
    }

    /// Push `name` onto the ready queue unless it was already scheduled.
    pub fn schedule(&mut self, registry: &mut TaskRegistry, name: TaskName) -> bool {
        if !self.scheduled.insert(name.clone()) {
            return false;
        }
        if let Some(record) = registry.get_mut(&name) {
            record.mark_ready();
        }
        self.ready.push_back(name);
        true
    }

    /// Fan-in check for `dependent`, run on every completion of one of its
    /// dependencies. Schedules it the first time all of them are complete.
    pub fn on_dependency_complete(&mut self, registry: &mut TaskRegistry, dependent: &TaskName) -> bool {
        let Some(record) = registry.get(dependent) else {
            return false;
        };
        if !registry.all_complete(record.dependencies()) {
            return false;
        }
        self.schedule(registry, dependent.clone())
    }

    /// Start everything on the ready queue. Returns how many tasks started.
    pub fn drain_ready(&mut self, registry: &mut TaskRegistry) -> usize {
        let mut started = 0;
        while let Some(name) = self.ready.pop_front() {
            if self.start(registry, name) {
                started += 1;
            }
        }
        started
    }

    fn start(&mut self, registry: &mut TaskRegistry, name: TaskName) -> bool {
        let dependencies = match registry.get(&name) {
            Some(record) => registry.snapshot(record.dependencies()),
            None => return false,
        };
        let Some(work) = registry.get_mut(&name).and_then(|record| record.start()) else {
            warn!(task = %name, "task already started; skipping");
            return false;
        };

        debug!(task = %name, dependencies = dependencies.len(), "task started");
        let running = async move {
            // work() の同期部分も poll 中に呼ぶので、同じ catch_unwind で捕まえられる
            let outcome = AssertUnwindSafe(async move { work(dependencies).await })
                .catch_unwind()
                .await;
            let result = outcome.unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));
            (name, result)
        };
        self.in_flight.push(running.boxed());
        true
    }

    /// Wait for the next task to finish. `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<(TaskName, TaskResult)> {
        self.in_flight.next().await
    }

}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
