use crate::work_timer::WorkTimer;

use std::time::Duration;

/// Estimates how much work fits into the remainder of a host frame, based on the measured cost of previous work items.
pub struct FrameBudget {
    item_time_estimate_ns: u64,
    timer: Option<WorkTimer>,
}

impl FrameBudget {
    pub fn new(initial_item_time_estimate_ns: u64) -> Self {
        Self {
            item_time_estimate_ns: initial_item_time_estimate_ns,
            timer: None,
        }
    }

    pub fn reset_timer(&mut self) {
        self.timer = Some(WorkTimer::start());
    }

    pub fn complete_items(&mut self, num_items: u64, cpu_time: Duration) {
        self.timer
            .get_or_insert_with(WorkTimer::start)
            .complete_items(num_items, cpu_time);
    }

    pub fn update_estimate(&mut self) {
        if let Some(timer) = self.timer.as_ref() {
            if timer.items_completed() > 0 {
                self.item_time_estimate_ns = timer.average_cpu_time_ns();
            }
        }
    }

    pub fn item_time_estimate_ns(&self) -> u64 {
        self.item_time_estimate_ns
    }

    /// The expected CPU time of `num_items` more items.
    pub fn estimate(&self, num_items: u64) -> Duration {
        Duration::from_nanos(self.item_time_estimate_ns.saturating_mul(num_items))
    }

    /// True if `num_items` more items are expected to finish within `remaining`.
    pub fn fits(&self, num_items: u64, remaining: Duration) -> bool {
        self.estimate(num_items) <= remaining
    }

    pub fn items_within(&self, budget: Duration) -> u64 {
        let budget_ns: u64 = budget.as_nanos().try_into().unwrap_or(u64::MAX);
        budget_ns / self.item_time_estimate_ns.max(1)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
