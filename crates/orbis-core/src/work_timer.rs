use std::convert::TryInto;
use std::time::Duration;

/// Accumulates the CPU time spent on a batch of homogeneous work items (pixels, for raster generation).
pub struct WorkTimer {
    total_cpu_time: Duration,
    items_completed: u64,
}

impl WorkTimer {
    pub fn start() -> Self {
        Self {
            total_cpu_time: Duration::new(0, 0),
            items_completed: 0,
        }
    }

    pub fn total_cpu_time(&self) -> Duration {
        self.total_cpu_time
    }

    pub fn items_completed(&self) -> u64 {
        self.items_completed
    }

    /// Records that `num_items` were completed in `d`.
    pub fn complete_items(&mut self, num_items: u64, d: Duration) {
        self.total_cpu_time += d;
        self.items_completed += num_items;
    }

    pub fn average_cpu_time_ns(&self) -> u64 {
        let total_ns: u64 = self
            .total_cpu_time
            .as_nanos()
            .try_into()
            .unwrap_or(u64::MAX);

        total_ns / self.items_completed.max(1)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
