use crate::{CacheService, ProgressSink};

use orbis_core::frame_budget::FrameBudget;
use orbis_map::{BodyId, MasterBuild};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GenerationConfig {
    /// Minimum number of master pixels processed per step.
    pub pixel_budget: usize,
    /// A master build is split into about this many steps, whatever its resolution.
    pub target_step_count: usize,
    /// Assumed cost of one pixel until real measurements come in.
    pub initial_pixel_time_ns: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            pixel_budget: 4096,
            target_step_count: 20,
            initial_pixel_time_ns: 200,
        }
    }
}

impl GenerationConfig {
    /// `max(pixel_budget, ceil(total_pixels / target_step_count))`.
    pub fn step_pixels(&self, total_pixels: usize) -> usize {
        let steps = self.target_step_count.max(1);
        let per_step = (total_pixels + steps - 1) / steps;
        self.pixel_budget.max(per_step).max(1)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Poll {
    Done,
    InProgress,
}

struct Pass {
    body: BodyId,
    revision: u64,
    build: MasterBuild,
    step_pixels: usize,
}

/// Generates master rasters a bounded step at a time, so that the host loop never stalls on a full build.
///
/// Requested bodies are built one after another. A body's master is only published to the [`CacheService`] once its
/// last step is done; until then readers keep seeing the previous master, if any.
pub struct GenerationScheduler {
    config: GenerationConfig,
    queue: VecDeque<BodyId>,
    current: Option<Pass>,
    batch_total: usize,
    batch_completed: usize,
    budget: FrameBudget,
    progress: Option<Box<dyn ProgressSink>>,
}

impl GenerationScheduler {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            current: None,
            batch_total: 0,
            batch_completed: 0,
            budget: FrameBudget::new(config.initial_pixel_time_ns),
            progress: None,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Takes effect from the next pass.
    pub fn set_config(&mut self, config: GenerationConfig) {
        self.config = config;
    }

    pub fn set_progress_sink(&mut self, sink: impl ProgressSink + 'static) {
        self.progress = Some(Box::new(sink));
    }

    pub fn clear_progress_sink(&mut self) {
        self.progress = None;
    }

    /// Queues a master build for `body`. Returns false if the request was coalesced with a build of the same body that
    /// is already queued or in flight.
    pub fn request(&mut self, body: BodyId) -> bool {
        if self.in_flight() == Some(body) || self.queue.contains(&body) {
            log::trace!("Coalesced generation request for {:?}", body);
            return false;
        }
        self.queue.push_back(body);
        self.batch_total += 1;
        true
    }

    /// Queues every body in order. Returns the number of requests that were not coalesced.
    pub fn request_all(&mut self, bodies: impl IntoIterator<Item = BodyId>) -> usize {
        bodies.into_iter().filter(|&body| self.request(body)).count()
    }

    pub fn in_flight(&self) -> Option<BodyId> {
        self.current.as_ref().map(|pass| pass.body)
    }

    pub fn num_queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// Runs at least one step of pending work, then keeps going while another step is expected to fit in `budget`.
    pub fn resume(&mut self, cache: &mut CacheService, budget: Duration) -> Poll {
        let start = Instant::now();
        self.budget.update_estimate();

        let mut stepped = false;
        loop {
            if self.current.is_none() && !self.start_next_pass(cache) {
                self.finish_batch();
                return Poll::Done;
            }

            if stepped {
                let step_pixels = self.current.as_ref().map_or(0, |pass| pass.step_pixels);
                let remaining = budget.saturating_sub(start.elapsed());
                if remaining.is_zero() || !self.budget.fits(step_pixels as u64, remaining) {
                    return Poll::InProgress;
                }
            }

            self.step_current(cache);
            stepped = true;
        }
    }

    /// Drives all pending work to completion.
    pub fn run_to_completion(&mut self, cache: &mut CacheService) {
        while self.resume(cache, Duration::MAX) == Poll::InProgress {}
    }

    fn start_next_pass(&mut self, cache: &mut CacheService) -> bool {
        while let Some(body) = self.queue.pop_front() {
            match cache.begin_master_build(body) {
                Some((build, revision)) => {
                    let step_pixels = self.config.step_pixels(build.total_pixels());
                    log::debug!(
                        "Generating master for {:?}: {} pixels in steps of {}",
                        body,
                        build.total_pixels(),
                        step_pixels
                    );
                    self.current = Some(Pass {
                        body,
                        revision,
                        build,
                        step_pixels,
                    });
                    return true;
                }
                None => {
                    log::debug!("Skipping generation for unregistered {:?}", body);
                    self.complete_one(body);
                }
            }
        }
        false
    }

    fn step_current(&mut self, cache: &mut CacheService) {
        let pass = match self.current.as_mut() {
            Some(pass) => pass,
            None => return,
        };

        let before = pass.build.completed_pixels();
        let step_start = Instant::now();
        let done = pass.build.step(pass.step_pixels);
        let pixels = pass.build.completed_pixels() - before;
        self.budget.complete_items(pixels as u64, step_start.elapsed());
        log::trace!(
            "{:?}: {}/{} pixels",
            pass.body,
            pass.build.completed_pixels(),
            pass.build.total_pixels()
        );

        if !done {
            return;
        }
        if let Some(Pass {
            body, revision, build, ..
        }) = self.current.take()
        {
            let committed = cache.commit_master(body, build, revision);
            self.complete_one(body);
            // A refused commit of a registered body means the master layout changed mid-pass.
            let stale = match committed {
                Some(_) => cache.body_revision(body) != Some(revision),
                None => cache.is_registered(body),
            };
            if stale {
                log::debug!("{:?} changed during generation; queueing a fresh pass", body);
                self.request(body);
            }
        }
    }

    fn complete_one(&mut self, body: BodyId) {
        self.batch_completed += 1;
        if let Some(sink) = self.progress.as_mut() {
            let fraction = self.batch_completed as f64 / self.batch_total.max(1) as f64;
            sink.report(
                fraction.min(1.0),
                &format!(
                    "Generated minimap {} of {} ({:?})",
                    self.batch_completed, self.batch_total, body
                ),
            );
        }
    }

    fn finish_batch(&mut self) {
        self.batch_total = 0;
        self.batch_completed = 0;
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
