//! Mutation phase
//!
//! Runs the copy, transcode and retag job lists in that order. Each list is
//! spread over a fixed pool of worker threads fed from a shared queue;
//! workers report back over a result channel. The first failure stops
//! workers from taking new jobs and is returned once the list drains.

use crate::error::{Result, SyncError};
use crate::format::TargetFormat;
use crate::fsops;
use crate::path;
use crate::reconcile::{Job, Plan};
use crate::tags::MediaBackend;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, info};

/// Fixed-size pool of worker threads
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// One worker per available processing unit
    pub fn with_available_parallelism() -> Self {
        Self::new(thread::available_parallelism().map_or(1, |n| n.get()))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` on every job and collect the results
    ///
    /// Result order is completion order. On failure the first error is
    /// returned; jobs already finished keep their effects.
    pub fn run<J, T, F>(&self, jobs: Vec<J>, work: F) -> Result<Vec<T>>
    where
        J: Send,
        T: Send,
        F: Fn(&J) -> Result<T> + Sync,
    {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let total = jobs.len();
        let workers = self.workers.min(total);

        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        for job in jobs {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);

        let (result_tx, result_rx) = crossbeam_channel::unbounded::<Result<T>>();
        let cancelled = AtomicBool::new(false);

        thread::scope(|scope| {
            for index in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancelled = &cancelled;
                let work = &work;

                thread::Builder::new()
                    .name(format!("worker-{}", index + 1))
                    .spawn_scoped(scope, move || {
                        for job in job_rx.iter() {
                            if cancelled.load(Ordering::Relaxed) {
                                break;
                            }
                            let result = work(&job);
                            if result.is_err() {
                                cancelled.store(true, Ordering::Relaxed);
                            }
                            if result_tx.send(result).is_err() {
                                break;
                            }
                        }
                    })
                    .map_err(|e| SyncError::io("worker thread", e))?;
            }
            drop(result_tx);

            let mut outcomes = Vec::with_capacity(total);
            let mut first_error = None;
            for result in result_rx.iter() {
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => {
                        if first_error.is_none() {
                            first_error = Some(err);
                        }
                    }
                }
            }

            match first_error {
                Some(err) => Err(err),
                None => Ok(outcomes),
            }
        })
    }
}

/// Result of one file job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Plain file copied
    Created,
    /// Lossless file encoded (and tagged)
    Converted,
    /// Tags of an existing encoded file replaced
    Retagged,
    /// Tags already matched
    Unchanged,
}

/// Counts of completed file jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub copied: usize,
    pub converted: usize,
    pub retagged: usize,
}

impl ExecutionReport {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Created => self.copied += 1,
            JobOutcome::Converted => self.converted += 1,
            JobOutcome::Retagged => self.retagged += 1,
            JobOutcome::Unchanged => {}
        }
    }
}

/// Applies file jobs to the destination tree
pub struct Executor<'a> {
    source_root: &'a Path,
    dest_root: &'a Path,
    format: TargetFormat,
    backend: &'a dyn MediaBackend,
    pool: WorkerPool,
    coarse_time: bool,
}

impl<'a> Executor<'a> {
    pub fn new(
        source_root: &'a Path,
        dest_root: &'a Path,
        format: TargetFormat,
        backend: &'a dyn MediaBackend,
        pool: WorkerPool,
    ) -> Self {
        Self {
            source_root,
            dest_root,
            format,
            backend,
            pool,
            coarse_time: false,
        }
    }

    /// Round written files up to even seconds
    pub fn coarse_time(mut self, enabled: bool) -> Self {
        self.coarse_time = enabled;
        self
    }

    /// Run copy, transcode and retag jobs, each list to completion before the next
    pub fn run(&self, plan: &Plan) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();

        let lists: [(&[Job], fn(&Self, &Job) -> Result<JobOutcome>); 3] = [
            (&plan.copies, Self::copy),
            (&plan.transcodes, Self::transcode),
            (&plan.retags, Self::sync_tags),
        ];

        for (jobs, work) in lists {
            let outcomes = self.pool.run(jobs.iter().collect(), |job| work(self, job))?;
            for outcome in outcomes {
                report.record(outcome);
            }
        }

        Ok(report)
    }

    /// Round directory times after all files have been written
    pub fn flatten_dirs<'n>(&self, dirs: impl IntoIterator<Item = &'n String>) -> Result<()> {
        if !self.coarse_time {
            return Ok(());
        }
        for name in dirs {
            path::ensure_safe(name)?;
            fsops::flatten_mtime(&self.dest_root.join(name))?;
        }
        Ok(())
    }

    fn paths(&self, job: &Job) -> Result<(PathBuf, PathBuf)> {
        path::ensure_safe(&job.source)?;
        path::ensure_safe(&job.dest)?;
        Ok((self.source_root.join(&job.source), self.dest_root.join(&job.dest)))
    }

    fn copy(&self, job: &Job) -> Result<JobOutcome> {
        let (source, target) = self.paths(job)?;
        info!("Create {}", job.dest);

        fsops::write_atomic(&target, |temp| fsops::copy_contents(&source, temp))?;
        self.finish(&target)?;
        Ok(JobOutcome::Created)
    }

    fn transcode(&self, job: &Job) -> Result<JobOutcome> {
        let (source, target) = self.paths(job)?;
        info!("Convert {} to {}", job.source, job.dest);

        fsops::write_atomic(&target, |temp| self.backend.transcode(&source, temp))?;
        self.retag(&source, &target, &job.dest)?;
        self.finish(&target)?;
        Ok(JobOutcome::Converted)
    }

    fn sync_tags(&self, job: &Job) -> Result<JobOutcome> {
        let (source, target) = self.paths(job)?;

        if self.retag(&source, &target, &job.dest)? {
            self.finish(&target)?;
            Ok(JobOutcome::Retagged)
        } else {
            Ok(JobOutcome::Unchanged)
        }
    }

    /// Replace the tags of `target` with those of `source` if they differ
    fn retag(&self, source: &Path, target: &Path, name: &str) -> Result<bool> {
        let wanted = self.backend.read_source_tags(source)?.for_format(self.format);
        let current = self.backend.read_target_tags(target)?.for_format(self.format);
        if wanted == current {
            return Ok(false);
        }

        debug!("Tag {}", name);
        fsops::write_atomic(target, |temp| {
            fsops::copy_contents(target, temp)?;
            self.backend.write_target_tags(temp, &wanted)
        })?;
        Ok(true)
    }

    fn finish(&self, target: &Path) -> Result<()> {
        if self.coarse_time {
            fsops::flatten_mtime(target)?;
        }
        Ok(())
    }
}
