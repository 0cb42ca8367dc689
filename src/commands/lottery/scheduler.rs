use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};

// One-shot timer registry. Each scheduled job sleeps on its own tokio
// task until the fire time and then runs the given future exactly once.
// Fire times in the past fire immediately.
#[derive(Debug)]
pub struct DrawScheduler {
    jobs: Arc<DashMap<Uuid, JoinHandle<()>>>,
}

impl DrawScheduler {
    pub fn new() -> Self {
        DrawScheduler {
            jobs: Arc::new(DashMap::new()),
        }
    }

    pub fn schedule<F>(&self, job_id: Uuid, fire_at: DateTime<Local>, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = (fire_at - Local::now()).to_std().unwrap_or(Duration::ZERO);
        let jobs = self.jobs.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
            jobs.remove(&job_id);
        });

        self.jobs.insert(job_id, handle);
        info!("Job {} scheduled at {}.", job_id, fire_at);
    }

    pub fn remove(&self, job_id: &Uuid) -> Result<()> {
        match self.jobs.remove(job_id) {
            Some((_, handle)) => {
                handle.abort();
                Ok(())
            }
            None => {
                let message = format!("No scheduled job with the id {}.", job_id);
                Err(Error::Scheduler(message))
            }
        }
    }

    pub fn contains(&self, job_id: &Uuid) -> bool {
        self.jobs.contains_key(job_id)
    }
}
