//! Event dispatch thread (EDT)
//!
//! One worker thread per display connection executes every scheduled window
//! mutation in submission order and pumps native messages while idle. Tasks
//! submitted from the worker itself run inline; re-queueing them would make
//! a waiting caller wait on itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{WindowError, WindowResult};
use crate::foundation::logging::TARGET_EDT;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Stop,
}

/// Serializing task scheduler bound to one worker thread
pub struct Scheduler {
    name: String,
    sender: Sender<Message>,
    worker_id: ThreadId,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawn the worker thread
    ///
    /// `pump` is called every `poll_period` while no task is queued, and
    /// after each task, so native messages keep flowing.
    pub fn start<P>(name: impl Into<String>, poll_period: Duration, pump: P) -> WindowResult<Self>
    where
        P: Fn() + Send + 'static,
    {
        let name = name.into();
        let (sender, receiver) = unbounded::<Message>();
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || Self::run_loop(&receiver, &running, poll_period, &pump))
                .map_err(|e| WindowError::Scheduler(format!("failed to spawn {}: {}", name, e)))?
        };
        let worker_id = worker.thread().id();
        log::debug!(target: TARGET_EDT, "EDT {} started", name);

        Ok(Self {
            name,
            sender,
            worker_id,
            running,
            worker: Mutex::new(Some(worker)),
        })
    }

    fn run_loop<P: Fn()>(
        receiver: &Receiver<Message>,
        running: &AtomicBool,
        poll_period: Duration,
        pump: &P,
    ) {
        while running.load(Ordering::SeqCst) {
            match receiver.recv_timeout(poll_period) {
                Ok(Message::Run(job)) => {
                    job();
                    pump();
                }
                Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => pump(),
            }
        }
        running.store(false, Ordering::SeqCst);
        log::debug!(target: TARGET_EDT, "EDT {} stopped", thread::current().name().unwrap_or("?"));
    }

    /// Thread name of the worker
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if called from the worker thread
    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// True until [`Scheduler::stop`] or worker exit
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run `task` on the worker
    ///
    /// With `wait` the caller blocks and receives `Some(result)`; without it
    /// the task is queued and `None` is returned. Called from the worker, the
    /// task always runs inline.
    pub fn invoke<R, F>(&self, wait: bool, task: F) -> WindowResult<Option<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current_thread() {
            return Ok(Some(task()));
        }
        if !self.is_running() {
            return Err(WindowError::Scheduler(format!("EDT {} is not running", self.name)));
        }

        if !wait {
            self.send(Box::new(move || {
                task();
            }))?;
            return Ok(None);
        }

        let (result_tx, result_rx) = bounded::<R>(1);
        self.send(Box::new(move || {
            // The receiver only disappears if the caller gave up waiting
            let _ = result_tx.send(task());
        }))?;
        result_rx.recv().map(Some).map_err(|_| {
            WindowError::Scheduler(format!("EDT {} dropped a task before completion", self.name))
        })
    }

    fn send(&self, job: Job) -> WindowResult<()> {
        self.sender
            .send(Message::Run(job))
            .map_err(|_| WindowError::Scheduler(format!("EDT {} queue closed", self.name)))
    }

    /// Stop the worker after the tasks already queued
    ///
    /// Joins the worker unless called from it.
    pub fn stop(&self) {
        if self.sender.send(Message::Stop).is_err() {
            return;
        }
        if self.is_current_thread() {
            self.running.store(false, Ordering::SeqCst);
            return;
        }
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                log::error!(target: TARGET_EDT, "EDT {} panicked", self.name);
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.sender.send(Message::Stop);
    }
}
