//! Off-thread model reads. Only disk I/O and parsing happen here; GPU upload
//! stays with the thread that owns the device.

use crate::{
    error::LoadError,
    model::{ModelIdentifier, ModelSource},
};
use crossbeam_channel::{Receiver, Sender};
use pointfile::MalformedLinePolicy;
use std::{
    thread,
    time::{Duration, Instant},
};

struct Request {
    seq: u64,
    id: ModelIdentifier,
}

/// A finished read for the newest request.
#[derive(Debug)]
pub struct Completed {
    pub id: ModelIdentifier,
    pub result: Result<ModelSource, LoadError>,
}

/// Background reader where the newest request wins: anything that finishes
/// for an older request is dropped.
pub struct ModelLoader {
    requests: Sender<Request>,
    completed: Receiver<(u64, Completed)>,
    latest: u64,
    delivered: u64,
    _worker: thread::JoinHandle<()>,
}

impl ModelLoader {
    pub fn spawn(policy: MalformedLinePolicy) -> Self {
        let (requests, inbox) = crossbeam_channel::unbounded::<Request>();
        let (outbox, completed) = crossbeam_channel::unbounded();

        let worker = thread::spawn(move || {
            while let Ok(mut req) = inbox.recv() {
                // Jump straight to the newest queued request.
                for newer in inbox.try_iter() {
                    log::debug!("load of {} superseded before it started", req.id);
                    req = newer;
                }

                let started = Instant::now();
                let result = ModelSource::read(&req.id, policy);
                log::debug!("read {} in {:.2?}", req.id, started.elapsed());

                let done = Completed { id: req.id, result };
                if outbox.send((req.seq, done)).is_err() {
                    break;
                }
            }
        });

        Self {
            requests,
            completed,
            latest: 0,
            delivered: 0,
            _worker: worker,
        }
    }

    /// Queues a read of `id`, superseding any outstanding request.
    pub fn request(&mut self, id: ModelIdentifier) -> u64 {
        self.latest += 1;
        if self
            .requests
            .send(Request {
                seq: self.latest,
                id,
            })
            .is_err()
        {
            log::error!("model loader thread has exited");
        }
        self.latest
    }

    /// Makes every outstanding request stale without queuing a new one.
    pub fn cancel(&mut self) {
        if self.is_pending() {
            self.latest += 1;
            self.delivered = self.latest;
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.delivered < self.latest
    }

    /// Non-blocking. Returns the result for the newest request if it has
    /// finished, discarding stale ones along the way.
    pub fn poll(&mut self) -> Option<Completed> {
        while let Ok((seq, done)) = self.completed.try_recv() {
            if let Some(done) = self.accept(seq, done) {
                return Some(done);
            }
        }
        None
    }

    /// Like [`poll`](Self::poll) but waits up to `timeout`. Returns at once
    /// when nothing is pending.
    pub fn wait(&mut self, timeout: Duration) -> Option<Completed> {
        if !self.is_pending() {
            return None;
        }
        let deadline = Instant::now() + timeout;
        while let Ok((seq, done)) = self.completed.recv_deadline(deadline) {
            if let Some(done) = self.accept(seq, done) {
                return Some(done);
            }
        }
        None
    }

    fn accept(&mut self, seq: u64, done: Completed) -> Option<Completed> {
        if seq != self.latest || self.delivered >= seq {
            log::warn!(
                "discarding load of {} (request {seq}, newest is {})",
                done.id,
                self.latest
            );
            return None;
        }
        self.delivered = seq;
        Some(done)
    }
}
