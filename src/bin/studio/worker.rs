//! Advisor worker - runs advisor requests off the UI thread
//!
//! The UI sends jobs and keeps going; replies come back over a channel and
//! are applied on the UI thread, so the engine is only ever touched there.

use std::{
    collections::BTreeSet,
    io,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
};

use tracing::debug;

use saavy_studio::{
    advisor::{Advisor, AdvisorError, AdvisorTransport},
    performance::Annotation,
    synth::PitchId,
};

pub enum AdvisorJob {
    Describe { id: u64, pitches: BTreeSet<PitchId> },
    Compose { vibe: String },
}

pub enum AdvisorReply {
    Described {
        id: u64,
        result: Result<Annotation, AdvisorError>,
    },
    Composed {
        vibe: String,
        result: Result<Vec<PitchId>, AdvisorError>,
    },
}

pub struct AdvisorWorker {
    jobs: Sender<AdvisorJob>,
    replies: Receiver<AdvisorReply>,
    in_flight: usize,
}

impl AdvisorWorker {
    pub fn spawn<T: AdvisorTransport + 'static>(advisor: Advisor<T>) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<AdvisorJob>();
        let (reply_tx, reply_rx) = mpsc::channel();

        thread::Builder::new()
            .name("advisor".into())
            .spawn(move || {
                for job in job_rx {
                    let reply = match job {
                        AdvisorJob::Describe { id, pitches } => AdvisorReply::Described {
                            id,
                            result: advisor.describe(&pitches),
                        },
                        AdvisorJob::Compose { vibe } => {
                            let result = advisor.compose(&vibe);
                            AdvisorReply::Composed { vibe, result }
                        }
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                debug!("advisor worker exiting");
            })?;

        Ok(Self {
            jobs: job_tx,
            replies: reply_rx,
            in_flight: 0,
        })
    }

    pub fn submit(&mut self, job: AdvisorJob) -> bool {
        let sent = self.jobs.send(job).is_ok();
        if sent {
            self.in_flight += 1;
        }
        sent
    }

    /// Next finished reply, if any.
    pub fn poll(&mut self) -> Option<AdvisorReply> {
        match self.replies.try_recv() {
            Ok(reply) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(reply)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}
