use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use taskqueue::scheduler::{CompletionSink, StartFeed};

/// Something that happened on the worker side of a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Started(String),
    Completed(String),
}

/// A fake worker that drains a start feed sequentially.
///
/// Every started task is completed after `batch` further start events have
/// been received (or once the feed has nothing more to offer), which keeps
/// several tasks in flight at once without any real concurrency.
pub struct ScriptedWorker {
    batch: usize,
    log: Arc<Mutex<Vec<WorkerEvent>>>,
}

impl ScriptedWorker {
    /// Complete each task as soon as it is received.
    pub fn immediate() -> Self {
        Self::batched(1)
    }

    /// Hold up to `batch` tasks before completing them (in start order).
    pub fn batched(batch: usize) -> Self {
        Self {
            batch: batch.max(1),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> Vec<WorkerEvent> {
        self.log.lock().unwrap().clone()
    }

    /// Names in the order they were started.
    pub fn started(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|e| match e {
                WorkerEvent::Started(name) => Some(name),
                WorkerEvent::Completed(_) => None,
            })
            .collect()
    }

    /// Drive the schedule to the end.
    pub async fn run(&self, mut feed: StartFeed, sink: CompletionSink) {
        let mut in_flight: Vec<String> = Vec::new();

        loop {
            // Take what is immediately available, up to the batch size.
            while in_flight.len() < self.batch {
                match tokio::time::timeout(std::time::Duration::from_millis(20), feed.recv()).await
                {
                    Ok(Some(name)) => {
                        self.push(WorkerEvent::Started(name.clone()));
                        in_flight.push(name);
                    }
                    Ok(None) => {
                        self.complete_all(&mut in_flight, &sink);
                        return;
                    }
                    Err(_) => break,
                }
            }

            if in_flight.is_empty() {
                // Nothing running, nothing offered: wait for the feed to close.
                match feed.recv().await {
                    Some(name) => {
                        self.push(WorkerEvent::Started(name.clone()));
                        in_flight.push(name);
                        continue;
                    }
                    None => return,
                }
            }

            self.complete_all(&mut in_flight, &sink);
        }
    }

    fn complete_all(&self, in_flight: &mut Vec<String>, sink: &CompletionSink) {
        for name in in_flight.drain(..) {
            self.push(WorkerEvent::Completed(name.clone()));
            let _ = sink.complete(name);
        }
    }

    fn push(&self, event: WorkerEvent) {
        self.log.lock().unwrap().push(event);
    }
}

/// Check that no two groups ever had tasks running at the same time.
///
/// `group_of` maps task names to their group label.
pub fn groups_never_overlap(log: &[WorkerEvent], group_of: impl Fn(&str) -> String) -> bool {
    let mut running: BTreeSet<String> = BTreeSet::new();

    for event in log {
        match event {
            WorkerEvent::Started(name) => {
                let group = group_of(name);
                if running.iter().any(|other| group_of(other) != group) {
                    return false;
                }
                running.insert(name.clone());
            }
            WorkerEvent::Completed(name) => {
                running.remove(name);
            }
        }
    }
    true
}
