use std::path::Path;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::query::SlotQuery;
use super::runner::TrackerRunner;
use crate::error::QueryError;

/// Unchecked locations reported for one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotResult {
    pub slot: String,
    pub items: Vec<String>,
}

/// Per-slot results of a fully successful batch, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    slots: Vec<SlotResult>,
}

impl FromIterator<SlotResult> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = SlotResult>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl AggregateResult {
    #[cfg(test)]
    pub fn get(&self, slot: &str) -> Option<&[String]> {
        self.slots
            .iter()
            .find(|r| r.slot == slot)
            .map(|r| r.items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotResult> {
        self.slots.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sum of item counts over all slots
    pub fn total(&self) -> usize {
        self.slots.iter().map(|r| r.items.len()).sum()
    }
}

/// Extra time cancelled slots get to exit before their tasks are aborted
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Wait for every task in the set, discarding results
async fn drain<T: 'static>(tasks: &mut JoinSet<T>) {
    while tasks.join_next().await.is_some() {}
}

/// Runs one tracker query per slot as a single all-or-nothing batch
#[derive(Debug, Clone)]
pub struct TrackerOrchestrator {
    runner: TrackerRunner,
}

impl TrackerOrchestrator {
    pub fn new(runner: TrackerRunner) -> Self {
        Self { runner }
    }

    /// Query every slot concurrently.
    ///
    /// The first failing slot cancels its siblings; this returns only after
    /// their processes have been killed and reaped, and never with partial
    /// results.
    pub async fn query<S: AsRef<str>>(
        &self,
        server: &str,
        slots: &[S],
        launcher_path: &Path,
        credential: Option<&str>,
    ) -> Result<AggregateResult, QueryError> {
        let mut queries: Vec<SlotQuery> = Vec::with_capacity(slots.len());
        for slot in slots {
            let slot = slot.as_ref();
            if queries.iter().any(|q| q.slot_name == slot) {
                warn!("slot '{}' requested more than once, querying it once", slot);
                continue;
            }
            queries.push(SlotQuery::new(server, slot, credential, launcher_path));
        }

        info!("querying {} slot(s) on {}", queries.len(), server);

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        for (index, query) in queries.iter().enumerate() {
            let runner = self.runner.clone();
            let command = query.command();
            let cancel = cancel.clone();
            tasks.spawn(async move { (index, runner.run(&command, &cancel).await) });
        }

        let mut finished: Vec<Option<Vec<String>>> = vec![None; queries.len()];
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((index, Ok(items))) => {
                    debug!(
                        "slot '{}' finished with {} item(s)",
                        queries[index].slot_name,
                        items.len()
                    );
                    finished[index] = Some(items);
                    continue;
                }
                Ok((index, Err(source))) => QueryError::Slot {
                    slot: queries[index].slot_name.clone(),
                    source,
                },
                Err(e) => QueryError::Task(e),
            };

            warn!(error = ?failure, "batch failed, cancelling remaining slots");
            cancel.cancel();
            if tokio::time::timeout(CANCEL_GRACE, drain(&mut tasks))
                .await
                .is_err()
            {
                warn!("cancelled slots did not stop in time, aborting their tasks");
                tasks.abort_all();
                drain(&mut tasks).await;
            }
            return Err(failure);
        }

        info!("all {} slot(s) succeeded", queries.len());
        Ok(queries
            .into_iter()
            .zip(finished)
            .map(|(query, items)| SlotResult {
                slot: query.slot_name,
                items: items.unwrap_or_default(),
            })
            .collect())
    }
}
