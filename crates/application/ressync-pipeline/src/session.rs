use camino::Utf8PathBuf;
use ressync_core::{Disposition, ModEntry, ModList, SyncStage};
use ressync_infra::net::{DownloadEvent, Fetcher, ManifestSource};
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

use crate::reconcile::{apply_disposition, reconcile_entry};
use crate::SyncError;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub manifest_url: String,
    /// Base directory under which catalog subdirectories live. All writes
    /// are confined beneath it.
    pub base_dir: Utf8PathBuf,
    /// Local modlist JSON used when the remote endpoint fails.
    pub fallback_path: Option<Utf8PathBuf>,
    /// When false, download-bearing stages only report what they would do.
    pub auto_download: bool,
}

/// Progress events consumed by a presentation layer (CLI, GUI, or test
/// harness). Delivery is fire-and-forget; formatting is the consumer's
/// concern, only the event data is contract.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    ManifestLoaded {
        entries: usize,
        from_fallback: bool,
    },
    StageStarted {
        stage: SyncStage,
        index: usize,
        total: usize,
    },
    ItemStarted {
        stage: SyncStage,
        name: String,
    },
    Download(DownloadEvent),
    ItemFinished {
        stage: SyncStage,
        name: String,
        outcome: ItemOutcome,
    },
    StageFinished {
        stage: SyncStage,
        succeeded: u32,
        failed: u32,
    },
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Correct file already at the target path.
    UpToDate,
    /// Matching content found under another name and moved into place.
    Renamed,
    Downloaded {
        bytes: u64,
    },
    /// Not processed: auto-download disabled, or not selected.
    Skipped,
    Failed(String),
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }
}

/// Supplies the user's choice for the optional-mods stage. The candidates
/// passed in are already filtered to entries not yet satisfied locally.
#[async_trait::async_trait]
pub trait OptionalSelector: Send + Sync {
    async fn select(&self, candidates: &[ModEntry]) -> Vec<i64>;
}

/// Skips every optional entry.
pub struct SelectNone;

#[async_trait::async_trait]
impl OptionalSelector for SelectNone {
    async fn select(&self, _candidates: &[ModEntry]) -> Vec<i64> {
        Vec::new()
    }
}

/// Accepts every optional entry.
pub struct SelectAll;

#[async_trait::async_trait]
impl OptionalSelector for SelectAll {
    async fn select(&self, candidates: &[ModEntry]) -> Vec<i64> {
        candidates.iter().map(|e| e.id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: SyncStage,
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub stages: Vec<StageReport>,
    pub from_fallback: bool,
}

impl SyncReport {
    pub fn total_succeeded(&self) -> u32 {
        self.stages.iter().map(|s| s.succeeded).sum()
    }

    pub fn total_failed(&self) -> u32 {
        self.stages.iter().map(|s| s.failed).sum()
    }
}

/// Ephemeral state for one synchronization run: the manifest, the current
/// stage, and per-stage tallies. Stages advance strictly forward; the
/// session is discarded (or explicitly reset) after `Completed`.
pub struct SyncSession {
    config: SessionConfig,
    fetcher: Fetcher,
    manifest: ModList,
    stage: SyncStage,
    next_item_id: u64,
}

impl SyncSession {
    pub fn new(client: reqwest::Client, config: SessionConfig) -> Self {
        Self {
            config,
            fetcher: Fetcher::new(client),
            manifest: ModList::default(),
            stage: SyncStage::FetchManifest,
            next_item_id: 0,
        }
    }

    pub fn stage(&self) -> SyncStage {
        self.stage
    }

    /// Discard session state and return to the first stage.
    pub fn reset(&mut self) {
        self.manifest = ModList::default();
        self.stage = SyncStage::FetchManifest;
        self.next_item_id = 0;
    }

    /// Drive the full workflow through every stage in order.
    ///
    /// Per-item failures are tallied and reported, never escalated; the only
    /// fatal condition is the manifest being unavailable from both the
    /// remote endpoint and the local fallback, which aborts before any
    /// download stage and leaves the session idle.
    pub async fn run(
        &mut self,
        source: &dyn ManifestSource,
        selector: &dyn OptionalSelector,
        events: Option<Sender<SyncEvent>>,
    ) -> Result<SyncReport, SyncError> {
        self.reset();

        let mut report = SyncReport::default();
        report.from_fallback = self.fetch_manifest_stage(source, &events).await?;
        self.stage = self.stage.next();

        while self.stage != SyncStage::Completed {
            let stage = self.stage;
            let (succeeded, failed) = if stage == SyncStage::SelectOptional {
                self.run_optional_stage(selector, &events).await
            } else {
                self.run_download_stage(stage, &events).await
            };
            report.stages.push(StageReport {
                stage,
                succeeded,
                failed,
            });
            // Unconditional forward transition: partial failure never blocks
            // the next stage.
            self.stage = self.stage.next();
        }

        emit(&events, SyncEvent::Completed).await;
        Ok(report)
    }

    async fn fetch_manifest_stage(
        &mut self,
        source: &dyn ManifestSource,
        events: &Option<Sender<SyncEvent>>,
    ) -> Result<bool, SyncError> {
        emit(
            events,
            SyncEvent::StageStarted {
                stage: SyncStage::FetchManifest,
                index: SyncStage::FetchManifest.index(),
                total: SyncStage::COUNT,
            },
        )
        .await;

        let (list, from_fallback) = match source.fetch_modlist(&self.config.manifest_url).await {
            Ok(list) => (list, false),
            Err(remote_err) => {
                warn!(url = %self.config.manifest_url, error = %remote_err, "remote manifest fetch failed");
                let Some(fallback) = self.config.fallback_path.clone() else {
                    self.reset();
                    return Err(SyncError::ManifestUnavailable(format!(
                        "remote fetch failed ({remote_err}) and no local fallback is configured"
                    )));
                };
                match ressync_infra::net::load_modlist_file(&fallback) {
                    Ok(list) => {
                        info!(path = %fallback, "using local modlist fallback");
                        (list, true)
                    }
                    Err(local_err) => {
                        self.reset();
                        return Err(SyncError::ManifestUnavailable(format!(
                            "remote fetch failed ({remote_err}); local fallback failed ({local_err})"
                        )));
                    }
                }
            }
        };

        info!(entries = list.data.len(), from_fallback, "manifest loaded");
        emit(
            events,
            SyncEvent::ManifestLoaded {
                entries: list.data.len(),
                from_fallback,
            },
        )
        .await;
        emit(
            events,
            SyncEvent::StageFinished {
                stage: SyncStage::FetchManifest,
                succeeded: 1,
                failed: 0,
            },
        )
        .await;

        self.manifest = list;
        Ok(from_fallback)
    }

    fn stage_entries(&self, stage: SyncStage) -> Vec<ModEntry> {
        self.manifest
            .data
            .iter()
            .filter(|e| stage.matches(e))
            .cloned()
            .collect()
    }

    async fn run_download_stage(
        &mut self,
        stage: SyncStage,
        events: &Option<Sender<SyncEvent>>,
    ) -> (u32, u32) {
        let entries = self.stage_entries(stage);
        emit(
            events,
            SyncEvent::StageStarted {
                stage,
                index: stage.index(),
                total: SyncStage::COUNT,
            },
        )
        .await;
        info!(stage = stage.label(), entries = entries.len(), "stage started");

        if !self.config.auto_download {
            self.skip_entries(stage, &entries, events).await;
            emit(
                events,
                SyncEvent::StageFinished {
                    stage,
                    succeeded: 0,
                    failed: 0,
                },
            )
            .await;
            return (0, 0);
        }

        let (succeeded, failed) = self.process_serially(stage, &entries, events).await;
        emit(
            events,
            SyncEvent::StageFinished {
                stage,
                succeeded,
                failed,
            },
        )
        .await;
        (succeeded, failed)
    }

    async fn run_optional_stage(
        &mut self,
        selector: &dyn OptionalSelector,
        events: &Option<Sender<SyncEvent>>,
    ) -> (u32, u32) {
        let stage = SyncStage::SelectOptional;
        let entries = self.stage_entries(stage);
        emit(
            events,
            SyncEvent::StageStarted {
                stage,
                index: stage.index(),
                total: SyncStage::COUNT,
            },
        )
        .await;
        info!(entries = entries.len(), "optional selection started");

        if !self.config.auto_download {
            self.skip_entries(stage, &entries, events).await;
            emit(
                events,
                SyncEvent::StageFinished {
                    stage,
                    succeeded: 0,
                    failed: 0,
                },
            )
            .await;
            return (0, 0);
        }

        // Entries already satisfied locally are reported as present but
        // withheld from the choice set.
        let mut succeeded = 0u32;
        let mut candidates = Vec::new();
        for entry in entries {
            if self.is_up_to_date(&entry).await {
                succeeded += 1;
                emit(
                    events,
                    SyncEvent::ItemFinished {
                        stage,
                        name: entry.display_name().to_string(),
                        outcome: ItemOutcome::UpToDate,
                    },
                )
                .await;
            } else {
                candidates.push(entry);
            }
        }

        let chosen = selector.select(&candidates).await;
        let (selected, skipped): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|e| chosen.contains(&e.id));

        self.skip_entries(stage, &skipped, events).await;

        let (ok, failed) = self.process_serially(stage, &selected, events).await;
        succeeded += ok;
        emit(
            events,
            SyncEvent::StageFinished {
                stage,
                succeeded,
                failed,
            },
        )
        .await;
        (succeeded, failed)
    }

    async fn skip_entries(
        &self,
        stage: SyncStage,
        entries: &[ModEntry],
        events: &Option<Sender<SyncEvent>>,
    ) {
        for entry in entries {
            info!(stage = stage.label(), name = entry.display_name(), "skipping entry");
            emit(
                events,
                SyncEvent::ItemFinished {
                    stage,
                    name: entry.display_name().to_string(),
                    outcome: ItemOutcome::Skipped,
                },
            )
            .await;
        }
    }

    /// One reconcile+fetch at a time; no interleaving between items.
    async fn process_serially(
        &mut self,
        stage: SyncStage,
        entries: &[ModEntry],
        events: &Option<Sender<SyncEvent>>,
    ) -> (u32, u32) {
        let mut succeeded = 0u32;
        let mut failed = 0u32;

        for entry in entries {
            emit(
                events,
                SyncEvent::ItemStarted {
                    stage,
                    name: entry.display_name().to_string(),
                },
            )
            .await;

            let outcome = self.process_entry(entry, events).await;
            match &outcome {
                ItemOutcome::Failed(reason) => {
                    warn!(name = entry.display_name(), reason, "entry failed");
                    failed += 1;
                }
                other => {
                    info!(name = entry.display_name(), outcome = ?other, "entry done");
                    succeeded += 1;
                }
            }

            emit(
                events,
                SyncEvent::ItemFinished {
                    stage,
                    name: entry.display_name().to_string(),
                    outcome,
                },
            )
            .await;
        }

        (succeeded, failed)
    }

    async fn process_entry(
        &mut self,
        entry: &ModEntry,
        events: &Option<Sender<SyncEvent>>,
    ) -> ItemOutcome {
        // Hashing an unknown amount of directory content is blocking work.
        let base = self.config.base_dir.clone();
        let entry_clone = entry.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            reconcile_entry(&base, &entry_clone).map(|(target, disposition)| {
                let needs_download = apply_disposition(&disposition, &target);
                (target, disposition, needs_download)
            })
        })
        .await;

        let (target, disposition, needs_download) = match outcome {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => return ItemOutcome::Failed(format!("IO error: {e}")),
            Err(e) => return ItemOutcome::Failed(format!("reconcile task failed: {e}")),
        };

        if !needs_download {
            return match disposition {
                Disposition::NeedsRename(_) => ItemOutcome::Renamed,
                _ => ItemOutcome::UpToDate,
            };
        }

        if !entry.has_url() {
            return ItemOutcome::Failed("no download URL in manifest".to_string());
        }

        let id = self.next_item_id;
        self.next_item_id += 1;

        match self
            .fetch_forwarding(id, &entry.res_url, &target, &entry.hash, events)
            .await
        {
            Ok(bytes) => ItemOutcome::Downloaded { bytes },
            Err(e) => ItemOutcome::Failed(e.to_string()),
        }
    }

    /// Is the entry already satisfied at its exact target path? Read-only;
    /// used by the optional stage to trim its choice set.
    async fn is_up_to_date(&self, entry: &ModEntry) -> bool {
        let base = self.config.base_dir.clone();
        let entry = entry.clone();
        matches!(
            tokio::task::spawn_blocking(move || reconcile_entry(&base, &entry)).await,
            Ok(Ok((_, Disposition::UpToDate(_))))
        )
    }

    /// Run one fetch, bridging its byte-level events into the session
    /// channel.
    async fn fetch_forwarding(
        &self,
        id: u64,
        url: &str,
        dest: &camino::Utf8Path,
        expected_hash: &str,
        events: &Option<Sender<SyncEvent>>,
    ) -> Result<u64, ressync_infra::net::FetchError> {
        let Some(tx) = events else {
            return self.fetcher.fetch(id, url, dest, expected_hash, None).await;
        };

        let (dtx, mut drx) = tokio::sync::mpsc::channel(32);
        let tx = tx.clone();
        let forward = tokio::spawn(async move {
            while let Some(ev) = drx.recv().await {
                let _ = tx.send(SyncEvent::Download(ev)).await;
            }
        });

        let result = self
            .fetcher
            .fetch(id, url, dest, expected_hash, Some(&dtx))
            .await;
        drop(dtx);
        let _ = forward.await;
        result
    }
}

async fn emit(events: &Option<Sender<SyncEvent>>, event: SyncEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
