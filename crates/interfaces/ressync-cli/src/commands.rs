use crate::CliOptionalMode;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use ressync_core::{Disposition, ModEntry, ModList};
use ressync_infra::net::{default_http_client, DownloadEvent, HttpManifestSource, ManifestSource};
use ressync_pipeline::{
    ItemOutcome, OptionalSelector, SessionConfig, SyncEvent, SyncReport, SyncSession,
};
use std::collections::HashMap;
use tokio::sync::mpsc;

pub async fn cmd_list(url: String) -> Result<()> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let source = HttpManifestSource::new(client);
    let list = source
        .fetch_modlist(&url)
        .await
        .context("Failed to fetch mod list")?;

    println!(":: {} entries from {}", list.data.len(), url);
    for (i, entry) in list.data.iter().enumerate() {
        println!(
            "{:3}. {} (ID: {}) - {} [{}] - {}",
            i + 1,
            entry.display_name(),
            entry.id,
            entry.subject,
            if entry.required { "Required" } else { "Optional" },
            entry.raw_name
        );
    }

    print_summary(&list.data);
    Ok(())
}

fn print_summary(entries: &[ModEntry]) {
    let mut by_subject: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        if !entry.subject.is_empty() {
            *by_subject.entry(entry.subject.as_str()).or_default() += 1;
        }
    }
    let mut rows: Vec<_> = by_subject.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    println!("\n:: Summary by subject");
    for (subject, count) in rows {
        println!("   {subject:<15}: {count}");
    }

    let required = entries.iter().filter(|e| e.required).count();
    println!("\n   Required: {}/{}", required, entries.len());
}

pub async fn cmd_check(
    url: String,
    path: Utf8PathBuf,
    fallback: Option<Utf8PathBuf>,
) -> Result<()> {
    println!(":: Checking local state...");
    println!("   Endpoint: {url}");
    println!("   Base:     {path}");

    let list = fetch_with_fallback(&url, fallback.as_deref()).await?;

    let mut up_to_date = 0usize;
    let mut pending = 0usize;
    for entry in &list.data {
        let base = path.clone();
        let entry_clone = entry.clone();
        let (target, disposition) =
            tokio::task::spawn_blocking(move || {
                ressync_pipeline::reconcile_entry(&base, &entry_clone)
            })
            .await??;

        let verdict = match disposition {
            Disposition::UpToDate(_) => {
                up_to_date += 1;
                "up-to-date"
            }
            Disposition::NeedsUpdate(_) => {
                pending += 1;
                "stale (digest mismatch)"
            }
            Disposition::NeedsRename(_) => {
                pending += 1;
                "present under another name"
            }
            Disposition::NotFound => {
                pending += 1;
                "missing"
            }
        };
        println!("   {:<40} {}", target, verdict);
    }

    println!("\n:: {} up-to-date, {} pending", up_to_date, pending);
    Ok(())
}

pub async fn cmd_sync(
    url: String,
    path: Utf8PathBuf,
    fallback: Option<Utf8PathBuf>,
    optional: CliOptionalMode,
    optional_ids: Vec<i64>,
    no_download: bool,
) -> Result<SyncReport> {
    println!(":: Synchronizing resources");
    println!("   Endpoint: {url}");
    println!("   Base:     {path}");

    let client = default_http_client().context("Failed to build HTTP client")?;
    let source = HttpManifestSource::new(client.clone());
    let mut session = SyncSession::new(
        client,
        SessionConfig {
            manifest_url: url,
            base_dir: path,
            fallback_path: fallback,
            auto_download: !no_download,
        },
    );

    let (tx, rx) = mpsc::channel(256);
    let renderer = tokio::spawn(render_events(rx));

    let selector = CliSelector {
        mode: optional,
        ids: optional_ids,
    };
    let report = session.run(&source, &selector, Some(tx)).await?;
    let _ = renderer.await;

    println!(
        ":: {} succeeded, {} failed",
        report.total_succeeded(),
        report.total_failed()
    );
    Ok(report)
}

async fn fetch_with_fallback(url: &str, fallback: Option<&Utf8Path>) -> Result<ModList> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let source = HttpManifestSource::new(client);
    match source.fetch_modlist(url).await {
        Ok(list) => Ok(list),
        Err(e) => {
            tracing::warn!("remote modlist fetch failed: {e}");
            eprintln!("!! Remote fetch failed: {e}");
            let path = fallback
                .context("remote fetch failed and no --fallback file was given")?;
            ressync_infra::net::load_modlist_file(path)
                .with_context(|| format!("Failed to load fallback modlist {path}"))
        }
    }
}

struct CliSelector {
    mode: CliOptionalMode,
    ids: Vec<i64>,
}

#[async_trait::async_trait]
impl OptionalSelector for CliSelector {
    async fn select(&self, candidates: &[ModEntry]) -> Vec<i64> {
        if candidates.is_empty() {
            return Vec::new();
        }

        println!("   Optional entries not yet installed:");
        for c in candidates {
            println!("      {} (id {}) - {}", c.display_name(), c.id, c.description);
        }

        match self.mode {
            CliOptionalMode::None => Vec::new(),
            CliOptionalMode::All => candidates.iter().map(|e| e.id).collect(),
            CliOptionalMode::Ids => candidates
                .iter()
                .map(|e| e.id)
                .filter(|id| self.ids.contains(id))
                .collect(),
        }
    }
}

async fn render_events(mut rx: mpsc::Receiver<SyncEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(ev) = rx.recv().await {
        match ev {
            SyncEvent::StageStarted { stage, index, total } => {
                println!("\n:: [{}/{}] {}", index + 1, total, stage.label());
            }
            SyncEvent::ManifestLoaded {
                entries,
                from_fallback,
            } => {
                let origin = if from_fallback { " (local fallback)" } else { "" };
                println!("   {entries} entries{origin}");
            }
            SyncEvent::ItemStarted { name, .. } => {
                println!("   -> {name}");
            }
            SyncEvent::Download(DownloadEvent::Started { total_bytes, .. }) => {
                let pb = match total_bytes {
                    Some(total) => {
                        let pb = ProgressBar::new(total);
                        pb.set_style(
                            ProgressStyle::default_bar()
                                .template("      {bytes}/{total_bytes} {wide_bar}")
                                .unwrap(),
                        );
                        pb
                    }
                    // Unknown content length: indeterminate spinner.
                    None => ProgressBar::new_spinner(),
                };
                bar = Some(pb);
            }
            SyncEvent::Download(DownloadEvent::Progress { bytes_read, .. }) => {
                if let Some(pb) = &bar {
                    pb.set_position(bytes_read);
                }
            }
            SyncEvent::Download(DownloadEvent::Completed { .. }) => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
            }
            SyncEvent::ItemFinished { name, outcome, .. } => match outcome {
                ItemOutcome::UpToDate => println!("      up-to-date: {name}"),
                ItemOutcome::Renamed => println!("      renamed into place: {name}"),
                ItemOutcome::Downloaded { bytes } => {
                    println!("      downloaded: {name} ({})", format_size(bytes, DECIMAL));
                }
                ItemOutcome::Skipped => println!("      skipped: {name}"),
                ItemOutcome::Failed(reason) => println!("      FAILED: {name} ({reason})"),
            },
            SyncEvent::StageFinished {
                succeeded, failed, ..
            } => {
                if succeeded + failed > 0 {
                    println!("   {succeeded} ok, {failed} failed");
                }
            }
            SyncEvent::Completed => {
                println!("\n:: Sync completed");
            }
        }
    }
}
