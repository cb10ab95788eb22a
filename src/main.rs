mod analyze;
mod error;
mod github;
mod model;
mod report;
mod store;
mod utils;

#[cfg(test)]
mod test_utils;

use crate::analyze::{merge, ContributionFetcher, SyncPlan};
use crate::error::SyncError;
use crate::github::{GithubApi, GithubClient, Paginator};
use crate::model::settings::{DEFAULT_API_URL, DEFAULT_CONCURRENCY, DEFAULT_SINCE_YEAR};
use crate::model::{ContributionDataset, Settings, Strictness};
use crate::report::MarkdownReport;
use crate::store::{CommitDetailCache, DataDir, ProcessedPrs, SyncState};
use crate::utils::{MultiProgressNew, ProgressStyleTemplate};
use chrono::{DateTime, Datelike, Utc};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Collects a GitHub user's contributions into quarterly Markdown reports")]
struct Args {
    #[arg(long = "username", env = "GITHUB_USERNAME")]
    username: String,
    #[arg(long = "token", env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long = "since-year", default_value_t = DEFAULT_SINCE_YEAR)]
    since_year: i32,
    #[arg(long = "api-url", default_value = DEFAULT_API_URL)]
    api_url: String,
    #[arg(long = "data-dir", default_value = "data")]
    data_dir: PathBuf,
    #[arg(long = "output-dir", default_value = "contributions")]
    output_dir: PathBuf,
    #[arg(long = "strictness", value_enum, default_value_t = Strictness::Loose)]
    strictness: Strictness,
    #[arg(long = "concurrency", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
    /// Ignore the last run and fetch everything since `--since-year`.
    #[arg(long = "full")]
    full: bool,
    /// Update the data files without rendering Markdown.
    #[arg(long = "no-report")]
    no_report: bool,
}

impl Args {
    fn into_settings(self, current_year: i32) -> Result<Settings, SyncError> {
        let mut settings = Settings::new(self.username, self.token)?;
        settings.since_year = self.since_year;
        settings.api_url = self.api_url;
        settings.data_dir = self.data_dir;
        settings.output_dir = self.output_dir;
        settings.strictness = self.strictness;
        settings.concurrency = self.concurrency;
        settings.force_full = self.full;
        settings.write_report = !self.no_report;
        settings.validate(current_year)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = args.into_settings(Utc::now().year())?;
    run(&settings).await?;
    Ok(())
}

async fn run(settings: &Settings) -> Result<(), SyncError> {
    let multi_progress = MultiProgress::default();
    let client = GithubClient::new(&settings.api_url, &settings.token)?;
    let merged = sync(Paginator::new(&client), settings, Utc::now(), &multi_progress).await?;

    if settings.write_report {
        let report_pb = multi_progress.add_spinner("Writing reports ...");
        let written = merged.report_create(&settings.output_dir)?;
        report_pb.finish_with_message(format!(
            "✅ Wrote {} report files to `{}`",
            written.len(),
            settings.output_dir.display()
        ));
    }
    Ok(())
}

/// One sync pass over the data directory. The dataset and sync state are only
/// replaced after a successful fetch; the caches are flushed either way.
async fn sync<A: GithubApi>(
    paginator: Paginator<'_, A>,
    settings: &Settings,
    now: DateTime<Utc>,
    multi_progress: &MultiProgress,
) -> Result<ContributionDataset, SyncError> {
    let data_dir = DataDir::new(&settings.data_dir);

    let load_pb = multi_progress.add_spinner("Loading state ...");
    let sync_state = SyncState::load(&data_dir.sync_state())?;
    let cache = CommitDetailCache::load(&data_dir.commit_cache())?;
    let processed = ProcessedPrs::load(&data_dir.processed())?;
    let prior = store::load_dataset(&data_dir.dataset())?;
    load_pb.finish_with_message(format!(
        "✅ Loaded {} contributions ({} cached commit details, {} processed)",
        prior.len(),
        cache.len().await,
        processed.len().await
    ));

    let plan = if settings.force_full {
        SyncPlan::Full
    } else {
        SyncPlan::choose(sync_state.last_successful_run, now)
    };
    let start_year = plan.start_year(now, settings.since_year);
    tracing::info!(
        username = %settings.username,
        ?plan,
        start_year,
        last_run = ?sync_state.last_successful_run,
        last_start_year = ?sync_state.last_start_year,
        "Planned sync"
    );

    let fetcher = ContributionFetcher::new(paginator, settings, &cache, &processed, now);

    let years = (now.year() - start_year + 1).max(1) as u64;
    let fetch_pb = multi_progress.add_with_style(
        ProgressBar::new(years),
        ProgressStyleTemplate::year_bar(),
    );
    let progress_pb = fetch_pb.clone();
    let progress = move |year: i32| {
        progress_pb.set_position((year - start_year) as u64);
        progress_pb.set_message(format!("Fetching {year} ..."));
    };
    let fetched = fetcher.fetch(start_year, Box::new(progress)).await;

    // Cache entries are individually valid, so they are kept even when the fetch failed.
    let flushed = flush_caches(&data_dir, &cache, &processed).await;
    let (fresh, summary) = match fetched {
        Ok(fetched) => fetched,
        Err(e) => {
            fetch_pb.abandon_with_message("❌ Fetch failed");
            return Err(e.into());
        }
    };
    flushed?;
    fetch_pb.set_style(ProgressStyleTemplate::only_message());
    fetch_pb.finish_with_message(format!(
        "✅ Completed fetch (found {} contributions in {} search results)",
        fresh.len(),
        summary.searched
    ));
    tracing::info!(
        skipped_own_repo = summary.skipped_own_repo,
        skipped_bot = summary.skipped_bot,
        skipped_private = summary.skipped_private,
        skipped_processed = summary.skipped_processed,
        skipped_malformed = summary.skipped_malformed,
        "Fetch summary"
    );

    let (merged, report) = merge(prior, fresh);
    tracing::info!(
        new = report.new_entries,
        updated = report.updated_entries,
        promoted = report.promoted,
        superseded = report.superseded,
        dropped_on_load = report.dropped_on_load,
        total = merged.len(),
        "Merged contributions"
    );
    store::save_dataset(&data_dir.dataset(), &merged)?;
    SyncState::completed(now, start_year).save(&data_dir.sync_state())?;
    Ok(merged)
}

async fn flush_caches(
    data_dir: &DataDir,
    cache: &CommitDetailCache,
    processed: &ProcessedPrs,
) -> Result<(), SyncError> {
    cache.save(&data_dir.commit_cache()).await?;
    processed.save(&data_dir.processed()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::fetcher::queries;
    use crate::github::paginator::search_path;
    use crate::test_utils::{search_page, FakeGithub};
    use chrono::TimeZone;
    use indicatif::ProgressDrawTarget;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    const USER: &str = "alice";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn sync_settings(data_dir: &Path) -> Settings {
        let mut settings = crate::test_utils::settings(USER);
        settings.since_year = 2024;
        settings.data_dir = data_dir.to_path_buf();
        settings
    }

    /// Every 2024 query answers with an empty result page.
    fn quiet_api() -> FakeGithub {
        queries::all(USER, 2024)
            .into_iter()
            .fold(FakeGithub::new(), |api, query| {
                api.with_pages(&search_path(&query), vec![search_page(vec![])])
            })
    }

    async fn sync_with(api: &FakeGithub, settings: &Settings) -> Result<ContributionDataset, SyncError> {
        let paginator = Paginator::new(api).with_delays(Duration::ZERO, Duration::ZERO);
        let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        sync(paginator, settings, now(), &multi_progress).await
    }

    #[tokio::test]
    async fn test_sync_writes_all_state_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = sync_settings(dir.path());
        let data_dir = DataDir::new(dir.path());

        let merged = sync_with(&quiet_api(), &settings).await.unwrap();
        assert!(merged.is_empty());
        for path in [
            data_dir.dataset(),
            data_dir.sync_state(),
            data_dir.commit_cache(),
            data_dir.processed(),
        ] {
            assert!(path.is_file(), "missing {}", path.display());
        }
        let state = SyncState::load(&data_dir.sync_state()).unwrap();
        assert_eq!(state, SyncState::completed(now(), 2024));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_dataset_and_sync_state() {
        let dir = tempfile::tempdir().unwrap();
        let settings = sync_settings(dir.path());
        let data_dir = DataDir::new(dir.path());
        let last_run = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
        store::save_dataset(&data_dir.dataset(), &ContributionDataset::default()).unwrap();
        SyncState::completed(last_run, 2019).save(&data_dir.sync_state()).unwrap();
        let dataset_before = fs::read(data_dir.dataset()).unwrap();
        let state_before = fs::read(data_dir.sync_state()).unwrap();

        let api = quiet_api().with_server_error(&search_path(&queries::issues(USER, 2024)));
        let result = sync_with(&api, &settings).await;

        assert!(matches!(
            result,
            Err(SyncError::Github(crate::error::GithubError::Api { status: 502, .. }))
        ));
        assert_eq!(fs::read(data_dir.dataset()).unwrap(), dataset_before);
        assert_eq!(fs::read(data_dir.sync_state()).unwrap(), state_before);
        assert!(data_dir.commit_cache().is_file());
        assert!(data_dir.processed().is_file());
    }

    #[test]
    fn test_args_map_onto_settings() {
        let args = Args::try_parse_from([
            "contributions",
            "--username",
            "alice",
            "--token",
            "secret",
            "--since-year",
            "2021",
            "--strictness",
            "strict",
            "--concurrency",
            "2",
            "--full",
            "--no-report",
        ])
        .unwrap();
        let settings = args.into_settings(2024).unwrap();
        assert_eq!(settings.username, "alice");
        assert_eq!(settings.since_year, 2021);
        assert_eq!(settings.strictness, Strictness::Strict);
        assert_eq!(settings.concurrency, 2);
        assert!(settings.force_full);
        assert!(!settings.write_report);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_future_since_year_is_rejected() {
        let args = Args::try_parse_from([
            "contributions",
            "--username",
            "alice",
            "--token",
            "secret",
            "--since-year",
            "2030",
        ])
        .unwrap();
        assert!(matches!(
            args.into_settings(2024),
            Err(SyncError::InvalidSettings(_))
        ));
    }
}
