//! CLI command implementations
//!
//! One store client is constructed at startup and injected into
//! every engine. Commands print their structured summary and map
//! outcomes onto the exit-code contract: non-zero exactly when a
//! fail-class outcome occurred.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;

use crate::audit::AuditConfig;
use crate::backup::{BackupManager, ChecksumComparison};
use crate::cleanup::{CleanupEngine, CleanupOptions, CleanupRun};
use crate::confirm::{ConfirmationPort, ScriptedConfirmation, TerminalConfirmation};
use crate::health::{HealthCheckEngine, HealthConfig, HealthStatus};
use crate::monitor::ChangeMonitor;
use crate::observability::{Logger, Severity};
use crate::restore::{load_backup, RestoreManager, RestoreRun};
use crate::stats::{self, AlertThresholds};
use crate::store::{Filter, HttpRecordStore, Order, QueryOptions, Range, RecordStore};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{self as output, DashboardRender, EventLogRender};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store endpoint (required)
    pub store_url: String,

    /// Store credential; the CASEOPS_API_KEY environment variable
    /// takes precedence over this field
    #[serde(default)]
    pub api_key: String,

    /// Tables this tool administers
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// The table listed, monitored, cleaned and audited
    #[serde(default = "default_primary_table")]
    pub primary_table: String,

    /// Where backup files land
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// How many backup files to keep after rotation
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    /// Completed records older than this are stale (days)
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: i64,

    /// Default seconds between monitor snapshots
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    /// Capacity of the recent-change ring
    #[serde(default = "default_event_history")]
    pub event_history: usize,

    /// HTTP request timeout (seconds); the only operation bound
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_tables() -> Vec<String> {
    vec!["service_requests".to_string(), "waitlist".to_string()]
}
fn default_primary_table() -> String {
    "service_requests".to_string()
}
fn default_backup_dir() -> String {
    "./backups".to_string()
}
fn default_backup_retention() -> usize {
    7
}
fn default_stale_after_days() -> i64 {
    90
}
fn default_monitor_interval_secs() -> u64 {
    5
}
fn default_event_history() -> usize {
    10
}
fn default_http_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from file, applying the environment
    /// credential override
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("invalid config JSON: {}", e)))?;

        if let Ok(key) = std::env::var("CASEOPS_API_KEY") {
            if !key.is_empty() {
                config.api_key = key;
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> CliResult<()> {
        if self.store_url.trim().is_empty() {
            return Err(CliError::config_error("store_url is required"));
        }
        if self.api_key.trim().is_empty() {
            return Err(CliError::config_error(
                "api_key is required (config field or CASEOPS_API_KEY)",
            ));
        }
        if self.tables.is_empty() {
            return Err(CliError::config_error("tables must not be empty"));
        }
        if !self.tables.contains(&self.primary_table) {
            return Err(CliError::config_error(format!(
                "primary_table '{}' must be one of the configured tables",
                self.primary_table
            )));
        }
        if self.monitor_interval_secs == 0 {
            return Err(CliError::config_error("monitor_interval_secs must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(CliError::config_error("http_timeout_secs must be > 0"));
        }
        if self.event_history == 0 {
            return Err(CliError::config_error("event_history must be > 0"));
        }
        if self.backup_retention == 0 {
            return Err(CliError::config_error("backup_retention must be > 0"));
        }
        Ok(())
    }

    /// Health tunables derived from this configuration
    pub fn health_config(&self) -> HealthConfig {
        HealthConfig {
            tables: self.tables.clone(),
            primary_table: self.primary_table.clone(),
            stale_after_days: self.stale_after_days,
            ..HealthConfig::default()
        }
    }

    /// Auditor tunables derived from this configuration
    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            stale_after_days: self.stale_after_days,
        }
    }
}

/// Parses arguments, runs the selected command, returns the exit
/// code.
pub async fn run() -> i32 {
    let cli = Cli::parse_args();

    if cli.verbose {
        Logger::set_min_severity(Severity::Trace);
    }

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            Logger::error(
                "command_failed",
                &[("code", e.code_str()), ("message", e.message())],
            );
            1
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<i32> {
    let config = Config::load(&cli.config)?;

    let store: Arc<dyn RecordStore> = Arc::new(HttpRecordStore::new(
        &config.store_url,
        &config.api_key,
        Duration::from_secs(config.http_timeout_secs),
    )?);

    match cli.command {
        Command::Health { output } => health(store, &config, output).await,
        Command::List {
            status,
            priority,
            limit,
        } => list(store, &config, status, priority, limit).await,
        Command::Stats { days } => stats_summary(store, &config, days).await,
        Command::Backup {
            table,
            output,
            compress,
        } => backup(store, &config, table, output, compress).await,
        Command::Restore {
            file,
            dry_run,
            force,
            override_checksum,
        } => restore(store, file, dry_run, force, override_checksum).await,
        Command::Cleanup { dry_run, force } => cleanup(store, &config, dry_run, force).await,
        Command::Monitor { interval } => monitor(store, &config, interval, false).await,
        Command::Live { interval } => monitor(store, &config, interval, true).await,
    }
}

async fn health(
    store: Arc<dyn RecordStore>,
    config: &Config,
    report_path: Option<PathBuf>,
) -> CliResult<i32> {
    let engine = HealthCheckEngine::new(store, config.health_config());
    let report = engine.run().await;

    output::print_health_report(&report);

    if let Some(path) = report_path {
        output::write_report_file(&path, &serde_json::to_value(&report)?)?;
        Logger::info("report_written", &[("path", &path.display().to_string())]);
    }

    Ok(if report.overall() == HealthStatus::Fail {
        1
    } else {
        0
    })
}

async fn list(
    store: Arc<dyn RecordStore>,
    config: &Config,
    status: Option<String>,
    priority: Option<String>,
    limit: usize,
) -> CliResult<i32> {
    let mut options = QueryOptions::default()
        .with_order(Order::desc("created_at"))
        .with_range(Range::first(limit.max(1)));
    if let Some(status) = status {
        options = options.with_filter(Filter::Eq("status".into(), status));
    }
    if let Some(priority) = priority {
        options = options.with_filter(Filter::Eq("priority".into(), priority));
    }

    let page = store.query(&config.primary_table, &options).await?;
    output::print_record_lines(&page.records);

    match page.total {
        Some(total) => println!("{} of {} matching records", page.records.len(), total),
        None => println!("{} records", page.records.len()),
    }

    Ok(0)
}

async fn stats_summary(
    store: Arc<dyn RecordStore>,
    config: &Config,
    days: u32,
) -> CliResult<i32> {
    let records = store.fetch_all(&config.primary_table).await?;
    let now = Utc::now();

    let summary = json!({
        "records": records.len(),
        "by_status": stats::count_by_status(&records),
        "by_priority": stats::count_by_priority(&records),
        "by_service_type": stats::count_by_service_type(&records),
        "weekday_histogram": stats::weekday_histogram(&records).to_vec(),
        "hourly_histogram": stats::hourly_histogram(&records).to_vec(),
        "resolution": stats::resolution_stats(&records),
        "trend": stats::trend_buckets(&records, days.max(1), now),
        "top_contacts": stats::top_contacts(&records, 5),
        "alerts": stats::alerts(&records, &AlertThresholds::default(), now),
    });
    output::write_json(&summary)?;

    Ok(0)
}

async fn backup(
    store: Arc<dyn RecordStore>,
    config: &Config,
    table: Option<String>,
    output_dir: Option<PathBuf>,
    compress: bool,
) -> CliResult<i32> {
    let tables = match table {
        Some(table) => vec![table],
        None => config.tables.clone(),
    };
    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.backup_dir));

    let summary = BackupManager::new(store)
        .export(&tables, &output_dir, compress, config.backup_retention)
        .await?;

    for table in &summary.skipped_tables {
        Logger::warn("table_skipped", &[("table", table)]);
    }
    for path in &summary.rotation.deleted {
        Logger::info("backup_rotated", &[("path", &path.display().to_string())]);
    }
    for path in &summary.rotation.failed {
        Logger::warn(
            "rotation_failed",
            &[("path", &path.display().to_string())],
        );
    }

    let row_counts: BTreeMap<String, usize> = summary.row_counts.iter().cloned().collect();
    output::write_json(&json!({
        "path": summary.path.display().to_string(),
        "row_counts": row_counts,
        "skipped_tables": summary.skipped_tables,
    }))?;

    Ok(0)
}

async fn restore(
    store: Arc<dyn RecordStore>,
    file: PathBuf,
    dry_run: bool,
    force: bool,
    override_checksum: bool,
) -> CliResult<i32> {
    let backup = load_backup(&file)?;

    if let ChecksumComparison::Mismatch { expected, actual } = &backup.checksum {
        Logger::warn(
            "checksum_mismatch",
            &[("expected", expected.as_str()), ("actual", actual.as_str())],
        );
    }

    if dry_run {
        let planned: BTreeMap<String, usize> = backup.planned_counts().into_iter().collect();
        output::write_json(&json!({
            "dry_run": true,
            "checksum_ok": backup.checksum_ok(),
            "created_at": backup.file.metadata.created_at.clone(),
            "planned_upserts": planned,
        }))?;
        return Ok(0);
    }

    let confirm: Box<dyn ConfirmationPort> = if force {
        Box::new(ScriptedConfirmation::new(true))
    } else {
        Box::new(TerminalConfirmation)
    };

    let run = RestoreManager::new(store)
        .restore(&backup, override_checksum, confirm.as_ref())
        .await;

    match run {
        RestoreRun::ChecksumBlocked { expected, actual } => {
            Logger::error(
                "restore_blocked",
                &[
                    ("expected", expected.as_str()),
                    ("actual", actual.as_str()),
                    ("hint", "re-run with --override-checksum to proceed anyway"),
                ],
            );
            Ok(1)
        }
        RestoreRun::Declined => {
            Logger::info("restore_declined", &[]);
            Ok(0)
        }
        RestoreRun::Completed(summary) => {
            let totals = summary.totals();
            output::write_json(&json!({
                "tables": summary
                    .tables
                    .iter()
                    .map(|(table, counts)| (table.clone(), *counts))
                    .collect::<BTreeMap<_, _>>(),
                "inserted": totals.inserted,
                "skipped": totals.skipped,
                "errored": totals.errored,
            }))?;
            Ok(if summary.had_errors() { 1 } else { 0 })
        }
    }
}

async fn cleanup(
    store: Arc<dyn RecordStore>,
    config: &Config,
    dry_run: bool,
    force: bool,
) -> CliResult<i32> {
    let engine = CleanupEngine::new(store, config.primary_table.clone(), config.audit_config());

    let report = engine.analyze().await?;
    let flagged: BTreeMap<&str, usize> = report.class_counts().into_iter().collect();
    output::write_json(&json!({
        "scanned": report.scanned,
        "flagged": flagged,
        "clean": report.is_clean(),
    }))?;

    if dry_run {
        return Ok(0);
    }
    if report.is_clean() {
        return Ok(0);
    }

    let confirm: Box<dyn ConfirmationPort> = if force {
        Box::new(ScriptedConfirmation::new(true))
    } else {
        Box::new(TerminalConfirmation)
    };

    match engine
        .execute(&report, &CleanupOptions::default(), confirm.as_ref())
        .await
    {
        CleanupRun::Declined => {
            Logger::info("cleanup_declined", &[]);
            Ok(0)
        }
        CleanupRun::Completed(outcome) => {
            output::write_json(&serde_json::to_value(&outcome)?)?;
            Ok(if outcome.had_errors() { 1 } else { 0 })
        }
    }
}

async fn monitor(
    store: Arc<dyn RecordStore>,
    config: &Config,
    interval: Option<u64>,
    dashboard: bool,
) -> CliResult<i32> {
    let seconds = interval.unwrap_or(config.monitor_interval_secs).max(1);
    let mut monitor = ChangeMonitor::new(
        store,
        config.primary_table.clone(),
        config.event_history,
        AlertThresholds::default(),
    );

    // The loop itself knows nothing about signals; ctrl-c is wired
    // to the stop channel here.
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    Logger::info(
        "monitor_started",
        &[
            ("table", &config.primary_table),
            ("interval_secs", &seconds.to_string()),
        ],
    );

    let interval = Duration::from_secs(seconds);
    if dashboard {
        monitor.run(interval, &DashboardRender, stop_rx).await;
    } else {
        monitor.run(interval, &EventLogRender, stop_rx).await;
    }

    Logger::info(
        "monitor_stopped",
        &[("ticks", &monitor.state().ticks.to_string())],
    );

    Ok(0)
}
