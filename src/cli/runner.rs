//! CLI runner - executes commands

use crate::capture::{load_har, OperationMatcher, TemplateStore};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::cli::server::{serve, ServerConfig};
use crate::config::AppConfig;
use crate::engine::{PaginationEngine, RunConfig};
use crate::error::{Error, Result, ResultExt};
use crate::export::{export_records, import_file, validate_file, ExportKind, MemoryStore};
use crate::http::HttpClient;
use crate::relay::{Relay, RelayEvent, RelayHandle};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Options of a single `harvest` invocation
#[derive(Debug, Clone, Default)]
struct HarvestArgs {
    subject_id: Option<String>,
    handle: Option<String>,
    max_records: Option<usize>,
    min_views: i64,
    delay_ms: Option<u64>,
    include_replies: bool,
    output: Option<PathBuf>,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
    config: AppConfig,
}

impl Runner {
    /// Create a runner, loading configuration from file and environment
    ///
    /// The global `--template` flag takes precedence over both.
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = AppConfig::load(cli.config.as_deref())?;
        if let Some(path) = &cli.template {
            config.template_path.clone_from(path);
        }
        Ok(Self { cli, config })
    }

    /// Effective configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Capture { har } => self.capture(har).await,
            Commands::Template => self.show_template().await,
            Commands::Harvest {
                subject_id,
                handle,
                max_records,
                min_views,
                delay_ms,
                include_replies,
                output,
            } => {
                let args = HarvestArgs {
                    subject_id: subject_id.clone(),
                    handle: handle.clone(),
                    max_records: *max_records,
                    min_views: *min_views,
                    delay_ms: *delay_ms,
                    include_replies: *include_replies,
                    output: output.clone(),
                };
                self.harvest(args).await
            }
            Commands::Validate { file } => self.validate(file),
            Commands::Import { file } => self.import(file).await,
            Commands::Serve { port } => {
                let (store, relay) = self.spawn_relay().await?;
                let config = ServerConfig {
                    template_path: Some(self.config.template_path.clone()),
                };
                serve(relay, store, config, *port).await
            }
        }
    }

    fn template_store(&self) -> TemplateStore {
        TemplateStore::with_matcher(OperationMatcher::new(&self.config.operation_name))
    }

    /// Build the engine and relay, preloading any persisted template
    async fn spawn_relay(&self) -> Result<(TemplateStore, RelayHandle)> {
        let store = self.template_store();
        if self.config.template_path.exists() {
            store.load_from_file(&self.config.template_path).await?;
        } else {
            info!(
                "No template at {}; waiting for a capture",
                self.config.template_path.display()
            );
        }

        let client = HttpClient::with_config(self.config.http_client_config())?;
        let engine = PaginationEngine::new(client).with_options(self.config.engine_options());
        let relay = Relay::spawn(engine, store.clone());
        Ok((store, relay))
    }

    /// Scan a HAR file and persist the last matching request
    async fn capture(&self, har: &Path) -> Result<()> {
        let store = self.template_store();
        let template = load_har(&store, har).await?.ok_or_else(|| {
            Error::capture(format!(
                "No {} request found in {}",
                store.matcher().operation(),
                har.display()
            ))
        })?;

        store.save_to_file(&self.config.template_path).await?;
        info!("Template saved to {}", self.config.template_path.display());

        self.output_message(&json!({
            "type": "templateCaptured",
            "path": self.config.template_path.display().to_string(),
            "template": template.redacted(),
        }));
        Ok(())
    }

    async fn show_template(&self) -> Result<()> {
        let template = self
            .template_store()
            .load_from_file(&self.config.template_path)
            .await?;
        self.output_message(&serde_json::to_value(template.redacted())?);
        Ok(())
    }

    /// Run the engine to completion and export what it collected
    ///
    /// Ctrl-C asks the run to stop; records gathered so far are still exported.
    async fn harvest(&self, args: HarvestArgs) -> Result<()> {
        let (store, relay) = self.spawn_relay().await?;
        let template = store.require().await?;

        let subject_id = args
            .subject_id
            .clone()
            .or_else(|| template.subject_id.clone())
            .ok_or_else(|| {
                Error::config("No subject id given and none found in the captured template")
            })?;

        let mut run = RunConfig::new(subject_id.clone())
            .per_page_delay_ms(args.delay_ms.unwrap_or(self.config.engine.per_page_delay_ms))
            .min_views(args.min_views)
            .include_replies(args.include_replies);
        if let Some(max) = args.max_records {
            run = run.max_records(max);
        }

        let mut events = relay.subscribe();
        relay.start(run).await?;

        let mut interrupted = false;
        let terminal = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        self.output_message(&serde_json::to_value(&event)?);
                        if event.is_terminal() {
                            break event;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => warn!("Skipped {missed} relay events"),
                    Err(RecvError::Closed) => {
                        return Err(Error::Other("Relay closed before the run ended".into()));
                    }
                },
                _ = tokio::signal::ctrl_c(), if !interrupted => {
                    warn!("Interrupted; stopping after the current request");
                    interrupted = true;
                    relay.stop().await?;
                }
            }
        };

        let records = relay.snapshot().await;
        let handle = args
            .handle
            .clone()
            .or_else(|| records.iter().find_map(|r| r.author_handle.clone()))
            .unwrap_or(subject_id);
        let dir = args
            .output
            .as_deref()
            .unwrap_or(self.config.output_dir.as_path());
        let kind = ExportKind::for_replies(args.include_replies);

        if !records.is_empty() {
            let (path, written) = export_records(dir, &handle, &records, kind, Utc::now())
                .with_context(|| format!("Export to {} failed", dir.display()))?;
            info!("Exported {written} records to {}", path.display());
            self.output_message(&json!({
                "type": "exported",
                "path": path.display().to_string(),
                "written": written,
                "kind": kind.as_str(),
            }));
        }

        match terminal {
            RelayEvent::Error { message, .. } => Err(Error::Other(message)),
            _ => Ok(()),
        }
    }

    fn validate(&self, file: &Path) -> Result<()> {
        let report = validate_file(file)?;
        self.output_message(&json!({
            "valid": report.valid,
            "total": report.total,
            "message": report.to_string(),
        }));
        Ok(())
    }

    async fn import(&self, file: &Path) -> Result<()> {
        let store = MemoryStore::new();
        let stats = import_file(&store, file).await?;
        self.output_message(&serde_json::to_value(stats)?);
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("command", &self.cli.command)
            .field("config", &self.config)
            .finish()
    }
}

