//! `scoutq` - CLI for scoutqueue
//!
//! This binary submits scouting records, retries the offline queue, and
//! inspects the local store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;

use scoutqueue::cli::{
    selected_kinds, Cli, Command, ConfigCommand, QueueCommand, StatusCommand, SubmitCommand,
    TeamsCommand,
};
use scoutqueue::delivery::OfflineChannel;
use scoutqueue::roster::{self, RosterSource};
use scoutqueue::{
    init_logging, Config, DeliveryChannel, DuplicateDetector, Error, HttpChannel, QueueManager,
    Record, RecordKind, RetryOutcome, RosterClient, SqliteStore, SubmissionQueue,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Validation loads its own file, so a broken default config can still be checked.
    if let Command::Config(ConfigCommand::Validate { file }) = cli.command {
        return handle_validate(file.or(cli.config));
    }

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Submit(cmd) => handle_submit(&config, &cmd).await,
        Command::Retry(cmd) => handle_retry(&config, selected_kinds(cmd.kind)).await,
        Command::Queue(cmd) => handle_queue(&config, cmd).await,
        Command::Teams(cmd) => handle_teams(&config, &cmd).await,
        Command::Status(StatusCommand { json }) => handle_status(&config, json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let path = config.database_path();
    SqliteStore::open(&path).with_context(|| format!("opening store at {}", path.display()))
}

async fn handle_submit(config: &Config, cmd: &SubmitCommand) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&cmd.file)
        .with_context(|| format!("reading {}", cmd.file.display()))?;
    let record = Record::from_json(&text)
        .with_context(|| format!("{} is not a JSON record", cmd.file.display()))?;

    if !config.verify_code(record.get_str("submitCode").unwrap_or("")) {
        return Err(Error::AccessDenied.into());
    }

    let store = open_store(config)?;
    let kind = record.kind();
    let queue = SubmissionQueue::load(&store, config.queue_key(kind));
    let summary = record.summary();

    let outcome = if cmd.offline {
        manager(OfflineChannel, queue, kind, config)
            .submit(record)
            .await
    } else {
        manager(HttpChannel::from_config(&config.delivery), queue, kind, config)
            .submit(record)
            .await
    };

    println!("{summary}: {outcome}");
    Ok(())
}

fn manager<'a, C: DeliveryChannel>(
    channel: C,
    queue: SubmissionQueue<&'a SqliteStore>,
    kind: RecordKind,
    config: &Config,
) -> QueueManager<C, &'a SqliteStore> {
    QueueManager::new(channel, queue, kind).with_demo(config.access.demo)
}

async fn handle_retry(config: &Config, kinds: Vec<RecordKind>) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let channel = HttpChannel::from_config(&config.delivery);

    for kind in kinds {
        let queue = SubmissionQueue::load(&store, config.queue_key(kind));
        if queue.is_empty() {
            println!("{kind}: queue is empty");
            continue;
        }
        match manager(&channel, queue, kind, config).retry_all().await {
            RetryOutcome::Completed(report) => println!(
                "{kind}: resent {}, {} still queued",
                report.sent, report.remaining
            ),
            RetryOutcome::Busy => println!("{kind}: a submission is already in progress"),
            RetryOutcome::Disabled => println!("{kind}: demo mode, submission disabled"),
        }
    }
    Ok(())
}

async fn handle_queue(config: &Config, cmd: QueueCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;

    match cmd {
        QueueCommand::List { kind, json } => {
            let mut listing = Vec::new();
            for kind in selected_kinds(kind) {
                let queue = SubmissionQueue::load(&store, config.queue_key(kind));
                let detector = DuplicateDetector::for_kind(kind);
                for (index, record) in queue.records().iter().enumerate() {
                    listing.push((kind, index, detector.fingerprint(record), record.clone()));
                }
            }

            if json {
                let items: Vec<_> = listing
                    .iter()
                    .map(|(kind, index, fingerprint, record)| {
                        serde_json::json!({
                            "kind": kind,
                            "index": index,
                            "fingerprint": fingerprint,
                            "record": record,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if listing.is_empty() {
                println!("Queue is empty");
            } else {
                for (kind, index, fingerprint, record) in &listing {
                    println!(
                        "{kind:<5} {index:>3}  {}  {}  {}",
                        &fingerprint[..12],
                        record.get_str("timestampISO").unwrap_or("-"),
                        record.summary()
                    );
                }
            }
        }
        QueueCommand::Discard { kind, index } => {
            let kind = RecordKind::from(kind);
            let queue = SubmissionQueue::load(&store, config.queue_key(kind));
            match manager(OfflineChannel, queue, kind, config).discard(index).await {
                Some(record) => println!("Discarded {}", record.summary()),
                None => bail!("no queued {kind} record at index {index}"),
            }
        }
        QueueCommand::Clear { kind, yes } => {
            let kinds = selected_kinds(kind);
            if !yes {
                let total: usize = kinds
                    .iter()
                    .map(|k| SubmissionQueue::load(&store, config.queue_key(*k)).len())
                    .sum();
                println!("This will drop {total} queued record(s).");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            for kind in kinds {
                let queue = SubmissionQueue::load(&store, config.queue_key(kind));
                let dropped = manager(OfflineChannel, queue, kind, config).clear().await;
                println!("{kind}: dropped {dropped}");
            }
        }
    }
    Ok(())
}

async fn handle_teams(config: &Config, cmd: &TeamsCommand) -> anyhow::Result<()> {
    let event_key = config.event.event_key.trim();
    if event_key.is_empty() {
        bail!("no event configured (set event.event_key)");
    }

    let store = open_store(config)?;
    let cached = if cmd.refresh {
        None
    } else {
        roster::cached_teams(&store, event_key)
    };

    let (teams, source) = match cached {
        Some(teams) => (teams, RosterSource::Cached),
        None => {
            let client = RosterClient::from_config(&config.roster);
            let loaded = roster::load_teams(client.as_ref(), &store, event_key).await;
            (loaded.teams, loaded.source)
        }
    };

    match source {
        RosterSource::Disabled => {
            println!("Team lookup is disabled; enter team numbers by hand.");
            return Ok(());
        }
        RosterSource::Unavailable => {
            println!("Couldn't load teams; you can still enter team numbers by hand.");
            return Ok(());
        }
        RosterSource::Cached => println!("{} teams (cached)", teams.len()),
        RosterSource::Fresh => println!("{} teams", teams.len()),
    }

    let shown: Vec<_> = match cmd.query.as_deref() {
        Some(query) => roster::search(&teams, query),
        None => teams.iter().collect(),
    };
    for team in shown {
        println!("{:>6}  {}", team.number, team.name);
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.stats()?;
    let match_count = SubmissionQueue::load(&store, config.queue_key(RecordKind::Match)).len();
    let pit_count = SubmissionQueue::load(&store, config.queue_key(RecordKind::Pit)).len();

    if json {
        let status = serde_json::json!({
            "deployment": config.queue.deployment,
            "event_key": config.event.event_key,
            "endpoint_configured": !config.delivery.endpoint_url.trim().is_empty(),
            "demo": config.access.demo,
            "queued": { "match": match_count, "pit": pit_count },
            "database_path": store.path(),
            "database_size_bytes": stats.db_size_bytes,
            "last_write": stats.last_write,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("scoutq status");
        println!("-------------");
        println!("Deployment:    {}", config.queue.deployment);
        println!("Event:         {}", display_or_unset(&config.event.event_key));
        println!("Endpoint:      {}", display_or_unset(&config.delivery.endpoint_url));
        if config.access.demo {
            println!("Mode:          demo (submissions disabled)");
        }
        println!("Queued match:  {match_count}");
        println!("Queued pit:    {pit_count}");
        println!("Database:      {}", store.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        if let Some(last) = stats.last_write {
            println!("Last write:    {}", last.to_rfc3339());
        }
    }
    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "(not set)"
    } else {
        value
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Delivery]");
                println!("  Endpoint URL:       {}", display_or_unset(&config.delivery.endpoint_url));
                println!("  Form field:         {}", config.delivery.form_field);
                println!();
                println!("[Roster]");
                println!("  Enabled:            {}", config.roster.enabled);
                println!("  Base URL:           {}", config.roster.base_url);
                println!(
                    "  API key:            {}",
                    if config.roster.api_key.is_some() { "(set)" } else { "(not set)" }
                );
                println!();
                println!("[Event]");
                println!("  Event key:          {}", display_or_unset(&config.event.event_key));
                println!();
                println!("[Queue]");
                println!("  Deployment:         {}", config.queue.deployment);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Access]");
                println!(
                    "  Secret code:        {}",
                    if config.access.secret_code.is_some() { "(set)" } else { "(not set)" }
                );
                println!("  Demo:               {}", config.access.demo);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => return handle_validate(file),
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
    Ok(())
}
