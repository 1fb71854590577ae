#[path = "mailrelay-cli/args.rs"]
mod args;
#[path = "mailrelay-cli/output.rs"]
mod output;

use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands, Format, RelayCommand, read_input};
use mailrelay_lib::{
    AbortHandle, Pipeline, Relay, RelayConfig, RelayError, SendRequest, SystemClock, parse_upload,
};

const WATCH_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mailrelay_lib=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = RelayConfig::load(cli.config.as_deref()).context("load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let format = cli.format;

    // codes de sortie : 0 OK, 2 adresse refusée, 1 fatal
    let rejected = match cli.cmd {
        Commands::Validate { stdin, emails } => {
            let pipeline =
                Pipeline::from_options(&config.dns, &config.scoring, Arc::new(SystemClock))?;
            validate(&pipeline, format, stdin, emails).await?
        }
        Commands::Relay(cmd) => {
            let relay = Relay::open(&config).await.context("open relay")?;
            run(&relay, &config, format, cmd).await?
        }
    };
    if rejected {
        std::process::exit(2);
    }
    Ok(())
}

async fn validate(
    pipeline: &Pipeline,
    format: Format,
    stdin: bool,
    mut emails: Vec<String>,
) -> Result<bool> {
    if stdin {
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            if !line.trim().is_empty() {
                emails.push(line);
            }
        }
    }
    if emails.is_empty() {
        bail!("no address given (pass addresses or --stdin)");
    }
    let mut rows = Vec::with_capacity(emails.len());
    for email in emails {
        let verdict = pipeline.validate(&email).await;
        rows.push((email.trim().to_string(), verdict));
    }
    output::verdicts(format, &rows)?;
    Ok(rows.iter().any(|(_, v)| !v.ok))
}

async fn run(
    relay: &Relay,
    config: &RelayConfig,
    format: Format,
    cmd: RelayCommand,
) -> Result<bool> {
    match cmd {
        RelayCommand::Send {
            to,
            subject,
            text,
            html,
            token,
        } => {
            let request = SendRequest {
                to,
                subject,
                text,
                html,
                token,
            };
            match relay.send(request).await {
                Ok(receipt) => output::send_receipt(format, &receipt)?,
                Err(err) if err.is_rejection() => {
                    eprintln!("[REFUSED] {err}");
                    return Ok(true);
                }
                Err(RelayError::MissingFields) => bail!("--to and --text or --html are required"),
                Err(err) => return Err(err).context("send"),
            }
        }
        RelayCommand::Batch {
            file,
            token,
            delay_ms,
        } => {
            let bytes = std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let upload = parse_upload(&bytes)?;
            for error in upload.errors.iter().take(3) {
                eprintln!("warning: CSV row skipped: {error}");
            }
            if upload.items.is_empty() {
                bail!("no email+analysis rows in {}", file.display());
            }

            let abort = AbortHandle::default();
            let on_signal = abort.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("stopping after the current message...");
                    on_signal.abort();
                }
            });

            let delay = delay_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.batch.send_delay());
            let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
            let report = relay
                .run_batch(upload.items, token.as_deref(), delay, &abort)
                .await;
            output::batch_report(format, &report)?;
        }
        RelayCommand::Events { input } => {
            let raw: Value = serde_json::from_str(&read_input(&input)?).context("parse events JSON")?;
            let events = match raw {
                Value::Array(events) => events,
                other => vec![other],
            };
            let summary = relay.apply_events(&events).await?;
            output::event_summary(format, &summary)?;
        }
        RelayCommand::Inbound { input } => {
            let payload: Value =
                serde_json::from_str(&read_input(&input)?).context("parse inbound JSON")?;
            let outcome = relay.apply_inbound(&payload).await?;
            output::inbound(format, outcome.as_ref())?;
        }
        RelayCommand::Followup { watch } => loop {
            let report = relay.run_followups().await?;
            output::followup(format, &report)?;
            if !watch {
                break;
            }
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(WATCH_INTERVAL) => {}
            }
        },
        RelayCommand::Series { days, token } => {
            let series = relay.series(days, token.as_deref());
            output::series(format, &series)?;
        }
    }
    Ok(false)
}
