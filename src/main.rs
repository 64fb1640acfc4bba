use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use hostwatch::application::config::AppConfig;
use hostwatch::application::services::check_plan::configured_checks;
use hostwatch::application::services::dispatcher::{NotificationDispatcher, SubscriptionCommands};
use hostwatch::application::services::orchestrator::{
    RunOrchestrator, RunOutcome, RunSettings, EXIT_NOT_RUN,
};
use hostwatch::domain::checks::{CheckContext, CheckRunner};
use hostwatch::domain::ports::store::SubscriberStore;
use hostwatch::domain::value_objects::RunMode;
use hostwatch::infrastructure::notifications::email::{EmailChannel, SmtpSettings};
use hostwatch::infrastructure::notifications::telegram::TelegramChannel;
use hostwatch::infrastructure::os::command_runner::TokioCommandRunner;
use hostwatch::infrastructure::os::network::HttpNetworkClient;
use hostwatch::infrastructure::os::run_lock::RunLock;
use hostwatch::infrastructure::os::sysinfo_collector::SysinfoCollector;
use hostwatch::infrastructure::persistence::sqlite_store::SqliteStore;
use hostwatch::infrastructure::persistence::subscriber_store::JsonSubscriberStore;
use hostwatch::presentation::cli::app::Cli;
use hostwatch::presentation::cli::formatters::report_fmt::{
    format_delivery, format_poll, TerminalReporter,
};

fn setup_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The Telegram channel, when this mode can use one.
///
/// Polling cannot run without it, nor can a test run with no mail channel; a
/// notify run degrades with a warning.
fn build_telegram(config: &AppConfig, mode: RunMode) -> anyhow::Result<Option<TelegramChannel>> {
    if mode == RunMode::Collect {
        return Ok(None);
    }
    let required = mode == RunMode::PollOnly
        || (mode == RunMode::TestNotify && !config.notification.email.enabled);
    let tg = &config.notification.telegram;
    if !tg.enabled {
        if required {
            anyhow::bail!("{mode} needs [notification.telegram] enabled = true");
        }
        tracing::debug!("telegram notifications are disabled");
        return Ok(None);
    }
    let built = tg
        .resolve_token()
        .with_context(|| format!("no bot token: set {} or telegram.token", tg.bot_token_env))
        .and_then(|token| {
            TelegramChannel::new(
                &tg.api_base,
                &token,
                Duration::from_secs(tg.request_timeout_secs.max(1)),
            )
            .context("failed to create telegram channel")
        });
    match built {
        Ok(channel) => Ok(Some(channel)),
        Err(e) if required => Err(e),
        Err(e) => {
            tracing::warn!("{e:#}, telegram alerts will not be sent");
            Ok(None)
        }
    }
}

/// The mail channel for notify and test runs, when enabled.
fn build_email(config: &AppConfig, mode: RunMode) -> anyhow::Result<Option<EmailChannel>> {
    let mail = &config.notification.email;
    if !mail.enabled || !matches!(mode, RunMode::Notify | RunMode::TestNotify) {
        return Ok(None);
    }
    let settings = SmtpSettings {
        host: mail.smtp_host.clone(),
        port: mail.smtp_port,
        credentials: mail.resolve_credentials(),
        timeout: Duration::from_secs(mail.timeout_secs.max(1)),
    };
    match EmailChannel::new(&settings, &mail.sender, &mail.subject_prefix) {
        Ok(channel) => Ok(Some(channel)),
        Err(e) if mode == RunMode::TestNotify => {
            Err(e).context("failed to create email channel")
        }
        Err(e) => {
            tracing::warn!("{e}, email alerts will not be sent");
            Ok(None)
        }
    }
}

fn print_outcome(outcome: &RunOutcome, quiet: bool) {
    if quiet {
        return;
    }
    match outcome {
        RunOutcome::Checked {
            delivery: Some(summary),
            ..
        }
        | RunOutcome::TestNotified(summary) => eprintln!("{}", format_delivery(summary)),
        RunOutcome::Polled(summary) => eprintln!("{}", format_poll(summary)),
        RunOutcome::Checked { delivery: None, .. } => {}
    }
}

async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let mode = cli.mode();

    let lock = RunLock::acquire(&config.lock_path())
        .context("could not take the run lock, is another run in progress?")?;
    tracing::debug!(lock = %lock.path().display(), "holding run lock");

    // Manual DI: main.rs is the only place that knows concrete types
    let telegram = build_telegram(&config, mode)?;
    let email = build_email(&config, mode)?;
    let subscribers = (config.uses_subscribers() || mode == RunMode::PollOnly)
        .then(|| JsonSubscriberStore::new(config.subscriber_store_path()));
    let tg = &config.notification.telegram;
    let mail_recipients = config.notification.email.all_recipients();
    let commands = SubscriptionCommands {
        subscribe: tg.subscribe_command.clone(),
        unsubscribe: tg.unsubscribe_command.clone(),
        welcome: tg.welcome_message.clone(),
    };
    let dispatcher = match (&telegram, &email) {
        (Some(bot), mail) => {
            let dispatcher = NotificationDispatcher::new(
                bot,
                &tg.chat_ids,
                subscribers.as_ref().map(|s| s as &dyn SubscriberStore),
                commands,
            );
            Some(match mail {
                Some(mail) => dispatcher.with_channel(mail, &mail_recipients),
                None => dispatcher,
            })
        }
        (None, Some(mail)) => Some(NotificationDispatcher::new(
            mail,
            &mail_recipients,
            None,
            commands,
        )),
        (None, None) => {
            if mode == RunMode::Notify {
                tracing::warn!("no notification channel available, alerts will only be printed");
            }
            None
        }
    };

    let runner = CheckRunner::new(configured_checks(&config));
    let reporter = TerminalReporter::new(cli.json, cli.quiet);
    let orchestrator = RunOrchestrator::new(
        &runner,
        dispatcher.as_ref(),
        &reporter,
        RunSettings {
            host: config.host_label(),
            retention_days: config.retention_days,
            poll_before_notify: tg.poll_updates && telegram.is_some(),
        },
    );

    let outcome = if mode.collects() {
        let state_path = config.state_path();
        let store = SqliteStore::open(&state_path)
            .with_context(|| format!("failed to open state store {}", state_path.display()))?;
        let collector = SysinfoCollector::new();
        let commands = TokioCommandRunner;
        let network = HttpNetworkClient::new().context("failed to create HTTP client")?;
        let ctx = CheckContext {
            metrics: &store,
            state: &store,
            collector: &collector,
            commands: &commands,
            network: &network,
            now: Utc::now(),
        };
        orchestrator.run(mode, Some(&ctx), ctx.now).await?
    } else {
        orchestrator.run(mode, None, Utc::now()).await?
    };

    print_outcome(&outcome, cli.quiet || cli.json);
    Ok(outcome.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("{} {e:#}", "hostwatch:".red().bold());
            ExitCode::from(EXIT_NOT_RUN)
        }
    }
}
