use chrono::Utc;
use clap::{Parser, Subcommand};
use codequery_core::{
    render_panel, AnswerService, Completion, EndpointConfig, HttpAnswerService, PendingQuery,
    Phase, QueryPanel, SubmitSkip, DEFAULT_BASE_URL,
};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "codequery", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Answering service base URL
    #[arg(long, env = "CODEQUERY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Optional API key sent as a bearer token
    #[arg(long, env = "CODEQUERY_API_KEY")]
    api_key: Option<String>,

    /// Transport timeout in seconds; unset means no timeout.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question and print the answer.
    Ask {
        /// Question text
        #[arg(long)]
        question: String,
    },
    /// Interactive session: each line is a question, `:help` lists commands.
    Repl,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let service = match cli.timeout_secs {
        Some(seconds) => HttpAnswerService::with_timeout(Duration::from_secs(seconds))?,
        None => HttpAnswerService::new(),
    };
    let endpoint = EndpointConfig::new(cli.base_url, cli.api_key);
    let panel = QueryPanel::new().with_endpoint(endpoint);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        base_url = %panel.endpoint_config().base_url,
        "codequery boot"
    );

    let mut stdout = io::stdout();
    match cli.command {
        Command::Ask { question } => ask_once(panel, &service, question, &mut stdout).await,
        Command::Repl => {
            let input = BufReader::new(tokio::io::stdin());
            repl(panel, Arc::new(service), input, &mut stdout).await
        }
    }
}

async fn ask_once<S, W>(
    mut panel: QueryPanel,
    service: &S,
    question: String,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: AnswerService + ?Sized,
    W: Write,
{
    panel.edit_draft(question);

    if panel.draft().trim().is_empty() {
        writeln!(out, "nothing to ask: question is empty")?;
        return Ok(());
    }

    let phase = panel.ask(service).await;
    write!(out, "{}", ensure_newline(render_panel(&panel)))?;

    if phase == Phase::Error {
        anyhow::bail!("query failed");
    }
    Ok(())
}

/// Runs the interactive loop until `:quit`, or until input ends and no
/// query is still in flight.
async fn repl<S, R, W>(
    mut panel: QueryPanel,
    service: Arc<S>,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: AnswerService + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<Completion>();
    let mut lines = input.lines();
    let mut input_open = true;

    writeln!(out, "Ask about the codebase. `:help` lists commands.")?;

    loop {
        if !input_open && panel.phase() != Phase::Loading {
            break;
        }

        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    debug!(phase = %panel.phase(), "input closed");
                    input_open = false;
                    continue;
                };
                match handle_line(&mut panel, line.trim_end(), out)? {
                    LineAction::Quit => break,
                    LineAction::Continue => {}
                    LineAction::Dispatch(pending) => {
                        writeln!(out, "{}", render_panel(&panel))?;
                        let service = Arc::clone(&service);
                        let completion_tx = completion_tx.clone();
                        tokio::spawn(async move {
                            let completion = pending.execute(service.as_ref()).await;
                            let _ = completion_tx.send(completion);
                        });
                    }
                }
            }
            Some(completion) = completion_rx.recv() => {
                if panel.apply(completion) {
                    write!(out, "{}", ensure_newline(render_panel(&panel)))?;
                } else {
                    debug!("late answer dropped");
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

enum LineAction {
    Continue,
    Quit,
    Dispatch(PendingQuery),
}

fn handle_line<W: Write>(panel: &mut QueryPanel, line: &str, out: &mut W) -> io::Result<LineAction> {
    let (command, argument) = match line.strip_prefix(':') {
        Some(rest) => {
            let (command, argument) = rest.split_once(' ').unwrap_or((rest, ""));
            (Some(command), argument.trim())
        }
        None => (None, ""),
    };

    let action = match command {
        None => {
            panel.edit_draft(line);
            match panel.submit() {
                Ok(pending) => LineAction::Dispatch(pending),
                Err(SubmitSkip::AlreadyLoading) => {
                    writeln!(out, "still waiting on the previous question; ignored")?;
                    LineAction::Continue
                }
                Err(SubmitSkip::EmptyQuestion) => LineAction::Continue,
            }
        }
        Some("quit") | Some("q") => LineAction::Quit,
        Some("clear") => {
            panel.clear();
            writeln!(out, "cleared")?;
            LineAction::Continue
        }
        Some("url") => {
            if argument.is_empty() {
                writeln!(out, "usage: :url <base-url>")?;
            } else {
                let api_key = panel.endpoint_config().api_key.clone();
                panel.edit_endpoint_config(EndpointConfig::new(argument, api_key));
                writeln!(out, "base url set to {argument}")?;
            }
            LineAction::Continue
        }
        Some("key") => {
            let base_url = panel.endpoint_config().base_url.clone();
            let api_key = (!argument.is_empty()).then(|| argument.to_string());
            let message = if api_key.is_some() { "api key set" } else { "api key removed" };
            panel.edit_endpoint_config(EndpointConfig::new(base_url, api_key));
            writeln!(out, "{message}")?;
            LineAction::Continue
        }
        Some("status") => {
            let config = panel.endpoint_config();
            writeln!(
                out,
                "phase={} base_url={} api_key={} scope={}",
                panel.phase(),
                config.base_url,
                if config.bearer_token().is_some() { "set" } else { "unset" },
                panel.scope()
            )?;
            LineAction::Continue
        }
        Some("help") => {
            writeln!(out, ":clear  :url <base-url>  :key [api-key]  :status  :quit")?;
            LineAction::Continue
        }
        Some(other) => {
            writeln!(out, "unknown command :{other}")?;
            LineAction::Continue
        }
    };

    Ok(action)
}

fn ensure_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
