use anyhow::Context;
use clap::{ArgAction, Parser};
use dotenv::dotenv;
use std::env;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use todo_board::shell::{Reply, RestAdapters, Shell};
use todo_board::{app_env, backend, logging};
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "todo-board",
    version,
    about = "Tasks, categories and a profile, kept in a hosted backend"
)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace). LOG_LEVEL takes precedence.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn default_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();
    let cli = Cli::parse();

    let otel_exporters = match env::var(app_env::OTEL_SPAN_EXPORT_URL) {
        Ok(span_url) => {
            let metric_url = env::var(app_env::OTEL_METRIC_EXPORT_URL).unwrap_or_else(|_| span_url.clone());
            Some(logging::init_exporters(&span_url, &metric_url)?)
        }
        Err(_) => None,
    };
    logging::setup_logging_and_tracing(
        logging::init_env_filter(default_level(cli.verbose))?,
        otel_exporters.as_ref(),
    );

    let endpoint = backend::endpoint_from_env().context("reading backend configuration")?;
    info!(backend = %endpoint.base_url, "starting shell");
    let ext_cxn = backend::ExternalConnectivity::new(endpoint)?;
    let mut shell = Shell::new(ext_cxn, RestAdapters);

    let run_result = run_repl(&mut shell).await;

    if let Some(exporters) = otel_exporters {
        exporters.shutdown();
    }
    run_result
}

async fn run_repl(
    shell: &mut Shell<backend::ExternalConnectivity, RestAdapters>,
) -> Result<(), anyhow::Error> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Sign in with: signin <email> <password>   (help lists every command)\n")
        .await?;
    loop {
        stdout.write_all(shell.prompt().as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("reading input")? else {
            break;
        };
        match shell.handle_line(&line).await {
            Reply::Output(text) => stdout.write_all(text.as_bytes()).await?,
            Reply::Quit(text) => {
                stdout.write_all(text.as_bytes()).await?;
                break;
            }
        }
    }

    stdout.flush().await?;
    Ok(())
}
