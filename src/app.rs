use std::io::Write;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::client::{self, ClientOptions};
use crate::config::{self, ConfigFile};
use crate::output::{self, OutputFormat};
use crate::runner::{FetchResult, Mode, Options, Runner};
use crate::utils;

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    format: OutputFormat,
    output: Option<String>,
    no_color: bool,
}

fn format_kv_line(label: &str, value: &str) {
    eprintln!(":: {:<10}: {}", label, value);
}

fn mode_label(mode: Mode) -> String {
    match mode {
        Mode::List => "list".to_string(),
        Mode::Table => "table".to_string(),
        Mode::User(id) => format!("user {id}"),
    }
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn init_logging(verbose: u8, no_color: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .try_init();
}

fn resolve_format(
    args: &CliArgs,
    cfg: &ConfigFile,
    mode: Mode,
    output: Option<&str>,
) -> Result<OutputFormat, String> {
    if let Some(raw) = args.format.as_deref() {
        return OutputFormat::parse(raw).ok_or_else(|| format!("invalid --format '{raw}'"));
    }
    if mode == Mode::Table {
        return Ok(OutputFormat::Table);
    }
    if let Some(inferred) = output.and_then(output::infer_format_from_path) {
        return Ok(inferred);
    }
    match cfg.format.as_deref() {
        Some(raw) => OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid format '{raw}' in config file")),
        None => Ok(OutputFormat::Cards),
    }
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let base_url_raw = args
        .base_url
        .clone()
        .or(cfg.base_url.clone())
        .unwrap_or_else(|| client::DEFAULT_BASE_URL.to_string());
    let base_url = utils::parse_base_url(&base_url_raw)
        .map_err(|e| format!("invalid base URL '{base_url_raw}': {e}"))?;

    let api_key = args
        .api_key
        .clone()
        .or(cfg.api_key.clone())
        .or_else(|| Some(client::DEFAULT_API_KEY.to_string()));
    let api_key_header = args
        .key_header
        .clone()
        .or(cfg.api_key_header.clone())
        .unwrap_or_else(|| client::DEFAULT_API_KEY_HEADER.to_string());

    let header = args.header.clone().or(cfg.header.clone());
    if let Some(raw) = header.as_deref() {
        if utils::split_header(raw).is_none() {
            return Err(format!("invalid header '{raw}', expected \"Key: Value\""));
        }
    }

    let timeout_seconds = args
        .timeout
        .or(cfg.timeout)
        .unwrap_or(client::DEFAULT_TIMEOUT_SECONDS);
    if timeout_seconds == 0 {
        return Err("invalid timeout, expected positive integer".to_string());
    }

    let proxy = args
        .proxy
        .clone()
        .or(cfg.proxy.clone())
        .filter(|p| !p.trim().is_empty());
    let rate = args.rate.or(cfg.rate).unwrap_or(0);
    let user_agent = cfg
        .user_agent
        .clone()
        .filter(|ua| !ua.trim().is_empty())
        .unwrap_or_else(|| client::DEFAULT_USER_AGENT.to_string());

    let mode = match args.user.as_deref() {
        Some(raw) => Mode::User(
            utils::parse_user_id(raw).map_err(|e| format!("invalid --user '{raw}': {e}"))?,
        ),
        None if args.table => Mode::Table,
        None => Mode::List,
    };

    let output = args
        .output
        .clone()
        .or(cfg.output.clone())
        .filter(|p| !p.trim().is_empty())
        .map(|p| config::expand_tilde_string(&p));
    let format = resolve_format(&args, &cfg, mode, output.as_deref())?;

    Ok(RunConfig {
        options: Options {
            client: ClientOptions {
                base_url,
                api_key,
                api_key_header,
                timeout_seconds,
                proxy,
                user_agent,
                rate,
                header,
            },
            mode,
        },
        format,
        output,
        no_color,
    })
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("fetching users");
    pb
}

fn render(result: &FetchResult, format: OutputFormat) -> Vec<u8> {
    match result.mode {
        Mode::User(_) => output::render_user(result.user(), format),
        Mode::List | Mode::Table => output::render_users(&result.users, format),
    }
}

async fn write_output(path: Option<&str>, rendered: &[u8]) -> Result<(), String> {
    match path {
        Some(path) => {
            let mut outfile = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .await
                .map_err(|e| format!("failed to open output file: {e}"))?;
            outfile
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write output file: {e}"))?;
            Ok(())
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(rendered)
                .and_then(|_| lock.flush())
                .map_err(|e| format!("failed to write to stdout: {e}"))
        }
    }
}

fn print_summary(result: &FetchResult) {
    let elapsed = utils::format_duration(result.elapsed);
    match result.mode {
        Mode::User(id) => match result.user() {
            Some(user) => {
                info!("Hello {}!", user.display_name());
                eprintln!(
                    "{} user {} in {}",
                    ":: Fetched".bold().green(),
                    id,
                    elapsed
                );
            }
            None => eprintln!(
                "{} {}",
                ":: Warning".bold().yellow(),
                output::NO_USER_MESSAGE
            ),
        },
        Mode::List | Mode::Table => {
            if result.is_empty() {
                eprintln!(
                    "{} {}",
                    ":: Warning".bold().yellow(),
                    output::NO_USERS_MESSAGE
                );
            } else {
                eprintln!(
                    "{} {} users in {}",
                    ":: Fetched".bold().green(),
                    result.users.len(),
                    elapsed
                );
            }
        }
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let runner = Runner::new(run.options.clone()).map_err(|e| e.to_string())?;

    format_kv_line("API", runner.client().base_url());
    format_kv_line("Mode", &mode_label(run.options.mode));
    format_kv_line("Format", run.format.label());
    if let Some(path) = run.output.as_deref() {
        format_kv_line("Output", path);
    }

    let result = if run.options.mode.drains() {
        let pb = new_spinner();
        let result = runner.run_with_observer(&pb).await;
        pb.finish_and_clear();
        result
    } else {
        runner.run().await
    };

    let rendered = render(&result, run.format);
    write_output(run.output.as_deref(), &rendered).await?;
    print_summary(&result);
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    if args.init_config {
        let path = match args.config.as_deref() {
            Some(p) => config::expand_tilde(p),
            None => config::default_config_path()
                .ok_or_else(|| "could not determine home directory".to_string())?,
        };
        if config::ensure_default_config_file(&path)? {
            println!("wrote default config to {}", path.display());
        } else {
            println!("config already exists at {}", path.display());
        }
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(p) => config::load_config(&config::expand_tilde(p), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    init_logging(
        args.verbose,
        args.no_color || cfg.no_color.unwrap_or(false),
    );

    let run = build_run_config(args, cfg)?;
    if run.options.client.rate == 0 {
        info!("rate limiting disabled");
    }
    if run.options.client.proxy.is_some() {
        warn!("routing requests through proxy");
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
