//! eecalc - collaborative engineering calculator sheets in the terminal

mod config;
mod error;
mod tui;

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use eecalc_core::document::read_snapshot_file;
use eecalc_core::starters::{load_starter, starter_names};
use eecalc_core::{CellResult, Controller, Document, Snapshot};
use eecalc_relay::DEFAULT_ADDR;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SHEET: &str = "scratch";
const DEFAULT_SAVE_PATH: &str = "eecalc-sheet.json";

fn print_usage() {
    eprintln!("Usage: eecalc [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Sheet snapshot to open (.json); Ctrl-S saves to it");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --server <ADDR>       Relay address (default: {})", DEFAULT_ADDR);
    eprintln!("  --sheet <NAME>            Sheet to join (default: {})", DEFAULT_SHEET);
    eprintln!("  -f, --functions <FILE>    Load custom Rhai functions (can be repeated)");
    eprintln!("  --starter <NAME>          Start from a bundled sheet");
    eprintln!("  --list-starters           List bundled sheets and exit");
    eprintln!("  --nick <NAME>             Nickname shown in the header");
    eprintln!("  --log-file <FILE>         Write logs to FILE (RUST_LOG sets the level)");
    eprintln!("  --config <FILE>           Read settings from FILE instead of config.toml");
    eprintln!("  --offline                 Do not connect to a relay");
    eprintln!("  -p, --print               Evaluate the sheet, print it and exit");
    eprintln!("  -c, --command <EXPR>      Evaluate EXPR as a cell and print the result (can be repeated)");
    eprintln!("  --no-default-functions    Do not load default.rhai from the config dir");
    eprintln!("  -h, --help                Print help");
}

#[derive(Debug, Default)]
struct Options {
    file_path: Option<PathBuf>,
    functions_files: Vec<PathBuf>,
    starter: Option<String>,
    server: Option<String>,
    sheet: Option<String>,
    nick: Option<String>,
    log_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    commands: Vec<String>,
    offline: bool,
    print: bool,
    no_default_functions: bool,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--list-starters" => {
                for name in starter_names() {
                    println!("{}", name);
                }
                return;
            }
            "--offline" => opts.offline = true,
            "-p" | "--print" => opts.print = true,
            "--no-default-functions" => opts.no_default_functions = true,
            flag @ ("-s" | "--server" | "--sheet" | "-f" | "--functions" | "--starter"
            | "--nick" | "--log-file" | "--config" | "-c" | "--command") => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("Error: {} requires a value", flag);
                    std::process::exit(1);
                };
                match flag {
                    "-s" | "--server" => opts.server = Some(value.to_string()),
                    "--sheet" => opts.sheet = Some(value.to_string()),
                    "-f" | "--functions" => opts.functions_files.push(PathBuf::from(value)),
                    "--starter" => opts.starter = Some(value.to_string()),
                    "--nick" => opts.nick = Some(value.to_string()),
                    "--log-file" => opts.log_file = Some(PathBuf::from(value)),
                    "-c" | "--command" => opts.commands.push(value.to_string()),
                    _ => opts.config_file = Some(PathBuf::from(value)),
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if opts.file_path.is_none() {
                    opts.file_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    if let Err(e) = run(opts) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(opts: Options) -> Result<()> {
    let (config, warnings) = config::load_config(opts.config_file.as_deref());
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }

    if let Some(path) = opts.log_file.as_ref().or(config.log_file.as_ref()) {
        init_logging(path)?;
    }

    let mut functions_files: Vec<PathBuf> = Vec::new();
    if !opts.no_default_functions {
        functions_files.extend(config::default_functions_path());
    }
    functions_files.extend(config.functions.iter().cloned());
    functions_files.extend(opts.functions_files.iter().cloned());

    if !opts.commands.is_empty() {
        let mut doc = Document::with_functions(&functions_files);
        doc.cells.full_replace(&opts.commands);
        doc.recalculate_all();
        let mut failed = false;
        for result in doc.results() {
            match result {
                CellResult::Error(e) => {
                    failed = true;
                    println!("#ERR: {}", e);
                }
                result => println!("{}", result.render()),
            }
        }
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let initial = initial_snapshot(&opts)?;

    if opts.print {
        let mut doc = Document::with_functions(&functions_files);
        if let Some(snapshot) = &initial {
            doc.cells.full_replace(&snapshot.cells);
        }
        doc.recalculate_all();
        print_sheet(&doc);
        return Ok(());
    }

    let mut controller = Controller::new(Document::with_functions(&functions_files));
    if let Some(nick) = opts.nick.as_ref().or(config.nick.as_ref()) {
        controller.set_nickname(nick);
    }

    let sheet = opts
        .sheet
        .or(config.sheet)
        .unwrap_or_else(|| DEFAULT_SHEET.to_string());
    let server = opts
        .server
        .or(config.server)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let offline = opts.offline || config.offline;

    // Owns the connection tasks; must outlive the UI loop.
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let link = if offline {
        None
    } else {
        match runtime.block_on(eecalc_relay::connect(server.as_str(), &sheet)) {
            Ok(link) => Some(link),
            Err(e) => {
                tracing::warn!(%server, error = %e, "relay unreachable; starting offline");
                eprintln!("Warning: could not reach relay at {}: {}", server, e);
                None
            }
        }
    };
    let online = link.is_some();

    let save_path = opts
        .file_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_PATH));
    let mut app = tui::App::new(controller, link, sheet, online.then_some(server), save_path);
    if let Some(snapshot) = initial {
        app.load_snapshot(snapshot, Instant::now());
    }

    tui::run(&mut app).context("terminal error")?;
    runtime.shutdown_background();
    Ok(())
}

fn initial_snapshot(opts: &Options) -> Result<Option<Snapshot>> {
    if let Some(path) = opts.file_path.as_ref().filter(|p| p.exists()) {
        let snapshot = read_snapshot_file(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        return Ok(Some(snapshot));
    }
    match &opts.starter {
        Some(name) => Ok(Some(load_starter(name)?)),
        None => Ok(None),
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}

fn print_sheet(doc: &Document) {
    for cell in doc.cells.cells() {
        match &cell.result {
            CellResult::Empty => println!("[{}] {}", cell.index, cell.text),
            CellResult::Error(e) => println!("[{}] {} ! {}", cell.index, cell.text, e),
            result => println!("[{}] {} = {}", cell.index, cell.text, result.render()),
        }
    }
}
