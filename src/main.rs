use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::session::Session;

/// Exit code for lex, parse and resolve errors.
const EXIT_STATIC: i32 = 65;

/// Exit code for runtime errors.
const EXIT_RUNTIME: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to rox.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        /// Print one JSON object per token
        #[arg(long)]
        json: bool,

        filename: PathBuf,
    },

    /// Parses a file and prints the syntax tree of every declaration
    Parse { filename: PathBuf },

    /// Runs a file as a Lox program
    Run { filename: PathBuf },
}

/// Reads the whole of `filename` into memory.
fn read_file(filename: &Path) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn source_text(buf: &[u8]) -> Result<&str> {
    std::str::from_utf8(buf).context("Source is not valid UTF-8")
}

fn init_logger() -> Result<()> {
    let log_file = File::create("rox.log").context("Failed to create rox.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to rox.log");
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    let buf = read_file(filename)?;
    let source = source_text(&buf)?;
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
        exit(EXIT_STATIC);
    }

    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    let buf = read_file(filename)?;
    let source = source_text(&buf)?;
    let mut parsed = true;

    for stmt in Parser::new(Scanner::new(source)) {
        match stmt {
            Ok(stmt) => println!("{:#?}", stmt),
            Err(e) => {
                parsed = false;
                eprintln!("{}", e);
            }
        }
    }

    if !parsed {
        exit(EXIT_STATIC);
    }

    Ok(())
}

fn run(filename: &Path) -> Result<()> {
    let buf = read_file(filename)?;
    let source = source_text(&buf)?;
    let mut session = Session::with_stdout();

    match session.run_recovering(source) {
        Ok(errors) if errors.is_empty() => {
            info!("Program executed successfully");
            Ok(())
        }
        Ok(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            exit(EXIT_STATIC);
        }
        Err(e) => {
            debug!("Runtime debug: {}", e);
            eprintln!("{}", e);
            exit(EXIT_RUNTIME);
        }
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new()
            .filter_level(log::LevelFilter::Off)
            .parse_default_env()
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { json, filename } => tokenize(filename, *json),
        Commands::Parse { filename } => parse(filename),
        Commands::Run { filename } => run(filename),
    }
}
