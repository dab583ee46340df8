use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rlox::ast_printer::AstPrinter;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::{self, Scanner};
use rlox::token::Token;

/// Exit code for lex/parse/resolve errors ("incorrect data").
const EXIT_COMPILE_ERROR: i32 = 65;

/// Exit code for runtime failures.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Emit tokens as JSON lines instead of the plain form
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs a file as a Lox program, or starts a REPL if no file is given
    Run { filename: Option<PathBuf> },
}

/// A script held ready for the scanner.  Non‑empty files are memory‑mapped
/// so lexemes are sliced straight out of the map; empty files cannot be
/// mapped and fall back to an empty buffer.
enum SourceFile {
    Mapped(Mmap),
    Empty,
}

impl SourceFile {
    fn bytes(&self) -> &[u8] {
        match self {
            SourceFile::Mapped(map) => &map[..],
            SourceFile::Empty => &[],
        }
    }
}

fn read_file(filename: &PathBuf) -> Result<SourceFile> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        return Ok(SourceFile::Empty);
    }

    let map = unsafe { Mmap::map(&file) }
        .context(format!("Failed to memory-map file {:?}", filename))?;

    // The scanner slices `&str`s straight out of the map, so the bytes
    // must be checked exactly once, here.
    if let Err(e) = scanner::validate_source(&map[..]) {
        eprintln!("{}", e);

        std::process::exit(EXIT_COMPILE_ERROR);
    }

    info!("Mapped {} bytes from {:?}", map.len(), filename);

    Ok(SourceFile::Mapped(map))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with timestamp, module, and line
    Builder::new()
        .format(|buf, record| {
            // Strip 'rlox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{} {}:{}] - {}",
                Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan the whole input, reporting lex errors to stderr.  Returns the
/// tokens (always ending in EOF) and whether any error surfaced.
fn scan(source: &[u8]) -> (Vec<Token>, bool) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut had_error = false;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                debug!("Lex diagnostic: {}", e);

                eprintln!("{}", e);
                had_error = true;
            }
        }
    }

    (tokens, had_error)
}

/// How one top‑level unit (a file, or one REPL line) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    CompileError,
    RuntimeError,
}

/// Full pipeline over one unit: scan → parse → resolve → interpret.
///
/// `next_id` threads the parser's node‑id counter across REPL lines so the
/// interpreter's binding table never sees a collision.
fn run_unit(source: &[u8], interpreter: &mut Interpreter, next_id: &mut usize) -> Outcome {
    let (tokens, lex_error) = scan(source);

    let mut parser = Parser::resuming(&tokens, *next_id);
    let (program, parse_errors) = parser.parse();
    *next_id = parser.next_node_id();

    for e in &parse_errors {
        eprintln!("{}", e);
    }

    let had_syntax_error: bool = lex_error || !parse_errors.is_empty();

    // Statements that parsed cleanly still run: recovery surfaces the
    // diagnostics, then execution proceeds over what survived and the
    // unit as a whole still reports the compile error.  Resolve errors
    // do stop evaluation; a half-resolved program has no meaning.
    if let Err(errors) = Resolver::new(interpreter).resolve(&program) {
        for e in &errors {
            eprintln!("{}", e);
        }

        return Outcome::CompileError;
    }

    match interpreter.interpret(&program) {
        Ok(()) if had_syntax_error => Outcome::CompileError,

        Ok(()) => Outcome::Success,

        Err(e) => {
            debug!("Runtime diagnostic: {}", e);

            eprintln!("{}", e);

            if had_syntax_error {
                Outcome::CompileError
            } else {
                Outcome::RuntimeError
            }
        }
    }
}

/// Interactive mode: one pipeline pass per line.  The interpreter (and its
/// binding table) persists; compile‑time diagnostic state resets each line.
fn run_prompt() -> Result<()> {
    info!("Starting REPL");

    let mut interpreter = Interpreter::new();
    let mut next_id: usize = 0;

    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF ends the session
        }

        // Errors were already reported; the session simply continues.
        let _ = run_unit(line.as_bytes(), &mut interpreter, &mut next_id);
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");

                let source = read_file(&filename)?;
                let mut tokenized = true;

                for result in Scanner::new(source.bytes()) {
                    match result {
                        Ok(token) => {
                            if json {
                                println!("{}", serde_json::to_string(&token)?);
                            } else {
                                println!("{}", token);
                            }
                        }

                        Err(e) => {
                            tokenized = false;

                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    debug!("Tokenization failed, exiting with code 65");

                    std::process::exit(EXIT_COMPILE_ERROR);
                }

                info!("Tokenization completed successfully");
            }
            None => {
                println!("No input filepath was provided. Exiting...");

                std::process::exit(0);
            }
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");

                let source = read_file(&filename)?;
                let (tokens, lex_error) = scan(source.bytes());

                if lex_error {
                    std::process::exit(EXIT_COMPILE_ERROR);
                }

                let mut parser = Parser::new(&tokens);

                match parser.parse_expression() {
                    Ok(expr) => {
                        println!("{}", AstPrinter::print(&expr));
                    }

                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(EXIT_COMPILE_ERROR);
                    }
                }
            }
            None => {
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Evaluate { filename } => match filename {
            Some(filename) => {
                info!("Running Evaluate subcommand");

                let source = read_file(&filename)?;
                let (tokens, lex_error) = scan(source.bytes());

                if lex_error {
                    std::process::exit(EXIT_COMPILE_ERROR);
                }

                let mut parser = Parser::new(&tokens);
                let mut interpreter = Interpreter::new();

                match parser.parse_expression() {
                    Ok(expr) => match interpreter.evaluate(&expr) {
                        Ok(value) => {
                            println!("{}", value);
                        }

                        Err(e) => {
                            eprintln!("{}", e);
                            std::process::exit(EXIT_RUNTIME_ERROR);
                        }
                    },

                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(EXIT_COMPILE_ERROR);
                    }
                }
            }

            None => {
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");

                let source = read_file(&filename)?;
                let mut interpreter = Interpreter::new();
                let mut next_id: usize = 0;

                match run_unit(source.bytes(), &mut interpreter, &mut next_id) {
                    Outcome::Success => {
                        info!("Program executed successfully");
                    }

                    Outcome::CompileError => std::process::exit(EXIT_COMPILE_ERROR),

                    Outcome::RuntimeError => std::process::exit(EXIT_RUNTIME_ERROR),
                }
            }

            None => {
                run_prompt()?;
            }
        },
    }

    Ok(())
}
