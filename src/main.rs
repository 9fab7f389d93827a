use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use log::LevelFilter;

use marklisp::heap::{DEFAULT_CAPACITY, DEFAULT_GC_THRESHOLD};
use marklisp::reader::Reader;
use marklisp::{LispError, Machine, MachineConfig};

const BANNER: &str = "Basic Lisp interpreter with Mark and Sweep GC";

#[derive(ClapParser, Debug)]
#[command(author, version, about = BANNER, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print a line per garbage collection pass
    #[arg(short, long, global = true)]
    debug: bool,

    /// Number of object slots in the arena
    #[arg(long, global = true, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Live-object count that triggers the first collection
    #[arg(long, global = true, default_value_t = DEFAULT_GC_THRESHOLD)]
    threshold: usize,

    /// Evaluate the expression given to `define` before binding it
    #[arg(long, global = true)]
    eager_define: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the read-eval-print loop on stdin
    Repl,
    /// Interpret a source file
    Input {
        /// Path of the file to interpret
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let mut machine = match Machine::with_config(MachineConfig {
        capacity: cli.capacity,
        initial_threshold: cli.threshold,
        eager_define: cli.eager_define,
    }) {
        Ok(m) => m,
        Err(e) => fatal(&e),
    };

    match cli.command {
        Command::Repl => {
            if io::stdin().is_terminal() {
                println!("{}", BANNER);
                if cli.debug {
                    println!("GC logging active");
                }
                println!();
            }
            run_interactive(&mut machine);
        }
        Command::Input { path } => {
            let input = match std::fs::read_to_string(&path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error loading {}: {}", path.display(), e);
                    process::exit(1);
                }
            };
            eval_and_print(&input, &mut machine);
        }
    }
}

fn fatal(err: &LispError) -> ! {
    eprintln!("error: {}", err);
    process::exit(1);
}

/// Interactive REPL: accumulate lines until parens are balanced.
fn run_interactive(machine: &mut Machine) {
    let stdin = io::stdin();
    let mut buf = String::new();
    let mut depth: i32 = 0;

    loop {
        if depth == 0 {
            print!("> ");
        } else {
            print!("  ");
        }
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }

        // naive, but enough for well-formed input
        for ch in line.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }

        buf.push_str(&line);

        if depth <= 0 {
            depth = 0;
            let input = std::mem::take(&mut buf);
            if input.trim().is_empty() {
                continue;
            }
            eval_and_print(&input, machine);
        }
    }
}

/// Evaluate the expressions in a string one at a time, printing each result.
/// Fatal runtime errors end the process.
fn eval_and_print(input: &str, machine: &mut Machine) {
    let mut reader = Reader::new(input);
    loop {
        match reader.read(machine) {
            Ok(Some(expr)) => match machine.evaluate_top_level(expr) {
                Ok(val) => println!("{}", machine.render(val)),
                Err(e) => fatal(&e),
            },
            Ok(None) => break,
            Err(e) if e.is_fatal() => fatal(&e),
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }
        machine.take_diagnostics();
    }
}
