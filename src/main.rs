use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use shaledb::repl::Repl;
use shaledb::session::Session;

/// Single-node, file-backed relational database engine.
#[derive(Parser, Debug)]
#[command(
    name = "shaledb",
    version,
    about = "A single-node, file-backed relational database engine",
    long_about = "Reads SQL-like statements from an interactive shell and stores \
                  tables as paged heap files with optional per-column ordered indexes."
)]
struct Args {
    /// Advisory user name recorded in the operation log
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Advisory password (parsed but not enforced)
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Directory holding database, table, and log files
    #[arg(long, default_value = ".", value_name = "DIR")]
    data_dir: PathBuf,

    /// Execute the given statements and exit
    #[arg(short = 'c', long, value_name = "SQL")]
    command: Option<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.password.is_some() {
        // Authentication is advisory in this engine
        debug!("credentials accepted for '{}'", args.user.as_deref().unwrap_or("admin"));
    }

    let session = match Session::new(&args.data_dir, args.user.as_deref()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("[Error] {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut repl = match Repl::new(session) {
        Ok(repl) => repl,
        Err(e) => {
            eprintln!("[Error] {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(command) = &args.command {
        repl.run_input(command);
        repl.close();
        return ExitCode::SUCCESS;
    }

    match repl.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[Error] {}", e);
            ExitCode::FAILURE
        }
    }
}
