use clap::Parser;
use fieldvisit_processor::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    // Create async runtime and run the main command logic with signal handling
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        // Create cancellation token for coordinating graceful shutdown
        let cancellation_token = CancellationToken::new();

        // Run the command as its own task so the future stays alive
        // across a CTRL+C: cancelling the token tells it to stop, and
        // awaiting the handle lets in-flight files finish their state
        // transitions instead of being dropped mid-upload.
        let mut command_task = tokio::spawn(commands::run(args, cancellation_token.clone()));

        tokio::select! {
            joined = &mut command_task => flatten_join(joined),
            signal = tokio::signal::ctrl_c() => {
                signal.expect("Failed to install CTRL+C signal handler");
                eprintln!("\nReceived CTRL+C, shutting down gracefully...");
                cancellation_token.cancel();
                flatten_join(command_task.await)
            }
        }
    });

    match result {
        Ok(_stats) => {
            // Success - the summary has already been reported by the command
            process::exit(0);
        }
        Err(error) => {
            // Error occurred - print to stderr and exit with error code
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

type CommandResult =
    fieldvisit_processor::Result<Option<fieldvisit_processor::ProcessingStats>>;

/// Surface a panicked or aborted command task as an ordinary error
fn flatten_join(joined: Result<CommandResult, tokio::task::JoinError>) -> CommandResult {
    joined.unwrap_or_else(|e| {
        Err(fieldvisit_processor::Error::processing_interrupted(format!(
            "command task failed: {e}"
        )))
    })
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Field Visit Processor - Hot-Folder Ingestion for Hydrological Field Data");
    println!("========================================================================");
    println!();
    println!("Watch a folder for field-collected observation files, parse them into");
    println!("consolidated visits, and publish the visits to a remote time-series store.");
    println!();
    println!("USAGE:");
    println!("    fieldvisit-processor <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    process     Watch a hot folder and process incoming files (main command)");
    println!("    check       Validate configuration and remote connectivity, then exit");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Watch a folder and upload to a remote store:");
    println!("    fieldvisit-processor process --hot-folder /data/incoming \\");
    println!("                                 --server https://hydro.example.org");
    println!();
    println!("    # Parse and merge without uploading anything:");
    println!("    fieldvisit-processor process --hot-folder /data/incoming --dry-run");
    println!();
    println!("    # Restrict eligible files and merge strictly by interval:");
    println!("    fieldvisit-processor process --hot-folder /data/incoming \\");
    println!("                                 --patterns '*.json,*.zip' --overlap-mode strict");
    println!();
    println!("For detailed help on any command, use:");
    println!("    fieldvisit-processor <COMMAND> --help");
}
