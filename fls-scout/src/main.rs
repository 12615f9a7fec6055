use fls_scout::commands::command_argument_builder;
use fls_scout::handlers::{handle_probe, handle_run, print_banner};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    init_tracing(verbose);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("run", primary_command)) => handle_run(primary_command, quiet).await,
        Some(("probe", primary_command)) => handle_probe(primary_command, quiet).await,
        // No subcommand provided, just show the banner
        None => Ok(0),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}
