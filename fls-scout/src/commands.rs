use clap::{arg, command};
use fls_scout_core::config::{DEFAULT_MANIFEST_NAME, DEFAULT_STATUS_PAGE_NAME};
use fls_scout_scanner::discovery::DEFAULT_SEARCH_URL;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn timeout_arg() -> clap::Arg {
    arg!(--"timeout" <SECONDS>)
        .required(false)
        .help("Per-server probe timeout in seconds")
        .value_parser(clap::value_parser!(u64).range(1..))
        .default_value("5")
}

fn threads_arg() -> clap::Arg {
    arg!(-t --"threads" <NUM_WORKERS>)
        .required(false)
        .help("Number of probes in flight at once (1 probes strictly one after another)")
        .value_parser(clap::value_parser!(usize))
        .default_value("10")
}

fn insecure_arg() -> clap::Arg {
    arg!(--"insecure")
        .required(false)
        .help("Accept invalid TLS certificates when probing https servers")
        .action(clap::ArgAction::SetTrue)
}

fn fail_if_none_arg() -> clap::Arg {
    arg!(--"fail-if-none")
        .required(false)
        .help("Exit with status 2 when no live server was found")
        .action(clap::ArgAction::SetTrue)
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("fls-scout")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("fls-scout")
        .styles(CLAP_STYLING)
        .about("Discover JetBrains floating license servers on Shodan and verify they are up")
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("run")
                .about(
                    "Search Shodan for license servers, probe each one and publish the live \
                list and status page.",
                )
                .arg(
                    arg!(--"api-key" <KEY>)
                        .required(false)
                        .help("Shodan API key")
                        .env("SHODAN_API_KEY")
                        .hide_env_values(true),
                )
                .arg(
                    arg!(--"search-url" <URL>)
                        .required(false)
                        .help("Base URL of the Shodan API")
                        .default_value(DEFAULT_SEARCH_URL),
                )
                .arg(
                    arg!(--"page" <PAGE>)
                        .required(false)
                        .help("Search result page to fetch")
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .default_value("1"),
                )
                .arg(
                    arg!(-o --"output-dir" <PATH>)
                        .required(false)
                        .help("Directory the manifest and status page are written to")
                        .default_value("."),
                )
                .arg(
                    arg!(--"manifest" <FILE>)
                        .required(false)
                        .help("File name of the live server manifest")
                        .default_value(DEFAULT_MANIFEST_NAME),
                )
                .arg(
                    arg!(--"status-page" <FILE>)
                        .required(false)
                        .help("File name of the HTML status page")
                        .default_value(DEFAULT_STATUS_PAGE_NAME),
                )
                .arg(
                    arg!(--"json" <PATH>)
                        .required(false)
                        .help("Also write a JSON summary of the run to PATH, relative to --output-dir")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(timeout_arg())
                .arg(threads_arg())
                .arg(insecure_arg())
                .arg(
                    arg!(--"utc-offset" <HOURS>)
                        .required(false)
                        .help("UTC offset, in hours, of the timestamps written to the artifacts")
                        .value_parser(clap::value_parser!(i32))
                        .allow_negative_numbers(true)
                        .default_value("8"),
                )
                .arg(fail_if_none_arg())
                .arg(
                    arg!(--"no-print")
                        .required(false)
                        .help("Do not echo the manifest after writing it")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("probe")
                .about("Probe servers you already know about, without searching or publishing")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A server to probe; a bare host:port is probed over http")
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Newline-delimited file of servers, e.g. a previous manifest")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(timeout_arg())
                .arg(threads_arg())
                .arg(insecure_arg())
                .arg(fail_if_none_arg()),
        )
}
