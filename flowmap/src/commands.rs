use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("flowmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("flowmap")
        .about("Crawl a website into a page-link graph and group it into navigation flows")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress the progress spinner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log crawl decisions to stderr")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site breadth-first, detect its global navigation and extract user \
                flows. Set GROQ_API_KEY to enable flow classification.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The start URL (http:// is assumed when no scheme is given)"),
                )
                .arg(
                    arg!(-m --"max-pages" <NUM_PAGES>)
                        .required(false)
                        .help("Maximum number of pages to fetch, clamped to 1-200 (default: 10)")
                        .value_parser(clap::value_parser!(i64))
                        .allow_negative_numbers(true),
                )
                .arg(
                    arg!(-T --"max-time" <SECONDS>)
                        .required(false)
                        .help("Wall-clock budget in seconds, clamped to 10-3600 (default: none)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"email" <EMAIL>)
                        .required(false)
                        .help("Log in on the start page with this email or username")
                        .requires("password"),
                )
                .arg(
                    arg!(--"password" <PASSWORD>)
                        .required(false)
                        .help("Password for --email")
                        .requires("email"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: ndjson event stream or a text report")
                        .value_parser(["ndjson", "text"])
                        .default_value("ndjson"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Also save the final flow map as JSON to this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"no-settle")
                        .required(false)
                        .help("Skip the render/scroll waits between navigation and link extraction")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
