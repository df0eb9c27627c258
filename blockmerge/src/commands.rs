use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("blockmerge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Merge remote DNS blocklists into one deduplicated, whitelist-filtered list")
        .bin_name("blockmerge")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress the status table, progress bar and summary")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" ... "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("run")
                .about(
                    "Fetch every source, filter and consolidate the domains, and write the \
                blocklist, whitelist, allow-list and version files.",
                )
                .arg(sources_arg())
                .arg(whitelist_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the merged blocklist")
                        .default_value("blocklist.txt"),
                )
                .arg(
                    arg!(-a --"allowlist" <PATH>)
                        .required(false)
                        .help("Where to write the decorated allow-list derived from the whitelist")
                        .default_value("allowlist.txt"),
                )
                .arg(
                    arg!(--"version-file" <PATH>)
                        .required(false)
                        .help("Run metadata file; a .json sibling is written alongside")
                        .default_value("version.txt"),
                )
                .arg(
                    arg!(-t --"threshold" <COUNT>)
                        .required(false)
                        .help(
                            "Distinct subdomains under one parent before the parent replaces them",
                        )
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("45"),
                )
                .arg(
                    arg!(--"retries" <COUNT>)
                        .required(false)
                        .help("Extra attempts for timeouts, connection errors, 429 and 5xx")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"retry-delay-ms" <MS>)
                        .required(false)
                        .help("Base backoff between attempts; attempt n waits n times this")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("1000"),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM_TASKS>)
                        .required(false)
                        .help("Maximum sources fetched at once (default: all)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"reserved-suffix" <SUFFIX>)
                        .required(false)
                        .help("Extra non-public suffix to reject, on top of local, lan and home.arpa")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"allow-prefix" <TEXT>)
                        .required(false)
                        .help("Text placed before each allow-list entry")
                        .allow_hyphen_values(true)
                        .default_value("@@||"),
                )
                .arg(
                    arg!(--"allow-suffix" <TEXT>)
                        .required(false)
                        .help("Text placed after each allow-list entry")
                        .allow_hyphen_values(true)
                        .default_value("^"),
                ),
        )
        .subcommand(
            command!("whitelist")
                .about("Normalize the whitelist file in place (strip comments, lowercase, dedupe, sort)")
                .arg(whitelist_arg()),
        )
        .subcommand(
            command!("sources")
                .about("Print the cleaned, deduplicated source list")
                .arg(sources_arg()),
        )
}

fn sources_arg() -> clap::Arg {
    arg!(-s --"sources" <PATH>)
        .required(false)
        .help("Newline-delimited list of source URLs")
        .default_value("sources.txt")
}

fn whitelist_arg() -> clap::Arg {
    arg!(-w --"whitelist" <PATH>)
        .required(false)
        .help("Newline-delimited list of trusted domains")
        .default_value("whitelist.txt")
}
