use crate::CLAP_STYLING;
use clap::{arg, command};

fn capture_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"har" <PATH>)
            .required(false)
            .help("Path to a HAR recording with inline response bodies")
            .conflicts_with("archive"),
    )
    .arg(
        arg!(-a --"archive" <PATH>)
            .required(false)
            .help("Path to a zip archive holding har.har and the response body files")
            .conflicts_with("har"),
    )
    .group(
        clap::ArgGroup::new("capture")
            .args(["har", "archive"])
            .required(true),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("streamtrace")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("streamtrace")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" ...)
                .help("Increase log verbosity (-v debug, -vv trace)")
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            capture_args(
                command!("resolve").about(
                    "Work out which earlier requests supplied the data used to fetch the \
                media stream, and export the chain as a diagram.",
                ),
            )
            .arg(
                arg!(-o --"output" <PATH>)
                    .required(false)
                    .help("Save diagram to file (default: display to screen)"),
            )
            .arg(
                arg!(-f --"format" <FORMAT>)
                    .required(false)
                    .help("Diagram format: drawio, dot, json, text")
                    .value_parser(["drawio", "dot", "json", "text"])
                    .default_value("drawio"),
            )
            .arg(
                arg!(--"keep-assets")
                    .required(false)
                    .help("Keep stylesheets, fonts and images in the registry")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                arg!(--"no-direct")
                    .required(false)
                    .help("Do not treat a body quoting a request URL as a full explanation of it")
                    .action(clap::ArgAction::SetTrue),
            ),
        )
        .subcommand(capture_args(
            command!("targets").about("List the media requests in a recording"),
        ))
}
