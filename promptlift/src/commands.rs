use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("promptlift")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("promptlift")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress progress and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" ...)
                .help("Increase log verbosity (-v debug, -vv trace)")
                .required(false),
        )
        .subcommand_required(true)
        .subcommand(
            command!("extract")
                .about("Extract positive prompts from PNG files or directories of PNG files")
                .arg(
                    arg!(<PATHS> ...)
                        .help("PNG files and/or directories to search recursively")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(-m --"mode" <MODE>)
                        .required(false)
                        .help("Extraction mode: graph (workflow/prompt JSON) or parameters")
                        .value_parser(["graph", "comfyui", "parameters", "params"])
                        .default_value("graph"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Number of files processed concurrently")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"first")
                        .required(false)
                        .help("Print only the first prompt found")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("raw"),
                )
                .arg(
                    arg!(--"raw")
                        .required(false)
                        .help("Print only the prompt texts, separated by blank lines")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save a report to this file, or into this directory under a default name"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"translate" <DIRECTION>)
                        .required(false)
                        .help("Translate prompts, e.g. en:zh or zh:en"),
                )
                .arg(
                    arg!(--"engine" <ENGINE>)
                        .required(false)
                        .help("Translation engine")
                        .value_parser(["libretranslate", "mymemory"])
                        .default_value("libretranslate")
                        .requires("translate"),
                )
                .arg(
                    arg!(--"translator-url" <URL>)
                        .required(false)
                        .help("Base URL of the translation service (default depends on engine)")
                        .value_parser(clap::value_parser!(Url))
                        .requires("translate"),
                )
                .arg(
                    arg!(--"api-key" <KEY>)
                        .required(false)
                        .help("API key for the translation service, if it needs one")
                        .requires("translate"),
                ),
        )
}
