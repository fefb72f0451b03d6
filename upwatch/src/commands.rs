use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("upwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("upwatch")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log requests and state changes to stderr")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"api-url" <URL>)
                .required(false)
                .global(true)
                .help("Base URL of the uptime API [env: UPWATCH_API_URL] [default: http://localhost:8000]"),
        )
        .arg(
            arg!(--"session-file" <PATH>)
                .required(false)
                .global(true)
                .help("Where the session cookie is kept [default: ~/.config/upwatch/session]")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand_required(false)
        .subcommand(
            command!("login")
                .about("Log in and remember the session")
                .arg(arg!(-e --"email" <EMAIL>).required(true).help("Account email"))
                .arg(
                    arg!(-p --"password" <PASSWORD>)
                        .required(false)
                        .help("Account password; prompted for when omitted"),
                ),
        )
        .subcommand(
            command!("register")
                .about("Create an account and log in")
                .arg(arg!(-e --"email" <EMAIL>).required(true).help("Account email"))
                .arg(
                    arg!(-p --"password" <PASSWORD>)
                        .required(false)
                        .help("Account password; prompted for when omitted"),
                ),
        )
        .subcommand(command!("logout").about("End the session and forget it locally"))
        .subcommand(command!("whoami").about("Show the logged-in account"))
        .subcommand(
            command!("list")
                .about("Show every target with its latest check")
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("add")
                .about("Start monitoring a URL")
                .arg(arg!(<URL>).help("http or https URL to monitor"))
                .arg(
                    arg!(-n --"name" <NAME>)
                        .required(false)
                        .help("Display name for the target"),
                ),
        )
        .subcommand(
            command!("delete")
                .about("Stop monitoring a target")
                .arg(
                    arg!(<ID>)
                        .help("Target id, as shown by `upwatch list`")
                        .value_parser(clap::value_parser!(i64)),
                ),
        )
        .subcommand(command!("ui").about("Launch the interactive dashboard"))
}
