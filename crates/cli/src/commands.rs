//! clap command tree for `tern`.

use clap::{Arg, ArgAction, Command};

/// Build the top-level command.
pub fn build_cli() -> Command {
    Command::new("tern")
        .about("Drive snapshot-isolation scenarios against an in-memory tern database")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Print results as JSON"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("run")
                .about("Run reference scenarios")
                .arg(
                    Arg::new("scenario")
                        .value_parser(["simple", "rollback", "never-ending", "all"])
                        .default_value("all")
                        .help("Scenario to run"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Configuration helpers")
                .subcommand_required(true)
                .subcommand(
                    Command::new("check")
                        .about("Validate a configuration file")
                        .arg(Arg::new("file").required(true).value_name("FILE")),
                )
                .subcommand(Command::new("default").about("Print the default configuration")),
        )
}
