use crate::config::DEFAULT_CONFIG_PATH;
use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

fn key_args(cmd: Command, public_help: &'static str, private_help: &'static str) -> Command {
    cmd.arg(
        Arg::new("name")
            .help("Name of certificate")
            .long("name")
            .short('n')
            .required(true),
    )
    .arg(
        Arg::new("public-key")
            .help(public_help)
            .long("public-key")
            .short('p')
            .value_name("PATH")
            .required(true),
    )
    .arg(
        Arg::new("private-key")
            .help(private_help)
            .long("private-key")
            .short('k')
            .value_name("PATH")
            .required(true),
    )
}

/// Pure clap command definitions with zero business logic
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let push = key_args(
        Command::new("push").about("Push certs to PGSQL"),
        "Path to public key to upload",
        "Path to private key to upload",
    );

    let pull = key_args(
        Command::new("pull").about("Pull certs from PGSQL"),
        "Path to write the public key to",
        "Path to write the private key to",
    )
    .arg(
        Arg::new("force")
            .help("Always pull certificates, skipping the local expiry check")
            .long("force")
            .short('f')
            .action(ArgAction::SetTrue),
    );

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .env("PG_CERT_STORE_CONFIG")
                .global(true)
                .help(format!("Path to config file [default: {DEFAULT_CONFIG_PATH}]"))
                .long("config")
                .short('c')
                .value_name("PATH"),
        )
        .arg(
            Arg::new("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence")
                .long("verbose")
                .short('v'),
        )
        .subcommand(push)
        .subcommand(pull)
}
