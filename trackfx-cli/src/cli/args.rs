//! CLI argument definitions for `trackfx`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("trackfx")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render multitrack effect chains to WAV")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only log errors"),
        )
        .subcommand(
            Command::new("render")
                .about("Render a JSON manifest to a mono WAV file")
                .arg(
                    Arg::new("MANIFEST")
                        .help("Path to the render manifest JSON")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .value_name("WAV")
                        .required(true)
                        .help("Output WAV path"),
                )
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_name("SECONDS")
                        .default_value("0.0")
                        .help("Window start in seconds"),
                )
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_name("SECONDS")
                        .help("Window length in seconds (default: timeline end plus tail)"),
                )
                .arg(
                    Arg::new("block-frames")
                        .long("block-frames")
                        .value_name("FRAMES")
                        .default_value("512")
                        .help("Frames rendered per block"),
                )
                .arg(
                    Arg::new("sample-rate")
                        .long("sample-rate")
                        .value_name("HZ")
                        .help("Override the manifest sample rate"),
                )
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .action(ArgAction::SetTrue)
                        .help("Mix clips without running any effect chain"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("effects-json")
                        .about("Print one default config for every built-in effect"),
                )
                .subcommand(
                    Command::new("manifest-json").about("Print an example render manifest"),
                ),
        )
        .subcommand(
            Command::new("bench")
                .about("Time a chain of every built-in effect against real time")
                .arg(
                    Arg::new("sample-rate")
                        .long("sample-rate")
                        .value_name("HZ")
                        .default_value("48000")
                        .help("Sample rate for the benchmark"),
                )
                .arg(
                    Arg::new("block-frames")
                        .long("block-frames")
                        .value_name("FRAMES")
                        .default_value("512")
                        .help("Frames per processed block"),
                )
                .arg(
                    Arg::new("blocks")
                        .long("blocks")
                        .value_name("COUNT")
                        .default_value("200")
                        .help("Blocks per iteration"),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .value_name("COUNT")
                        .default_value("5")
                        .help("Number of iterations"),
                ),
        )
}
