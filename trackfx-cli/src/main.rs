//! # trackfx
//!
//! Command-line renderer for trackfx manifests: clips, tracks and their effect
//! chains mixed down to a mono WAV file.

use log::error;

mod cli;
mod error;
mod logging;
mod manifest;
mod runner;

fn main() {
    let args = cli::args::build_cli().get_matches();
    logging::init(args.get_flag("quiet"));

    let code = match runner::run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            -1
        }
    };

    std::process::exit(code)
}
