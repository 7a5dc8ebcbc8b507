use std::str::FromStr;

use clap::ArgMatches;

use crate::error::CliError;

/// Run the chain benchmark and return an exit code.
pub fn run_bench(_args: &ArgMatches) -> Result<i32, CliError> {
    #[cfg(not(feature = "bench"))]
    {
        eprintln!("Benchmarking requires the `bench` feature.");
        return Ok(1);
    }
    #[cfg(feature = "bench")]
    {
        use trackfx_lib::diagnostics::bench::{bench_chain, ChainBenchConfig};

        let config = ChainBenchConfig {
            sample_rate: bench_value(_args, "sample-rate")?,
            block_frames: bench_value(_args, "block-frames")?,
            blocks: bench_value(_args, "blocks")?,
            iterations: bench_value(_args, "iterations")?,
        };
        let result = bench_chain(config);

        println!(
            "Chain bench ({} slots, block={} @ {} Hz, blocks={} iters={}): avg {:.3}ms (min {:.3}ms max {:.3}ms), audio {:.2}ms, rt {:.3}x",
            result.slots,
            config.block_frames,
            config.sample_rate,
            config.blocks,
            config.iterations,
            result.avg_ms,
            result.min_ms,
            result.max_ms,
            result.audio_time_ms,
            result.rt_factor
        );
        return Ok(0);
    }
}

#[cfg_attr(not(feature = "bench"), allow(dead_code))]
fn bench_value<T: FromStr>(args: &ArgMatches, name: &str) -> Result<T, CliError> {
    let value = args
        .get_one::<String>(name)
        .ok_or_else(|| CliError::InvalidArgument(format!("missing --{}", name)))?;
    value
        .parse::<T>()
        .map_err(|_| CliError::InvalidArgument(format!("--{} = {:?} is out of range", name, value)))
}
