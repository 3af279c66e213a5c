use clap::Parser;
use pivotrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
