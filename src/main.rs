use clap::Parser;
use sigtrader::cli::{run, Cli};
use sigtrader::logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli)
}
