mod cli;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let command_line_interface = cli::CommandLineInterface::load();

    let filter = match command_line_interface.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let all_ok = command_line_interface.run()?;
    Ok(if all_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
