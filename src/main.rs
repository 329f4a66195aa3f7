use clap::Parser;

use rql_gateway::cli::Args;
use rql_gateway::config::ConfigFile;
use rql_gateway::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let (config, source) = ConfigFile::resolve(args.config.as_deref())?;
    logging::init(config.log_level.as_deref());
    source.log();
    let output = args.command.run(&config, args.format)?;
    println!("{}", output);
    Ok(())
}
