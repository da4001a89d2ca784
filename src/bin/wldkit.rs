use clap::Parser;

use wldkit::cli::Commands;

#[derive(Parser)]
#[command(name = "wldkit")]
#[command(about = "WLD world file toolkit", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
