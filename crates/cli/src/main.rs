use clap::Parser;
use webvnc_cli::{cli::Cli, logging, session};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let code = session::run(cli).await;
    std::process::exit(code);
}
