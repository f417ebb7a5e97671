use clap::Parser;
use codeatlas::cli::args::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = codeatlas::cli::run(cli).await;
    std::process::exit(exit_code);
}
