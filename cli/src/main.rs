use clap::Parser;
use poimap_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    poimap_cli::init_tracing(cli.global.verbose);
    let code = cli.run().await;
    std::process::exit(code);
}
