mod app;
mod cli;
mod comment;
mod config;
mod error;
mod labels;
mod linear;
mod model;
mod reference;
#[cfg(test)]
mod testutil;

use anyhow::Result;

use crate::linear::LinearClient;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        println!("{}", cli::usage());
        return;
    }

    // Single top-level handler: every fatal condition ends up here as a
    // diagnostic and a non-zero exit.
    if let Err(error) = run(&args).await {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
    println!("All done!");
}

async fn run(args: &[String]) -> Result<()> {
    let cli = cli::parse_args(args)?;
    let credential = config::resolve_credential(cli.token.clone())?;
    let client = LinearClient::new(credential);
    app::run(&cli, &client).await?;
    Ok(())
}
