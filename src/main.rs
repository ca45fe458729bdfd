use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    graphchat::cli::run_cli().await
}
