#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bankrecon_cli::run(std::env::args()).await
}
