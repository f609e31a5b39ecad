use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    keyquest::cli::run().await
}
