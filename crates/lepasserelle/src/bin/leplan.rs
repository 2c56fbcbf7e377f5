// leplan - Change request planner binary

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lepasserelle::cli::main().await
}
