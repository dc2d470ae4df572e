#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = smartgrade_rust::run().await {
        eprintln!("smartgrade-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
