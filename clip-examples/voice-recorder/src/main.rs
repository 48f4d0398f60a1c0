use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let recorder = voice_recorder::build().await?;
    let addr = recorder.addr();

    println!("[voice-recorder] listening on http://{addr}");

    recorder.app.listen(addr).await?;

    Ok(())
}
