//! Full restore pipeline against the live API.
//!
//! ```sh
//! DIFFIO_API_KEY=sk-... cargo run --example restore_file -- recording.wav
//! ```

use diffio::{DiffioClient, RestoreOptions, RetryPolicy};
use std::time::Duration;

#[tokio::main]
async fn main() -> diffio::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("diffio=info")
        .init();

    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "recording.wav".to_string());

    let client = DiffioClient::builder()
        .retry(RetryPolicy::standard())
        .build()?;

    let options = RestoreOptions::new(&input)
        .with_show_progress(true)
        .with_timeout(Duration::from_secs(600));
    let (content, metadata) = client.restore(options).await?;

    match content {
        Some(bytes) => {
            let out = metadata
                .file_name
                .clone()
                .unwrap_or_else(|| "restored.wav".to_string());
            std::fs::write(&out, bytes)?;
            println!("wrote {}", out);
        }
        None => {
            eprintln!(
                "restore stopped at stage {}: {}",
                metadata.stage,
                metadata.error.as_deref().unwrap_or("unknown error"),
            );
        }
    }
    Ok(())
}
