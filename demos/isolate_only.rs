//! Upload and queue a generation, then return immediately with the
//! handle. Useful when completion is observed through webhooks instead
//! of polling.
//!
//! ```sh
//! DIFFIO_API_KEY=sk-... cargo run --example isolate_only -- recording.wav
//! ```

use diffio::{DiffioClient, IsolateOptions};

#[tokio::main]
async fn main() -> diffio::Result<()> {
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "recording.wav".to_string());

    let client = DiffioClient::from_env()?;
    let result = client.isolate(&IsolateOptions::new(&input)).await?;

    println!("project:    {}", result.project.api_project_id);
    println!("generation: {}", result.generation.generation_id);
    println!("status:     {}", result.generation.status);
    Ok(())
}
