//! Consume the polling sequence as a stream instead of a callback.
//!
//! ```sh
//! DIFFIO_API_KEY=sk-... cargo run --example progress_stream -- <generation_id> <project_id>
//! ```

use diffio::{format_progress, DiffioClient, WaitOptions};
use futures::StreamExt;
use std::time::Duration;

#[tokio::main]
async fn main() -> diffio::Result<()> {
    let mut args = std::env::args().skip(1);
    let generation_id = args.next().expect("usage: progress_stream <generation_id> <project_id>");
    let project_id = args.next().expect("usage: progress_stream <generation_id> <project_id>");

    let client = DiffioClient::from_env()?;
    let options = WaitOptions::new(generation_id)
        .with_api_project_id(project_id)
        .with_timeout(Duration::from_secs(600));

    let mut updates = std::pin::pin!(client.progress_updates(&options));
    while let Some(update) = updates.next().await {
        let snapshot = update?;
        println!("{}", format_progress(&snapshot));
    }
    Ok(())
}
