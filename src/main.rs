//! Dropout Tracker - student dropout prevention advisor
//!
//! Recommends preventive measures, scores follow-up surveys, and tracks the
//! resulting dropout-rate changes per session.

use dropout_tracker::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up GROQ_API_KEY and friends from a local .env
    dotenvy::dotenv().ok();

    // Initialize logging (WARN level by default, use RUST_LOG=info for debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .init();

    cli::run().await
}
