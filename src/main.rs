//! PDF Reader MCP Server - Entry point
//!
//! An MCP server for inspecting PDF files inside a sandboxed root directory.

use pdf_reader_mcp::run_server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr only: stdout carries the MCP frames)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_reader_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Root directory: first CLI argument, else PDF_READER_ROOT, else cwd
    let root_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PDF_READER_ROOT").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    tracing::info!(root = %root_dir.display(), "Starting PDF reader MCP server");

    run_server(root_dir).await
}
