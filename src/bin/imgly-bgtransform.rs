//! IMG.LY image transformation CLI tool
//!
//! Command-line interface for background removal, aspect-fit resizing,
//! color compositing and re-encoding.

#[cfg(feature = "cli")]
use imgly_bgtransform::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
