//! Image transformation CLI tool
//!
//! Command-line front end for the request boundary: one input (file, stdin
//! or URL) in, one encoded image out.

use super::config::CliConfigBuilder;
use crate::{
    config::OutputFormat,
    service::{ImageService, ProcessRequest},
    services::OutputFormatHandler,
    tracing_config::{init_cli_tracing, spans},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Background removal, resize, compositing and re-encoding
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-bgtransform")]
pub struct Cli {
    /// Input image file (use "-" for stdin)
    #[arg(value_name = "INPUT", required_unless_present_any = &["url", "status", "health"], conflicts_with = "url")]
    pub input: Option<String>,

    /// Fetch the input image from this URL instead
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Output file (use "-" for stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CliOutputFormat::Png)]
    pub format: CliOutputFormat,

    /// Maximum output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Background color: "transparent", "#RRGGBB", "rgb(r, g, b)" or "r,g,b"
    #[arg(short, long, default_value = "transparent")]
    pub background: String,

    /// ONNX segmentation model path
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the service status JSON and exit
    #[arg(long)]
    pub status: bool,

    /// Print the health JSON and exit
    #[arg(long)]
    pub health: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Jpg,
    Webp,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => Self::Png,
            CliOutputFormat::Jpeg | CliOutputFormat::Jpg => Self::Jpeg,
            CliOutputFormat::Webp => Self::WebP,
        }
    }
}

impl CliOutputFormat {
    /// Name accepted by the request boundary
    #[must_use]
    pub fn as_request_name(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let service = ImageService::from_config(config).context("Failed to start image service")?;
    let _session = spans::session(&session_id, service.pipeline().remover().name()).entered();

    if cli.status {
        println!("{}", serde_json::to_string_pretty(&service.status())?);
        return Ok(());
    }
    if cli.health {
        println!("{}", serde_json::to_string_pretty(&service.health())?);
        return Ok(());
    }

    process(&cli, &service).await
}

/// Run one request and write its output
async fn process(cli: &Cli, service: &ImageService) -> Result<()> {
    let (request, source) = build_request(cli)?;
    let _span = spans::request(&source, cli.format.as_request_name()).entered();

    let result = match service.handle(request).await {
        Ok(result) => result,
        Err(e) => {
            error!("Request failed with status {}: {}", e.status_code(), e);
            anyhow::bail!(e);
        },
    };

    let output = resolve_output(cli.output.as_deref(), cli.input.as_deref(), cli.format.into());
    match &output {
        OutputTarget::Stdout => write_stdout(&result.bytes)?,
        OutputTarget::File(path) => {
            result
                .save(path)
                .with_context(|| format!("Failed to write output file {}", path.display()))?;
            info!(
                "Wrote {} ({}x{}, {}) in {}ms",
                path.display(),
                result.dimensions.0,
                result.dimensions.1,
                result.content_type,
                result.timings.total_ms
            );
        },
    }

    Ok(())
}

/// Build the boundary request from CLI arguments
///
/// Returns the request and a short description of its source.
fn build_request(cli: &Cli) -> Result<(ProcessRequest, String)> {
    let (request, source) = match (cli.input.as_deref(), cli.url.as_deref()) {
        (Some("-"), _) => (ProcessRequest::from_upload(read_stdin()?), "stdin".to_string()),
        (Some(path), _) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read input file {path}"))?;
            (ProcessRequest::from_upload(bytes), path.to_string())
        },
        (None, Some(url)) => (ProcessRequest::from_url(url), url.to_string()),
        (None, None) => anyhow::bail!("An input file or --url is required"),
    };

    let mut request = request
        .background_color(cli.background.clone())
        .format(cli.format.as_request_name());
    request.width = cli.width;
    request.height = cli.height;

    Ok((request, source))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// Pick where the encoded image goes
///
/// Without an explicit output, the result lands next to a file input as
/// `<stem>.<ext>`, or as `output.<ext>` for stdin and URL inputs.
fn resolve_output(output: Option<&str>, input: Option<&str>, format: OutputFormat) -> OutputTarget {
    match output {
        Some("-") => OutputTarget::Stdout,
        Some(path) => OutputTarget::File(PathBuf::from(path)),
        None => OutputTarget::File(generate_output_path(input, format)),
    }
}

/// Generate output path with correct extension
fn generate_output_path(input: Option<&str>, format: OutputFormat) -> PathBuf {
    let extension = OutputFormatHandler::get_extension(format);

    match input.filter(|input| *input != "-").map(Path::new) {
        Some(input_path) => {
            let stem = input_path.file_stem().unwrap_or_default();
            let dir = input_path.parent().unwrap_or(Path::new("."));
            dir.join(format!("{}.{}", stem.to_string_lossy(), extension))
        },
        None => PathBuf::from(format!("output.{extension}")),
    }
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }

    Ok(buffer)
}

/// Write image data to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_output_format_enum() {
        assert_eq!(OutputFormat::from(CliOutputFormat::Png), OutputFormat::Png);
        assert_eq!(OutputFormat::from(CliOutputFormat::Jpeg), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from(CliOutputFormat::Jpg), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from(CliOutputFormat::Webp), OutputFormat::WebP);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "imgly-bgtransform",
            "photo.jpg",
            "--width",
            "100",
            "-b",
            "#FF0000",
            "-f",
            "webp",
        ])
        .unwrap();

        assert_eq!(cli.input.as_deref(), Some("photo.jpg"));
        assert_eq!(cli.width, Some(100));
        assert_eq!(cli.background, "#FF0000");
        assert_eq!(cli.format, CliOutputFormat::Webp);
    }

    #[test]
    fn test_cli_requires_some_input() {
        assert!(Cli::try_parse_from(["imgly-bgtransform"]).is_err());
        assert!(Cli::try_parse_from(["imgly-bgtransform", "--health"]).is_ok());
        assert!(Cli::try_parse_from(["imgly-bgtransform", "--url", "https://example.com/a.png"]).is_ok());
    }

    #[test]
    fn test_cli_input_conflicts_with_url() {
        let result = Cli::try_parse_from([
            "imgly-bgtransform",
            "photo.jpg",
            "--url",
            "https://example.com/a.png",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_output_path() {
        assert_eq!(
            generate_output_path(Some("/tmp/photos/cat.jpg"), OutputFormat::Png),
            PathBuf::from("/tmp/photos/cat.png")
        );
        assert_eq!(
            generate_output_path(Some("-"), OutputFormat::WebP),
            PathBuf::from("output.webp")
        );
        assert_eq!(
            generate_output_path(None, OutputFormat::Jpeg),
            PathBuf::from("output.jpg")
        );
    }

    #[test]
    fn test_resolve_output() {
        assert_eq!(
            resolve_output(Some("-"), Some("a.png"), OutputFormat::Png),
            OutputTarget::Stdout
        );
        assert_eq!(
            resolve_output(Some("out.webp"), None, OutputFormat::WebP),
            OutputTarget::File(PathBuf::from("out.webp"))
        );
    }

    #[test]
    fn test_build_request_from_url() {
        let cli = Cli::try_parse_from([
            "imgly-bgtransform",
            "--url",
            "https://example.com/a.png",
            "--height",
            "40",
        ])
        .unwrap();

        let (request, source) = build_request(&cli).unwrap();
        assert_eq!(source, "https://example.com/a.png");
        assert_eq!(request.image_url.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(request.height, Some(40));
        assert_eq!(request.format, "png");
    }
}
