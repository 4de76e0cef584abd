//! Command-line interface for building signed wallet passes.
//!
//! Reads a pass request as JSON and writes the signed `.pkpass` archive.
//! Signing configuration comes from `WALLETPASS_*` environment variables;
//! flags override them.

use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use walletpass::{Error, PassRequest, PassSigner, SignerConfig};

#[derive(Parser)]
#[command(name = "walletpass")]
#[command(about = "Signed wallet pass builder")]
struct Cli {
    /// Pass request JSON file, or `-` for stdin
    input: PathBuf,

    /// Output file (default: derived from the card holder's name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Signer certificate file (PEM or DER)
    #[arg(short = 'c', long)]
    certificate: Option<PathBuf>,

    /// Signer private key file (PEM format)
    #[arg(short = 'k', long)]
    private_key: Option<PathBuf>,

    /// PKCS#12 file (.p12)
    #[arg(short = 'p', long)]
    pkcs12: Option<PathBuf>,

    /// Password for the PKCS#12 file or the private key
    #[arg(long)]
    password: Option<String>,

    /// WWDR intermediate certificate (PEM or DER)
    #[arg(short = 'w', long)]
    wwdr: Option<PathBuf>,

    /// Team identifier
    #[arg(long)]
    team_id: Option<String>,

    /// Pass type identifier
    #[arg(long)]
    pass_type_id: Option<String>,

    /// Organization name shown on the pass
    #[arg(long)]
    organization: Option<String>,

    /// Per-image fetch timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// ZIP compression level (0-9, default: 6)
    #[arg(short = 'z', long, default_value = "6")]
    zip_level: u32,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(output) => {
            println!("Built: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> walletpass::Result<PathBuf> {
    let request = PassRequest::from_json(&read_input(&cli.input)?)?;
    let output = cli.output.clone();
    let signer = PassSigner::new(signer_config(cli))?;

    let bundle = signer.build(&request).await?;
    let output = output.unwrap_or_else(|| PathBuf::from(bundle.file_name()));
    std::fs::write(&output, bundle.as_bytes())?;
    Ok(output)
}

fn read_input(path: &Path) -> walletpass::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read(path)?)
}

fn signer_config(cli: Cli) -> SignerConfig {
    let mut config = SignerConfig::from_env().compression_level(cli.zip_level);

    if let Some(path) = cli.pkcs12 {
        config = config.pkcs12(path);
        if let Some(password) = &cli.password {
            config = config.pkcs12_password(password.as_str());
        }
    } else if let Some(password) = &cli.password {
        config = config.key_password(password.as_str());
    }
    if let Some(path) = cli.certificate {
        config = config.certificate(path);
    }
    if let Some(path) = cli.private_key {
        config = config.private_key(path);
    }
    if let Some(path) = cli.wwdr {
        config = config.wwdr_certificate(path);
    }
    if let Some(id) = cli.team_id {
        config = config.team_identifier(id);
    }
    if let Some(id) = cli.pass_type_id {
        config = config.pass_type_identifier(id);
    }
    if let Some(name) = cli.organization {
        config = config.organization_name(name);
    }
    if let Some(secs) = cli.timeout {
        config = config.fetch_timeout(Duration::from_secs(secs));
    }
    config
}

/// 2 for problems the caller can fix, 1 for everything else.
fn exit_code(error: &Error) -> u8 {
    match error {
        Error::ConfigurationMissing(_) => 2,
        e if e.is_user_correctable() => 2,
        _ => 1,
    }
}
