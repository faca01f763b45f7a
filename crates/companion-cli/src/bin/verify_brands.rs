use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use companion_cli::{init_tracing, load_config, render_text, verify_brands};
use companion_core::EnvTenantSource;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "verify_brands")]
#[command(about = "Check the brand configuration the gateway would boot with")]
struct Args {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Exit with an error when any brand reports an issue
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = load_config(|key| std::env::var(key).ok())
        .context("Configuration verification failed")?;
    let reports =
        verify_brands(&config, &EnvTenantSource).context("Configuration verification failed")?;

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        Format::Text => print!("{}", render_text(&reports)),
    }

    let with_issues = reports.iter().filter(|r| !r.is_clean()).count();
    if args.strict && with_issues > 0 {
        anyhow::bail!("{} brand(s) have configuration issues", with_issues);
    }

    Ok(())
}
