use super::Parser;

/// Inkwell blogging API server.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Path to a TOML settings file; defaults to `settings/dev.toml` in debug
    /// builds and `settings/release.toml` in release builds.
    #[arg(long)]
    pub settings: Option<String>,
}
