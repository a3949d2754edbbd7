use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "turnstile", about = "Session credential service")]
pub struct Cli {
    /// Path to a settings TOML file
    #[arg(long)]
    pub settings: Option<String>,
}
