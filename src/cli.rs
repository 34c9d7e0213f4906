use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use crate::domain::models::Gender;

#[derive(Parser, Debug)]
#[command(
    name = "faceai",
    version,
    about = "FaceAI Geometry Lab client: facial measurements from a front and a side photo"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        env = "FACEAI_API_URL",
        help = "Analysis service base URL (overrides config file)"
    )]
    pub api_url: Option<String>,
    #[arg(short, long, global = true, help = "Debug logging on stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one front/side pair and print measurements
    Analyze(AnalyzeArgs),
    /// Interactive session: submit, recalculate and place Tr manually
    Session(SessionArgs),
    /// Check that the analysis service is up
    Health,
    /// Convert a click inside an image box into normalized coordinates
    Normalize(NormalizeArgs),
    /// Tell whether the given warnings offer manual Tr placement
    Gate {
        warnings: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub front: PathBuf,
    #[arg(long)]
    pub side: PathBuf,
    #[arg(long, value_enum)]
    pub gender: Option<Gender>,
    /// Normalized Tr x, applied only if the first result reports Tr as undetected
    #[arg(long, requires = "tr_y")]
    pub tr_x: Option<f64>,
    #[arg(long, requires = "tr_x")]
    pub tr_y: Option<f64>,
    /// Also write the result JSON to this file
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[arg(long)]
    pub front: Option<PathBuf>,
    #[arg(long)]
    pub side: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub gender: Option<Gender>,
}

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub click_x: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub click_y: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub left: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub top: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub width: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub height: f64,
}
