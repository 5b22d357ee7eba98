use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "blockmap",
    about = "Compile data-mapping configurations into Blockly workspace XML."
)]
pub struct Args {
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "JSON file with the known functions, transformers and dictionaries."
    )]
    pub registry: Option<PathBuf>,

    #[arg(
        long,
        help = "Skip unknown expressions, functions and statements instead of failing the mapping."
    )]
    pub permissive: bool,

    #[arg(
        long,
        help = "Treat OUTPUT as a directory and write one .xml file per functional mapping."
    )]
    pub split: bool,

    #[arg(long, help = "Re-parse every compiled document and check its block structure.")]
    pub verify: bool,

    #[arg(
        long,
        help = "Use sequential block ids instead of random UUIDs (reproducible output)."
    )]
    pub sequential_ids: bool,

    #[arg(long, help = "Exit successfully even when some functional mappings fail.")]
    pub allow_failures: bool,
}
