//! Command-line arguments of the `worlddiff` binary.

use crate::mode::Mode;
use crate::runner::RunConfig;
use clap::Parser;
use std::path::PathBuf;
use worlddiff_common::Dimension;

pub const USAGE: &str = "usage: <world1> <world2> <output> <mode(ADD, DEL, STAY)>";

#[derive(Parser, Debug)]
#[command(
    name = "worlddiff",
    about = "Diff two Minecraft worlds region by region",
    override_usage = "worlddiff [OPTIONS] <world1> <world2> <output> <mode(ADD, DEL, STAY)>"
)]
pub struct CliArgs {
    /// Older world directory.
    pub world1: PathBuf,

    /// Newer world directory.
    pub world2: PathBuf,

    /// Output world directory. Regions already present here are skipped.
    pub output: PathBuf,

    /// ADD, DEL or STAY. Anything else runs as ADD.
    pub mode: String,

    /// Global block state registry.
    #[arg(long, env = "WORLDDIFF_BLOCKS", default_value = "blocks.json")]
    pub blocks: PathBuf,

    /// Dimension whose regions are diffed.
    #[arg(long, default_value_t = Dimension::Overworld)]
    pub dimension: Dimension,
}

impl CliArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            world1: self.world1.clone(),
            world2: self.world2.clone(),
            output: self.output.clone(),
            mode: Mode::parse(&self.mode),
            dimension: self.dimension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positionals() {
        let args = CliArgs::try_parse_from(["worlddiff", "old", "new", "out", "STAY"]).unwrap();
        let config = args.run_config();
        assert_eq!(config.world1, PathBuf::from("old"));
        assert_eq!(config.world2, PathBuf::from("new"));
        assert_eq!(config.output, PathBuf::from("out"));
        assert_eq!(config.mode, Mode::Stay);
        assert_eq!(config.dimension, Dimension::Overworld);
    }

    #[test]
    fn test_options() {
        let args = CliArgs::try_parse_from([
            "worlddiff",
            "old",
            "new",
            "out",
            "DEL",
            "--blocks",
            "data/blocks.json",
            "--dimension",
            "the_nether",
        ])
        .unwrap();
        assert_eq!(args.blocks, PathBuf::from("data/blocks.json"));
        assert_eq!(args.run_config().dimension, Dimension::Nether);
    }

    #[test]
    fn test_unknown_mode_runs_as_add() {
        let args = CliArgs::try_parse_from(["worlddiff", "old", "new", "out", "KEEP"]).unwrap();
        assert_eq!(args.run_config().mode, Mode::Add);
    }

    #[test]
    fn test_missing_arguments() {
        assert!(CliArgs::try_parse_from(["worlddiff", "old", "new", "out"]).is_err());
        assert!(CliArgs::try_parse_from(["worlddiff", "--dimension", "mars", "a", "b", "c", "ADD"]).is_err());
    }
}
