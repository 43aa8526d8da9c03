use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Images: png, jpeg, tiff, tga, bmp\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Image sequence stimulus playback
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging to file (default: seqstim.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the playback loop, reading commands from stdin
    Run(RunArgs),

    /// Check sequence files for missing images and unknown markers
    Validate {
        /// Sequence files to check
        #[arg(value_name = "SEQFILE", required = true)]
        files: Vec<PathBuf>,

        /// Stimulus marker table (JSON object of name -> value)
        #[arg(short = 'm', long = "markers", value_name = "FILE")]
        markers: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Config file (default: seqstim.json in the config directory)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Block descriptor, e.g. "[('seqs/a.txt', 10), ('seqs/b.txt', 5)]"
    #[arg(short = 'b', long = "block", value_name = "BLOCK")]
    pub block: Option<String>,

    /// Queue start_preload and start_playback at startup
    #[arg(short = 'a', long = "autoplay")]
    pub autoplay: bool,

    /// Stop after N ticks
    #[arg(long = "ticks", value_name = "N")]
    pub ticks: Option<u64>,

    /// Exit when the first block has finished
    #[arg(long = "once")]
    pub once: bool,

    /// Also send markers as UDP datagrams to HOST:PORT
    #[arg(long = "udp", value_name = "HOST:PORT")]
    pub udp: Option<String>,

    /// Draw debug information (overrides config)
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = Args::parse_from([
            "seqstim", "-vv", "run", "--autoplay", "--ticks", "100", "--block", "[('a.txt', 10)]",
        ]);
        assert_eq!(args.verbosity, 2);
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert!(run.autoplay);
        assert_eq!(run.ticks, Some(100));
        assert_eq!(run.block.as_deref(), Some("[('a.txt', 10)]"));
    }

    #[test]
    fn test_parse_validate_with_global_flags_after() {
        let args = Args::parse_from(["seqstim", "validate", "a.txt", "b.txt", "-m", "markers.json", "-l"]);
        assert_eq!(args.log_file, Some(None));
        match args.command {
            Command::Validate { files, markers } => {
                assert_eq!(files.len(), 2);
                assert_eq!(markers, Some(PathBuf::from("markers.json")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validate_requires_files() {
        assert!(Args::try_parse_from(["seqstim", "validate"]).is_err());
    }
}
