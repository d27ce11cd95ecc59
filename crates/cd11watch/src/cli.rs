use std::fmt::Display;
use std::path::PathBuf;

use clap::{error::ErrorKind, value_parser, CommandFactory, Parser};

const USAGE_SHORT: &str = r#"
This program watches a directory for CD-1.1 station data files. A transfer agent announces each data file in a manifest (*.inv) before delivering it. Every delivered file is stored, decoded into waveforms and state-of-health records, and deleted.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program watches a directory for CD-1.1 station data files. A transfer agent announces each data file in a manifest (*.inv) before delivering it. Every delivered file is stored, decoded into waveforms and state-of-health records, and deleted.

Manifests list one data file name per line. They are deleted as soon as they are read.

    echo "ABC12-0001.json" > /data/incoming/batch-0001.inv

Each data file holds one raw station data frame, in JSON. The CD-1.1 payload is base64-encoded in its "rawPayload" field.

Channels are identified with a --channels table. This is a JSON array like

    [{"site": "ABC12", "channel": "BHZ", "id": "3f1e0c4e-52a6-4c1a-9d0b-7a4f4ef0d2a1"}]

Subframes for channels which are not in the table are logged and skipped.

Output is appended to frames.jsonl, segments.jsonl, and health.jsonl in the --store-dir.

Files which are announced but not delivered within the --missing-file-age-ms are reported as missing, with a warning.

This program runs until it is killed.
"#;

const ADVANCED: &str = "Advanced Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log NOTHING, not even missing files
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory to watch for manifests and data files
    #[arg(long, value_name = "DIR")]
    pub watch_dir: PathBuf,

    /// Channel table (JSON)
    ///
    /// Maps each station site and channel name to its channel ID.
    #[arg(long, value_name = "FILE")]
    pub channels: PathBuf,

    /// Output directory for stored frames and records
    ///
    /// Created if it does not exist.
    #[arg(long, value_name = "DIR")]
    pub store_dir: PathBuf,

    /// Report files not delivered within this time (ms)
    ///
    /// Measured from the last manifest which announced the file.
    #[arg(long, default_value_t = 120000)]
    #[arg(value_parser = value_parser!(i64).range(0..))]
    pub missing_file_age_ms: i64,

    /// Manifest file name suffix
    #[arg(long, default_value_t = cd11rx::DEFAULT_MANIFEST_SUFFIX.to_string())]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub manifest_suffix: String,

    /// Delay between directory scans (ms)
    #[arg(long, default_value_t = 100)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub poll_interval_ms: u64,

    /// Warn after this many consecutive scans find no manifests
    #[arg(long, default_value_t = 100)]
    #[arg(value_parser = value_parser!(u64).range(1..))]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub idle_warning_scans: u64,
}

/// Fatal error which ends `cd11watch`, with its exit status
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Wrap `error`, exiting with status `code`
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Report the error on standard error
    ///
    /// Argument errors keep clap's own message and usage hint.
    /// Startup and I/O failures are styled to match them.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Report the error and terminate with its exit status
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clap() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from([
            "cd11watch",
            "--watch-dir",
            "/data/incoming",
            "--channels",
            "channels.json",
            "--store-dir",
            "/data/out",
        ])
        .unwrap();

        assert_eq!(0, args.verbose);
        assert!(!args.quiet);
        assert_eq!(PathBuf::from("/data/incoming"), args.watch_dir);
        assert_eq!(".inv", args.manifest_suffix);
        assert_eq!(100, args.poll_interval_ms);
        assert_eq!(120000, args.missing_file_age_ms);
        assert_eq!(100, args.idle_warning_scans);
    }

    #[test]
    fn test_invalid() {
        // required options
        assert!(Args::try_parse_from(["cd11watch", "--watch-dir", "/data"]).is_err());

        let err = Args::try_parse_from([
            "cd11watch",
            "--watch-dir",
            "/data/incoming",
            "--channels",
            "channels.json",
            "--store-dir",
            "/data/out",
            "--idle-warning-scans",
            "0",
        ])
        .unwrap_err();
        assert_eq!(ErrorKind::ValueValidation, err.kind());
    }
}
