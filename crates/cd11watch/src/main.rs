use anyhow::{anyhow, Context};
use chrono::Duration;
use clap::Parser;
use log::{info, LevelFilter};

use cd11rx::{
    AcquisitionProtocol, Cd11Decoder, ChannelTable, Ingester, IngesterBuilder, JsonLinesStore,
    LogNotifier, RawSampleDecoder,
};

mod app;
mod cli;

use cli::{Args, CliError};

fn main() {
    match cd11watch() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn cd11watch() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // collaborators and the ingester itself
    let ingester = ingester_setup(&args)?;

    // runs until killed
    app::run(&args, ingester)
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("cd11rx", log_filter)
            .filter_module("cd11watch", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn ingester_setup(args: &Args) -> Result<Ingester<JsonLinesStore>, anyhow::Error> {
    if !args.watch_dir.is_dir() {
        return Err(anyhow!(
            "--watch-dir \"{}\" is not a directory",
            args.watch_dir.display()
        ));
    }

    let channels = ChannelTable::from_path(&args.channels).with_context(|| {
        format!(
            "Unable to load --channels \"{}\"",
            args.channels.display()
        )
    })?;
    info!(
        "loaded {} channel(s) from \"{}\"",
        channels.len(),
        args.channels.display()
    );

    let store = JsonLinesStore::new(&args.store_dir).with_context(|| {
        format!(
            "Unable to open --store-dir \"{}\"",
            args.store_dir.display()
        )
    })?;

    Ok(IngesterBuilder::new(&args.watch_dir)
        .with_manifest_suffix(args.manifest_suffix.as_str())
        .with_missing_file_age(Duration::milliseconds(args.missing_file_age_ms))
        .with_idle_warning_scans(args.idle_warning_scans)
        .with_notifier(LogNotifier)
        .with_decoder(
            AcquisitionProtocol::Cd11,
            Cd11Decoder::new(channels, RawSampleDecoder),
        )
        .build(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn args(dir: &std::path::Path) -> Args {
        let path = |name: &str| dir.join(name).display().to_string();
        Args::try_parse_from([
            "cd11watch".to_owned(),
            "--watch-dir".to_owned(),
            path("incoming"),
            "--channels".to_owned(),
            path("channels.json"),
            "--store-dir".to_owned(),
            path("out"),
        ])
        .unwrap()
    }

    #[test]
    fn test_ingester_setup() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path());

        // watch directory must exist
        assert!(ingester_setup(&args).is_err());
        fs::create_dir(dir.path().join("incoming")).unwrap();

        // channel table must exist and parse
        assert!(ingester_setup(&args).is_err());
        fs::write(dir.path().join("channels.json"), "{").unwrap();
        assert!(ingester_setup(&args).is_err());
        fs::write(
            dir.path().join("channels.json"),
            r#"[{"site": "ABC12", "channel": "BHZ", "id": "3f1e0c4e-52a6-4c1a-9d0b-7a4f4ef0d2a1"}]"#,
        )
        .unwrap();

        let ingester = ingester_setup(&args).unwrap();
        assert_eq!(dir.path().join("incoming"), ingester.watch_dir());
        assert_eq!(dir.path().join("out"), ingester.storage().dir());
        assert!(dir.path().join("out").is_dir());
    }
}
