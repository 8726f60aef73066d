//! Command line plumbing shared by the simulator binaries: help styles,
//! verbosity flags and the tracing subscriber.

pub use clap;
pub use clap_verbosity_flag as verbose;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use std::{fs::File, sync::Mutex};

/// Help message styles, in the cargo flavor.
pub fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .invalid(AnsiColor::Yellow.on_default() | Effects::BOLD)
}

/// Map the `-v`/`-q` count to a tracing level. The default (no flag) shows
/// errors only; every `-v` opens one more level.
pub fn verbosity_to_level(level: Option<verbose::Level>) -> &'static tracing::Level {
    match level {
        Some(verbose::Level::Error) => &tracing::Level::WARN,
        Some(verbose::Level::Warn) => &tracing::Level::INFO,
        Some(verbose::Level::Info) => &tracing::Level::DEBUG,
        Some(verbose::Level::Debug) => &tracing::Level::TRACE,
        Some(verbose::Level::Trace) => &tracing::Level::TRACE,
        None => &tracing::Level::ERROR,
    }
}

/// Install the global subscriber.
///
/// Without a log file, events go to stderr in the compact text format. With a
/// log file, events are written to it as JSON lines. Calling this twice keeps
/// the first subscriber; the refusal is reported through it.
pub fn logging_setup(level: &tracing::Level, log_file: Option<&File>) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(*level)
        .with_target(false);

    let (file, clone_err) = match log_file.map(File::try_clone).transpose() {
        Ok(file) => (file, None),
        Err(err) => (None, Some(err)),
    };

    let installed = match file {
        Some(file) => builder.json().with_writer(Mutex::new(file)).try_init(),
        None => builder
            .without_time()
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if let Err(err) = installed {
        tracing::warn!("keeping the existing subscriber: {}", err);
    }
    if let Some(err) = clone_err {
        tracing::warn!("log file unusable ({}), logging to stderr", err);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(*verbosity_to_level(None), tracing::Level::ERROR);
        assert_eq!(
            *verbosity_to_level(Some(verbose::Level::Info)),
            tracing::Level::DEBUG
        );
        assert_eq!(
            *verbosity_to_level(Some(verbose::Level::Trace)),
            tracing::Level::TRACE
        );
    }

    #[test]
    fn test_json_log_file() {
        let mut file = tempfile::tempfile().unwrap();
        logging_setup(&tracing::Level::INFO, Some(&file));
        tracing::info!(answer = 42, "logged to file");

        use std::io::Seek;
        file.rewind().unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert!(content.contains("logged to file"));
        assert!(content.contains("\"answer\":42"));

        // a second install is refused and the refusal lands in the first one
        logging_setup(&tracing::Level::INFO, None);
        file.rewind().unwrap();
        content.clear();
        file.read_to_string(&mut content).unwrap();
        assert!(content.contains("keeping the existing subscriber"));
    }
}
