use std::io;
use std::path::Path;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const FALLBACK_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}";

/// Initialise log4rs from `config_path`, or a plain console logger at `info`
/// when the file does not exist.
pub fn init(config_path: &Path) -> io::Result<()> {
    if config_path.exists() {
        return log4rs::init_file(config_path, Default::default())
            .map_err(|e| io::Error::other(e.to_string()));
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FALLBACK_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .map_err(|e| io::Error::other(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| io::Error::other(e.to_string()))?;

    log::warn!("{} not found, logging to stdout", config_path.display());
    Ok(())
}
