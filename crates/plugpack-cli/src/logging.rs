//! Scoped logging for a single CLI invocation.
//!
//! [`LoggingContext`] owns the subscriber for the duration of a run. Console
//! output follows the `-v` count and `--log-format`; a second layer records
//! everything at DEBUG into `plugin_builder.log` once a build directory is
//! attached. Nothing is installed globally: dropping the context restores
//! the previous default subscriber and closes the build log.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::Utf8Path;
use plugpack_config::LogFormat;
use thiserror::Error;
use tracing::dispatcher::DefaultGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::Registry;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter, time::UtcTime};
use tracing_subscriber::layer::{Layer, SubscriberExt};

/// Build log file name prefix; combined with the suffix as `prefix.suffix`.
const BUILD_LOG_PREFIX: &str = "plugin_builder";
const BUILD_LOG_SUFFIX: &str = "log";

/// Errors raised while attaching the build log.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The build log file could not be opened.
    #[error("failed to open build log in {dir}: {source}")]
    BuildLog {
        /// Build directory the log was meant for.
        dir: String,
        /// Appender initialisation failure.
        #[source]
        source: InitError,
    },
}

/// Maps the count of `-v` flags to the console level.
///
/// No flag keeps the default of INFO. One or two select ERROR, three WARN,
/// four INFO, and five or more DEBUG.
#[must_use]
pub const fn console_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        1 | 2 => LevelFilter::ERROR,
        3 => LevelFilter::WARN,
        0 | 4 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Shared slot the build-log layer writes through.
///
/// Writes are discarded while no appender is attached.
#[derive(Clone, Default)]
struct BuildLogSlot(Arc<Mutex<Option<RollingFileAppender>>>);

impl BuildLogSlot {
    fn lock(&self) -> MutexGuard<'_, Option<RollingFileAppender>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for BuildLogSlot {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.lock().as_mut() {
            Some(appender) => appender.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(appender) => appender.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for BuildLogSlot {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Logging lifecycle for one CLI run: init, attach the build log, detach.
pub struct LoggingContext {
    build_log: BuildLogSlot,
    _default: DefaultGuard,
}

impl LoggingContext {
    /// Installs the console and build-log layers as the scoped default
    /// subscriber for the current thread.
    #[must_use]
    pub fn init(verbosity: u8, format: LogFormat) -> Self {
        let build_log = BuildLogSlot::default();
        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(build_log.clone())
            .with_filter(LevelFilter::DEBUG);
        let subscriber = tracing_subscriber::registry()
            .with(console_layer(format, console_level(verbosity)))
            .with(file_layer);

        Self {
            build_log,
            _default: tracing::subscriber::set_default(subscriber),
        }
    }

    /// Starts writing DEBUG and above to `plugin_builder.log` in `build_dir`.
    ///
    /// Any previously attached log is closed first.
    ///
    /// # Errors
    ///
    /// Returns [`LoggingError::BuildLog`] when the log file cannot be opened.
    pub fn attach_build_log(&self, build_dir: &Utf8Path) -> Result<(), LoggingError> {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(BUILD_LOG_PREFIX)
            .filename_suffix(BUILD_LOG_SUFFIX)
            .build(build_dir)
            .map_err(|source| LoggingError::BuildLog {
                dir: build_dir.to_string(),
                source,
            })?;
        *self.build_log.lock() = Some(appender);
        Ok(())
    }

    /// Flushes and closes the build log, if one is attached.
    pub fn detach_build_log(&self) {
        // Release the slot before logging: the file layer locks it too.
        let detached = self.build_log.lock().take();
        if let Some(mut appender) = detached {
            if let Err(error) = appender.flush() {
                tracing::warn!(%error, "failed to flush build log");
            }
        }
    }

    /// Whether a build log is currently attached.
    #[must_use]
    pub fn has_build_log(&self) -> bool {
        self.build_log.lock().is_some()
    }
}

impl Drop for LoggingContext {
    fn drop(&mut self) {
        self.detach_build_log();
    }
}

fn console_layer(format: LogFormat, level: LevelFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
    let timer = UtcTime::rfc_3339();
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_timer(timer)
            .with_writer(io::stderr)
            .with_filter(level)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            // Colour only on interactive terminals.
            .with_ansi(io::stderr().is_terminal())
            .with_timer(timer)
            .with_writer(io::stderr)
            .with_filter(level)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;
    use plugpack_config::{BUILD_LOG_FILENAME, LogFormat};
    use rstest::rstest;
    use tempfile::TempDir;
    use tracing_subscriber::filter::LevelFilter;

    use super::{LoggingContext, console_level};

    #[rstest]
    #[case::default(0, LevelFilter::INFO)]
    #[case::one(1, LevelFilter::ERROR)]
    #[case::two(2, LevelFilter::ERROR)]
    #[case::three(3, LevelFilter::WARN)]
    #[case::four(4, LevelFilter::INFO)]
    #[case::five(5, LevelFilter::DEBUG)]
    #[case::beyond(6, LevelFilter::DEBUG)]
    #[case::many(42, LevelFilter::DEBUG)]
    #[case::max(u8::MAX, LevelFilter::DEBUG)]
    fn verbosity_maps_to_console_level(#[case] count: u8, #[case] expected: LevelFilter) {
        assert_eq!(console_level(count), expected);
    }

    fn utf8_temp() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        (dir, path)
    }

    #[test]
    fn build_log_records_debug_events_only_while_attached() {
        let (_guard, dir) = utf8_temp();
        let logging = LoggingContext::init(0, LogFormat::Compact);

        tracing::debug!("before attach");
        logging.attach_build_log(&dir).expect("attach build log");
        assert!(logging.has_build_log());
        tracing::debug!("while attached");
        logging.detach_build_log();
        assert!(!logging.has_build_log());
        tracing::debug!("after detach");

        let contents = fs::read_to_string(dir.join(BUILD_LOG_FILENAME)).expect("read build log");
        assert!(contents.contains("while attached"));
        assert!(!contents.contains("before attach"));
        assert!(!contents.contains("after detach"));
    }

    #[rstest]
    #[case::json(LogFormat::Json)]
    #[case::compact(LogFormat::Compact)]
    fn dropping_the_context_closes_the_build_log(#[case] format: LogFormat) {
        let (_guard, dir) = utf8_temp();
        {
            let logging = LoggingContext::init(5, format);
            logging.attach_build_log(&dir).expect("attach build log");
            tracing::info!("inside");
        }
        tracing::info!("outside");

        let contents = fs::read_to_string(dir.join(BUILD_LOG_FILENAME)).expect("read build log");
        assert!(contents.contains("inside"));
        assert!(!contents.contains("outside"));
    }

    #[test]
    fn attaching_to_a_missing_directory_fails() {
        let (_guard, dir) = utf8_temp();
        let file = dir.join("not-a-dir");
        fs::write(&file, "").expect("write file");
        let logging = LoggingContext::init(0, LogFormat::Compact);

        assert!(logging.attach_build_log(&file).is_err());
        assert!(!logging.has_build_log());
    }
}
