use std::fmt;
use std::sync::Arc;

use log::{Level, Log, Metadata, Record};

const TARGET: &str = env!("CARGO_CRATE_NAME");

/// Handle to the logger a translator writes to.
///
/// Cheap to clone and safe to share between threads. The default handle
/// discards everything.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<dyn Log>,
}

impl Logger {
    pub fn new<L: Log + 'static>(logger: L) -> Self {
        Self {
            inner: Arc::new(logger),
        }
    }

    pub fn from_arc(logger: Arc<dyn Log>) -> Self {
        Self { inner: logger }
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(TARGET).build();
        if !self.inner.enabled(&metadata) {
            return;
        }
        self.inner.log(
            &Record::builder()
                .metadata(metadata)
                .module_path_static(Some(TARGET))
                .args(args)
                .build(),
        );
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Discard)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish()
    }
}

struct Discard;

impl Log for Discard {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        false
    }

    fn log(&self, _: &Record<'_>) {}

    fn flush(&self) {}
}
