//! Bridge between the SSH library's logging and the host application logger.
//!
//! The embedding tool owns verbosity and destination; russh logs through the
//! [`log`] facade. [`LogBridge`] adapts facade records onto a [`HostLog`]
//! capability handle so both streams end up in the same place.
//!
//! Routing is encoded as data, not conditionals: one table decides which host
//! predicate gates a foreign level, a second decides which host channel a
//! message lands on. The two differ in exactly one row: library `info` output
//! is emitted on the host's debug channel, because russh's info level is too
//! chatty for normal release runs.

use std::sync::Arc;

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Host logger capability set.
///
/// The embedding application supplies one implementation; the factory holds
/// it for its own messages and installs a [`LogBridge`] over it for the SSH
/// library's messages. Fatal conditions share the error channel.
pub trait HostLog: Send + Sync {
    fn is_debug_enabled(&self) -> bool;
    fn is_info_enabled(&self) -> bool;
    fn is_warn_enabled(&self) -> bool;
    fn is_error_enabled(&self) -> bool;

    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Host-side severity a foreign level routes to.
///
/// Ordered by verbosity: `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BridgeLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Enablement routing: the host predicate that gates each foreign level.
/// Trace has no host counterpart and shares the debug gate.
const ENABLE_ROUTES: [(Level, BridgeLevel); 5] = [
    (Level::Error, BridgeLevel::Error),
    (Level::Warn, BridgeLevel::Warn),
    (Level::Info, BridgeLevel::Info),
    (Level::Debug, BridgeLevel::Debug),
    (Level::Trace, BridgeLevel::Debug),
];

/// Emission routing: the host channel each foreign level lands on.
/// Library info is downgraded to debug; see the module doc.
const EMIT_ROUTES: [(Level, BridgeLevel); 5] = [
    (Level::Error, BridgeLevel::Error),
    (Level::Warn, BridgeLevel::Warn),
    (Level::Info, BridgeLevel::Debug),
    (Level::Debug, BridgeLevel::Debug),
    (Level::Trace, BridgeLevel::Debug),
];

fn route(table: &[(Level, BridgeLevel)], level: Level) -> BridgeLevel {
    table
        .iter()
        .find(|(from, _)| *from == level)
        .map(|(_, to)| *to)
        .unwrap_or(BridgeLevel::Debug)
}

/// Which host predicate gates `level`.
pub fn enable_route(level: Level) -> BridgeLevel {
    route(&ENABLE_ROUTES, level)
}

/// Which host channel `level` emits on.
pub fn emit_route(level: Level) -> BridgeLevel {
    route(&EMIT_ROUTES, level)
}

/// [`log::Log`] implementation forwarding to a [`HostLog`].
///
/// No buffering and no formatting beyond what the host logger applies; a
/// record is rendered with `to_string` and handed over as-is.
pub struct LogBridge {
    sink: Arc<dyn HostLog>,
}

impl LogBridge {
    pub fn new(sink: Arc<dyn HostLog>) -> Self {
        Self { sink }
    }

    /// Whether the host currently accepts `level`, per [`enable_route`].
    pub fn enabled_for(&self, level: Level) -> bool {
        match enable_route(level) {
            BridgeLevel::Debug => self.sink.is_debug_enabled(),
            BridgeLevel::Info => self.sink.is_info_enabled(),
            BridgeLevel::Warn => self.sink.is_warn_enabled(),
            BridgeLevel::Error => self.sink.is_error_enabled(),
        }
    }

    /// Emit `message` on the host channel chosen by [`emit_route`].
    pub fn emit(&self, level: Level, message: &str) {
        match emit_route(level) {
            BridgeLevel::Debug => self.sink.debug(message),
            BridgeLevel::Info => self.sink.info(message),
            BridgeLevel::Warn => self.sink.warn(message),
            BridgeLevel::Error => self.sink.error(message),
        }
    }

    /// Install a bridge over `sink` on the facade's process-global slot.
    ///
    /// The slot is write-once for the lifetime of the process; a second
    /// install is a no-op and returns `false`. The max level is opened up to
    /// `Trace` so filtering is entirely the host logger's decision.
    pub fn install(sink: Arc<dyn HostLog>) -> bool {
        match log::set_boxed_logger(Box::new(Self::new(sink))) {
            Ok(()) => {
                log::set_max_level(LevelFilter::Trace);
                true
            }
            Err(_) => false,
        }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.enabled_for(metadata.level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.emit(record.level(), &record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Minimal [`HostLog`] writing to stderr.
///
/// Embedding tools normally adapt their own logger; this one covers
/// standalone use and examples. Messages below `threshold` are dropped.
pub struct StderrLog {
    threshold: BridgeLevel,
}

impl StderrLog {
    pub fn new(threshold: BridgeLevel) -> Self {
        Self { threshold }
    }

    fn accepts(&self, level: BridgeLevel) -> bool {
        level >= self.threshold
    }

    fn write(&self, level: BridgeLevel, message: &str) {
        if self.accepts(level) {
            eprintln!("[{level:?}] {message}");
        }
    }
}

impl Default for StderrLog {
    fn default() -> Self {
        Self::new(BridgeLevel::Info)
    }
}

impl HostLog for StderrLog {
    fn is_debug_enabled(&self) -> bool {
        self.accepts(BridgeLevel::Debug)
    }
    fn is_info_enabled(&self) -> bool {
        self.accepts(BridgeLevel::Info)
    }
    fn is_warn_enabled(&self) -> bool {
        self.accepts(BridgeLevel::Warn)
    }
    fn is_error_enabled(&self) -> bool {
        self.accepts(BridgeLevel::Error)
    }

    fn debug(&self, message: &str) {
        self.write(BridgeLevel::Debug, message);
    }
    fn info(&self, message: &str) {
        self.write(BridgeLevel::Info, message);
    }
    fn warn(&self, message: &str) {
        self.write(BridgeLevel::Warn, message);
    }
    fn error(&self, message: &str) {
        self.write(BridgeLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every emitted (channel, message) pair; every level enabled.
    #[derive(Default)]
    struct RecordingLog {
        entries: Mutex<Vec<(BridgeLevel, String)>>,
    }

    impl HostLog for RecordingLog {
        fn is_debug_enabled(&self) -> bool {
            true
        }
        fn is_info_enabled(&self) -> bool {
            true
        }
        fn is_warn_enabled(&self) -> bool {
            true
        }
        fn is_error_enabled(&self) -> bool {
            true
        }

        fn debug(&self, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push((BridgeLevel::Debug, message.to_string()));
        }
        fn info(&self, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push((BridgeLevel::Info, message.to_string()));
        }
        fn warn(&self, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push((BridgeLevel::Warn, message.to_string()));
        }
        fn error(&self, message: &str) {
            self.entries
                .lock()
                .unwrap()
                .push((BridgeLevel::Error, message.to_string()));
        }
    }

    /// Only the named level enabled; emits are counted per channel.
    struct GatedLog {
        gate: BridgeLevel,
    }

    impl HostLog for GatedLog {
        fn is_debug_enabled(&self) -> bool {
            self.gate == BridgeLevel::Debug
        }
        fn is_info_enabled(&self) -> bool {
            self.gate == BridgeLevel::Info
        }
        fn is_warn_enabled(&self) -> bool {
            self.gate == BridgeLevel::Warn
        }
        fn is_error_enabled(&self) -> bool {
            self.gate == BridgeLevel::Error
        }

        fn debug(&self, _: &str) {}
        fn info(&self, _: &str) {}
        fn warn(&self, _: &str) {}
        fn error(&self, _: &str) {}
    }

    #[test]
    fn test_enablement_maps_to_same_named_predicate() {
        for (level, gate) in [
            (Level::Debug, BridgeLevel::Debug),
            (Level::Info, BridgeLevel::Info),
            (Level::Warn, BridgeLevel::Warn),
            (Level::Error, BridgeLevel::Error),
            (Level::Trace, BridgeLevel::Debug),
        ] {
            let bridge = LogBridge::new(Arc::new(GatedLog { gate }));
            assert!(bridge.enabled_for(level), "{level} should pass its gate");
        }

        // A warn-only host accepts nothing else.
        let bridge = LogBridge::new(Arc::new(GatedLog {
            gate: BridgeLevel::Warn,
        }));
        assert!(!bridge.enabled_for(Level::Debug));
        assert!(!bridge.enabled_for(Level::Info));
        assert!(!bridge.enabled_for(Level::Error));
    }

    #[test]
    fn test_emit_downgrades_info_to_debug() {
        let sink = Arc::new(RecordingLog::default());
        let bridge = LogBridge::new(sink.clone());

        bridge.emit(Level::Info, "key exchange done");
        bridge.emit(Level::Debug, "kex proposal");
        bridge.emit(Level::Trace, "raw packet");

        let entries = sink.entries.lock().unwrap();
        assert!(
            entries
                .iter()
                .all(|(channel, _)| *channel == BridgeLevel::Debug)
        );
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_emit_keeps_warn_and_error_channels() {
        let sink = Arc::new(RecordingLog::default());
        let bridge = LogBridge::new(sink.clone());

        bridge.emit(Level::Warn, "deprecated cipher");
        bridge.emit(Level::Error, "disconnect");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries[0].0, BridgeLevel::Warn);
        assert_eq!(entries[1].0, BridgeLevel::Error);
    }

    #[test]
    fn test_second_install_is_a_noop() {
        let sink: Arc<dyn HostLog> = Arc::new(RecordingLog::default());
        let _ = LogBridge::install(sink.clone());
        // The facade slot is write-once for the process lifetime.
        assert!(!LogBridge::install(sink));
    }

    #[test]
    fn test_routing_tables_differ_only_on_info() {
        for level in [Level::Error, Level::Warn, Level::Debug, Level::Trace] {
            assert_eq!(enable_route(level), emit_route(level));
        }
        assert_eq!(enable_route(Level::Info), BridgeLevel::Info);
        assert_eq!(emit_route(Level::Info), BridgeLevel::Debug);
    }
}
