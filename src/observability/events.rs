//! Observable engine events

use std::fmt;

/// Every event the engine logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    BootStart,
    ConfigLoaded,
    BootComplete,
    Serving,
    ShutdownComplete,

    // Journal
    JournalReplayed,
    /// Incomplete trailing entry cut off on open
    JournalTailDiscarded,

    // Schema
    ModelDefined,
    ModelDeleted,
    FieldDeleted,

    // Records
    RecordCreated,
    RecordDeleted,
    ValueDeleted,

    // Requests
    RequestRejected,
    StorageFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "BOOT_START",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::BootComplete => "BOOT_COMPLETE",
            Event::Serving => "SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::JournalReplayed => "JOURNAL_REPLAYED",
            Event::JournalTailDiscarded => "JOURNAL_TAIL_DISCARDED",
            Event::ModelDefined => "MODEL_DEFINED",
            Event::ModelDeleted => "MODEL_DELETED",
            Event::FieldDeleted => "FIELD_DELETED",
            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordDeleted => "RECORD_DELETED",
            Event::ValueDeleted => "VALUE_DELETED",
            Event::RequestRejected => "REQUEST_REJECTED",
            Event::StorageFailed => "STORAGE_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
