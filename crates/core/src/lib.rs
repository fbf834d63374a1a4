//! Core library for extracting Star Citizen control bindings into a normalized JSON file.
//!
//! This crate is UI-agnostic and host-agnostic. It exposes:
//! - `sc`: the `Data.p4k` reader, the CryXmlB decoder, install layout + language detection,
//!   cache fingerprints, the output document and the extraction orchestrator.
//! - `bindings`: action-map parsing, activation-mode resolution, localization and overrides.
//! - `core_log::CoreLog`: thin logging trait the host (CLI or anything else) can implement.
//!
//! Import the `prelude` if you want the most common types in scope.

pub mod core_log;

pub mod bindings;
pub mod config;
pub mod fs;
pub mod sc;
pub mod util;

/// Convenient re-exports for downstream users (CLI/tests).
pub use core_log::CoreLog;

pub mod prelude {
    pub use crate::config::ExtractOptions;
    pub use crate::core_log::{CoreLog, LogLevel, MemoryLog, NoopLog};
    pub use crate::fs::{FileStamp, FileSystem, MemoryFileSystem, ReadSeek, RealFileSystem};

    // Bindings
    pub use crate::bindings::action_binding::BindingRecord;
    pub use crate::bindings::action_bindings::ActionBindings;
    pub use crate::bindings::activation_mode::{
        ActivationMode, ActivationModeMetadata, ActivationModeTable, DeclaredActivation,
        resolve_activation_mode,
    };
    pub use crate::bindings::binds::{Bindings, Device};
    pub use crate::bindings::translations::LocalizationTable;

    // Archive + decoder
    pub use crate::sc::cryxml::{CryXmlError, XmlNode};
    pub use crate::sc::p4k::{ArchiveEntry, P4kArchive};

    // Pipeline
    pub use crate::sc::fingerprint::{ExtractionFingerprint, needs_regeneration};
    pub use crate::sc::install::{GameLanguage, InstallLayout, detect_language};
    pub use crate::sc::output::{BindingsDocument, OutputMetadata, SCHEMA_VERSION};
    pub use crate::sc::profiles::{
        APP_ID, BindingsExtractor, CancelToken, ExtractionRequest, PipelineError, RefreshOutcome,
        RefreshStatus, appdata_dir, default_output_path,
    };
}
