//! Orchestration: "produce or refresh the bindings file for installation X".
//!
//! Lower layers report `Option` / `Result<_, String>`; this is the only place that decides
//! what is fatal (a [`PipelineError`], nothing written) and what merely degrades the output
//! (localization, overrides: logged and skipped).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use thiserror::Error;

use crate::CoreLog;
use crate::bindings::{
    action_bindings::ActionBindings,
    constants::{DEFAULT_PROFILE_DIR, DEFAULT_PROFILE_FILE, LOCALIZATION_DIR, LOCALIZATION_FILE},
    translations::LocalizationTable,
};
use crate::config::ExtractOptions;
use crate::fs::FileSystem;
use crate::sc::{
    cryxml::{self, CryXmlError},
    fingerprint::{ExtractionFingerprint, needs_regeneration},
    install::{DEFAULT_LANGUAGE, GameLanguage, InstallLayout, detect_language, normalize_language},
    output::BindingsDocument,
    p4k::P4kArchive,
};
use crate::util::text::{decode_text, looks_like_xml};

/// Folder name under the user data directory.
pub const APP_ID: &str = "sc-bindings";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("extraction cancelled")]
    Cancelled,
    #[error("failed to open archive {0}")]
    ArchiveOpen(String),
    #[error("failed to extract default profile from archive")]
    DefaultProfileNotFound,
    #[error("failed to decode binary-XML: {0}")]
    Decode(String),
    #[error("failed to parse default profile: {0}")]
    Parse(String),
    #[error("no actions found in default profile")]
    NoActions,
    #[error("failed to write output: {0}")]
    Write(String),
}

/// Cooperative cancellation, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionRequest {
    pub archive_path: PathBuf,
    /// User rebinds; a path that doesn't exist is treated as "no override".
    pub override_profile: Option<PathBuf>,
    pub output_path: PathBuf,
    pub language_hint: Option<String>,
    /// Used to read `user.cfg` when no hint is given.
    pub install_dir: Option<PathBuf>,
    /// Regenerate even when the fingerprint says the output is current.
    pub force: bool,
}

impl ExtractionRequest {
    /// Archive, override profile and `user.cfg` from the standard layout under `root`.
    pub fn for_install(root: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        let layout = InstallLayout::from_root(root);
        Self {
            archive_path: layout.archive_path(),
            override_profile: Some(layout.override_profile_path()),
            output_path: output_path.into(),
            language_hint: None,
            install_dir: Some(layout.root),
            force: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    UpToDate,
    Regenerated { action_count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub language: String,
    pub status: Result<RefreshStatus, PipelineError>,
}

pub struct BindingsExtractor {
    fs: Arc<dyn FileSystem>,
    options: ExtractOptions,
    logger: Arc<dyn CoreLog>,
    cancel: CancelToken,
}

impl BindingsExtractor {
    pub fn new(fs: Arc<dyn FileSystem>, options: ExtractOptions, logger: Arc<dyn CoreLog>) -> Self {
        Self {
            fs,
            options,
            logger,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Produce the output file for `req`, or leave it alone when its fingerprint still
    /// matches. On any failure the previous output (if any) is untouched.
    pub fn refresh(&self, req: &ExtractionRequest) -> RefreshOutcome {
        let language = self.resolve_language(req);
        let status = self.run(req, &language);
        match &status {
            Ok(RefreshStatus::UpToDate) => self.logger.info(&format!(
                "[refresh] {} is up to date",
                req.output_path.display()
            )),
            Ok(RefreshStatus::Regenerated { action_count }) => self.logger.info(&format!(
                "[refresh] wrote {action_count} actions to {}",
                req.output_path.display()
            )),
            Err(e) => self.logger.error(&format!("[refresh] {e}")),
        }
        RefreshOutcome { language, status }
    }

    fn run(&self, req: &ExtractionRequest, language: &str) -> Result<RefreshStatus, PipelineError> {
        let override_profile = req
            .override_profile
            .as_deref()
            .filter(|_| self.options.include_override);

        let fingerprint = ExtractionFingerprint::capture(
            self.fs.as_ref(),
            &req.archive_path,
            override_profile,
            language,
        )
        .ok_or_else(|| PipelineError::ArchiveOpen(req.archive_path.display().to_string()))?;

        if !req.force && !needs_regeneration(self.fs.as_ref(), &req.output_path, &fingerprint) {
            return Ok(RefreshStatus::UpToDate);
        }

        let ab = self.extract(&req.archive_path, override_profile, language)?;

        self.cancel.check()?;
        let action_count = ab.records.len();
        BindingsDocument::new(ab.records, fingerprint)
            .write(self.fs.as_ref(), &req.output_path)
            .map_err(PipelineError::Write)?;
        Ok(RefreshStatus::Regenerated { action_count })
    }

    /// Archive → default profile → records, with localization and overrides merged in.
    /// Writes nothing.
    pub fn extract(
        &self,
        archive_path: &Path,
        override_profile: Option<&Path>,
        language: &str,
    ) -> Result<ActionBindings, PipelineError> {
        self.cancel.check()?;
        let mut archive = P4kArchive::new(self.fs.clone());
        if !archive.open(archive_path) {
            return Err(PipelineError::ArchiveOpen(archive_path.display().to_string()));
        }
        self.logger.info(&format!(
            "[extract] opened {} ({} entries)",
            archive_path.display(),
            archive.len()
        ));

        self.cancel.check()?;
        let entry = archive
            .scan_directory(DEFAULT_PROFILE_DIR, DEFAULT_PROFILE_FILE)
            .into_iter()
            .next()
            .ok_or(PipelineError::DefaultProfileNotFound)?;
        let bytes = archive
            .read_bytes(&entry)
            .ok_or(PipelineError::DefaultProfileNotFound)?;
        let xml = decode_profile_bytes(&bytes)?;

        let mut ab = ActionBindings::parse_default_profile(&xml, &self.options, &self.logger)
            .map_err(PipelineError::Parse)?;
        if ab.is_empty() {
            return Err(PipelineError::NoActions);
        }

        self.cancel.check()?;
        match self.load_localization(&mut archive, language) {
            Some(table) => {
                let n = ab.apply_localization(&table, &self.options.toggle_markers);
                self.logger
                    .info(&format!("[extract] localized {n} fields ({language})"));
            }
            None => self.logger.warn(&format!(
                "[extract] no localization for {language}; keeping raw labels"
            )),
        }
        archive.close();

        if let Some(path) = override_profile.filter(|p| self.fs.file_exists(p)) {
            let applied = self
                .fs
                .read_all_text(path)
                .map_err(|e| format!("read {}: {e}", path.display()))
                .and_then(|xml| ab.apply_override_profile(&xml, &self.logger));
            if let Err(e) = applied {
                self.logger
                    .warn(&format!("[extract] ignoring override profile: {e}"));
            }
        }

        let removed = ab.retain_meaningful();
        if removed > 0 {
            self.logger.debug(&format!(
                "[extract] dropped {removed} unbound actions without a readable label"
            ));
        }
        Ok(ab)
    }

    /// Hint → `user.cfg` → default. Unsupported hints are logged and ignored.
    pub fn resolve_language(&self, req: &ExtractionRequest) -> String {
        if let Some(hint) = req.language_hint.as_deref() {
            match normalize_language(hint) {
                Some(lang) => return lang,
                None => self
                    .logger
                    .warn(&format!("[resolve_language] unsupported language '{hint}'")),
            }
        }
        match req.install_dir.as_deref() {
            Some(dir) => detect_language(self.fs.as_ref(), dir),
            None => DEFAULT_LANGUAGE.token().to_string(),
        }
    }

    /// `global.ini` for `language`, falling back to English. `None` if neither is usable.
    fn load_localization(
        &self,
        archive: &mut P4kArchive,
        language: &str,
    ) -> Option<LocalizationTable> {
        let wanted = language
            .parse::<GameLanguage>()
            .map(|l| l.folder())
            .unwrap_or_else(|_| language.to_lowercase());
        let fallback = DEFAULT_LANGUAGE.folder();

        let mut folders = vec![wanted];
        if folders[0] != fallback {
            folders.push(fallback);
        }
        for folder in folders {
            let dir = format!("{LOCALIZATION_DIR}/{folder}");
            let Some(entry) = archive.scan_directory(&dir, LOCALIZATION_FILE).into_iter().next()
            else {
                self.logger
                    .debug(&format!("[load_localization] no {LOCALIZATION_FILE} in {dir}"));
                continue;
            };
            let Some(bytes) = archive.read_bytes(&entry) else {
                self.logger
                    .warn(&format!("[load_localization] unreadable entry {}", entry.path));
                continue;
            };
            let table = LocalizationTable::from_bytes(&bytes);
            if !table.is_empty() {
                return Some(table);
            }
        }
        None
    }
}

/// CryXmlB → XML text. A profile that is already plain XML is passed through.
pub fn decode_profile_bytes(bytes: &[u8]) -> Result<String, PipelineError> {
    match cryxml::decode_to_string(bytes) {
        Ok(xml) => Ok(xml),
        Err(CryXmlError::NotCryXml) if looks_like_xml(bytes) => Ok(decode_text(bytes)),
        Err(e) => Err(PipelineError::Decode(e.to_string())),
    }
}

/// Compute (and create) the data folder for this app.
pub fn appdata_dir(app_id: &str) -> Result<PathBuf, String> {
    let base = directories::BaseDirs::new().ok_or("Could not find user data directory")?;
    let dir = base.data_dir().join(app_id);
    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    Ok(dir)
}

/// `<data dir>/<app_id>/bindings_<LANGUAGE>.json` (does not create the file).
pub fn default_output_path(app_id: &str, language: &str) -> Result<PathBuf, String> {
    Ok(appdata_dir(app_id)?.join(format!("bindings_{language}.json")))
}
