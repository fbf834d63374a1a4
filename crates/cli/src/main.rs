//! Extract Star Citizen control bindings from `Data.p4k` into a normalized JSON file.
//!
//! Examples:
//!   sc-bindings-extract --install "C:\\Games\\StarCitizen\\LIVE"
//!   sc-bindings-extract --install ".\\LIVE" --language german_(germany) --out ".\\bindings.json"
//!   sc-bindings-extract --archive ".\\Data.p4k" --no-override --force
//!   sc-bindings-extract --archive ".\\Data.p4k" --list Data/Libs/Config
//!   sc-bindings-extract --archive ".\\Data.p4k" --decode Data/Libs/Config/defaultProfile.xml
//!
//! Notes:
//! - Either --install or --archive is required.
//! - Without --out the file goes to `<data dir>/sc-bindings/bindings_<LANGUAGE>.json`.

use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use sc_bindings_core::prelude::*;
use sc_bindings_core::sc::cryxml;
use sc_bindings_core::util::text::decode_text;

// ───────────────────────────── CLI Args ─────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sc-bindings-extract",
    version,
    about = "Extract Star Citizen control bindings to JSON"
)]
struct Args {
    /// Install root (the folder holding Data.p4k, e.g. .../StarCitizen/LIVE)
    #[arg(short, long, value_name = "DIR")]
    install: Option<PathBuf>,

    /// Data.p4k to read (defaults to <install>/Data.p4k)
    #[arg(short, long, value_name = "PATH")]
    archive: Option<PathBuf>,

    /// Override profile (defaults to <install>/user/client/0/Profiles/default/actionmaps.xml)
    #[arg(long = "override", value_name = "PATH")]
    override_profile: Option<PathBuf>,

    /// Output JSON path
    #[arg(short, long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Language token, e.g. english or german_(germany) (defaults to user.cfg, then english)
    #[arg(short, long)]
    language: Option<String>,

    /// Optional JSON overriding skip lists, category fallbacks and toggle markers
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Regenerate even if the output is up to date
    #[arg(short, long)]
    force: bool,

    /// Ignore the user's override profile
    #[arg(long)]
    no_override: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print one archive entry as XML (CryXmlB is decoded) and exit
    #[arg(long, value_name = "ENTRY")]
    decode: Option<String>,

    /// List archive entries under a directory prefix and exit
    #[arg(long, value_name = "PREFIX")]
    list: Option<String>,
}

// ───────────────────────────── Logger ─────────────────────────────

#[derive(Clone)]
struct StderrLogger {
    verbose: bool,
}

impl CoreLog for StderrLogger {
    fn info(&self, msg: &str) {
        eprintln!("INFO:  {msg}");
    }
    fn warn(&self, msg: &str) {
        eprintln!("WARN:  {msg}");
    }
    fn error(&self, msg: &str) {
        eprintln!("ERROR: {msg}");
    }
    fn debug(&self, msg: &str) {
        if self.verbose {
            eprintln!("DEBUG: {msg}");
        }
    }
}

// ───────────────────────────── main ─────────────────────────────

fn main() -> Result<(), String> {
    let args = Args::parse();
    let core_log: Arc<dyn CoreLog> = Arc::new(StderrLogger {
        verbose: args.verbose,
    });
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let layout = args.install.as_deref().map(InstallLayout::from_root);
    let archive_path = args
        .archive
        .clone()
        .or_else(|| layout.as_ref().map(InstallLayout::archive_path))
        .ok_or("either --install or --archive is required")?;

    // Quick inspection modes
    if let Some(prefix) = args.list.as_deref() {
        return list_entries(fs, &archive_path, prefix);
    }
    if let Some(entry) = args.decode.as_deref() {
        return decode_entry(fs, &archive_path, entry);
    }

    let mut options = match args.config.as_deref() {
        Some(p) => ExtractOptions::load(fs.as_ref(), p)?,
        None => ExtractOptions::default(),
    };
    if args.no_override {
        options.include_override = false;
    }

    let mut req = ExtractionRequest {
        archive_path,
        override_profile: args
            .override_profile
            .clone()
            .or_else(|| layout.as_ref().map(InstallLayout::override_profile_path)),
        output_path: PathBuf::new(),
        language_hint: args.language.clone(),
        install_dir: layout.as_ref().map(|l| l.root.clone()),
        force: args.force,
    };

    let extractor = BindingsExtractor::new(fs, options, core_log.clone());
    let language = extractor.resolve_language(&req);
    req.output_path = match args.out.clone() {
        Some(p) => p,
        None => default_output_path(APP_ID, &language)?,
    };
    core_log.info(&format!(
        "Archive: {} | language: {language} | out: {}",
        req.archive_path.display(),
        req.output_path.display()
    ));

    let outcome = extractor.refresh(&req);
    match outcome.status {
        Ok(RefreshStatus::UpToDate) => {
            println!("{} (up to date)", req.output_path.display());
            Ok(())
        }
        Ok(RefreshStatus::Regenerated { action_count }) => {
            println!("{} ({action_count} actions)", req.output_path.display());
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

fn open_archive(fs: Arc<dyn FileSystem>, path: &std::path::Path) -> Result<P4kArchive, String> {
    let mut archive = P4kArchive::new(fs);
    if !archive.open(path) {
        return Err(format!("failed to open archive {}", path.display()));
    }
    Ok(archive)
}

fn list_entries(
    fs: Arc<dyn FileSystem>,
    archive_path: &std::path::Path,
    prefix: &str,
) -> Result<(), String> {
    let mut archive = open_archive(fs, archive_path)?;
    for e in archive.list_directory(prefix) {
        println!(
            "{:>12} {:>12} {} {}",
            e.compressed_size,
            e.uncompressed_size,
            if e.is_compressed { "C" } else { "-" },
            e.path
        );
    }
    Ok(())
}

fn decode_entry(
    fs: Arc<dyn FileSystem>,
    archive_path: &std::path::Path,
    entry: &str,
) -> Result<(), String> {
    let mut archive = open_archive(fs, archive_path)?;
    let wanted = entry.replace('\\', "/");
    let (dir, name) = wanted.rsplit_once('/').unwrap_or(("", wanted.as_str()));
    let found = archive
        .scan_directory(dir, name)
        .into_iter()
        .next()
        .ok_or_else(|| format!("no entry {entry} in {}", archive_path.display()))?;
    let bytes = archive
        .read_bytes(&found)
        .ok_or_else(|| format!("failed to read {}", found.path))?;

    let text = if cryxml::is_cry_xml(&bytes) {
        cryxml::decode_to_string(&bytes).map_err(|e| format!("{}: {e}", found.path))?
    } else {
        decode_text(&bytes)
    };
    println!("{text}");
    Ok(())
}
