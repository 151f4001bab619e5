//! Doctor command - verify external tools, credentials and local paths.

use crate::cli::output::format_size;
use crate::cli::preflight::needs_supabase;
use crate::cli::Output;
use crate::config::{MetadataProvider, Settings, StorageProvider};
use crate::openai::is_api_key_configured;
use console::style;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Error,
}

/// Outcome of one diagnostic.
#[derive(Debug)]
pub struct Check {
    pub name: &'static str,
    pub status: Status,
    pub detail: String,
    pub hint: Option<String>,
}

impl Check {
    fn new(name: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
            hint: None,
        }
    }

    fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn print(&self) {
        let icon = match self.status {
            Status::Ok => style("✓").green(),
            Status::Warning => style("!").yellow(),
            Status::Error => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(self.name).bold(), self.detail);
        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// An external binary the pipeline shells out to.
struct Tool<'a> {
    name: &'static str,
    binary: &'a str,
    version_arg: &'static str,
    homepage: &'static str,
    brew: &'static str,
    linux: &'static str,
}

impl Tool<'_> {
    fn install_hint(&self) -> String {
        if cfg!(target_os = "macos") {
            format!("Install with: brew install {}", self.brew)
        } else if cfg!(target_os = "linux") {
            format!("Install with: {} (or your package manager)", self.linux)
        } else {
            format!("Install from: {}", self.homepage)
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("tldw Doctor");
    println!();

    let sections = [
        ("External Tools", check_tools(settings)),
        ("API Configuration", vec![check_openai_api_key()]),
        ("Storage", check_storage(settings)),
        ("Local Paths", check_paths(settings)),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                Status::Error => errors += 1,
                Status::Warning => warnings += 1,
                Status::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!("{} error(s) found. Fix them before running the pipeline.", errors));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! tldw is ready to use.");
    }

    Ok(())
}

fn check_tools(settings: &Settings) -> Vec<Check> {
    [
        Tool {
            name: "yt-dlp",
            binary: &settings.source.ytdlp_path,
            version_arg: "--version",
            homepage: "https://github.com/yt-dlp/yt-dlp",
            brew: "yt-dlp",
            linux: "pip install yt-dlp",
        },
        Tool {
            name: "ffmpeg",
            binary: &settings.segmenter.ffmpeg_path,
            version_arg: "-version",
            homepage: "https://ffmpeg.org/download.html",
            brew: "ffmpeg",
            linux: "sudo apt install ffmpeg",
        },
    ]
    .iter()
    .map(check_tool)
    .collect()
}

fn check_tool(tool: &Tool<'_>) -> Check {
    match Command::new(tool.binary).arg(tool.version_arg).output() {
        Ok(output) if output.status.success() => {
            let version: String = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(50)
                .collect();
            Check::new(tool.name, Status::Ok, version)
        }
        Ok(output) => Check::new(
            tool.name,
            Status::Error,
            format!("{} exited with {}", tool.binary, output.status),
        )
        .hint(tool.install_hint()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Check::new(tool.name, Status::Error, format!("{} not found", tool.binary))
                .hint(tool.install_hint())
        }
        Err(e) => Check::new(tool.name, Status::Error, format!("error: {}", e)).hint(tool.install_hint()),
    }
}

fn check_openai_api_key() -> Check {
    if is_api_key_configured() {
        Check::new("OPENAI_API_KEY", Status::Ok, "configured")
    } else {
        Check::new("OPENAI_API_KEY", Status::Error, "not set")
            .hint("export OPENAI_API_KEY='sk-...' (needed by transcribe and summarize)")
    }
}

fn check_storage(settings: &Settings) -> Vec<Check> {
    let mut checks = vec![Check::new(
        "Providers",
        Status::Ok,
        format!(
            "storage: {}, metadata: {}",
            settings.storage.provider, settings.metadata.provider
        ),
    )];

    if settings.storage.provider == StorageProvider::Memory {
        checks.push(
            Check::new("Storage", Status::Warning, "memory provider")
                .hint("Objects vanish when the process exits; use local or supabase to keep them"),
        );
    }

    if needs_supabase(settings) {
        checks.push(match settings.storage.resolved_url() {
            Some(url) => Check::new("SUPABASE_URL", Status::Ok, url),
            None => Check::new("SUPABASE_URL", Status::Error, "not set")
                .hint("Set storage.url in the config or export SUPABASE_URL"),
        });
        checks.push(match settings.storage.resolved_api_key() {
            Some(_) => Check::new("SUPABASE_KEY", Status::Ok, "configured"),
            None => Check::new("SUPABASE_KEY", Status::Error, "not set")
                .hint("Set storage.api_key in the config or export SUPABASE_KEY"),
        });
    }

    checks
}

fn check_paths(settings: &Settings) -> Vec<Check> {
    let mut checks = vec![existing_or(
        "Work directory",
        &settings.work_dir(),
        "created on first ingest",
    )];

    if settings.storage.provider == StorageProvider::Local {
        checks.push(existing_or(
            "Storage directory",
            &settings.local_storage_dir(),
            "created on first upload",
        ));
    }

    if settings.metadata.provider == MetadataProvider::Sqlite {
        let db_path = settings.sqlite_path();
        checks.push(match std::fs::metadata(&db_path) {
            Ok(meta) => Check::new(
                "Database",
                Status::Ok,
                format!("{} ({})", db_path.display(), format_size(meta.len())),
            ),
            Err(_) => existing_or("Database", &db_path, "created on first ingest"),
        });
    }

    let config_path = Settings::default_config_path();
    checks.push(if config_path.exists() {
        Check::new("Config file", Status::Ok, config_path.display().to_string())
    } else {
        Check::new("Config file", Status::Warning, "using defaults")
            .hint("Create with: tldw config set <key> <value>")
    });

    checks
}

fn existing_or(name: &'static str, path: &Path, later: &str) -> Check {
    if path.exists() {
        Check::new(name, Status::Ok, path.display().to_string())
    } else {
        Check::new(name, Status::Warning, format!("{} (missing)", path.display())).hint(later)
    }
}
