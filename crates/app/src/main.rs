use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use course_core::model::{ComponentKind, CourseClass};
use services::config::{api_settings_from_env, sync_policy_from_env};
use services::{
    ComponentPosition, ComponentShell, ContentApi, HttpContentApi, HttpProgressApi, MediaEvent,
    ShellContext,
};
use storage::Storage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Time given to background writes before the process exits.
const WRITE_GRACE: Duration = Duration::from_millis(750);

/// Media seconds simulated per `watch` tick.
const WATCH_STEP_SECS: f64 = 1.0;
const WATCH_TICK: Duration = Duration::from_millis(100);

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidComponent { raw: String },
    InvalidDbUrl { raw: String },
    UnknownComponent { kind: ComponentKind, class_index: usize },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidComponent { raw } => write!(f, "invalid --component value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::UnknownComponent { kind, class_index } => {
                write!(f, "class {class_index} has no {kind} component")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Complete,
    Watch,
    Read,
    Write,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "complete" => Some(Self::Complete),
            "watch" => Some(Self::Watch),
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    course: String,
    class_index: usize,
    component: Option<ComponentKind>,
    duration: f64,
    prompt: usize,
    text: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  learn status   --course <slug> [--class <index>]");
    eprintln!("  learn complete --course <slug> [--class <index>] --component <kind>");
    eprintln!("  learn watch    --course <slug> [--class <index>] [--duration <secs>]");
    eprintln!("  learn read     --course <slug> [--class <index>]");
    eprintln!("  learn write    --course <slug> [--class <index>] [--prompt <index>] --text <text>");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>   local draft store (default sqlite://drafts.sqlite3)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_API_BASE_URL, LEARN_API_TOKEN, LEARN_API_TIMEOUT_SECS, LEARN_DB_URL");
    eprintln!("  LEARN_SYNC_MIN_DELTA, LEARN_READING_DWELL_SECS, RUST_LOG");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LEARN_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://drafts.sqlite3".into(), normalize_sqlite_url);
        let mut course = None;
        let mut class_index = 0;
        let mut component = None;
        let mut duration = 60.0;
        let mut prompt = 0;
        let mut text = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--course" => course = Some(require_value(args, "--course")?),
                "--class" => class_index = parse_number(require_value(args, "--class")?, "--class")?,
                "--component" => {
                    let value = require_value(args, "--component")?;
                    let kind = ComponentKind::from_wire_key(&value)
                        .map_err(|_| ArgsError::InvalidComponent { raw: value.clone() })?;
                    component = Some(kind);
                }
                "--duration" => {
                    let value: f64 = parse_number(require_value(args, "--duration")?, "--duration")?;
                    if !(value.is_finite() && value > 0.0) {
                        return Err(ArgsError::InvalidNumber {
                            flag: "--duration",
                            raw: value.to_string(),
                        });
                    }
                    duration = value;
                }
                "--prompt" => prompt = parse_number(require_value(args, "--prompt")?, "--prompt")?,
                "--text" => text = Some(require_value(args, "--text")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course: course.ok_or(ArgsError::MissingFlag { flag: "--course" })?,
            class_index,
            component,
            duration,
            prompt,
            text,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open the shell on the component of `kind` within the requested class.
async fn open_component(
    ctx: ShellContext,
    content: &dyn ContentApi,
    args: &Args,
    kind: ComponentKind,
) -> Result<ComponentShell, Box<dyn std::error::Error>> {
    let class = content.class(&args.course, args.class_index).await?;
    let position = position_of(&class, kind, args.class_index)?;
    let shell = ComponentShell::load(
        ctx,
        &args.course,
        args.class_index,
        ComponentPosition::Index(position),
    )
    .await?;
    Ok(shell)
}

fn position_of(class: &CourseClass, kind: ComponentKind, class_index: usize) -> Result<usize, ArgsError> {
    class
        .position_of(kind)
        .ok_or(ArgsError::UnknownComponent { kind, class_index })
}

fn print_status(shell: &ComponentShell) {
    println!(
        "{} / class {}: {}",
        shell.course().title(),
        shell.class().index(),
        shell.class().title()
    );
    for (kind, completed) in shell.completion_flags() {
        let marker = if completed { "done" } else { "    " };
        println!("  [{marker}] {kind:<22} {}", shell.sync().fraction(kind));
    }
    println!("  overall {}", shell.aggregate_progress());
}

async fn watch(shell: &mut ComponentShell, duration: f64) {
    shell.handle_media(MediaEvent::LoadStart);
    let mut position = shell
        .handle_media(MediaEvent::MetadataLoaded { duration })
        .unwrap_or(0.0);
    if position > 0.0 {
        info!(position, "resuming playback");
    }
    shell.handle_media(MediaEvent::Play);

    let mut ticker = tokio::time::interval(WATCH_TICK);
    while position < duration {
        ticker.tick().await;
        position = (position + WATCH_STEP_SECS).min(duration);
        shell.handle_media(MediaEvent::TimeUpdate {
            current_time: position,
        });
    }
    shell.handle_media(MediaEvent::Ended);
}

async fn read(shell: &ComponentShell) {
    let mut ticker = tokio::time::interval(Duration::from_secs(10));
    while !shell.sync().is_completed(ComponentKind::KeyConcepts) {
        ticker.tick().await;
        if let Some(elapsed) = shell.reading_elapsed() {
            info!(elapsed_secs = elapsed.as_secs(), "reading");
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    let settings = api_settings_from_env()?;
    let policy = sync_policy_from_env()?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;

    let content = Arc::new(HttpContentApi::new(settings.clone())?);
    let progress = Arc::new(HttpProgressApi::new(settings)?);
    let ctx = ShellContext::new(content.clone(), progress, storage.drafts.clone()).with_policy(policy);

    match cmd {
        Command::Status => {
            let shell =
                ComponentShell::load(ctx, &args.course, args.class_index, ComponentPosition::Index(0))
                    .await?;
            print_status(&shell);
        }
        Command::Complete => {
            let kind = args.component.ok_or(ArgsError::MissingFlag {
                flag: "--component",
            })?;
            let shell = open_component(ctx, content.as_ref(), &args, kind).await?;
            let outcome = shell.sync().mark_complete(kind).await;
            info!(?outcome, %kind, "completion submitted");
            print_status(&shell);
        }
        Command::Watch => {
            let mut shell = open_component(ctx, content.as_ref(), &args, ComponentKind::Video).await?;
            watch(&mut shell, args.duration).await;
            tokio::time::sleep(WRITE_GRACE).await;
            print_status(&shell);
        }
        Command::Read => {
            let shell =
                open_component(ctx, content.as_ref(), &args, ComponentKind::KeyConcepts).await?;
            read(&shell).await;
            tokio::time::sleep(WRITE_GRACE).await;
            print_status(&shell);
        }
        Command::Write => {
            let text = args.text.clone().ok_or(ArgsError::MissingFlag { flag: "--text" })?;
            let mut shell =
                open_component(ctx, content.as_ref(), &args, ComponentKind::WritingPrompts).await?;
            if args.prompt >= shell.class().writing_prompts().len() {
                warn!(prompt = args.prompt, "no such prompt; draft not stored");
            }
            shell.edit_response(args.prompt, text).await?;
            tokio::time::sleep(WRITE_GRACE).await;
            print_status(&shell);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
