//! mermaid-dash - a mermaid diagram dashboard in the terminal.
//!
//! # Usage
//!
//! ```bash
//! mermaid-dash login --guest --name Ada
//! mermaid-dash new "Checkout flow" --thumbnail cover.png
//! mermaid-dash list
//! mermaid-dash edit <ID>
//! mermaid-dash export <ID> --format png
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use mermaid_dash::app::{App, Effects, Services};
use mermaid_dash::config::{
    ConfigFlags, ThemeMode, clear_config_flags, default_data_dir, global_config_path,
    load_config_flags, local_override_path, parse_flag_tokens, save_config_flags,
};
use mermaid_dash::dashboard::{Dashboard, DiagramForm, SignIn, Thumbnail, format_listing};
use mermaid_dash::debounce::{AUTOSAVE_QUIET_MS, RENDER_SETTLE_MS};
use mermaid_dash::editor::{EditorSettings, ExportFormat, Route};
use mermaid_dash::identity::{LocalIdentity, Provider, SessionContext};
use mermaid_dash::notify::{Level, Notification, Notifier, TracingNotifier};
use mermaid_dash::render::MermaidRenderer;
use mermaid_dash::store::{DiagramId, DirBlobStore, JsonFileStore, RecordStore};

/// A mermaid diagram dashboard with a live terminal editor
#[derive(Parser, Debug)]
#[command(name = "mermaid-dash", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding diagrams, thumbnails and the session
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Directory exports are written to
    #[arg(long, value_name = "DIR", global = true)]
    export_dir: Option<PathBuf>,

    /// Preview backdrop: light or dark terminal
    #[arg(long, value_enum, global = true)]
    theme: Option<ThemeMode>,

    /// Write log output to a file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Quiet period before an edit is saved
    #[arg(long, value_name = "MS", global = true)]
    autosave_ms: Option<u64>,

    /// Quiet period before an edit is re-rendered
    #[arg(long, value_name = "MS", global = true)]
    render_delay_ms: Option<u64>,

    /// Show a text summary instead of the rasterized preview
    #[arg(long, global = true)]
    no_preview: bool,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in as a guest or through a provider
    Login {
        #[arg(long, conflicts_with = "provider")]
        guest: bool,

        #[arg(long, value_enum)]
        provider: Option<Provider>,

        /// Display name for your profile
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your diagrams, newest first
    List,
    /// Create a diagram with starter code
    New {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Cover image to upload
        #[arg(long, value_name = "PATH")]
        thumbnail: Option<PathBuf>,
    },
    /// Delete one of your diagrams
    Delete { id: String },
    /// Open a diagram in the editor
    Edit { id: String },
    /// Render a diagram to a file
    Export {
        id: String,

        #[arg(long, value_enum, default_value = "svg")]
        format: ExportFormat,
    },
}

/// Notifier for one-shot commands: prints to stderr and logs.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let tag = match notification.level {
            Level::Success => "ok",
            Level::Error => "error",
            Level::Info | Level::Progress => "info",
        };
        eprintln!("[{tag}] {notification}");
        TracingNotifier.notify(notification);
    }
}

/// Everything a command needs, opened from the data directory.
struct Workspace {
    runtime: Runtime,
    store: Arc<dyn RecordStore>,
    session: SessionContext,
    dashboard: Dashboard,
    effects: Effects,
    settings: EditorSettings,
    preview: bool,
    backdrop: [u8; 3],
}

impl Workspace {
    fn open(effective: &ConfigFlags) -> Result<Self> {
        let data_dir = effective.data_dir.clone().unwrap_or_else(default_data_dir);
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start runtime")?;

        let store: Arc<dyn RecordStore> = Arc::new(
            JsonFileStore::open(data_dir.join("store.json")).context("Failed to open store")?,
        );
        let blobs = Arc::new(DirBlobStore::new(data_dir.join("blobs"), "thumbnails"));
        let session =
            SessionContext::init(data_dir.join("session.json")).context("Failed to load session")?;

        let effects = Effects::new(
            Services {
                store: Arc::clone(&store),
                renderer: Arc::new(MermaidRenderer::new()),
                notifier: Arc::new(TracingNotifier),
            },
            effective
                .export_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
        );
        let dashboard = Dashboard::new(Arc::clone(&store), blobs, Arc::new(ConsoleNotifier));
        let settings = EditorSettings {
            autosave_ms: effective.autosave_ms.unwrap_or(AUTOSAVE_QUIET_MS),
            render_settle_ms: effective.render_delay_ms.unwrap_or(RENDER_SETTLE_MS),
        };

        Ok(Self {
            runtime,
            store,
            session,
            dashboard,
            effects,
            settings,
            preview: !effective.no_preview,
            backdrop: effective.theme.unwrap_or(ThemeMode::Dark).backdrop(),
        })
    }

    fn identity(&self) -> LocalIdentity {
        LocalIdentity::with_user(self.session.user())
    }

    fn print_listing(&self) -> Result<()> {
        let records = self
            .runtime
            .block_on(self.dashboard.list(&self.session))
            .context("Failed to list diagrams")?;
        print!("{}", format_listing(&records));
        Ok(())
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn run(command: Commands, ctx: &Workspace) -> Result<()> {
    match command {
        Commands::Login {
            guest: _,
            provider,
            name,
        } => {
            let method = provider.map_or(SignIn::Guest, SignIn::Provider);
            let identity = ctx.identity();
            let mut state = ctx
                .runtime
                .block_on(ctx.dashboard.sign_in(&identity, &ctx.session, method))
                .context("Sign-in failed")?;
            if let Some(name) = name {
                state = ctx
                    .runtime
                    .block_on(ctx.dashboard.set_display_name(&ctx.session, &name))
                    .context("Failed to save profile")?;
            }
            println!("Signed in as {} ({})", state.display_name(), state.user.id);
        }
        Commands::Logout => {
            let identity = ctx.identity();
            ctx.runtime
                .block_on(ctx.dashboard.sign_out(&identity, &ctx.session))
                .context("Sign-out failed")?;
            println!("Signed out");
        }
        Commands::Whoami => match ctx.session.current() {
            Some(state) => {
                let via = state
                    .user
                    .provider
                    .map_or(if state.user.is_anonymous { "guest" } else { "local" }, Provider::as_str);
                println!("{} ({}, {via})", state.display_name(), state.user.id);
            }
            None => println!("Not signed in"),
        },
        Commands::List => ctx.print_listing()?,
        Commands::New {
            title,
            description,
            thumbnail,
        } => {
            let thumbnail = thumbnail
                .map(|path| read_thumbnail(&path))
                .transpose()?;
            let form = DiagramForm {
                title,
                description,
                thumbnail,
            };
            let record = ctx
                .runtime
                .block_on(ctx.dashboard.create(&ctx.session, form))
                .context("Failed to create diagram")?;
            println!("{}", record.id);
        }
        Commands::Delete { id } => {
            ctx.runtime
                .block_on(ctx.dashboard.delete(&ctx.session, &DiagramId::from(id)))
                .context("Failed to delete diagram")?;
        }
        Commands::Edit { id } => {
            if ctx.session.current().is_none() {
                anyhow::bail!("Not signed in: run `mermaid-dash login` first");
            }
            let app = App::new(ctx.effects.clone(), ctx.runtime.handle().clone())
                .with_settings(ctx.settings)
                .with_preview(ctx.preview)
                .with_backdrop(ctx.backdrop);
            match app.run(DiagramId::from(id)).context("Application error")? {
                Route::Listing => ctx.print_listing()?,
            }
        }
        Commands::Export { id, format } => {
            let id = DiagramId::from(id);
            let record = ctx
                .runtime
                .block_on(ctx.store.fetch(&id))
                .context("Failed to fetch diagram")?
                .with_context(|| format!("Diagram {id} not found"))?;
            let path = ctx
                .runtime
                .block_on(ctx.effects.export_record(&record, format))
                .context("Export failed")?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn read_thumbnail(path: &Path) -> Result<Thumbnail> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read thumbnail {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Thumbnail { file_name, bytes })
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    // The editor owns the terminal, so its log goes to a file by default.
    let log_file = effective.log_file.clone().or_else(|| {
        matches!(cli.command, Some(Commands::Edit { .. })).then(|| {
            effective
                .data_dir
                .clone()
                .unwrap_or_else(default_data_dir)
                .join("editor.log")
        })
    });
    if let Some(parent) = log_file
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log dir {}", parent.display()))?;
    }
    init_logging(log_file.as_deref())?;

    let Some(command) = cli.command else {
        if cli.save || cli.clear {
            return Ok(());
        }
        anyhow::bail!("No command given; see `mermaid-dash --help`");
    };

    let ctx = Workspace::open(&effective)?;
    run(command, &ctx)
}
