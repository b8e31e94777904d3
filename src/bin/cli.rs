//! casekit CLI - author, lay out and print investigative game kits
//!
//! Usage: casekit-cli [OPTIONS] <COMMAND>
//!
//! Every command ends with one success or error notice on stderr. Data goes to
//! stdout, as JSON with `--json`.

use casekit_lib::ai_client::{self, ChatClient, ChatTurn};
use casekit_lib::backend::{
    auth, storage, AgentStatus, AgentType, AgentUpdate, BackendClient, CaseStatus, CodeStatus, ModuleStatus,
    NewCase,
};
use casekit_lib::codes;
use casekit_lib::editor::{DocumentEditor, EditorField};
use casekit_lib::export::{self, CommandRasterizer};
use casekit_lib::extract::Extractor;
use casekit_lib::kit::{Direction, KitLayout};
use casekit_lib::{logging, settings, utils, KitError, Notice, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::error;

#[derive(Parser)]
#[command(name = "casekit-cli")]
#[command(version, about = "Investigative game kit authoring CLI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress progress output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Detailed logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Settings and log directory (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Case management
    Cases {
        #[command(subcommand)]
        cmd: CaseCommands,
    },
    /// Documents of a case kit
    Modules {
        #[command(subcommand)]
        cmd: ModuleCommands,
    },
    /// Activation codes
    Codes {
        #[command(subcommand)]
        cmd: CodeCommands,
    },
    /// AI chat agents
    Agents {
        #[command(subcommand)]
        cmd: AgentCommands,
    },
    /// Object storage for case files
    Storage {
        #[command(subcommand)]
        cmd: StorageCommands,
    },
    /// Settings
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CaseCommands {
    /// List cases, newest first
    List {
        /// Match title or theme
        #[arg(long, short, default_value = "")]
        search: String,
        /// editing, ready_to_print or distributed
        #[arg(long)]
        status: Option<String>,
    },
    /// Create a case
    Create {
        title: String,
        #[arg(long, default_value = "")]
        theme: String,
        #[arg(long, default_value = "editing")]
        status: String,
    },
    /// Delete a case
    Delete { id: String },
}

#[derive(Subcommand)]
enum ModuleCommands {
    /// List the documents of a case in kit order
    List { case_id: String },
    /// Add a placeholder document at the end of the kit
    Add { case_id: String },
    /// Show a document's fields
    Show { id: String },
    /// Change fields and save
    Edit {
        id: String,
        /// field=value (title, body, header, footer, stamp, signature, logo, subtitle)
        #[arg(long = "set", short = 's')]
        sets: Vec<String>,
        /// Read the body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// draft, ready or incomplete
        #[arg(long)]
        status: Option<String>,
    },
    /// Write the preview HTML, with unsaved edits applied
    Preview {
        id: String,
        #[arg(long = "set", short = 's')]
        sets: Vec<String>,
        /// Output file (default: stdout)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Export the document to PDF, with unsaved edits applied
    Export {
        id: String,
        #[arg(long = "set", short = 's')]
        sets: Vec<String>,
        /// Output directory (default: export-dir setting, then the current directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Delete a document
    Delete { id: String },
    /// Move a document up or down in the kit
    Move { id: String, direction: String },
    /// Recover text from a remote PDF or image
    Extract {
        url: String,
        /// Save the text as this document's body
        #[arg(long)]
        into: Option<String>,
    },
}

#[derive(Subcommand)]
enum CodeCommands {
    /// List activation codes, newest first
    List {
        #[arg(long, short, default_value = "")]
        search: String,
        /// active, used or expired
        #[arg(long)]
        status: Option<String>,
    },
    /// Generate a batch of codes for a case
    Generate {
        case_name: String,
        #[arg(long, short = 'n', default_value = "10")]
        quantity: usize,
    },
    /// Export the filtered codes as CSV
    ExportCsv {
        #[arg(long, short, default_value = "")]
        search: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, short, default_value = "codes_export.csv")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// List agents by name
    List,
    /// Update an agent's fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// detective, lab or archivist
        #[arg(long = "type")]
        agent_type: Option<String>,
        /// active, inactive or learning
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        /// Read the system prompt from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Test an agent; messages come from --message or one per stdin line
    Chat {
        id: String,
        #[arg(long = "message", short = 'm')]
        messages: Vec<String>,
        /// Override the agent's model
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Subcommand)]
enum StorageCommands {
    /// Create or update the case file bucket
    Init,
    /// Upload a file for a case and print its public URL
    Upload {
        case_id: String,
        path: PathBuf,
        /// Use the URL as this document's body
        #[arg(long)]
        into: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all settings
    List,
    /// Get a setting value
    Get {
        /// Setting key
        key: String,
    },
    /// Set a setting value
    Set {
        /// Setting key
        key: String,
        /// Setting value
        value: String,
    },
}

impl Commands {
    /// Prefix for the error notice when the command fails.
    fn failure_context(&self) -> &'static str {
        match self {
            Commands::Login { .. } => "Sign-in failed",
            Commands::Logout => "Sign-out failed",
            Commands::Cases { .. } => "Case operation failed",
            Commands::Modules { cmd } => match cmd {
                ModuleCommands::Export { .. } => "Export failed",
                ModuleCommands::Extract { .. } => "Extraction failed",
                ModuleCommands::Edit { .. } => "Save failed",
                _ => "Document operation failed",
            },
            Commands::Codes { .. } => "Code operation failed",
            Commands::Agents { cmd } => match cmd {
                AgentCommands::Chat { .. } => "Chat failed",
                _ => "Agent operation failed",
            },
            Commands::Storage { .. } => "Storage operation failed",
            Commands::Config { .. } => "Config failed",
            Commands::Completions { .. } => "Completions failed",
        }
    }
}

struct Output {
    json: bool,
    quiet: bool,
}

impl Output {
    fn data<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn progress(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }

    fn notice(&self, notice: &Notice) {
        if self.json {
            eprintln!("{}", serde_json::to_string(notice).unwrap_or_default());
        } else {
            eprintln!("{}", notice.render());
        }
    }
}

#[tokio::main]
async fn main() {
    // Ignore SIGPIPE so piping through head doesn't kill the process
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    // println! still panics on a closed pipe; exit quietly instead
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if info.to_string().contains("Broken pipe") {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(settings::default_data_dir);
    settings::init(data_dir.clone());

    if let Commands::Completions { shell } = &cli.command {
        generate(*shell, &mut Cli::command(), "casekit-cli", &mut std::io::stdout());
        return;
    }

    let log_path = logging::init_logging(&data_dir.join("logs"), cli.verbose);
    if cli.verbose {
        if let Some(path) = log_path {
            eprintln!("Logging to: {}", path.display());
        }
    }

    let out = Output {
        json: cli.json,
        quiet: cli.quiet,
    };
    let context = cli.command.failure_context();

    let notice = match run(cli.command, &out).await {
        Ok(message) => Notice::success(message),
        Err(e) => {
            error!(error = %e, "{}", context);
            Notice::from_error(context, &e)
        }
    };
    out.notice(&notice);
    if notice.is_error() {
        std::process::exit(1);
    }
}

async fn run(command: Commands, out: &Output) -> Result<String> {
    match command {
        Commands::Login { email, password } => handle_login(&email, &password).await,
        Commands::Logout => {
            settings::clear_session()?;
            Ok("Signed out".to_string())
        }
        Commands::Cases { cmd } => handle_cases(cmd, out).await,
        Commands::Modules { cmd } => handle_modules(cmd, out).await,
        Commands::Codes { cmd } => handle_codes(cmd, out).await,
        Commands::Agents { cmd } => handle_agents(cmd, out).await,
        Commands::Storage { cmd } => handle_storage(cmd, out).await,
        Commands::Config { cmd } => handle_config(cmd, out),
        Commands::Completions { .. } => Ok(String::new()),
    }
}

/// Parse an optional status flag with the enum's `from_str`.
fn parse_flag<T>(value: Option<&str>, parse: fn(&str) -> Option<T>, what: &str) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(v) => parse(v)
            .map(Some)
            .ok_or_else(|| KitError::Validation(format!("Unknown {} '{}'", what, v))),
    }
}

/// `field=value` → editor field and value.
fn parse_assignment(raw: &str) -> Result<(EditorField, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| KitError::Validation(format!("Expected field=value, got '{}'", raw)))?;
    let field = EditorField::from_str(name.trim())
        .ok_or_else(|| KitError::Validation(format!("Unknown field '{}'", name.trim())))?;
    Ok((field, value.to_string()))
}

/// Load a module into an editor and apply `field=value` edits without saving.
async fn open_editor(client: &BackendClient, id: &str, sets: &[String]) -> Result<DocumentEditor> {
    let module = client.get_module(id).await?;
    let mut editor = DocumentEditor::open(&module);
    for raw in sets {
        let (field, value) = parse_assignment(raw)?;
        editor.set_field(field, &value)?;
    }
    Ok(editor)
}

// ==================== Auth ====================

async fn handle_login(email: &str, password: &str) -> Result<String> {
    auth::validate_credentials(email, password)?;
    let client = BackendClient::from_settings()?;
    let session = auth::sign_in(&client, email, password).await?;
    let email = session.email.clone();
    settings::set_session(session)?;
    Ok(format!("Signed in as {}", email))
}

// ==================== Cases ====================

async fn handle_cases(cmd: CaseCommands, out: &Output) -> Result<String> {
    let client = BackendClient::from_settings()?;
    match cmd {
        CaseCommands::List { search, status } => {
            let status = parse_flag(status.as_deref(), CaseStatus::from_str, "case status")?;
            let cases = client.list_cases().await?;
            let shown: Vec<_> = cases.iter().filter(|c| c.matches(&search, status)).collect();
            if out.json {
                out.data(&shown)?;
            } else {
                for case in &shown {
                    println!(
                        "{}  {:<15} {} [{}] sold: {}",
                        case.id,
                        case.status.as_str(),
                        case.title,
                        case.theme,
                        case.copies_sold
                    );
                }
            }
            Ok(format!("{} of {} cases", shown.len(), cases.len()))
        }
        CaseCommands::Create { title, theme, status } => {
            let status = parse_flag(Some(&status), CaseStatus::from_str, "case status")?.unwrap_or(CaseStatus::Editing);
            let case = client
                .create_case(&NewCase {
                    title: title.trim().to_string(),
                    theme,
                    status,
                })
                .await?;
            if out.json {
                out.data(&case)?;
            } else {
                println!("{}", case.id);
            }
            Ok(format!("Created case '{}'", case.title))
        }
        CaseCommands::Delete { id } => {
            client.delete_case(&id).await?;
            Ok("Case deleted".to_string())
        }
    }
}

// ==================== Modules ====================

async fn handle_modules(cmd: ModuleCommands, out: &Output) -> Result<String> {
    let client = BackendClient::from_settings()?;
    match cmd {
        ModuleCommands::List { case_id } => {
            let layout = KitLayout::load(&client, &case_id).await?;
            if out.json {
                out.data(layout.modules())?;
            } else {
                for (i, m) in layout.modules().iter().enumerate() {
                    println!("{:>3}. {}  {:<9} {:<10} {}", i + 1, m.id, m.kind.as_str(), m.status.as_str(), m.title);
                }
            }
            Ok(format!("{} documents in the kit", layout.modules().len()))
        }
        ModuleCommands::Add { case_id } => {
            let mut layout = KitLayout::load(&client, &case_id).await?;
            let module = layout.add_document(&client).await?.clone();
            if out.json {
                out.data(&module)?;
            } else {
                println!("{}", module.id);
            }
            Ok("Document added".to_string())
        }
        ModuleCommands::Show { id } => {
            let module = client.get_module(&id).await?;
            let editor = DocumentEditor::open(&module);
            if out.json {
                out.data(&serde_json::json!({
                    "id": module.id,
                    "case_id": module.case_id,
                    "title": editor.title(),
                    "type": module.kind,
                    "status": module.status,
                    "format": editor.format().label(),
                    "content": editor.envelope(),
                }))?;
            } else {
                println!("id:       {}", module.id);
                println!("kind:     {}", module.kind.as_str());
                println!("status:   {}", module.status.as_str());
                println!("format:   {}", editor.format().label());
                for field in EditorField::ALL {
                    println!("{:<9} {}", format!("{}:", field.as_str()), editor.field(field));
                }
            }
            Ok(format!("Loaded '{}'", editor.title()))
        }
        ModuleCommands::Edit { id, sets, body_file, status } => {
            let status = parse_flag(status.as_deref(), ModuleStatus::from_str, "document status")?;
            let mut editor = open_editor(&client, &id, &sets).await?;
            if let Some(path) = body_file {
                let body = std::fs::read_to_string(&path)?;
                editor.set_field(EditorField::Body, &body)?;
            }
            if !editor.is_dirty() && status.is_none() {
                return Ok("Nothing to change".to_string());
            }
            if editor.is_dirty() {
                editor.save(&client).await?;
            }
            if let Some(status) = status {
                client.update_module_status(&id, status).await?;
            }
            Ok("Document saved".to_string())
        }
        ModuleCommands::Preview { id, sets, out: path } => {
            let editor = open_editor(&client, &id, &sets).await?;
            match path {
                Some(path) => {
                    std::fs::write(&path, editor.preview())?;
                    Ok(format!("Preview written to {}", path.display()))
                }
                None => {
                    println!("{}", editor.preview());
                    Ok("Preview rendered".to_string())
                }
            }
        }
        ModuleCommands::Export { id, sets, out_dir } => {
            let editor = open_editor(&client, &id, &sets).await?;
            let out_dir = out_dir
                .or_else(|| settings::get_export_dir().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            out.progress(&format!("Rendering '{}' ({})...", editor.title(), editor.format().label()));
            let report = export::export_document(&editor, &CommandRasterizer::from_settings(), &out_dir)?;
            if out.json {
                out.data(&report)?;
            }
            Ok(format!(
                "Exported {} ({} page{})",
                report.path.display(),
                report.pages,
                if report.pages == 1 { "" } else { "s" }
            ))
        }
        ModuleCommands::Delete { id } => {
            let module = client.get_module(&id).await?;
            let mut layout = KitLayout::load(&client, &module.case_id).await?;
            layout.remove(&client, &id).await?;
            Ok(format!("Deleted '{}'", module.title))
        }
        ModuleCommands::Move { id, direction } => {
            let direction = Direction::from_str(&direction)
                .ok_or_else(|| KitError::Validation(format!("Direction must be up or down, got '{}'", direction)))?;
            let module = client.get_module(&id).await?;
            let mut layout = KitLayout::load(&client, &module.case_id).await?;
            let index = layout
                .position(&id)
                .ok_or_else(|| KitError::NotFound(format!("module {}", id)))?;
            if !layout.move_item(index, direction) {
                return Ok(format!("'{}' is already at the edge of the kit", module.title));
            }
            layout.persist_order(&client).await?;
            Ok("Order saved".to_string())
        }
        ModuleCommands::Extract { url, into } => handle_extract(&client, &url, into.as_deref(), out).await,
    }
}

async fn handle_extract(client: &BackendClient, url: &str, into: Option<&str>, out: &Output) -> Result<String> {
    let http = reqwest::Client::builder().timeout(Duration::from_secs(120)).build()?;
    let extractor = Extractor::from_settings();
    let quiet = out.quiet;
    let mut report = move |percent: u8| {
        if !quiet {
            eprint!("\rExtracting... {:>3}%", percent);
        }
    };
    let result = extractor.extract_from_url(&http, url, &mut report).await;
    if !out.quiet {
        eprintln!();
    }
    let text = result?;
    let chars = text.chars().count();

    match into {
        Some(id) => {
            let mut editor = open_editor(client, id, &[]).await?;
            editor.set_field(EditorField::Body, &text)?;
            editor.save(client).await?;
            Ok(format!("Extracted {} characters into '{}'", chars, editor.title()))
        }
        None => {
            if out.json {
                out.data(&serde_json::json!({ "url": url, "chars": chars, "text": text }))?;
            } else {
                println!("{}", text);
            }
            Ok(format!("Extracted {} characters", chars))
        }
    }
}

// ==================== Codes ====================

async fn handle_codes(cmd: CodeCommands, out: &Output) -> Result<String> {
    let client = BackendClient::from_settings()?;
    match cmd {
        CodeCommands::List { search, status } => {
            let status = parse_flag(status.as_deref(), CodeStatus::from_str, "code status")?;
            let all = client.list_codes().await?;
            let shown = codes::filter_codes(&all, &search, status);
            if out.json {
                out.data(&shown)?;
            } else {
                for code in &shown {
                    println!(
                        "{}  {:<8} {}  used: {}",
                        code.code,
                        code.status.as_str(),
                        code.case_name,
                        code.used_at.as_deref().map(|d| utils::safe_truncate(d, 10)).unwrap_or("-")
                    );
                }
            }
            Ok(format!("{} of {} codes", shown.len(), all.len()))
        }
        CodeCommands::Generate { case_name, quantity } => {
            let batch = codes::generate_codes(&case_name, quantity, &mut rand::thread_rng())?;
            let inserted = client.insert_codes(&batch).await?;
            if out.json {
                out.data(&inserted)?;
            } else {
                for code in &inserted {
                    println!("{}", code.code);
                }
            }
            Ok(format!("{} codes generated for {}", inserted.len(), case_name.trim()))
        }
        CodeCommands::ExportCsv { search, status, out: path } => {
            let status = parse_flag(status.as_deref(), CodeStatus::from_str, "code status")?;
            let all = client.list_codes().await?;
            let shown = codes::filter_codes(&all, &search, status);
            let csv = codes::to_csv(&shown)?;
            std::fs::write(&path, csv)?;
            Ok(format!("Exported {} codes to {}", shown.len(), path.display()))
        }
    }
}

// ==================== Agents ====================

async fn handle_agents(cmd: AgentCommands, out: &Output) -> Result<String> {
    let client = BackendClient::from_settings()?;
    match cmd {
        AgentCommands::List => {
            let agents = client.list_agents().await?;
            if out.json {
                out.data(&agents)?;
            } else {
                for agent in &agents {
                    println!(
                        "{}  {:<10} {:<9} {:<18} {}",
                        agent.id,
                        agent.agent_type.as_str(),
                        agent.status.as_str(),
                        if agent.model.is_empty() { "-" } else { &agent.model },
                        agent.name
                    );
                }
            }
            Ok(format!("{} agents", agents.len()))
        }
        AgentCommands::Update {
            id,
            name,
            agent_type,
            status,
            prompt,
            prompt_file,
            model,
        } => {
            let system_prompt = match prompt_file {
                Some(path) => Some(std::fs::read_to_string(&path)?),
                None => prompt,
            };
            let update = AgentUpdate {
                name,
                agent_type: parse_flag(agent_type.as_deref(), AgentType::from_str, "agent type")?,
                status: parse_flag(status.as_deref(), AgentStatus::from_str, "agent status")?,
                system_prompt,
                model,
                last_interaction: Some(chrono::Utc::now().to_rfc3339()),
            };
            client.update_agent(&id, &update).await?;
            Ok("Agent saved".to_string())
        }
        AgentCommands::Chat { id, messages, model } => {
            let agent = client.get_agent(&id).await?;
            let chat = ChatClient::from_settings()?;
            let model = model.unwrap_or_else(|| ai_client::resolve_model(&agent.model));
            out.progress(&format!("Chatting with {} ({})", agent.name, model));

            let mut history: Vec<ChatTurn> = Vec::new();
            let lines: Vec<String> = if messages.is_empty() {
                std::io::stdin().lock().lines().collect::<std::io::Result<_>>()?
            } else {
                messages
            };
            for line in &lines {
                if let Some(reply) = chat
                    .send_message(&model, &agent.system_prompt, &mut history, line)
                    .await?
                {
                    if !out.json {
                        println!("> {}\n{}\n", line.trim(), reply);
                    }
                }
            }
            if out.json {
                out.data(&history)?;
            }
            Ok(format!("{} replies from {}", history.len() / 2, agent.name))
        }
    }
}

// ==================== Storage ====================

async fn handle_storage(cmd: StorageCommands, out: &Output) -> Result<String> {
    let client = BackendClient::from_settings()?;
    let bucket = settings::get_storage_bucket();
    match cmd {
        StorageCommands::Init => {
            let state = storage::ensure_bucket(&client, &bucket).await?;
            Ok(match state {
                storage::BucketState::Created => format!("Bucket '{}' created", bucket),
                storage::BucketState::Updated => format!("Bucket '{}' updated", bucket),
            })
        }
        StorageCommands::Upload { case_id, path, into } => {
            let url = storage::upload_file(&client, &bucket, &case_id, &path).await?;
            if out.json {
                out.data(&serde_json::json!({ "url": url }))?;
            } else {
                println!("{}", url);
            }
            if let Some(id) = into {
                let mut editor = open_editor(&client, &id, &[]).await?;
                editor.set_field(EditorField::Body, &url)?;
                editor.save(&client).await?;
                return Ok(format!("Uploaded {} and attached it to '{}'", file_label(&path), editor.title()));
            }
            Ok(format!("Uploaded {}", file_label(&path)))
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

// ==================== Config ====================

const CONFIG_KEYS: &[&str] = &[
    "backend-url",
    "anon-key",
    "gemini-api-key",
    "gemini-model",
    "storage-bucket",
    "ocr-language",
    "min-text-chars",
    "rasterizer",
    "export-dir",
];

fn config_value(key: &str) -> Result<String> {
    let not_set = || "not set".to_string();
    Ok(match key {
        "backend-url" => settings::get_backend_url().unwrap_or_else(not_set),
        "anon-key" => settings::get_anon_key()
            .map(|k| settings::mask_secret(&k))
            .unwrap_or_else(not_set),
        "gemini-api-key" => settings::get_masked_gemini_api_key().unwrap_or_else(not_set),
        "gemini-model" => settings::get_gemini_model(),
        "storage-bucket" => settings::get_storage_bucket(),
        "ocr-language" => settings::get_ocr_language(),
        "min-text-chars" => settings::get_min_text_chars().to_string(),
        "rasterizer" => settings::get_rasterizer(),
        "export-dir" => settings::get_export_dir().unwrap_or_else(not_set),
        _ => return Err(KitError::Validation(format!("Unknown config key: {}", key))),
    })
}

fn handle_config(cmd: ConfigCommands, out: &Output) -> Result<String> {
    match cmd {
        ConfigCommands::List => {
            let session = settings::get_session().map(|s| s.email);
            let tools = [settings::get_rasterizer(), "tesseract".to_string(), "pdftoppm".to_string()];
            if out.json {
                let mut map = serde_json::Map::new();
                for key in CONFIG_KEYS {
                    map.insert(key.to_string(), config_value(key)?.into());
                }
                map.insert("session".into(), session.into());
                for tool in &tools {
                    map.insert(format!("tool:{}", tool), utils::command_available(tool).into());
                }
                out.data(&map)?;
            } else {
                for key in CONFIG_KEYS {
                    println!("{:<16} {}", format!("{}:", key), config_value(key)?);
                }
                println!("{:<16} {}", "session:", session.as_deref().unwrap_or("signed out"));
                for tool in &tools {
                    let found = if utils::command_available(tool) { "found" } else { "missing" };
                    println!("{:<16} {}", format!("{}:", tool), found);
                }
            }
            Ok(format!("Settings from {}", settings::config_path_display()))
        }
        ConfigCommands::Get { key } => {
            let value = config_value(&key)?;
            if out.json {
                let mut map = serde_json::Map::new();
                map.insert(key.clone(), value.into());
                out.data(&map)?;
            } else {
                println!("{}", value);
            }
            Ok(format!("Read {}", key))
        }
        ConfigCommands::Set { key, value } => {
            match key.as_str() {
                "backend-url" => settings::set_backend_url(value.trim().to_string())?,
                "anon-key" => settings::set_anon_key(value.trim().to_string())?,
                "gemini-api-key" => settings::set_gemini_api_key(value.trim().to_string())?,
                "gemini-model" => settings::set_gemini_model(value.trim().to_string())?,
                "storage-bucket" => settings::set_storage_bucket(value.trim().to_string())?,
                "ocr-language" => settings::set_ocr_language(value.trim().to_string())?,
                "min-text-chars" => {
                    let chars = value
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| KitError::Validation("Invalid number".into()))?;
                    settings::set_min_text_chars(chars)?;
                }
                "rasterizer" => settings::set_rasterizer(value.trim().to_string())?,
                "export-dir" => settings::set_export_dir(value.trim().to_string())?,
                _ => return Err(KitError::Validation(format!("Unknown config key: {}", key))),
            }
            Ok(format!("Set {}", key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let (field, value) = parse_assignment("stamp=top_secret").unwrap();
        assert_eq!(field, EditorField::Stamp);
        assert_eq!(value, "top_secret");

        let (field, value) = parse_assignment("body=a=b").unwrap();
        assert_eq!(field, EditorField::Body);
        assert_eq!(value, "a=b");

        assert!(parse_assignment("body").is_err());
        assert!(parse_assignment("colour=red").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(None, CaseStatus::from_str, "x").unwrap(), None);
        assert_eq!(
            parse_flag(Some("distributed"), CaseStatus::from_str, "x").unwrap(),
            Some(CaseStatus::Distributed)
        );
        assert!(parse_flag(Some("lost"), CaseStatus::from_str, "x").is_err());
    }

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from([
            "casekit-cli",
            "--json",
            "modules",
            "edit",
            "abc",
            "-s",
            "title=Autopsy",
            "--status",
            "ready",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.command.failure_context(), "Save failed");
    }
}
