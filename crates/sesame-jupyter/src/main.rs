//! sesame-jupyter CLI entry point.
//!
//! Runs the notebook import/export actions and the kernel console from a
//! terminal, with stdin prompts standing in for the IDE's file dialogs.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use kernel_console::{ConsoleEvent, KernelConsole, OutputStream};
use log::info;
use notebook_cells::CellType;
use sesame_jupyter::settings::{self, Settings};
use sesame_jupyter::console_tab::next_input_line;
use sesame_jupyter::{ActionOutcome, ConsoleInput, ConsoleTab, Host, HostEvent, NotebookExtension};
use tabled::{settings::Style, Table, Tabled};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "sesame-jupyter")]
#[command(author, version, about = "Jupyter console and notebook tools for OpenSesame")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Settings file (default: <config dir>/sesame-jupyter/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a notebook to cell-annotated flat text
    Import {
        /// Notebook to read (prompts if omitted)
        notebook: Option<PathBuf>,
        /// Write the flat text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert cell-annotated flat text to a notebook
    Export {
        /// Flat-text file to read (reads stdin if omitted)
        source: Option<PathBuf>,
        /// Notebook to write (prompts if omitted)
        notebook: Option<PathBuf>,
    },
    /// List the cells found in a flat-text file
    Cells {
        file: PathBuf,
        /// Only list cells of this type (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<CellType>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Launch a kernel and open an interactive console
    Console {
        /// Kernelspec to launch (default from settings)
        kernel: Option<String>,
        /// Working directory for the kernel process
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let settings_path = cli.settings.unwrap_or_else(settings::settings_path);
    let settings = settings::load_settings_from(&settings_path);

    match cli.command {
        Commands::Import { notebook, output } => {
            import(settings, &settings_path, notebook, output)
        }
        Commands::Export { source, notebook } => {
            export(settings, &settings_path, source, notebook)
        }
        Commands::Cells { file, types, json } => list_cells(&file, &types, json),
        Commands::Console { kernel, cwd } => {
            let kernel = kernel.unwrap_or_else(|| settings.default_kernel.clone());
            console(&kernel, cwd).await
        }
    }
}

/// Host backed by the terminal: notifications go to stderr, new buffers to
/// stdout or a file, and file dialogs become path prompts.
#[derive(Default)]
struct TerminalHost {
    source: Option<String>,
    output: Option<PathBuf>,
}

impl TerminalHost {
    fn prompt_path(&self, prompt: &str, start_dir: &Path) -> Option<PathBuf> {
        eprint!("{} [{}]: ", prompt, start_dir.display());
        io::stderr().flush().ok();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).ok()? == 0 {
            return None;
        }
        let answer = line.trim();
        if answer.is_empty() {
            return None;
        }
        let path = PathBuf::from(answer);
        Some(if path.is_relative() {
            start_dir.join(path)
        } else {
            path
        })
    }
}

impl Host for TerminalHost {
    fn fire(&self, event: HostEvent) {
        match event {
            HostEvent::NewFile { source } => match self.output {
                Some(ref path) => match std::fs::write(path, &source) {
                    Ok(()) => info!("Wrote flat text to {:?}", path),
                    Err(e) => eprintln!("Failed to write {}: {}", path.display(), e),
                },
                None => print!("{}", source),
            },
            HostEvent::WorkspaceRestart { name } => eprintln!("[{}] workspace restarted", name),
            HostEvent::Notify { message } => eprintln!("{}", message),
        }
    }

    fn current_source(&self) -> Option<String> {
        self.source.clone()
    }

    fn pick_notebook_to_open(&self, start_dir: &Path) -> Option<PathBuf> {
        self.prompt_path("Notebook to open", start_dir)
    }

    fn pick_notebook_to_save(&self, start_dir: &Path) -> Option<PathBuf> {
        self.prompt_path("Save notebook as", start_dir)
    }
}

fn finish(outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Done => Ok(()),
        ActionOutcome::Cancelled => {
            eprintln!("Cancelled.");
            Ok(())
        }
        ActionOutcome::Empty => {
            eprintln!("Nothing to convert.");
            Ok(())
        }
        ActionOutcome::Failed(reason) => anyhow::bail!(reason),
    }
}

fn import(
    settings: Settings,
    settings_path: &Path,
    notebook: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut extension = NotebookExtension::new(settings).with_settings_path(settings_path);
    let host = TerminalHost {
        source: None,
        output,
    };

    let outcome = match notebook {
        Some(path) => extension.import_from(&host, &path),
        None => extension.import_notebook(&host),
    };
    finish(outcome)
}

fn export(
    settings: Settings,
    settings_path: &Path,
    source: Option<PathBuf>,
    notebook: Option<PathBuf>,
) -> Result<()> {
    let text = match source {
        Some(ref path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?,
        None => {
            if notebook.is_none() {
                anyhow::bail!("NOTEBOOK is required when the source is read from stdin");
            }
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut extension = NotebookExtension::new(settings).with_settings_path(settings_path);
    let host = TerminalHost {
        source: Some(text),
        output: None,
    };

    let outcome = match notebook {
        Some(path) => extension.export_to(&host, &path),
        None => extension.export_notebook(&host),
    };
    finish(outcome)
}

#[derive(Tabled)]
struct CellTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "TYPE")]
    cell_type: String,
    #[tabled(rename = "SPAN")]
    span: String,
    #[tabled(rename = "FIRST LINE")]
    first_line: String,
}

fn list_cells(file: &Path, types: &[CellType], json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;

    let extension = NotebookExtension::new(Settings::default());
    let filter = if types.is_empty() { None } else { Some(types) };
    let cells = extension.provide_cells(&text, filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
        return Ok(());
    }
    if cells.is_empty() {
        println!("No cells found.");
        return Ok(());
    }

    let rows: Vec<CellTableRow> = cells
        .iter()
        .enumerate()
        .map(|(index, cell)| CellTableRow {
            index,
            cell_type: cell.cell_type.to_string(),
            span: cell
                .span()
                .map(|r| format!("{}..{}", r.start, r.end))
                .unwrap_or_else(|| "-".to_string()),
            first_line: cell
                .source
                .lines()
                .find(|l| !l.trim().is_empty() && l.trim() != "\"\"\"")
                .unwrap_or("")
                .to_string(),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
    Ok(())
}

const CONSOLE_HELP: &str = "\
:restart       restart the kernel
:interrupt     interrupt the kernel
:cd <dir>      change the kernel's working directory
:run <file>    run a script in the kernel
:quit          shut down and exit";

/// Read stdin lines on a plain thread so the prompt can race Ctrl-C.
/// The receiver yields `None` at end of input.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn console(kernel_name: &str, cwd: Option<PathBuf>) -> Result<()> {
    let (mut backend, mut events) = KernelConsole::new(kernel_name);
    if let Some(dir) = cwd {
        backend = backend.with_working_dir(dir);
    }
    let mut tab = ConsoleTab::new(kernel_name, backend);
    let host = TerminalHost::default();

    tab.start().await?;

    println!("{} console", kernel_name);
    println!("Use Ctrl+D or Ctrl+C to exit, :help for commands.\n");

    let mut input = spawn_stdin_reader();

    let mut execution_count: u32 = 0;

    loop {
        execution_count += 1;
        print!("In [{}]: ", execution_count);
        io::stdout().flush()?;

        let Some(line) = next_input_line(&mut input, tokio::signal::ctrl_c()).await else {
            break;
        };

        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            execution_count -= 1;
            continue;
        }

        let msg_id = match ConsoleInput::parse(line) {
            ConsoleInput::Code(code) => tab.execute(code).await?,
            ConsoleInput::ChangeDir(dir) => tab.change_dir(Path::new(dir)).await?,
            ConsoleInput::RunFile(file) => tab.run_file(Path::new(file)).await?,
            ConsoleInput::Restart => {
                tab.restart(&host).await?;
                execution_count = 0;
                continue;
            }
            ConsoleInput::Interrupt => {
                tab.interrupt().await?;
                execution_count -= 1;
                continue;
            }
            ConsoleInput::Help => {
                println!("{}\n", CONSOLE_HELP);
                execution_count -= 1;
                continue;
            }
            ConsoleInput::Quit => break,
            ConsoleInput::Unknown(command) => {
                eprintln!("Unknown command :{} (try :help)\n", command);
                execution_count -= 1;
                continue;
            }
        };

        wait_for_idle(&mut tab, &mut events, &msg_id, execution_count).await?;
        // Blank line between output and the next prompt
        println!();
    }

    println!("\nShutting down kernel...");
    tab.shutdown().await?;
    println!("Done.");

    Ok(())
}

/// Render events until the kernel reports idle for `msg_id`.
/// Ctrl-C interrupts the kernel instead of exiting.
async fn wait_for_idle(
    tab: &mut ConsoleTab<KernelConsole>,
    events: &mut mpsc::UnboundedReceiver<ConsoleEvent>,
    msg_id: &str,
    execution_count: u32,
) -> Result<()> {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    anyhow::bail!("Kernel event stream closed");
                };
                tab.handle_event(&event);
                let ours = match event.parent_msg_id() {
                    Some(parent) => parent == msg_id,
                    None => true,
                };
                if ours {
                    render_event(&event, execution_count);
                }
                if event.is_idle_for(msg_id) {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nKeyboardInterrupt");
                tab.interrupt().await?;
            }
        }
    }
}

fn render_event(event: &ConsoleEvent, execution_count: u32) {
    match event {
        ConsoleEvent::Output { stream, text, .. } => match stream {
            OutputStream::Stdout => {
                print!("{}", text);
                io::stdout().flush().ok();
            }
            OutputStream::Stderr => {
                eprint!("{}", text);
                io::stderr().flush().ok();
            }
        },
        ConsoleEvent::Result { text, .. } => println!("Out[{}]: {}", execution_count, text),
        ConsoleEvent::Error {
            ename,
            evalue,
            traceback,
            ..
        } => {
            eprintln!("{}: {}", ename, evalue);
            for line in traceback {
                eprintln!("{}", line);
            }
        }
        ConsoleEvent::Status { .. } | ConsoleEvent::Focus | ConsoleEvent::Restarted { .. } => {}
    }
}
