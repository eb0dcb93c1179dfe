use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use reface_core::{find_latest_image, Invoker, Role, Stager, SwapOutcome};

#[derive(Parser)]
#[command(name = "reface", about = "Reface CLI — stage images and drive the external swap tool")]
struct Cli {
    /// Workspace directory for staged images (default: REFACE_WORKSPACE_DIR)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Output directory the tool writes results into (default: REFACE_OUTPUT_DIR)
    #[arg(long)]
    output: Option<PathBuf>,

    /// External swap tool to invoke (default: REFACE_TOOL)
    #[arg(long)]
    tool: Option<PathBuf>,

    /// Hardware backend selector passed to the tool
    #[arg(long)]
    execution_provider: Option<String>,

    /// Named processing stage the tool should run
    #[arg(long)]
    frame_processor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage a local image file under a role
    Stage {
        /// Staging slot: "source" (the face to use) or "target" (the image to replace)
        #[arg(short, long)]
        role: Role,
        /// Image file to stage
        file: PathBuf,
    },
    /// Run the external tool over the staged images
    Swap,
    /// Show staged inputs and the newest result
    Status,
    /// Print the newest image in the output directory
    Scan,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let paths = Paths::resolve(&cli);
    tracing::debug!(
        workspace = %paths.workspace.display(),
        output = %paths.output.display(),
        tool = %paths.tool.display(),
        "resolved paths"
    );

    match cli.command {
        Commands::Stage { role, file } => {
            let bytes = fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let staged = Stager::new(&paths.workspace).stage(role, &bytes)?;
            println!("Staged {role}: {}", staged.display());
        }
        Commands::Swap => {
            let stager = Stager::new(&paths.workspace);
            let Some(source) = stager.staged(Role::Source) else {
                bail!("no source image staged (run `reface stage --role source <file>`)");
            };
            let Some(target) = stager.staged(Role::Target) else {
                bail!("no target image staged (run `reface stage --role target <file>`)");
            };

            let mut invoker = Invoker::new(&paths.tool);
            if let Some(provider) = cli
                .execution_provider
                .or_else(|| std::env::var("REFACE_EXECUTION_PROVIDER").ok())
            {
                invoker = invoker.with_execution_provider(provider);
            }
            if let Some(processor) = cli
                .frame_processor
                .or_else(|| std::env::var("REFACE_FRAME_PROCESSOR").ok())
            {
                invoker = invoker.with_frame_processor(processor);
            }

            match invoker.invoke(&source, &target, &paths.output)? {
                SwapOutcome::Succeeded { log, result } => {
                    print_log(&log);
                    match image::image_dimensions(&result) {
                        Ok((w, h)) => println!("Result: {} ({w}x{h})", result.display()),
                        Err(_) => println!("Result: {}", result.display()),
                    }
                }
                SwapOutcome::SucceededNoOutput { log } => {
                    print_log(&log);
                    bail!(
                        "tool exited cleanly but no result image was found in {}",
                        paths.output.display()
                    );
                }
                SwapOutcome::Failed { log } => {
                    print_log(&log);
                    bail!("swap tool failed");
                }
            }
        }
        Commands::Status => {
            let stager = Stager::new(&paths.workspace);
            for role in Role::ALL {
                match stager.staged(role) {
                    Some(path) => println!("{role}: {}", path.display()),
                    None => println!("{role}: not staged"),
                }
            }
            match find_latest_image(&paths.output) {
                Some(path) => println!("latest result: {}", path.display()),
                None => println!("latest result: none"),
            }
        }
        Commands::Scan => match find_latest_image(&paths.output) {
            Some(path) => println!("{}", path.display()),
            None => bail!("no result image in {}", paths.output.display()),
        },
    }

    Ok(())
}

struct Paths {
    workspace: PathBuf,
    output: PathBuf,
    tool: PathBuf,
}

impl Paths {
    /// Flags win over `REFACE_*` environment variables, which win over
    /// the defaults under `$XDG_DATA_HOME/reface`.
    fn resolve(cli: &Cli) -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("reface");

        Self {
            workspace: cli
                .workspace
                .clone()
                .or_else(|| std::env::var("REFACE_WORKSPACE_DIR").map(PathBuf::from).ok())
                .unwrap_or_else(|| data_dir.join("workspace")),
            output: cli
                .output
                .clone()
                .or_else(|| std::env::var("REFACE_OUTPUT_DIR").map(PathBuf::from).ok())
                .unwrap_or_else(|| data_dir.join("output")),
            tool: cli
                .tool
                .clone()
                .or_else(|| std::env::var("REFACE_TOOL").map(PathBuf::from).ok())
                .unwrap_or_else(|| PathBuf::from("facefusion")),
        }
    }
}

fn print_log(log: &str) {
    if !log.trim().is_empty() {
        print!("{log}");
        if !log.ends_with('\n') {
            println!();
        }
    }
}
