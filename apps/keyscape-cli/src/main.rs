use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec2;
use keyscape_assets::{AssetResolver, ModelLoader, ModelSource, load_model};
use keyscape_common::Viewport;
use keyscape_input::PointerEvent;
use keyscape_keycaps::{KeycapRegistry, LogicalKey};
use keyscape_portfolio::{
    AdminAuth, LocalAuth, LocalProjectStore, ProjectDraft, ProjectStore, projects_for_key,
};
use keyscape_render::{Camera, DebugTextRenderer, Renderer, keycap_candidates, resolve_key};
use keyscape_stage::{Stage, StageConfig, demo};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const FRAME: f32 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "keyscape-cli", about = "CLI tool for the interactive keyboard scene")]
struct Cli {
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the keys the registry knows
    Info,
    /// Load a glTF/GLB model and list the keycaps it contains
    Inspect {
        /// Model file (.gltf or .glb)
        model: PathBuf,
        /// Also print the full scene outline
        #[arg(long)]
        outline: bool,
    },
    /// Tap the keyboard and report which key was pressed
    Simulate {
        /// Model path, or a bundled id when --bundle-dir is given. Defaults to
        /// the built-in demo keyboard
        #[arg(short, long)]
        model: Option<String>,
        /// Directory holding bundled models
        #[arg(long)]
        bundle_dir: Option<PathBuf>,
        /// Stage config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Tap position; defaults to the viewport centre
        #[arg(long, requires = "y")]
        x: Option<f32>,
        #[arg(long, requires = "x")]
        y: Option<f32>,
        #[arg(long, default_value = "390")]
        width: f32,
        #[arg(long, default_value = "844")]
        height: f32,
        /// Stay in the circling overview instead of focusing
        #[arg(long)]
        overview: bool,
        /// Seconds to let the camera settle before tapping
        #[arg(long, default_value = "2.0")]
        settle: f32,
        /// Project store to list the pressed key's projects from
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Manage portfolio projects
    Projects {
        /// Project store file
        #[arg(long, default_value = "projects.json")]
        store: PathBuf,
        /// Admin accounts file; when given, changes require sign-in
        #[arg(long)]
        accounts: Option<PathBuf>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[command(subcommand)]
        action: ProjectAction,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List projects, newest first
    List {
        /// Only this tech stack, e.g. "Python" or "C#"
        #[arg(short, long)]
        tech: Option<String>,
    },
    /// Add a project
    Add {
        title: String,
        /// Tech stack label
        #[arg(short, long)]
        tech: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        github: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a project by id
    Remove { id: Uuid },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("keyscape-cli v{}", env!("CARGO_PKG_VERSION"));
            let registry = KeycapRegistry::default();
            println!("registry: {} node names", registry.len());
            for key in registry.keys() {
                let stack = key.tech_stack().unwrap_or("(profile)");
                println!(
                    "  {:<11} {:<11} {:<11} {}",
                    key.tag(),
                    key.display_name(),
                    stack,
                    registry.names_for(key).join(", ")
                );
            }
        }
        Commands::Inspect { model, outline } => inspect(&model, outline)?,
        Commands::Simulate {
            model,
            bundle_dir,
            config,
            x,
            y,
            width,
            height,
            overview,
            settle,
            store,
        } => {
            let config = match config {
                Some(path) => StageConfig::load(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => StageConfig::default(),
            };
            let mut stage = Stage::from_config(config)?;
            match model {
                Some(model) => {
                    let (source, resolver) = match bundle_dir {
                        Some(dir) => (
                            ModelSource::Bundled(model),
                            AssetResolver::new(dir, std::env::temp_dir().join("keyscape-cache")),
                        ),
                        None => (
                            ModelSource::Path(PathBuf::from(model)),
                            AssetResolver::new(".", std::env::temp_dir().join("keyscape-cache")),
                        ),
                    };
                    stage.attach_loader(ModelLoader::spawn(resolver, source));
                    wait_for_model(&mut stage)?;
                }
                None => {
                    stage.attach_model(&demo::demo_keyboard()?)?;
                }
            }

            let viewport = Viewport::sized(width, height);
            stage.viewport_ready(viewport);
            stage.set_focused(!overview);
            stage.on_key_press(|key| println!("key press: {key}"));
            let settle_frames = (settle.max(0.0) / FRAME).ceil() as usize;
            for _ in 0..settle_frames.max(1) {
                stage.frame(FRAME);
            }

            let at = match (x, y) {
                (Some(x), Some(y)) => Vec2::new(x, y),
                _ => viewport.center(),
            };
            tracing::debug!(x = at.x, y = at.y, mode = ?stage.mode(), "tapping");
            let start = stage.clock();
            stage.handle_pointer(PointerEvent::down(1, at, start));
            stage.handle_pointer(PointerEvent::up(1, at, start + Duration::from_millis(80)));
            let pressed = stage.frame(FRAME);

            let p = stage.camera().position;
            println!(
                "tap at ({:.0}, {:.0}) with camera {:?} at ({:.1}, {:.1}, {:.1})",
                at.x,
                at.y,
                stage.mode(),
                p.x,
                p.y,
                p.z
            );
            if pressed.is_empty() {
                println!("no key pressed");
            }
            if let Some(store) = store {
                let store = LocalProjectStore::open(&store)?;
                for key in pressed {
                    print_key_projects(&store, key)?;
                }
            }
        }
        Commands::Projects {
            store,
            accounts,
            email,
            password,
            action,
        } => {
            let mut store = LocalProjectStore::open(&store)?;
            let writes = !matches!(action, ProjectAction::List { .. });
            let mut auth = match accounts {
                Some(path) if writes => {
                    let mut auth = LocalAuth::load(&path)?;
                    let (Some(email), Some(password)) = (email.as_deref(), password.as_deref())
                    else {
                        anyhow::bail!("--email and --password are required with --accounts");
                    };
                    auth.sign_in(email, password)?;
                    Some(auth)
                }
                _ => None,
            };

            match action {
                ProjectAction::List { tech } => {
                    let projects = match tech {
                        Some(tech) => store.fetch_by_tag(&tech)?,
                        None => store.fetch_all()?,
                    };
                    println!("{} project(s)", projects.len());
                    for p in projects {
                        println!("  {} [{}] {}", p.id, p.tech_stack, p.title);
                    }
                }
                ProjectAction::Add {
                    title,
                    tech,
                    description,
                    link,
                    github,
                    image,
                } => {
                    let draft = ProjectDraft {
                        description,
                        project_link: link,
                        github_link: github,
                        image_url: image,
                        ..ProjectDraft::new(title, tech)
                    };
                    let project = store.insert(draft)?;
                    println!("added {} [{}] {}", project.id, project.tech_stack, project.title);
                }
                ProjectAction::Remove { id } => {
                    let project = store.delete(id)?;
                    println!("removed {} {}", project.id, project.title);
                }
            }
            if let Some(auth) = auth.as_mut() {
                auth.sign_out()?;
            }
        }
    }

    Ok(())
}

fn inspect(path: &Path, outline: bool) -> anyhow::Result<()> {
    let scene = load_model(path).with_context(|| format!("loading {}", path.display()))?;
    let registry = KeycapRegistry::default();
    let keycaps = keycap_candidates(&scene, scene.root(), &registry);
    println!(
        "{}: {} nodes, {} meshes, {} keycaps",
        path.display(),
        scene.len(),
        scene.mesh_nodes(scene.root()).len(),
        keycaps.len()
    );
    for id in &keycaps {
        let key = resolve_key(&scene, *id, &registry).map(LogicalKey::tag);
        println!("  {} {} -> {}", id, scene.name(*id).unwrap_or_default(), key.unwrap_or("-"));
    }
    let missing: Vec<LogicalKey> = LogicalKey::ALL
        .into_iter()
        .filter(|k| {
            !keycaps
                .iter()
                .any(|id| resolve_key(&scene, *id, &registry) == Some(*k))
        })
        .collect();
    if !missing.is_empty() {
        let tags: Vec<&str> = missing.iter().map(|k| k.tag()).collect();
        println!("keys without a cap: {}", tags.join(", "));
    }
    if outline {
        print!("{}", DebugTextRenderer::new().render(&scene, &Camera::default()));
    }
    Ok(())
}

fn wait_for_model(stage: &mut Stage) -> anyhow::Result<()> {
    let deadline = Instant::now() + Duration::from_secs(30);
    while stage.is_loading() {
        if Instant::now() > deadline {
            anyhow::bail!("timed out waiting for the model");
        }
        stage.frame(0.0);
        std::thread::sleep(Duration::from_millis(10));
    }
    if !stage.has_model() {
        anyhow::bail!("model failed to load");
    }
    Ok(())
}

fn print_key_projects(store: &dyn ProjectStore, key: LogicalKey) -> anyhow::Result<()> {
    if key.is_github() {
        println!("{}: opens the GitHub profile", key.display_name());
        return Ok(());
    }
    let projects = projects_for_key(store, key)?;
    println!("{}: {} project(s)", key.display_name(), projects.len());
    for p in projects {
        println!("  {} {}", p.title, p.project_link.as_deref().unwrap_or(""));
    }
    Ok(())
}
