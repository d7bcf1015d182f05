use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fightframe::choreography::{
    CharacterDescriptor, CombatScenario, Environment, FightChoreographer, MoveLibrary,
    PhysicsContext, ScenarioGenerator, Style, simulate_combat,
};
use fightframe::{AnimationGenerator, EngineConfig, FightframeResult, SceneData};

#[derive(Parser, Debug)]
#[command(name = "fightframe", version)]
struct Cli {
    /// Engine configuration JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a generated combat scenario as JSON.
    Scenario(ScenarioArgs),
    /// Generate a fight sequence and print it as JSON.
    Choreograph(ChoreographArgs),
    /// Render a scene description to an MP4 file or a PNG frame directory.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ScenarioArgs {
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 2)]
    participants: usize,

    /// Also resolve the combat and print the outcome.
    #[arg(long, default_value_t = false)]
    simulate: bool,
}

#[derive(Parser, Debug)]
struct ChoreographArgs {
    /// Scenario JSON (as printed by `scenario`). Supplies both characters and environment.
    #[arg(long, conflicts_with_all = ["characters", "environment"])]
    scenario: Option<PathBuf>,

    /// JSON array of characters.
    #[arg(long, requires = "environment")]
    characters: Option<PathBuf>,

    /// Environment JSON.
    #[arg(long, requires = "characters")]
    environment: Option<PathBuf>,

    /// Move library JSON. The built-in library is used when omitted.
    #[arg(long)]
    library: Option<PathBuf>,

    /// Target timeline length in seconds.
    #[arg(long, default_value_t = 30.0)]
    duration: f64,

    /// dynamic, aggressive, defensive or cinematic.
    #[arg(long)]
    style: Option<Style>,

    /// Write the sequence here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Scene data JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output path: `*.mp4` (requires `ffmpeg` on PATH) or a directory for PNG frames.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Scenario(args) => cmd_scenario(args),
        Command::Choreograph(args) => cmd_choreograph(args, &cfg),
        Command::Render(args) => cmd_render(args, &cfg),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let mut cfg = match path {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    cfg.apply_env()?;
    cfg.validate()?;
    Ok(cfg)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse JSON '{}'", path.display()))
}

fn cmd_scenario(args: ScenarioArgs) -> anyhow::Result<()> {
    let mut generator = ScenarioGenerator::new(args.seed);
    let scenario = generator.generate_combat_scenario(args.participants)?;
    let json = if args.simulate {
        let outcome = simulate_combat(&scenario)?;
        serde_json::json!({ "scenario": scenario, "outcome": outcome })
    } else {
        serde_json::to_value(&scenario)?
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn cmd_choreograph(args: ChoreographArgs, cfg: &EngineConfig) -> anyhow::Result<()> {
    let (characters, environment): (Vec<CharacterDescriptor>, Environment) =
        match (&args.scenario, &args.characters, &args.environment) {
            (Some(path), _, _) => {
                let scenario: CombatScenario = read_json(path)?;
                (scenario.participants, scenario.environment)
            }
            (None, Some(chars), Some(env)) => (read_json(chars)?, read_json(env)?),
            _ => anyhow::bail!("pass --scenario, or both --characters and --environment"),
        };

    let library = match &args.library {
        Some(path) => MoveLibrary::from_path(path)?,
        None => MoveLibrary::builtin()?,
    };
    let physics = Arc::new(PhysicsContext::new(&cfg.physics)?);
    let choreographer = FightChoreographer::new(library, physics, cfg.choreography.clone())?;
    let style = args.style.unwrap_or(cfg.choreography.default_style);

    let sequence =
        choreographer.generate_fight_sequence(&characters, &environment, args.duration, style)?;
    let json = serde_json::to_string_pretty(&sequence)?;
    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(out, json).with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_render(args: RenderArgs, cfg: &EngineConfig) -> anyhow::Result<()> {
    let scene_json = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("read scene '{}'", args.scene.display()))?;
    let scene = SceneData::from_json_str(&scene_json)?;
    let generator = AnimationGenerator::procedural(cfg.render.clone())?;

    let mut log_progress = |percent: u8, message: &str| -> FightframeResult<()> {
        tracing::info!(percent, "{message}");
        Ok(())
    };
    let out = generator.render_animation(&scene, &args.out, &mut log_progress)?;

    eprintln!("wrote {} ({} frames)", args.out.display(), out.frames);
    Ok(())
}
