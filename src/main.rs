use anyhow::{bail, Context, Result};
use athlete_reid::{
    ClusterConfig, ClusterStore, JsonDirStore, ReidEngine, RunNumber, SessionClusters,
    SessionManifest, SqliteStore,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "athlete-reid", version, about = "Group training-session runs by athlete")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StoreArgs {
    /// Directory holding one <session>/clusters.json per session
    #[arg(long, conflicts_with = "sqlite")]
    store: Option<PathBuf>,

    /// SQLite database holding saved cluster state
    #[arg(long)]
    sqlite: Option<PathBuf>,
}

impl StoreArgs {
    fn open(&self) -> Result<Arc<dyn ClusterStore>> {
        match (&self.store, &self.sqlite) {
            (Some(dir), None) => Ok(Arc::new(JsonDirStore::new(dir))),
            (None, Some(db)) => Ok(Arc::new(
                SqliteStore::open(db)
                    .with_context(|| format!("Failed to open database at {}", db.display()))?,
            )),
            _ => bail!("Pass exactly one of --store or --sqlite"),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Cluster a session manifest and print the reconciled result
    Cluster {
        /// Session manifest JSON ({"session_id": ..., "runs": [...]})
        #[arg(long)]
        manifest: PathBuf,

        /// Minimum cosine similarity to merge (overrides --config)
        #[arg(long)]
        threshold: Option<f32>,

        /// JSON file with threshold and palette
        #[arg(long)]
        config: Option<PathBuf>,

        /// Persist the result back to the store
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Move a run into another cluster and record the override
    Reassign {
        #[arg(long)]
        session: String,
        #[arg(long)]
        run: RunNumber,
        #[arg(long)]
        to: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Give a cluster a custom label
    Rename {
        #[arg(long)]
        session: String,
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        label: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Print the saved state for a session
    Show {
        #[arg(long)]
        session: String,
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Cluster {
            manifest,
            threshold,
            config,
            save,
            store,
        } => run_cluster(manifest, threshold, config, save, &store),
        Command::Reassign {
            session,
            run,
            to,
            store,
        } => edit_saved(&store, &session, |s| Ok(s.reassign_run(run, &to)?)),
        Command::Rename {
            session,
            cluster,
            label,
            store,
        } => edit_saved(&store, &session, |s| Ok(s.rename_cluster(&cluster, &label)?)),
        Command::Show { session, store } => {
            let saved = load_existing(&*store.open()?, &session)?;
            println!("{}", saved.to_json()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>, threshold: Option<f32>) -> Result<ClusterConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => ClusterConfig::default(),
    };
    if let Some(threshold) = threshold {
        config.threshold = threshold;
    }
    Ok(config)
}

fn run_cluster(
    manifest: PathBuf,
    threshold: Option<f32>,
    config: Option<PathBuf>,
    save: bool,
    store: &StoreArgs,
) -> Result<()> {
    let start = Instant::now();
    let json = std::fs::read_to_string(&manifest)
        .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
    let manifest = SessionManifest::from_json(&json).context("Failed to parse session manifest")?;

    let config = load_config(config, threshold)?;
    let engine = ReidEngine::new(config, store.open()?).context("Invalid clustering config")?;
    let session = engine.compute(&manifest.session_id, &manifest.runs);

    if save {
        engine
            .persist(&session)
            .join()
            .map_err(|_| anyhow::anyhow!("Save thread panicked"))?;
    }

    println!("{}", serde_json::to_string_pretty(&session)?);
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        saved = save,
        "done"
    );
    Ok(())
}

fn load_existing(store: &dyn ClusterStore, session: &str) -> Result<athlete_reid::SavedClusterState> {
    store
        .load(session)
        .with_context(|| format!("Failed to load saved state for {}", session))?
        .with_context(|| format!("No saved state for session {}", session))
}

fn edit_saved<F>(store: &StoreArgs, session: &str, edit: F) -> Result<()>
where
    F: FnOnce(&mut SessionClusters) -> Result<()>,
{
    let store = store.open()?;
    let saved = load_existing(&*store, session)?;
    let mut clusters = SessionClusters::from_saved(session, saved);

    edit(&mut clusters)?;

    store
        .save(session, &clusters.to_saved_state())
        .with_context(|| format!("Failed to save state for {}", session))?;
    println!("{}", serde_json::to_string_pretty(&clusters.clusters)?);
    Ok(())
}
