use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dialogue_overlay::config::{init_default_config, ResolvedConfig};
use dialogue_overlay::dump::PassageDump;
use dialogue_overlay::reconcile::{write_report_file, ReconcileReport};
use dialogue_overlay::sources::load_inputs;
use dialogue_overlay::Engine;

#[derive(Parser, Debug)]
#[command(name = "dialogue-overlay")]
#[command(about = "Resolve game text and reconcile dialogue passages against a translated corpus", long_about = None)]
struct Args {
    /// Generate the default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file to (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for dialogue-overlay.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve UI strings through the string maps
    Resolve {
        #[arg(value_name = "TEXT", required = true)]
        texts: Vec<String>,
    },
    /// Look up localization keys
    Key {
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,
    },
    /// Reconcile every object of a passage dump and write the rewritten snapshot
    Reconcile {
        /// Passage dump to reconcile (default: passage_dump from the config)
        #[arg(long, value_name = "PATH")]
        dump: Option<PathBuf>,

        /// Output dump (default: <dump_stem>_translated.txt)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Write a JSON report of every passage's outcome
        #[arg(long, value_name = "JSON")]
        report: Option<PathBuf>,
    },
    /// Print corpus table sizes
    Stats,
}

fn init_logging(cfg: &ResolvedConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cfg.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let (cfg_path, written) =
            init_default_config(&dir, args.force).context("init default config")?;
        if written {
            eprintln!("Wrote config: {}", cfg_path.display());
        } else {
            eprintln!("Config exists, use --force to overwrite: {}", cfg_path.display());
        }
        return Ok(());
    }

    let Some(command) = args.command else {
        use clap::CommandFactory;
        Args::command().print_help().context("print help")?;
        return Ok(());
    };

    let cfg = ResolvedConfig::discover(args.config).context("load config")?;
    init_logging(&cfg);
    if let Some(p) = cfg.config_path.as_ref() {
        info!(config = %p.display(), "using config");
    }

    let mut inputs = load_inputs(&cfg).context("load corpus inputs")?;
    if let Command::Reconcile { dump: Some(path), .. } = &command {
        inputs.replace_dump(PassageDump::read(path)?);
    }
    let mut engine = Engine::from_sources(&inputs.sources);

    match command {
        Command::Resolve { texts } => {
            for text in texts {
                match engine.resolve(&text) {
                    Some(t) => println!("{text}\t{t}"),
                    None => println!("{text}\t(miss)"),
                }
            }
        }
        Command::Key { keys } => {
            for key in keys {
                match engine.resolve_key(&key) {
                    Some(t) => println!("{key}\t{t}"),
                    None => println!("{key}\t(miss)"),
                }
            }
        }
        Command::Stats => {
            let json = serde_json::to_string_pretty(engine.corpus().stats())
                .context("serialize corpus stats")?;
            println!("{json}");
        }
        Command::Reconcile {
            dump,
            output,
            report,
        } => {
            let dump_path = dump.unwrap_or_else(|| cfg.passage_dump.clone());
            let mut snapshot = inputs
                .dump
                .with_context(|| format!("no passage dump at {}", dump_path.display()))?;
            let output = output.unwrap_or_else(|| {
                let stem = dump_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("passage_dump")
                    .to_string();
                dump_path.with_file_name(format!("{stem}_translated.txt"))
            });

            let reports: Vec<_> = snapshot
                .objects
                .iter_mut()
                .map(|object| engine.reconcile_object(object))
                .collect();
            let summary = ReconcileReport::new(reports);
            info!(
                objects = summary.objects.len(),
                unresolved_choices = summary.unresolved_choices,
                "reconciliation finished"
            );
            for (tier, count) in &summary.tiers {
                info!(tier = %tier, passages = count, "tier total");
            }

            snapshot.write(&output)?;
            eprintln!("Wrote dump: {}", output.display());
            if let Some(path) = report {
                write_report_file(&path, &summary)?;
                eprintln!("Wrote report: {}", path.display());
            }
        }
    }
    Ok(())
}
