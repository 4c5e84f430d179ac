use colocation::cache::{self, Paths};
use colocation::config::Config;
use colocation::rules;
use colocation::significance::ChanceModel;
use colocation::Miner;
use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("colocation.toml"));

    // Read the config before logging is set up, since it decides the default level. Anything
    // it would have logged is repeated below.
    let config = Config::load(&config_path);
    let debug = config.as_ref().map(|c| c.debug).unwrap_or(false);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match config.map_err(Box::<dyn Error>::from).and_then(|config| run(&config_path, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &Path, config: &Config) -> Result<(), Box<dyn Error>> {
    if !config_path.exists() {
        tracing::warn!(path = %config_path.display(), "config file not found, using defaults");
    }

    let paths = Paths {
        dataset: config.dataset_path.clone(),
        delimiter: config.delimiter_byte(),
        snapshot: config.cache_path.clone(),
    };
    let loaded = cache::load_or_build(&paths, config.neighbor_distance, config.force_rebuild)?;
    let dataset = &loaded.dataset;
    let store = dataset.instances();

    println!(
        "data: {} instances of {} features, {} neighbor pairs within {}",
        store.len(),
        store.feature_count(),
        dataset.relation().len(),
        dataset.threshold()
    );

    let patterns = Miner::new(dataset, config.min_prevalence)?
        .retain_table_instances(true)
        .run();
    let chance = ChanceModel::new(dataset);

    println!();
    println!("{} prevalent patterns:", patterns.len());
    for pattern in &patterns {
        print!(
            "  {}: participation index {:.4}, {} table instances",
            store.describe(&pattern.features),
            pattern.participation_index,
            pattern.row_count().unwrap_or(0)
        );
        if let Some(chance) = &chance {
            let significance = chance.assess(pattern);
            print!(
                ", lift {:.2}, p-value {:.3e}",
                significance.lift, significance.p_value
            );
        }
        println!();
    }

    let rules = rules::derive(store, &patterns, config.min_conditional_probability)?;
    println!();
    println!("{} rules:", rules.len());
    for rule in &rules {
        println!(
            "  {} -> {}: conditional probability {:.4}",
            store.describe(&rule.antecedent),
            store.describe(&rule.consequent),
            rule.conditional_probability
        );
    }

    Ok(())
}
