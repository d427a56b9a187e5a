//! Credit Score ML - Main Entry Point

use clap::Parser;
use credit_score_ml::cli::{cmd_info, cmd_predict, cmd_run, cmd_trainers, Cli, Commands, RunArgs};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_score_ml=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            trainers,
            delimiter,
            mode,
            folds,
            test_fraction,
            validation,
            persist,
            no_importance,
            permutations,
            seed,
            base_path,
            config,
        } => cmd_run(RunArgs {
            data,
            trainers,
            delimiter,
            mode,
            folds,
            test_fraction,
            validation,
            persist,
            no_importance,
            permutations,
            seed,
            base_path,
            config,
        }),
        Commands::Predict { model, data, delimiter, limit } => cmd_predict(&model, &data, delimiter, limit),
        Commands::Trainers => cmd_trainers(),
        Commands::Info { data, delimiter, config } => cmd_info(&data, delimiter, config.as_ref()),
    }
}
