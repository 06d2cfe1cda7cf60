use clap::Parser;
use relay::cli::{handle_completions, handle_config_init, serve, Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Publisher(args) => serve::run_publisher(args).await,
        Commands::Consumer(args) => serve::run_consumer(args).await,
        Commands::Dashboard(args) => serve::run_dashboard(args).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
