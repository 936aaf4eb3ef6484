mod commands;
mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sitestack")]
#[command(about = "Static websites and serverless APIs on AWS, Azure and GCP", long_about = None)]
struct Cli {
    /// Config override applied on top of stack.kdl (repeatable)
    #[arg(short, long = "config", value_name = "KEY=VALUE", global = true)]
    config: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available programs
    Programs,
    /// Show what `up` would change
    Preview {
        /// Stack name (dev, prod, ...)
        stack: Option<String>,
        /// Stack name (-s/--stack flag, SITESTACK_STACK)
        #[arg(
            short = 's',
            long = "stack",
            env = "SITESTACK_STACK",
            conflicts_with = "stack",
            hide = true
        )]
        stack_flag: Option<String>,
    },
    /// Create or update the stack's resources
    Up {
        /// Stack name (dev, prod, ...)
        stack: Option<String>,
        /// Stack name (-s/--stack flag, SITESTACK_STACK)
        #[arg(
            short = 's',
            long = "stack",
            env = "SITESTACK_STACK",
            conflicts_with = "stack",
            hide = true
        )]
        stack_flag: Option<String>,
        /// Apply without asking; otherwise only the preview is shown
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the outputs of the last deployment
    Outputs {
        /// Stack name (dev, prod, ...)
        stack: Option<String>,
        /// Stack name (-s/--stack flag, SITESTACK_STACK)
        #[arg(
            short = 's',
            long = "stack",
            env = "SITESTACK_STACK",
            conflicts_with = "stack",
            hide = true
        )]
        stack_flag: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every resource of the stack
    Destroy {
        /// Stack name (dev, prod, ...)
        stack: Option<String>,
        /// Stack name (-s/--stack flag, SITESTACK_STACK)
        #[arg(
            short = 's',
            long = "stack",
            env = "SITESTACK_STACK",
            conflicts_with = "stack",
            hide = true
        )]
        stack_flag: Option<String>,
        /// Delete without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries plans and outputs, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Commands::Version => {
            println!("sitestack {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Programs => {
            commands::programs::handle();
        }
        Commands::Preview { stack, stack_flag } => {
            let ctx = utils::load_stack(stack.or(stack_flag), &cli.config)?;
            commands::preview::handle(&ctx).await?;
        }
        Commands::Up {
            stack,
            stack_flag,
            yes,
        } => {
            let ctx = utils::load_stack(stack.or(stack_flag), &cli.config)?;
            commands::up::handle(&ctx, yes).await?;
        }
        Commands::Outputs {
            stack,
            stack_flag,
            json,
        } => {
            let ctx = utils::load_stack(stack.or(stack_flag), &cli.config)?;
            commands::outputs::handle(&ctx, json).await?;
        }
        Commands::Destroy {
            stack,
            stack_flag,
            yes,
        } => {
            let ctx = utils::load_stack(stack.or(stack_flag), &cli.config)?;
            commands::destroy::handle(&ctx, yes).await?;
        }
    }

    Ok(())
}
