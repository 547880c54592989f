use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "layout-gen")]
#[command(about = "Codec generator for binary-layout schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Generate code from layout schema definitions */
    Generate {
        /* Input YAML files containing type definitions */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Output directory for generated code */
        #[arg(
            short = 'o',
            long = "output",
            value_name = "DIR",
            default_value = "generated"
        )]
        output_dir: PathBuf,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* Analyze schema definitions and show detailed plan information */
    Analyze {
        /* Input YAML files containing type definitions */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Print every operation plan as JSON after analysis */
        #[arg(long = "print-plans")]
        print_plans: bool,

        /* Print the plan of a single type as JSON */
        #[arg(long = "type", value_name = "TYPE")]
        type_name: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            files,
            output_dir,
            verbose,
        } => {
            layout_gen::cmds::generate::run(files, output_dir, verbose)?;
        }

        Commands::Analyze {
            files,
            print_plans,
            type_name,
        } => {
            layout_gen::cmds::analyze::run(files, print_plans, type_name)?;
        }
    }

    Ok(())
}
