use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

mod edit;
mod error;
mod inspect;
mod io;
mod logging;
mod plan;
mod render;
mod spec;
mod wire;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "mlspec")]
#[command(about = "Inspect and edit Core ML model specs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the layer count, two-element resize targets, and full dumps of
    /// selected layers.
    Layers {
        #[arg(long)]
        model: PathBuf,

        /// Layer name to dump in full (repeatable; replaces the defaults).
        #[arg(long = "show")]
        show: Vec<String>,

        /// Also dump layers whose name matches this regex.
        #[arg(long)]
        show_matching: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Fix input/output image sizes, set the output color space, attach a
    /// flexible size range, and write the result to a new file.
    Update {
        #[arg(long)]
        model: PathBuf,

        #[arg(short = 'o', long)]
        out: PathBuf,

        /// JSON edit plan; flags below override its values.
        #[arg(long = "plan")]
        plan_file: Option<PathBuf>,

        #[arg(long)]
        size: Option<i64>,

        #[arg(long)]
        color_space: Option<String>,

        /// Height range, e.g. 512..1024, 512.. or 768.
        #[arg(long)]
        height_range: Option<spec::SizeRange>,

        /// Width range, e.g. 512..1024, 512.. or 768.
        #[arg(long)]
        width_range: Option<spec::SizeRange>,

        /// Feature to make flexible (repeatable).
        #[arg(long = "flexible")]
        flexible: Vec<String>,

        /// Allow writing onto the input file.
        #[arg(long)]
        overwrite: bool,
    },

    /// Print the model description: version, type, inputs and outputs.
    Describe {
        #[arg(long)]
        model: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Check whether an image feature accepts a given size.
    CheckSize {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        feature: String,

        #[arg(long)]
        height: u64,

        #[arg(long)]
        width: u64,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose)?;

    match cli.cmd {
        Commands::Layers {
            model,
            show,
            show_matching,
            format,
        } => {
            let spec = io::load_spec(&model)?;
            let filter = inspect::LayerFilter::new(show, show_matching.as_deref())?;
            let report = inspect::build_layer_report(&spec, &filter)?;
            match format {
                Format::Text => print!("{}", render::render_layer_report(&report)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }

        Commands::Update {
            model,
            out,
            plan_file,
            size,
            color_space,
            height_range,
            width_range,
            flexible,
            overwrite,
        } => {
            // 1) Validate the plan before reading the model.
            let base = match &plan_file {
                Some(path) => plan::EditPlan::load(path)?,
                None => plan::EditPlan::default(),
            };
            let validated = base
                .apply_overrides(plan::PlanOverrides {
                    size,
                    output_color_space: color_space,
                    height_range,
                    width_range,
                    flexible_features: flexible,
                })
                .validate_and_build()?;

            if !overwrite && same_file(&model, &out) {
                anyhow::bail!(
                    "refusing to overwrite input {}; pass --overwrite or choose another --out",
                    model.display()
                );
            }

            // 2) Edit in memory.
            let mut spec = io::load_spec(&model)?;
            let summary = edit::apply_plan(&mut spec, &validated)
                .with_context(|| format!("update {}", model.display()))?;

            // 3) Save.
            io::save_spec(&spec, &out)?;
            print!("{}", render::render_edit_summary(&summary));
            println!("Wrote {}", out.display());
        }

        Commands::Describe { model, format } => {
            let spec = io::load_spec(&model)?;
            let summary = inspect::build_model_summary(&spec)?;
            match format {
                Format::Text => print!("{}", render::render_model_summary(&summary)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            }
        }

        Commands::CheckSize {
            model,
            feature,
            height,
            width,
            format,
        } => {
            let spec = io::load_spec(&model)?;
            let check = inspect::check_image_size(&spec, &feature, height, width)?;
            match format {
                Format::Text => print!("{}", render::render_size_check(&check)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&check)?),
            }
            if !check.accepted {
                std::io::Write::flush(&mut std::io::stdout())?;
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Compare canonical paths when both exist, raw paths otherwise.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
