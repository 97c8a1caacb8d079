use clap::{Parser, Subcommand};
use env_logger::Env;
use pixfan::{config, fingerprint, imaging, output, process, request};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pixfan")]
#[command(about = "Fan one source image out into many transformed variants")]
#[command(long_about = "\
Fan one source image out into many transformed variants

The source is decoded once. Each transform in the transforms file gets its
own copy, is resized/rotated/recoloured as asked, and is written in its
target format. PNG and WEBP output is re-compressed lossily; JPEG output
optionally goes through mozjpeg.

Transforms file (JSON array):

  [
    { \"args\": { \"toFormat\": \"webp\", \"width\": 800 } },
    { \"args\": { \"toFormat\": \"png\", \"width\": 200, \"height\": 200,
                \"fit\": \"contain\", \"background\": \"#ffffff\" } },
    { \"outputPath\": \"hero.jpg\",
      \"args\": { \"toFormat\": \"jpg\", \"quality\": 80, \"rotate\": 90 } }
  ]

Outputs without an outputPath are named <stem>-<fingerprint>.<ext>, where the
fingerprint is a 5-character hash of the args that affect the output bytes.

Run 'pixfan gen-config' to generate a documented pixfan.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./pixfan.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every transform in a transforms file against one source image
    Process(ProcessArgs),
    /// Print the fingerprint of a transform's args
    Fingerprint {
        /// Args as JSON, e.g. '{"toFormat": "webp", "width": 800}'
        args: String,
        /// Also print the canonical JSON that is hashed
        #[arg(long)]
        canonical: bool,
    },
    /// Print a stock pixfan.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Source image
    source: PathBuf,

    /// JSON file listing the transforms
    #[arg(long, short)]
    transforms: PathBuf,

    /// Output directory
    #[arg(long, short, default_value = ".")]
    out_dir: PathBuf,

    /// Leave ICC profiles and ancillary chunks out of every output
    #[arg(long)]
    strip_metadata: bool,

    /// Re-encode JPEG output through mozjpeg
    #[arg(long)]
    mozjpeg: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Process(args) => {
            let specs = request::load_specs(&args.transforms)?;
            std::fs::create_dir_all(&args.out_dir)?;
            let requests = request::plan_requests(&args.source, specs, &args.out_dir, &config.defaults);
            let options = process::BatchOptions {
                strip_metadata: args.strip_metadata || config.output.strip_metadata,
                use_mozjpeg: args.mozjpeg || config.output.use_mozjpeg,
            };

            process::init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_process_event(&event);
                }
            });
            let result = process::process_batch_with(
                &pixfan::compress::NativeRecompressor,
                &args.source,
                &requests,
                &options,
                Some(tx),
            );
            if printer.join().is_err() {
                log::error!("output thread panicked");
            }

            let outcomes = result?;
            output::print_batch_summary(&outcomes);
            let failed = outcomes.iter().filter(|o| o.is_err()).count();
            if failed > 0 {
                return Err(format!("{failed} transform(s) failed").into());
            }
        }
        Command::Fingerprint { args, canonical } => {
            let args: imaging::TransformArgs = serde_json::from_str(&args)?;
            let args = args.heal(&config.defaults);
            if canonical {
                println!("{}", fingerprint::fingerprint_canonical(&args));
            }
            println!("{}", fingerprint::fingerprint(&args));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `--config`, or `./pixfan.toml` when present, over stock defaults.
fn load_config(
    explicit: Option<&std::path::Path>,
) -> Result<config::PixfanConfig, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => Ok(config::load_config(std::path::Path::new(
            config::CONFIG_FILE_NAME,
        ))?),
    }
}
