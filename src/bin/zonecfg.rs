//! Validate a zone configuration file and print what the element would use

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gstzonepost::{
    load_config_with, postprocess_context, GlobalConfig, LoadOptions, PostProcessError,
    PostProcessResult,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration file to validate
    config: PathBuf,

    /// Directory a relative CONFIG path is resolved against
    #[arg(long)]
    base: Option<PathBuf>,

    /// Separator between list elements
    #[arg(long, default_value_t = gstzonepost::config::DEFAULT_LIST_SEPARATOR)]
    separator: char,

    /// Print the parsed configuration as JSON
    #[arg(long)]
    json: bool,

    /// Also write the JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log every parsed key
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(config: &GlobalConfig) {
    println!("✅ {}", config.config_file.display());
    println!("   enabled:       {}", config.enabled);
    println!("   object ids:    {:?}", config.object_ids);
    println!("   custom lib:    {}", config.custom_lib_path.display());
    println!("   tensor fn:     {}", config.tensor_preparation_function_name);
    println!("   user configs:  {}", config.user_configs.len());
    println!("   total zones:   {}", config.total_zones);

    for group in &config.groups {
        println!();
        println!(
            "   source-{} ({})",
            group.source_id,
            if group.enabled { "enabled" } else { "disabled" }
        );
        if !group.enabled {
            continue;
        }
        println!("      zone ids:         {:?}", group.zone_ids);
        println!("      fcm factor:       {}", group.fcm_factor);
        println!("      remove uncounted: {}", group.remove_uncounted);
        if let Some(name) = &group.custom_transform_function_name {
            println!("      transform fn:     {}", name);
        }
        for zone in &group.zones {
            let [r, g, b] = zone.color.as_array();
            println!(
                "      zone {}: {} points, approach {}, color ({:.3}, {:.3}, {:.3})",
                zone.index,
                zone.points.len(),
                zone.approach,
                r,
                g,
                b
            );
        }
    }
}

fn run(args: &Args) -> PostProcessResult<()> {
    let options = LoadOptions {
        list_separator: args.separator,
    };
    let base = args.base.clone().unwrap_or_default();
    let config = load_config_with(&args.config, base, &options)?;

    if args.json || args.output.is_some() {
        let json = serde_json::to_string_pretty(&config)?;
        if let Some(output) = &args.output {
            postprocess_context!(std::fs::write(output, &json), "writing JSON output")?;
            println!("💾 Configuration written to: {}", output.display());
        }
        if args.json {
            println!("{}", json);
        }
    } else {
        print_summary(&config);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("❌ Error: {}", e);
        if let PostProcessError::Config(config_error) = &e {
            eprintln!("   category: {:?}", config_error.kind());
            if let Some(section) = config_error.section() {
                eprintln!("   group:    {}", section);
            }
            if let Some(key) = config_error.key() {
                eprintln!("   key:      {}", key);
            }
        }
        std::process::exit(1);
    }
}
