// ABOUTME: Main entry point for the carousel-slides program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use anyhow::{Context, Result};
use carousel_slides::surface::write_surface_to_file;
use carousel_slides::{
    ArchiveFormat, AspectRatio, CarouselForm, CarouselStudio, ChromeRasterizer, Config,
    DirectoryDownloader, GeminiImageClient,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate backgrounds for a carousel and export its slides
    Generate(GenerateArgs),

    /// Export the text of every slide as JSON
    ExportText(IoArgs),

    /// Write each slide surface as a standalone HTML file
    RenderHtml(IoArgs),
}

#[derive(Args)]
struct IoArgs {
    /// Path to the carousel JSON file
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the exported files are written to
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Aspect ratio, overriding the one in the input file (1:1, 4:5, 16:9, 1.19:1)
    #[arg(long)]
    aspect_ratio: Option<AspectRatio>,

    /// Image format of the slides inside the ZIP archive
    #[arg(long, value_enum, default_value = "png")]
    format: ArchiveFormat,

    /// Also save each slide as its own PNG
    #[arg(long)]
    slide_images: bool,

    /// Also export the slide text as JSON
    #[arg(long)]
    text: bool,

    /// Skip the ZIP archive
    #[arg(long)]
    no_archive: bool,

    /// API key, overriding API_KEY from the environment
    #[arg(long)]
    api_key: Option<String>,
}

fn build_studio(config: &Config, output: &Path) -> Result<CarouselStudio> {
    let generator = GeminiImageClient::new(config).context("Failed to create image client")?;
    let rasterizer = ChromeRasterizer::new(config.get_render_config(None, None, None));
    let downloader = DirectoryDownloader::new(output)
        .with_context(|| format!("Output directory {:?} is not usable", output))?;

    Ok(CarouselStudio::new(
        config.api_key.clone(),
        Box::new(generator),
        Box::new(rasterizer),
        Box::new(downloader),
    ))
}

fn generate(args: &GenerateArgs) -> Result<()> {
    let config = Config::from_env().with_api_key(args.api_key.clone());
    let mut form = CarouselForm::from_file(&args.io.input)
        .with_context(|| format!("Failed to load carousel from {:?}", args.io.input))?;
    if let Some(aspect_ratio) = args.aspect_ratio {
        form.aspect_ratio = aspect_ratio;
    }

    let mut studio = build_studio(&config, &args.io.output)?;
    println!("Generating carousel in {} format", form.aspect_ratio.label());
    let report = studio
        .generate_carousel(&form)
        .context("Carousel generation failed")?;
    if report.skipped() > 0 {
        warn!(
            "{} of {} backgrounds could not be generated",
            report.skipped(),
            studio.run().len()
        );
    }

    if args.slide_images {
        let ready: Vec<String> = studio
            .run()
            .records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                if r.is_export_ready() {
                    Some(r.id.clone())
                } else {
                    warn!("Skipping slide {}: its background was not generated", i + 1);
                    None
                }
            })
            .collect();
        for id in ready {
            // One slide failing does not stop the others
            if let Err(e) = studio.download_slide_image(&id) {
                warn!("Could not save slide {}: {}", id, e);
            }
        }
    }

    if args.text {
        studio.download_all_text().context("Text export failed")?;
    }

    if !args.no_archive {
        if let Some(report) = studio
            .download_all_slides_zip(args.format)
            .context("Archive export failed")?
        {
            info!(
                "Archive written to {:?} with {} of {} slides",
                report.artifact,
                report.captured(),
                studio.run().len()
            );
        }
    }

    Ok(())
}

fn export_text(args: &IoArgs) -> Result<()> {
    let config = Config::from_env();
    let form = CarouselForm::from_file(&args.input)
        .with_context(|| format!("Failed to load carousel from {:?}", args.input))?;

    let mut studio = build_studio(&config, &args.output)?;
    studio.load_carousel(&form).context("Invalid carousel")?;
    match studio.download_all_text().context("Text export failed")? {
        Some(path) => println!("Text exported: {:?}", path),
        None => println!("No slides to export."),
    }
    Ok(())
}

fn render_html(args: &IoArgs) -> Result<()> {
    let config = Config::from_env();
    let form = CarouselForm::from_file(&args.input)
        .with_context(|| format!("Failed to load carousel from {:?}", args.input))?;

    let mut studio = build_studio(&config, &args.output)?;
    studio.load_carousel(&form).context("Invalid carousel")?;

    for record in &studio.run().records {
        let Some(surface) = studio.surfaces().get(&record.id) else {
            continue;
        };
        let path = args.output.join(format!("slide_{}.html", surface.index + 1));
        write_surface_to_file(surface, &path)
            .with_context(|| format!("Failed to write {:?}", path))?;
    }
    println!("Rendered {} slides to {:?}", studio.run().len(), args.output);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Generate(args)) => {
            println!("Executing generate command...");
            generate(args)
        }
        Some(Commands::ExportText(args)) => {
            println!("Executing export-text command...");
            export_text(args)
        }
        Some(Commands::RenderHtml(args)) => {
            println!("Executing render-html command...");
            render_html(args)
        }
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
