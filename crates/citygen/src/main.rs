use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;
use rayon::prelude::*;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use citymesh::{paths::replace_extension, save_gltf, save_obj, save_summary, City, GltfContainer};

mod config;
mod generator;

use config::{Config, MeshFormat};

fn load_city(path: &Path) -> Result<City> {
    let file =
        File::open(path).with_context(|| format!("Cannot open city file {}", path.display()))?;
    City::from_json_reader(BufReader::new(file))
        .with_context(|| format!("Cannot parse city file {}", path.display()))
}

fn save_city(city: &City, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
    );
    city.to_json_writer(&mut out)?;
    out.flush()?;
    Ok(())
}

/// The exporters swallow their own errors, so look at what actually landed on disk.
fn ensure_written(path: &Path, allow_empty: bool) -> Result<()> {
    let meta = fs::metadata(path).with_context(|| format!("{} was not written", path.display()))?;
    ensure!(
        allow_empty || meta.len() > 0,
        "{} is empty",
        path.display()
    );
    Ok(())
}

fn export(city: &City, format: MeshFormat, path: &Path) {
    let start = Instant::now();

    match format {
        MeshFormat::Obj => save_obj(city, path),
        MeshFormat::Gltf => save_gltf(city, path, GltfContainer::Separate),
        MeshFormat::Glb => save_gltf(city, path, GltfContainer::Packed),
    }

    info!("Wrote {} in {:.2?}", path.display(), start.elapsed());
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = Config::parse();
    config.normalize();

    let city = match &config.city {
        Some(path) => {
            info!("Loading city from {}", path.display());
            load_city(path)?
        }
        None => {
            info!(
                "Generating {}x{} city (seed {}, population {}, transport {})",
                config.grid_size, config.grid_size, config.seed, config.population, config.transport
            );
            generator::generate(&config)
        }
    };

    fs::create_dir_all(&config.output)
        .with_context(|| format!("Cannot create output directory {}", config.output.display()))?;

    let targets: Vec<(MeshFormat, PathBuf)> = config
        .format
        .mesh_formats()
        .iter()
        .map(|&format| {
            let name = format!("{}.{}", config.prefix, format.extension());
            (format, config.output.join(name))
        })
        .collect();

    info!(
        "Exporting {} buildings and {} roads as {}...",
        city.buildings.len(),
        city.roads.len(),
        config.format
    );

    // The exports only read the city, so `all` runs them side by side.
    targets
        .par_iter()
        .for_each(|(format, path)| export(&city, *format, path));

    let summary_path = config
        .output
        .join(format!("{}_summary.json", config.prefix));
    save_summary(&city, &summary_path)
        .with_context(|| format!("Cannot write summary {}", summary_path.display()))?;

    if config.save_city {
        let city_path = config.output.join(format!("{}_city.json", config.prefix));
        save_city(&city, &city_path)?;
        info!("Saved city to {}", city_path.display());
    }

    for (format, path) in &targets {
        ensure_written(path, false)?;
        for ext in format.companions() {
            // An empty scene has an empty payload.
            ensure_written(&replace_extension(path, ext), *ext == "bin")?;
        }
    }

    for (_, path) in &targets {
        info!("Generated city at: {}", path.display());
    }
    info!("Summary: {}", summary_path.display());

    Ok(())
}
