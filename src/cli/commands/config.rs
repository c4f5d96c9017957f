//! Configuration inspection and scan-path edits.

use std::path::Path;

use anyhow::Result;

use crate::cli::output;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

pub fn handle_config(
    config: &mut Config,
    config_path: &Path,
    add_path: Option<String>,
    remove_path: Option<String>,
    json: bool,
) -> Result<()> {
    let mut changed = false;

    if let Some(path) = add_path {
        if !config.scan_paths.contains(&path) {
            config.scan_paths.push(path);
            changed = true;
        }
    }
    if let Some(path) = remove_path {
        let before = config.scan_paths.len();
        config.scan_paths.retain(|p| p != &path);
        changed = changed || config.scan_paths.len() != before;
    }

    if changed {
        ConfigLoader::save(config, config_path)?;
        println!("Configuration written to {}", config_path.display());
    }

    if json {
        output::print_json(config);
    } else {
        println!("Scan paths:");
        for path in &config.scan_paths {
            println!("  {path}");
        }
        println!(
            "Sessions: {} global, {} per project",
            config.multiplex.max_sessions, config.multiplex.max_sessions_per_project
        );
        println!("Data dir: {}", config.data_dir);
    }
    Ok(())
}
