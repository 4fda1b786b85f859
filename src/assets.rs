use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "client.yml";
pub const CATALOG_FILE: &str = "things.yml";
pub const SCENE_FILE: &str = "scene.yml";

#[derive(Debug, Default)]
pub struct AssetSummary {
    pub settings: Option<PathBuf>,
    pub catalog: PathBuf,
    pub scene: Option<PathBuf>,
    pub yaml_files: usize,
}

/// Finds the data files under the asset root. Only the descriptor catalog
/// is mandatory.
pub fn scan(root: &Path) -> Result<AssetSummary, String> {
    let yaml_files = count_yaml(root)?;
    let catalog = root.join(CATALOG_FILE);
    if !catalog.is_file() {
        return Err(format!("missing {} in {}", CATALOG_FILE, root.display()));
    }
    Ok(AssetSummary {
        settings: existing(root.join(SETTINGS_FILE)),
        catalog,
        scene: existing(root.join(SCENE_FILE)),
        yaml_files,
    })
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn count_yaml(path: &Path) -> Result<usize, String> {
    let entries = fs::read_dir(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;

    let mut count = 0usize;
    for entry in entries.flatten() {
        let is_yaml = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if is_yaml {
            count += 1;
        }
    }

    Ok(count)
}
