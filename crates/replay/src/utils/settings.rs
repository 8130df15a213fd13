use anyhow::{bail, Result};
use doorcount::DoorConfig;
use serde::Deserialize;
use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

/// One doorway to replay.
#[derive(Debug, Clone, Deserialize)]
pub struct DoorSettings {
    pub name: String,
    /// CSV file with the recorded observations for this door.
    pub observations: PathBuf,
    #[serde(flatten)]
    pub config: DoorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub doors: Vec<DoorSettings>,
}

impl Settings {
    /// Load settings from a file. Relative observation paths are resolved against the file's directory.
    pub fn from_path(path: &Path) -> Result<Settings> {
        let mut settings = Settings::from_reader(File::open(path)?)?;
        if let Some(base) = path.parent() {
            for door in settings.doors.iter_mut() {
                if door.observations.is_relative() {
                    door.observations = base.join(&door.observations);
                }
            }
        }
        Ok(settings)
    }

    /// Parse settings from JSON. Relative observation paths are kept as written.
    pub fn from_reader<R: Read>(reader: R) -> Result<Settings> {
        let settings: Settings = serde_json::from_reader(reader)?;

        if settings.doors.is_empty() {
            bail!("settings must describe at least one door");
        }
        let mut names = HashSet::new();
        for door in &settings.doors {
            if !names.insert(door.name.as_str()) {
                bail!("door '{}' is listed more than once", door.name);
            }
        }

        Ok(settings)
    }
}
