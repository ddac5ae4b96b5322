//! JSON backup of unlocked achievements (`{user_id: [achievement_id, …]}`).
//!
//! Rewritten atomically on every unlock: written to a sibling temp file and
//! renamed over the target, so a crash mid-write never truncates the backup.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

pub type AwardMap = BTreeMap<String, Vec<String>>;

pub fn write_backup(path: &Path, awards: &AwardMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(awards)?)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), users = awards.len(), "achievement backup written");
    Ok(())
}

pub fn load_backup(path: &Path) -> Result<AwardMap> {
    if !path.exists() {
        return Ok(AwardMap::new());
    }
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("achievements.json");

        let mut awards = AwardMap::new();
        awards.insert("42".into(), vec!["first_question".into()]);
        write_backup(&path, &awards).unwrap();
        assert_eq!(load_backup(&path).unwrap(), awards);

        awards
            .get_mut("42")
            .unwrap()
            .push("night_owl".into());
        write_backup(&path, &awards).unwrap();
        assert_eq!(load_backup(&path).unwrap(), awards);

        // No temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = load_backup(&dir.path().join("nope.json")).unwrap();
        assert!(map.is_empty());
    }
}
