//! Static template library.
//!
//! Templates are JSON files in one directory. A file holds either a single
//! layout (`{"name"?, "slots": [...], "signature"?}`) or a collection
//! (`{"layouts": [...]}`). The directory is scanned on first access, in sorted
//! path order. Unreadable or malformed files are logged and skipped; they are
//! kept as [`TemplateLoadError`]s for inspection.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::CompatibilityTable;
use crate::error::{Result, TemplateLoadError};
use crate::inventory::{Inventory, Role};
use crate::layout::StaticLayout;
use crate::resolve::{MatchMode, admits};

/// Stored layouts, loaded lazily from a directory or given up front.
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    dir: Option<PathBuf>,
    mirrors: bool,
    seed: Vec<StaticLayout>,
    loaded: OnceLock<Loaded>,
}

#[derive(Debug, Default)]
struct Loaded {
    layouts: Vec<StaticLayout>,
    errors: Vec<TemplateLoadError>,
}

impl TemplateLibrary {
    /// Library backed by a template directory. Nothing is read until the
    /// layouts are first requested.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Library over in-memory layouts.
    pub fn from_layouts(layouts: Vec<StaticLayout>) -> Self {
        Self {
            seed: layouts,
            ..Self::default()
        }
    }

    /// Also offer a horizontally mirrored variant of every layout.
    pub fn with_mirrors(mut self) -> Self {
        self.mirrors = true;
        self
    }

    /// All layouts, in file order (mirrors follow their source layout).
    pub fn layouts(&self) -> &[StaticLayout] {
        &self.loaded().layouts
    }

    /// Files skipped during the scan.
    pub fn load_errors(&self) -> &[TemplateLoadError] {
        &self.loaded().errors
    }

    /// First layout named `name`.
    pub fn get(&self, name: &str) -> Option<&StaticLayout> {
        self.layouts().iter().find(|l| l.name == name)
    }

    /// Layouts whose signature and slot capacity can hold the inventory.
    ///
    /// This is a pre-filter on counts. Passing it does not guarantee the
    /// resolver can fill every required slot.
    pub fn list_compatible(
        &self,
        inventory: &Inventory,
        mode: MatchMode,
        table: &CompatibilityTable,
    ) -> Vec<&StaticLayout> {
        let counts = inventory.counts();
        self.layouts()
            .iter()
            .filter(|layout| {
                if mode == MatchMode::Strict && !layout.effective_signature().accepts(&counts) {
                    return false;
                }
                if inventory.len() > layout.slots.len() {
                    return false;
                }
                counts.iter().all(|(role, n)| capacity(layout, *role, mode, table) >= *n)
            })
            .collect()
    }

    /// Write `layout` to `dir` as `<name>_<YYYYmmdd_HHMMSS>.json`. Never
    /// overwrites: a numeric suffix is appended on collision.
    pub fn save(dir: impl AsRef<Path>, layout: &StaticLayout) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let stem = format!(
            "{}_{}",
            file_safe(&layout.name),
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let json = serde_json::to_string_pretty(layout)?;

        let mut n = 1;
        loop {
            let path = if n == 1 {
                dir.join(format!("{stem}.json"))
            } else {
                dir.join(format!("{stem}_{n}.json"))
            };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())?;
                    tracing::info!("saved layout '{}' to {}", layout.name, path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn loaded(&self) -> &Loaded {
        self.loaded.get_or_init(|| {
            let mut loaded = Loaded {
                layouts: self.seed.clone(),
                errors: Vec::new(),
            };
            if let Some(dir) = &self.dir {
                scan(dir, &mut loaded);
            }
            if self.mirrors {
                loaded.layouts = loaded
                    .layouts
                    .into_iter()
                    .flat_map(|l| {
                        let m = l.mirrored();
                        [l, m]
                    })
                    .collect();
            }
            tracing::debug!(
                "template library: {} layout(s), {} skipped file(s)",
                loaded.layouts.len(),
                loaded.errors.len()
            );
            loaded
        })
    }
}

/// Slots of `layout` that could take an item of `role` under `mode`.
fn capacity(layout: &StaticLayout, role: Role, mode: MatchMode, table: &CompatibilityTable) -> usize {
    layout
        .slots
        .iter()
        .filter(|s| admits(&s.role, role, mode, table))
        .count()
}

fn scan(dir: &Path, loaded: &mut Loaded) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("template directory {} unreadable: {e}", dir.display());
            loaded.errors.push(TemplateLoadError {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            });
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path) {
            Ok(layouts) => loaded.layouts.extend(layouts),
            Err(e) => {
                tracing::warn!("skipping {e}");
                loaded.errors.push(e);
            }
        }
    }
}

fn load_file(path: &Path) -> core::result::Result<Vec<StaticLayout>, TemplateLoadError> {
    let fail = |reason: String| TemplateLoadError {
        path: path.to_path_buf(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let mut value: serde_json::Value = serde_json::from_str(&text).map_err(|e| fail(e.to_string()))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut layouts: Vec<StaticLayout> = match value.get_mut("layouts") {
        Some(list) => serde_json::from_value(list.take()).map_err(|e| fail(e.to_string()))?,
        None => vec![serde_json::from_value(value).map_err(|e| fail(e.to_string()))?],
    };
    let single = layouts.len() == 1;
    for (i, layout) in layouts.iter_mut().enumerate() {
        if layout.name.is_empty() {
            layout.name = if single {
                stem.clone()
            } else {
                format!("{stem}_{}", i + 1)
            };
        }
        if layout.slots.is_empty() {
            return Err(fail(format!("layout '{}' has no slots", layout.name)));
        }
        for slot in &layout.slots {
            slot.rect
                .validate()
                .map_err(|e| fail(format!("layout '{}' slot '{}': {e}", layout.name, slot.name)))?;
        }
    }
    Ok(layouts)
}

fn file_safe(name: &str) -> String {
    let s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if s.is_empty() { String::from("layout") } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FracRect;
    use crate::layout::Slot;

    const TOWEL: &str = r#"{
        "slots": [
            {"name": "hero", "role": "hero", "x": 0.0, "y": 0.0, "w": 0.5, "h": 1.0},
            {"name": "a", "role": "small", "x": 0.5, "y": 0.0, "w": 0.5, "h": 0.5},
            {"name": "b", "role": "small", "x": 0.5, "y": 0.5, "w": 0.5, "h": 0.5}
        ]
    }"#;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn scans_sorted_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b_towel.json", TOWEL);
        write(dir.path(), "a_broken.json", "{ not json");
        write(
            dir.path(),
            "c_pack.json",
            r#"{"layouts": [
                {"name": "solo", "slots": [{"role": "hero", "x": 0, "y": 0, "w": 1, "h": 1}]},
                {"slots": [{"role": "large", "x": 0, "y": 0, "w": 1, "h": 1}]}
            ]}"#,
        );
        write(
            dir.path(),
            "d_range.json",
            r#"{"slots": [{"role": "hero", "x": 0.8, "y": 0, "w": 0.5, "h": 1}]}"#,
        );
        write(dir.path(), "notes.txt", "ignored");

        let lib = TemplateLibrary::from_dir(dir.path());
        let names: Vec<&str> = lib.layouts().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["b_towel", "solo", "c_pack_2"]);
        assert_eq!(lib.load_errors().len(), 2);
        assert!(lib.load_errors()[0].path.ends_with("a_broken.json"));
        assert!(lib.load_errors()[1].to_string().contains("d_range.json"));
    }

    #[test]
    fn slot_without_area_skips_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "towel.json", TOWEL);
        write(
            dir.path(),
            "flat.json",
            r#"{"slots": [
                {"name": "hero", "role": "hero", "x": 0, "y": 0, "w": 0.5, "h": 1},
                {"name": "line", "role": "small", "x": 0.5, "y": 0.2, "w": 0.5, "h": 0}
            ]}"#,
        );

        let lib = TemplateLibrary::from_dir(dir.path());
        let names: Vec<&str> = lib.layouts().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["towel"]);
        assert_eq!(lib.load_errors().len(), 1);
        assert!(lib.load_errors()[0].to_string().contains("no area"), "{}", lib.load_errors()[0]);
    }

    #[test]
    fn missing_dir_is_an_empty_library() {
        let lib = TemplateLibrary::from_dir("/nonexistent/zenboard/templates");
        assert!(lib.layouts().is_empty());
        assert_eq!(lib.load_errors().len(), 1);
    }

    #[test]
    fn list_compatible_filters_by_counts() {
        let towel: StaticLayout = serde_json::from_str(TOWEL).unwrap();
        let lib = TemplateLibrary::from_layouts(vec![towel]);
        let table = CompatibilityTable::new();

        let fits = Inventory::new()
            .with_many(Role::Hero, 1, 1000, 2000)
            .unwrap()
            .with_many(Role::Small, 2, 500, 500)
            .unwrap();
        assert_eq!(lib.list_compatible(&fits, MatchMode::Strict, &table).len(), 1);

        let too_many = fits.clone().with_many(Role::Small, 1, 500, 500).unwrap();
        assert!(lib.list_compatible(&too_many, MatchMode::Strict, &table).is_empty());
        assert!(lib.list_compatible(&too_many, MatchMode::Flexible, &table).is_empty());

        let tiny = Inventory::new()
            .with_many(Role::Hero, 1, 1000, 2000)
            .unwrap()
            .with_many(Role::Tiny, 2, 500, 500)
            .unwrap();
        assert!(lib.list_compatible(&tiny, MatchMode::Strict, &table).is_empty());
        let table = CompatibilityTable::new().allow(Role::Small, [Role::Tiny]);
        assert_eq!(lib.list_compatible(&tiny, MatchMode::Flexible, &table).len(), 1);
    }

    #[test]
    fn mirrors_follow_their_source() {
        let towel: StaticLayout = serde_json::from_str(TOWEL).unwrap();
        let lib = TemplateLibrary::from_layouts(vec![StaticLayout { name: "towel".into(), ..towel }]).with_mirrors();
        let names: Vec<&str> = lib.layouts().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["towel", "Mirror_towel"]);
        assert!(lib.get("Mirror_towel").is_some());
    }

    #[test]
    fn save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StaticLayout::new(
            "my layout",
            vec![Slot::new("hero", Role::Hero, FracRect::new(0.1, 0.1, 0.8, 0.8))],
        );
        let first = TemplateLibrary::save(dir.path(), &layout).unwrap();
        let second = TemplateLibrary::save(dir.path(), &layout).unwrap();
        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("my_layout_"), "{name}");

        let lib = TemplateLibrary::from_dir(dir.path());
        assert!(lib.load_errors().is_empty());
        assert_eq!(lib.layouts().len(), 2);
        assert_eq!(lib.layouts()[0].slots, layout.slots);
    }
}
