//! Reads a content directory into a ready-to-use catalog, technology tree
//! and configuration.
//!
//! A directory holds `config`, `items` and `technologies` files, each in
//! RON, TOML or JSON (detected from the extension). `config` is optional;
//! the other two are required. Cross-references are by name.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use telco_core::config::SimConfig;
use telco_core::error::CatalogError;
use telco_core::fixed::Fixed64;
use telco_core::item::{Item, ItemCatalog};
use telco_core::service::ServiceSet;
use telco_tech_tree::{TechId, TechTree, TechTreeError, Technology};
use tracing::{debug, info};

use crate::schema::{ItemData, TechnologyData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// Technologies whose prerequisites can never all be registered.
    #[error("prerequisite cycle through '{name}' in {file}")]
    PrerequisiteCycle { file: PathBuf, name: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Tech(#[from] TechTreeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.ron`, `.toml` or `.json` in `dir`. More than one of them
/// is a [`DataLoadError::ConflictingFormats`].
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML files keep the array under `toml_key`; RON and
/// JSON files are the bare list.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Ron | Format::Json => deserialize_file(path),
        Format::Toml => {
            let content = std::fs::read_to_string(path)?;
            let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .remove(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
            array.try_into().map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

pub fn check_duplicate<V>(map: &HashMap<String, V>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Everything a [`telco_core::game::Game`] needs besides the map.
#[derive(Debug)]
pub struct GameData {
    pub config: SimConfig,
    pub catalog: ItemCatalog,
    /// Template tree; each company gets a fresh copy.
    pub tech: TechTree,
    /// Technology ids by name, in file order starting at 1.
    pub tech_names: HashMap<String, TechId>,
}

/// Build a tech tree from definitions. Ids follow file order; a technology
/// may list prerequisites defined later in the file.
pub fn build_tech_tree(
    defs: &[TechnologyData],
    file: &Path,
) -> Result<(TechTree, HashMap<String, TechId>), DataLoadError> {
    let mut names: HashMap<String, TechId> = HashMap::new();
    for (idx, def) in defs.iter().enumerate() {
        check_duplicate(&names, &def.name, file)?;
        names.insert(def.name.clone(), TechId(idx as u32 + 1));
    }

    let mut pending: Vec<Technology> = Vec::with_capacity(defs.len());
    for def in defs {
        let prerequisites = def
            .prerequisites
            .iter()
            .map(|p| resolve_name(&names, p, file, "technology").copied())
            .collect::<Result<Vec<_>, _>>()?;
        pending.push(Technology {
            id: names[&def.name],
            name: def.name.clone(),
            prerequisites,
            cost: def.cost,
        });
    }

    // Register in passes so prerequisites always go first.
    let mut tree = TechTree::new();
    while !pending.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|t| t.prerequisites.iter().all(|p| tree.get_technology(*p).is_some()));
        if ready.is_empty() {
            let name = blocked.first().map(|t| t.name.clone()).unwrap_or_default();
            return Err(DataLoadError::PrerequisiteCycle {
                file: file.to_path_buf(),
                name,
            });
        }
        for tech in ready {
            tree.register(tech)?;
        }
        pending = blocked;
    }
    Ok((tree, names))
}

/// Build the item catalog, resolving technology names.
pub fn build_catalog(
    defs: &[ItemData],
    tech_names: &HashMap<String, TechId>,
    file: &Path,
) -> Result<ItemCatalog, DataLoadError> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    let mut catalog = ItemCatalog::new();
    for def in defs {
        check_duplicate(&seen, &def.name, file)?;
        seen.insert(def.name.clone(), ());

        let technology = def
            .technology
            .as_deref()
            .map(|name| resolve_name(tech_names, name, file, "technology").copied())
            .transpose()?;

        let mut item = Item::new(&def.name, def.kind, Fixed64::from_num(def.cost));
        item.rack_space = def.rack_space;
        item.range = def.range;
        item.subscribers = def.subscribers;
        item.throughput = def.throughput;
        item.technology = technology;
        item.wiring = def.wiring.clone();
        item.services = ServiceSet::of(&def.services);
        let id = catalog.register(item)?;
        debug!(item = %def.name, id = id.0, "item registered");
    }
    Ok(catalog)
}

/// Load a content directory.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let config = match find_data_file(dir, "config")? {
        Some(path) => deserialize_file(&path)?,
        None => SimConfig::default(),
    };

    let tech_path = require_data_file(dir, "technologies")?;
    let tech_defs: Vec<TechnologyData> = deserialize_list(&tech_path, "technologies")?;
    let (tech, tech_names) = build_tech_tree(&tech_defs, &tech_path)?;

    let items_path = require_data_file(dir, "items")?;
    let item_defs: Vec<ItemData> = deserialize_list(&items_path, "items")?;
    let catalog = build_catalog(&item_defs, &tech_names, &items_path)?;

    info!(
        dir = %dir.display(),
        items = catalog.len(),
        technologies = tech.technology_count(),
        "game data loaded"
    );
    Ok(GameData {
        config,
        catalog,
        tech,
        tech_names,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use telco_core::item::ItemKind;
    use telco_core::service::{CableType, Service};

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("telco_data_test_{suffix}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const TECH_RON: &str = r#"[
        (name: "Fiber", cost: 200, prerequisites: ["DOCSIS"]),
        (name: "DOCSIS", cost: 100),
    ]"#;

    const ITEMS_RON: &str = r#"[
        (name: "Copper Cable", kind: Cable, cost: 1.0, wiring: [Copper]),
        (name: "Coaxial Cable", kind: Cable, cost: 2.0, wiring: [Coaxial], technology: Some("DOCSIS")),
        (name: "DSL Modem", kind: Cpe, cost: 20.0, services: [Phone, Broadband]),
        (name: "Rack", kind: Rack, cost: 200.0, rack_space: 8),
    ]"#;

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("items.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("items")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "items").unwrap(), None);
        fs::write(dir.join("items.json"), "[]").unwrap();
        assert_eq!(find_data_file(&dir, "items").unwrap(), Some(dir.join("items.json")));
        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();

        let result = find_data_file(&dir, "items");
        assert!(matches!(result, Err(DataLoadError::ConflictingFormats { .. })));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        let result = require_data_file(&dir, "items");
        assert!(matches!(result, Err(DataLoadError::MissingRequired { ref file, .. }) if file == "items"));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_toml() {
        let dir = make_test_dir("list_toml");
        let path = dir.join("technologies.toml");
        fs::write(
            &path,
            r#"
[[technologies]]
name = "DOCSIS"
cost = 100
"#,
        )
        .unwrap();

        let techs: Vec<TechnologyData> = deserialize_list(&path, "technologies").unwrap();
        assert_eq!(techs.len(), 1);
        assert_eq!(techs[0].cost, 100);

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("list_toml_missing");
        let path = dir.join("items.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_list(&path, "items");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn tech_tree_registers_out_of_order_prerequisites() {
        let defs: Vec<TechnologyData> = ron::from_str(TECH_RON).unwrap();
        let (tree, names) = build_tech_tree(&defs, Path::new("technologies.ron")).unwrap();
        assert_eq!(names["Fiber"], TechId(1));
        assert_eq!(names["DOCSIS"], TechId(2));
        assert_eq!(tree.technology_count(), 2);
        assert_eq!(tree.available(), vec![TechId(2)]);
    }

    #[test]
    fn tech_tree_rejects_unknown_prerequisite() {
        let defs: Vec<TechnologyData> = ron::from_str(r#"[(name: "Fiber", cost: 1, prerequisites: ["Laser"])]"#).unwrap();
        let result = build_tech_tree(&defs, Path::new("technologies.ron"));
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "technology", .. }) if name == "Laser"
        ));
    }

    #[test]
    fn tech_tree_rejects_cycles() {
        let defs: Vec<TechnologyData> = ron::from_str(
            r#"[(name: "A", cost: 1, prerequisites: ["B"]), (name: "B", cost: 1, prerequisites: ["A"])]"#,
        )
        .unwrap();
        let result = build_tech_tree(&defs, Path::new("technologies.ron"));
        assert!(matches!(result, Err(DataLoadError::PrerequisiteCycle { .. })));
    }

    #[test]
    fn tech_tree_rejects_duplicates() {
        let defs: Vec<TechnologyData> =
            ron::from_str(r#"[(name: "A", cost: 1), (name: "A", cost: 2)]"#).unwrap();
        let result = build_tech_tree(&defs, Path::new("technologies.ron"));
        assert!(matches!(result, Err(DataLoadError::DuplicateName { ref name, .. }) if name == "A"));
    }

    #[test]
    fn catalog_resolves_technology_names() {
        let techs: Vec<TechnologyData> = ron::from_str(TECH_RON).unwrap();
        let (_, names) = build_tech_tree(&techs, Path::new("technologies.ron")).unwrap();
        let items: Vec<ItemData> = ron::from_str(ITEMS_RON).unwrap();
        let catalog = build_catalog(&items, &names, Path::new("items.ron")).unwrap();

        assert_eq!(catalog.len(), 4);
        let coax = catalog.by_name("Coaxial Cable").unwrap();
        assert_eq!(coax.technology, Some(names["DOCSIS"]));
        assert_eq!(coax.cable_type(), Some(CableType::Coaxial));
        let modem = catalog.by_name("DSL Modem").unwrap();
        assert_eq!(modem.kind, ItemKind::Cpe);
        assert!(modem.provides(Service::Broadband));
        assert_eq!(catalog.by_name("Rack").unwrap().rack_space, 8);
    }

    #[test]
    fn catalog_rejects_unknown_technology() {
        let items: Vec<ItemData> =
            ron::from_str(r#"[(name: "X", kind: Fan, cost: 1.0, technology: Some("Nope"))]"#).unwrap();
        let result = build_catalog(&items, &HashMap::new(), Path::new("items.ron"));
        assert!(matches!(result, Err(DataLoadError::UnresolvedRef { .. })));
    }

    #[test]
    fn catalog_rejects_cable_without_medium() {
        let items: Vec<ItemData> = ron::from_str(r#"[(name: "Cable", kind: Cable, cost: 1.0)]"#).unwrap();
        let result = build_catalog(&items, &HashMap::new(), Path::new("items.ron"));
        assert!(matches!(result, Err(DataLoadError::Catalog(CatalogError::MissingCableType(_)))));
    }

    // -----------------------------------------------------------------------
    // load_game_data
    // -----------------------------------------------------------------------

    #[test]
    fn load_directory_with_default_config() {
        let dir = make_test_dir("load_default");
        fs::write(dir.join("technologies.ron"), TECH_RON).unwrap();
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.config, SimConfig::default());
        assert_eq!(data.catalog.len(), 4);
        assert_eq!(data.tech.technology_count(), 2);

        cleanup(&dir);
    }

    #[test]
    fn load_directory_with_partial_config() {
        let dir = make_test_dir("load_config");
        fs::write(dir.join("technologies.ron"), TECH_RON).unwrap();
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
[company]
starting_money = 1000.0

[ai]
max_targets = 3
"#,
        )
        .unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.config.company.starting_money, 1000.0);
        assert_eq!(data.config.ai.max_targets, 3);
        assert_eq!(data.config.market, SimConfig::default().market);

        cleanup(&dir);
    }

    #[test]
    fn load_directory_missing_items() {
        let dir = make_test_dir("load_missing");
        fs::write(dir.join("technologies.ron"), TECH_RON).unwrap();
        let result = load_game_data(&dir);
        assert!(matches!(result, Err(DataLoadError::MissingRequired { .. })));
        cleanup(&dir);
    }

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::ConflictingFormats {
            a: PathBuf::from("items.ron"),
            b: PathBuf::from("items.json"),
        };
        let msg = format!("{e}");
        assert!(msg.contains("items.ron"));
        assert!(msg.contains("items.json"));

        let e = DataLoadError::PrerequisiteCycle {
            file: PathBuf::from("technologies.ron"),
            name: "A".to_string(),
        };
        assert!(format!("{e}").contains("cycle"));
    }
}
