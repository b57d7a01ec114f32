use std::error::Error;
use std::fs;
use std::path::Path;
use yaml_rust2::{Yaml, YamlEmitter, YamlLoader};

pub type YamlError = Box<dyn Error + Send + Sync>;

/// Loads a YAML file, resolving `!include <path>` lines relative to the
/// including file. Values in the including file win over included ones.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, YamlError> {
    let res = process_includes_recursive(path)?;
    tracing::debug!(path = %path.display(), "Processed config includes");
    Ok(res)
}

/// Same as [`load_yaml_with_includes`], but returns the merged document as text
/// so it can be handed to a serde deserializer.
pub fn load_yaml_string_with_includes(path: &Path) -> Result<String, YamlError> {
    let yaml = load_yaml_with_includes(path)?;
    let mut out_str = String::new();
    {
        let mut emitter = YamlEmitter::new(&mut out_str);
        emitter.dump(&yaml)?;
    }
    Ok(out_str)
}

fn process_includes_recursive(path: &Path) -> Result<Yaml, YamlError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, rest): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|&line| line.trim().starts_with("!include"));

    let mut merged_includes: Option<Yaml> = None;
    for line in includes {
        let include_path = line.trim().trim_start_matches("!include").trim();
        if include_path.is_empty() {
            return Err(format!("Empty !include directive in {}", path.display()).into());
        }
        let included = process_includes_recursive(&base_path.join(include_path))?;
        merged_includes = Some(match merged_includes {
            Some(acc) => merge_yaml(&acc, &included),
            None => included,
        });
    }

    let merged_rest = YamlLoader::load_from_str(&rest.join("\n"))?
        .into_iter()
        .reduce(|acc: Yaml, doc: Yaml| merge_yaml(&acc, &doc));

    match (merged_includes, merged_rest) {
        (Some(base), Some(own)) => Ok(merge_yaml(&base, &own)),
        (Some(base), None) => Ok(base),
        (None, Some(own)) => Ok(own),
        (None, None) => Err(format!("{} contains no YAML document", path.display()).into()),
    }
}

fn merge_yaml(base: &Yaml, override_yaml: &Yaml) -> Yaml {
    match (base, override_yaml) {
        (Yaml::Hash(base_hash), Yaml::Hash(override_hash)) => {
            let mut result = base_hash.clone();
            for (key, value) in override_hash {
                match base_hash.get(key) {
                    Some(base_value) => {
                        result.insert(key.clone(), merge_yaml(base_value, value));
                    }
                    None => {
                        result.insert(key.clone(), value.clone());
                    }
                }
            }
            Yaml::Hash(result)
        }
        (_, override_value) => override_value.clone(),
    }
}
