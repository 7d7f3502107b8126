//! Config validation: unknown-key detection with Levenshtein suggestions
//! and warnings for legal but suspicious hyperparameters.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for ScorerConfig.
///
/// Maintained by hand to match the struct hierarchy in scorer_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [synthesizer]
        "synthesizer",
        "synthesizer.seed",
        "synthesizer.noise_std",
        // [training]
        "training",
        "training.test_fraction",
        "training.split_seed",
        // [forest]
        "forest",
        "forest.n_trees",
        "forest.max_depth",
        "forest.min_samples_split",
        "forest.min_samples_leaf",
        "forest.seed",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known name for an unknown one, if within edit distance 3.
///
/// Ties go to the lexicographically smaller candidate so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        best = match best {
            Some((bk, bd)) if bd < dist || (bd == dist && bk <= k) => Some((bk, bd)),
            _ => Some((k, dist)),
        };
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Suspicious Values
// ============================================================================

/// Warnings for hyperparameters that are legal but likely mistakes.
pub fn check_suspicious_values(config: &super::ScorerConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |field: &str, message: String| {
        warnings.push(ValidationWarning {
            field: field.to_string(),
            message,
            suggestion: None,
        });
    };

    if config.forest.n_trees < 10 {
        warn(
            "forest.n_trees",
            format!("forest.n_trees = {} gives a very noisy ensemble", config.forest.n_trees),
        );
    }
    if config.forest.max_depth > 32 {
        warn(
            "forest.max_depth",
            format!("forest.max_depth = {} will memorize the training partition", config.forest.max_depth),
        );
    }
    if config.training.test_fraction > 0.5 {
        warn(
            "training.test_fraction",
            format!(
                "training.test_fraction = {:.2} holds out more rows than it trains on",
                config.training.test_fraction
            ),
        );
    }
    if config.synthesizer.noise_std > 0.25 {
        warn(
            "synthesizer.noise_std",
            format!(
                "synthesizer.noise_std = {:.2} will swamp the synthetic signal",
                config.synthesizer.noise_std
            ),
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_walk_nested_keys() {
        let value: toml::Value = "[a]\nb = 1\nc = 2\n".parse().expect("toml");
        let mut keys = walk_toml_keys(&value, "");
        keys.sort();
        assert_eq!(keys, vec!["a", "a.b", "a.c"]);
    }

    #[test]
    fn test_no_suggestion_when_far() {
        let known = known_config_keys();
        assert_eq!(suggest_correction("completely.unrelated.key", &known), None);
    }
}
