use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A structure attached to the dataset. The molfile is kept opaque; only the
/// molecular formula is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Molecule {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub molfile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

/// Parse a molecular formula such as "C6H12O" or "CH3CH2OH" into element
/// counts. Unparseable characters are skipped.
pub fn parse_formula(formula: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    let chars: Vec<char> = formula.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_uppercase() {
            i += 1;
            continue;
        }
        let mut element = chars[i].to_string();
        i += 1;
        while i < chars.len() && chars[i].is_ascii_lowercase() {
            element.push(chars[i]);
            i += 1;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let count = if start == i {
            1
        } else {
            chars[start..i].iter().collect::<String>().parse().unwrap_or(1)
        };
        *counts.entry(element).or_insert(0) += count;
    }
    counts
}

/// Number of atoms of `element` in `formula`
pub fn atom_count(formula: &str, element: &str) -> usize {
    parse_formula(formula).get(element).copied().unwrap_or(0)
}
