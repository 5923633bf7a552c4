//! Modifier combinatorics
//!
//! Exhaustive mode takes the Cartesian product of every modifier axis in
//! manifest order. A `oneOf` axis contributes one choice per option; an
//! `anyOf` axis contributes its power set, enumerated by ascending bitmask
//! over option indices (empty selection first).
//!
//! Directed mode expands the manifest's generation specs.

use super::{Assignment, Selection};
use crate::error::{Error, Result};
use dtcg_manifest::{GenerateSpec, Manifest, Modifier, ModifierKind, ModifierRef};

/// Which sets and modifiers contribute files to a permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub sets: Vec<String>,
    pub modifiers: Vec<String>,
}

impl Scope {
    /// Every set and modifier of the manifest.
    pub fn all(manifest: &Manifest) -> Self {
        Self {
            sets: manifest.sets.iter().map(|s| s.name.clone()).collect(),
            modifiers: manifest.modifiers.iter().map(|m| m.name.clone()).collect(),
        }
    }

    pub fn has_set(&self, name: &str) -> bool {
        self.sets.iter().any(|s| s == name)
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m == name)
    }
}

/// One output of a generation spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedTarget {
    pub name: String,
    pub assignment: Assignment,
    pub scope: Scope,
}

fn one_of_choices(modifier: &Modifier) -> Vec<Selection> {
    modifier
        .options
        .iter()
        .map(|o| Selection::One(o.name.clone()))
        .collect()
}

fn too_many(modifier: &Modifier) -> Error {
    Error::TooManyCombinations {
        modifier: modifier.name.clone(),
        options: modifier.options.len(),
    }
}

fn choices(modifier: &Modifier) -> Result<Vec<Selection>> {
    match modifier.kind {
        ModifierKind::OneOf => Ok(one_of_choices(modifier)),
        ModifierKind::AnyOf => {
            let count = u32::try_from(modifier.options.len()).map_err(|_| too_many(modifier))?;
            let masks = 1usize.checked_shl(count).ok_or_else(|| too_many(modifier))?;
            Ok((0..masks)
                .map(|mask| {
                    Selection::Many(
                        modifier
                            .options
                            .iter()
                            .enumerate()
                            .filter(|(index, _)| mask & (1 << index) != 0)
                            .map(|(_, o)| o.name.clone())
                            .collect(),
                    )
                })
                .collect())
        }
    }
}

fn product(axes: Vec<(String, Vec<Selection>)>) -> Vec<Assignment> {
    let mut assignments = vec![Assignment::new()];
    for (name, axis) in axes {
        assignments = assignments
            .iter()
            .flat_map(|partial| {
                axis.iter().map(|choice| {
                    let mut next = partial.clone();
                    next.insert(name.clone(), choice.clone());
                    next
                })
            })
            .collect();
    }
    assignments
}

/// Every selection of every modifier.
///
/// Fails when the combination count does not fit in memory addressing.
pub fn exhaustive(manifest: &Manifest) -> Result<Vec<Assignment>> {
    let mut axes = Vec::with_capacity(manifest.modifiers.len());
    let mut total = 1usize;
    for modifier in &manifest.modifiers {
        let axis = choices(modifier)?;
        total = total
            .checked_mul(axis.len())
            .ok_or_else(|| too_many(modifier))?;
        axes.push((modifier.name.clone(), axis));
    }
    Ok(product(axes))
}

/// Outputs of one generation spec.
///
/// Generic `oneOf` references expand into one output per value, in option
/// order; each adds `-<value>` to the output name. Pinned references fix
/// a value. Unknown references are skipped (manifest validation reports
/// them).
pub fn directed(manifest: &Manifest, spec: &GenerateSpec) -> Vec<DirectedTarget> {
    let refs = spec.modifier_refs();
    let referenced: Vec<&str> = refs.iter().map(ModifierRef::modifier).collect();

    let scope = Scope {
        sets: manifest
            .sets
            .iter()
            .filter(|s| selected(&s.name, &spec.include_sets, &spec.exclude_sets))
            .map(|s| s.name.clone())
            .collect(),
        modifiers: manifest
            .modifiers
            .iter()
            .filter(|m| {
                referenced.contains(&m.name.as_str())
                    || selected(&m.name, &spec.include_modifiers, &spec.exclude_modifiers)
            })
            .map(|m| m.name.clone())
            .collect(),
    };

    let mut pinned = Assignment::new();
    let mut generic = Vec::new();
    for reference in &refs {
        let Some(modifier) = manifest.modifier(reference.modifier()) else {
            continue;
        };
        match reference {
            ModifierRef::Pinned { value, .. } => {
                let selection = match modifier.kind {
                    ModifierKind::OneOf => Selection::One(value.clone()),
                    ModifierKind::AnyOf => Selection::Many(vec![value.clone()]),
                };
                pinned.insert(modifier.name.clone(), selection);
            }
            ModifierRef::Generic(_) if modifier.kind == ModifierKind::OneOf => {
                generic.push((modifier.name.clone(), one_of_choices(modifier)));
            }
            ModifierRef::Generic(_) => {}
        }
    }

    let generic_names: Vec<String> = generic.iter().map(|(name, _)| name.clone()).collect();
    product(generic)
        .into_iter()
        .map(|expansion| {
            let mut name = spec.output.clone();
            for modifier in &generic_names {
                if let Some(Selection::One(value)) = expansion.get(modifier) {
                    name.push('-');
                    name.push_str(value);
                }
            }
            let mut assignment = pinned.clone();
            assignment.extend(expansion);
            DirectedTarget {
                name,
                assignment,
                scope: scope.clone(),
            }
        })
        .collect()
}

/// Include/exclude filtering; an explicit include wins over an exclude,
/// an empty include list means everything not excluded.
fn selected(name: &str, include: &[String], exclude: &[String]) -> bool {
    if include.iter().any(|pattern| glob_match(pattern, name)) {
        return true;
    }
    if exclude.iter().any(|pattern| glob_match(pattern, name)) {
        return false;
    }
    include.is_empty()
}

/// Match `name` against a pattern where `*` matches any run of characters.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !name.starts_with(first) || name.len() < first.len() + last.len() || !name.ends_with(last) {
        return false;
    }

    let mut rest = &name[first.len()..name.len() - last.len()];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(index) => rest = &rest[index + middle.len()..],
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtcg_manifest::{ModifierOption, TokenSet};
    use rstest::rstest;

    fn modifier(name: &str, kind: ModifierKind, options: &[&str]) -> Modifier {
        Modifier {
            name: name.into(),
            description: None,
            kind,
            options: options
                .iter()
                .map(|o| ModifierOption {
                    name: o.to_string(),
                    sources: vec![],
                })
                .collect(),
            default: None,
        }
    }

    fn manifest(modifiers: Vec<Modifier>) -> Manifest {
        Manifest {
            sets: vec![
                TokenSet {
                    name: "core".into(),
                    description: None,
                    sources: vec![],
                },
                TokenSet {
                    name: "brand-extra".into(),
                    description: None,
                    sources: vec![],
                },
            ],
            modifiers,
            ..Manifest::default()
        }
    }

    #[test]
    fn one_of_axes_multiply() {
        let manifest = manifest(vec![
            modifier("theme", ModifierKind::OneOf, &["light", "dark"]),
            modifier("density", ModifierKind::OneOf, &["compact", "normal", "loose"]),
        ]);
        let all = exhaustive(&manifest).unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0]["theme"], Selection::from("light"));
        assert_eq!(all[0]["density"], Selection::from("compact"));
        assert_eq!(all[1]["density"], Selection::from("normal"));
    }

    #[test]
    fn any_of_axis_is_power_set_in_mask_order() {
        let manifest = manifest(vec![modifier("features", ModifierKind::AnyOf, &["a", "b", "c"])]);
        let all = exhaustive(&manifest).unwrap();
        assert_eq!(all.len(), 8);
        let selections: Vec<Vec<String>> = all.iter().map(|a| a["features"].values()).collect();
        assert_eq!(selections[0], Vec::<String>::new());
        assert_eq!(selections[1], vec!["a"]);
        assert_eq!(selections[2], vec!["b"]);
        assert_eq!(selections[3], vec!["a", "b"]);
        assert_eq!(selections[7], vec!["a", "b", "c"]);
    }

    #[test]
    fn no_modifiers_is_one_empty_assignment() {
        assert_eq!(exhaustive(&manifest(vec![])).unwrap(), vec![Assignment::new()]);
    }

    #[test]
    fn oversized_any_of_is_rejected() {
        let names: Vec<String> = (0..64).map(|i| format!("f{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let manifest = manifest(vec![modifier("features", ModifierKind::AnyOf, &names)]);

        let err = exhaustive(&manifest).unwrap_err();
        assert!(matches!(
            err,
            Error::TooManyCombinations { ref modifier, options: 64 } if modifier == "features"
        ));
    }

    #[test]
    fn directed_expands_generic_and_keeps_pins() {
        let manifest = manifest(vec![
            modifier("theme", ModifierKind::OneOf, &["light", "dark"]),
            modifier("density", ModifierKind::OneOf, &["compact", "normal"]),
            modifier("features", ModifierKind::AnyOf, &["motion"]),
        ]);
        let spec = GenerateSpec {
            output: "web".into(),
            modifiers: vec!["theme".into(), "density:compact".into()],
            exclude_modifiers: vec!["features".into()],
            ..GenerateSpec::default()
        };

        let targets = directed(&manifest, &spec);
        let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["web-light", "web-dark"]);
        assert_eq!(targets[1].assignment["theme"], Selection::from("dark"));
        assert_eq!(targets[1].assignment["density"], Selection::from("compact"));
        assert_eq!(targets[0].scope.modifiers, vec!["theme", "density"]);
    }

    #[test]
    fn directed_without_generic_refs_is_one_output() {
        let manifest = manifest(vec![modifier("theme", ModifierKind::OneOf, &["light", "dark"])]);
        let spec = GenerateSpec {
            output: "all".into(),
            exclude_sets: vec!["brand-*".into()],
            ..GenerateSpec::default()
        };
        let targets = directed(&manifest, &spec);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "all");
        assert_eq!(targets[0].scope.sets, vec!["core"]);
        assert_eq!(targets[0].scope.modifiers, vec!["theme"]);
    }

    #[rstest]
    #[case("core", &["*"], &["*"], true)]
    #[case("brand-x", &[], &["brand-*"], false)]
    #[case("core", &["core"], &[], true)]
    #[case("core", &["other"], &[], false)]
    #[case("core", &[], &[], true)]
    fn include_wins_over_exclude(
        #[case] name: &str,
        #[case] include: &[&str],
        #[case] exclude: &[&str],
        #[case] expected: bool,
    ) {
        let include: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        assert_eq!(selected(name, &include, &exclude), expected);
    }

    #[rstest]
    #[case("*", "anything", true)]
    #[case("brand-*", "brand-x", true)]
    #[case("*-dark", "theme-dark", true)]
    #[case("a*c", "abc", true)]
    #[case("a*b*c", "axxbyyc", true)]
    #[case("a*c", "ab", false)]
    #[case("exact", "exact", true)]
    #[case("exact", "exactly", false)]
    fn glob_patterns(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        assert_eq!(glob_match(pattern, name), expected);
    }
}
