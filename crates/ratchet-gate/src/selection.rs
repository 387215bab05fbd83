//! Task selection policy and its run-scoped evaluation state

use std::collections::HashMap;

use tracing::trace;

use crate::tags::{TagSpec, Tags};

/// Which tasks of a gate run are active. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every task runs
    #[default]
    All,
    /// Skip tasks until the first title containing the marker
    StartAt(String),
    /// Match titles by substring
    Filters { substrings: Vec<String>, exclude: bool },
    /// Match whole titles
    StrictFilters { names: Vec<String>, exclude: bool },
    /// Match tags, optionally restricted to occurrence windows
    Tags { specs: Vec<TagSpec>, exclude: bool },
}

impl Selection {
    /// Tag selection. Inclusive selections implicitly select the `always` tag.
    pub fn tags(mut specs: Vec<TagSpec>, exclude: bool) -> Self {
        if !exclude && !specs.iter().any(|s| s.name == Tags::ALWAYS) {
            specs.push(TagSpec::plain(Tags::ALWAYS));
        }
        Self::Tags { specs, exclude }
    }

    /// Whether a tag is part of an inclusive tag selection, or the run is
    /// not tag-restricted at all
    pub fn includes_tag(&self, tag: &str) -> bool {
        match self {
            Self::Tags {
                specs,
                exclude: false,
            } => specs.iter().any(|s| s.name == tag),
            Self::Tags { exclude: true, .. } => false,
            _ => true,
        }
    }
}

/// Evaluates a [`Selection`] against tasks in run order.
///
/// Holds the only mutable selection state: whether the start-at marker has
/// been consumed, and how often each ranged tag has been encountered.
#[derive(Debug, Clone)]
pub struct Selector {
    selection: Selection,
    start_at: Option<String>,
    counters: HashMap<String, usize>,
}

impl Selector {
    /// Fresh evaluation state for one run
    pub fn new(selection: Selection) -> Self {
        let start_at = match &selection {
            Selection::StartAt(marker) => Some(marker.clone()),
            _ => None,
        };
        let counters = match &selection {
            Selection::Tags { specs, .. } => specs
                .iter()
                .filter(|s| s.range.is_some())
                .map(|s| (s.name.clone(), 0))
                .collect(),
            _ => HashMap::new(),
        };
        Self {
            selection,
            start_at,
            counters,
        }
    }

    /// The policy being evaluated
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Decide whether the next task in run order is active.
    ///
    /// Must be called exactly once per task, in run order.
    pub fn is_selected(&mut self, title: &str, legacy_titles: &[String], tags: &[String]) -> bool {
        let titles = || std::iter::once(title).chain(legacy_titles.iter().map(String::as_str));

        let selected = match &self.selection {
            Selection::All => true,
            Selection::StartAt(_) => match &self.start_at {
                Some(marker) if title.contains(marker.as_str()) => {
                    self.start_at = None;
                    true
                }
                Some(_) => false,
                None => true,
            },
            Selection::Filters {
                substrings,
                exclude,
            } => {
                let hit = titles().any(|t| substrings.iter().any(|f| t.contains(f.as_str())));
                hit != *exclude
            }
            Selection::StrictFilters { names, exclude } => {
                let hit = titles().any(|t| names.iter().any(|f| f == t));
                hit != *exclude
            }
            Selection::Tags {
                specs,
                exclude: true,
            } => {
                // Untagged tasks stay active; tagged ones are dropped only
                // when every tag is excluded
                tags.is_empty() || !tags.iter().all(|t| specs.iter().any(|s| &s.name == t))
            }
            Selection::Tags {
                specs,
                exclude: false,
            } => Self::tag_matches(specs, &mut self.counters, tags),
        };

        trace!(task = title, selected, "selection");
        selected
    }

    /// First selected tag wins. Ranged tags advance their counter on every
    /// encounter, whether or not the occurrence is in range.
    fn tag_matches(specs: &[TagSpec], counters: &mut HashMap<String, usize>, tags: &[String]) -> bool {
        for tag in tags {
            let Some(spec) = specs.iter().find(|s| &s.name == tag) else {
                continue;
            };
            let Some(range) = spec.range else {
                return true;
            };
            let count = counters.entry(tag.clone()).or_insert(0);
            let occurrence = *count;
            *count += 1;
            if range.contains(occurrence) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn select(selector: &mut Selector, title: &str, tags: &[&str]) -> bool {
        selector.is_selected(title, &[], &strings(tags))
    }

    #[test]
    fn test_select_all() {
        let mut selector = Selector::new(Selection::All);
        assert!(select(&mut selector, "A", &[]));
        assert!(select(&mut selector, "B", &["style"]));
    }

    #[test]
    fn test_start_at_consumed_once() {
        let mut selector = Selector::new(Selection::StartAt("C".to_string()));
        let active: Vec<bool> = ["A", "B", "C", "D", "CC"]
            .iter()
            .map(|t| select(&mut selector, t, &[]))
            .collect();
        assert_eq!(active, vec![false, false, true, true, true]);
    }

    #[test]
    fn test_substring_filters() {
        let mut include = Selector::new(Selection::Filters {
            substrings: strings(&["Build", "Lint"]),
            exclude: false,
        });
        assert!(select(&mut include, "BuildWithJavac", &[]));
        assert!(!select(&mut include, "Versions", &[]));

        let mut exclude = Selector::new(Selection::Filters {
            substrings: strings(&["Build"]),
            exclude: true,
        });
        assert!(!select(&mut exclude, "BuildWithJavac", &[]));
        assert!(select(&mut exclude, "Versions", &[]));
    }

    #[test]
    fn test_filters_match_legacy_titles() {
        let mut selector = Selector::new(Selection::Filters {
            substrings: strings(&["BuildJava"]),
            exclude: false,
        });
        assert!(selector.is_selected("BuildWithEcj", &strings(&["BuildJavaWithEcj"]), &[]));
    }

    #[test]
    fn test_strict_filters_match_whole_title() {
        let mut selector = Selector::new(Selection::StrictFilters {
            names: strings(&["Build"]),
            exclude: false,
        });
        assert!(select(&mut selector, "Build", &[]));
        assert!(!select(&mut selector, "BuildWithJavac", &[]));
    }

    #[test]
    fn test_tag_range_selects_window() {
        let specs = TagSpec::parse_list("build:1:3", false).unwrap();
        let mut selector = Selector::new(Selection::tags(specs, false));
        let active: Vec<bool> = (0..5)
            .map(|i| select(&mut selector, &format!("task{i}"), &["build"]))
            .collect();
        assert_eq!(active, vec![false, true, true, false, false]);
        assert_eq!(selector.counters["build"], 5);
    }

    #[test]
    fn test_untagged_tasks_inactive_in_tag_mode() {
        let specs = TagSpec::parse_list("style", false).unwrap();
        let mut selector = Selector::new(Selection::tags(specs, false));
        assert!(!select(&mut selector, "A", &[]));
        assert!(select(&mut selector, "B", &["style"]));
        assert!(!select(&mut selector, "C", &["build"]));
    }

    #[test]
    fn test_always_tag_implicitly_selected() {
        let specs = TagSpec::parse_list("style", false).unwrap();
        let mut selector = Selector::new(Selection::tags(specs, false));
        assert!(select(&mut selector, "Versions", &["always"]));

        let selection = Selection::tags(TagSpec::parse_list("style", true).unwrap(), true);
        assert!(!selection.includes_tag(Tags::ALWAYS));
    }

    #[test]
    fn test_exclusion_drops_only_fully_excluded_tasks() {
        let specs = TagSpec::parse_list("style", true).unwrap();
        let mut selector = Selector::new(Selection::tags(specs, true));
        assert!(select(&mut selector, "Mixed", &["style", "build"]));
        assert!(!select(&mut selector, "Style", &["style"]));
        assert!(select(&mut selector, "Untagged", &[]));
    }

    #[test]
    fn test_first_matching_tag_short_circuits() {
        let specs = TagSpec::parse_list("style,build:0:1", false).unwrap();
        let mut selector = Selector::new(Selection::tags(specs, false));
        // style matches first so the build counter is not touched
        assert!(select(&mut selector, "A", &["style", "build"]));
        assert!(select(&mut selector, "B", &["build"]));
        assert!(!select(&mut selector, "C", &["build"]));
    }
}
