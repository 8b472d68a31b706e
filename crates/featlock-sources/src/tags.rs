/// Pick the numerically greatest version among tag refs.
///
/// A ref matches when it is `refs/<prefix>` followed by exactly `parts`
/// groups of ASCII digits joined by `separator`. Versions compare as integer
/// tuples, so `10.0.0` ranks above `9.0.0`. Returns `None` when nothing matches.
pub fn latest_tag_version(
    refs: &[String],
    prefix: &str,
    parts: usize,
    separator: &str,
) -> Option<String> {
    let full_prefix = format!("refs/{prefix}");
    refs.iter()
        .filter_map(|r| r.strip_prefix(&full_prefix))
        .filter_map(|candidate| {
            parse_numeric(candidate, parts, separator).map(|key| (key, candidate))
        })
        // max_by keeps the last of equal keys, so later listings win ties.
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, candidate)| candidate.to_owned())
}

fn parse_numeric(candidate: &str, parts: usize, separator: &str) -> Option<Vec<u64>> {
    if parts == 0 || (separator.is_empty() && parts > 1) {
        return None;
    }
    let groups: Vec<&str> = if parts == 1 {
        vec![candidate]
    } else {
        candidate.split(separator).collect()
    };
    if groups.len() != parts {
        return None;
    }
    groups
        .iter()
        .map(|g| {
            if !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()) {
                g.parse::<u64>().ok()
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn numeric_not_lexicographic_ordering() {
        let tags = refs(&["refs/tags/v1.9.0", "refs/tags/v1.10.0", "refs/tags/v2.0.0"]);
        assert_eq!(latest_tag_version(&tags, "tags/v", 3, ".").as_deref(), Some("2.0.0"));

        let tags = refs(&["refs/tags/9.0.0", "refs/tags/10.0.0"]);
        assert_eq!(latest_tag_version(&tags, "tags/", 3, ".").as_deref(), Some("10.0.0"));
    }

    #[test]
    fn minor_component_compared_numerically() {
        let tags = refs(&["refs/tags/v1.9.0", "refs/tags/v1.10.0"]);
        assert_eq!(latest_tag_version(&tags, "tags/v", 3, ".").as_deref(), Some("1.10.0"));
    }

    #[test]
    fn prerelease_and_wrong_arity_are_ignored() {
        let tags = refs(&[
            "refs/tags/v3.13.0rc1",
            "refs/tags/v3.14",
            "refs/tags/v3.12.4.1",
            "refs/tags/v3.12.4",
            "refs/heads/v9.9.9",
        ]);
        assert_eq!(latest_tag_version(&tags, "tags/v", 3, ".").as_deref(), Some("3.12.4"));
    }

    #[test]
    fn prefix_must_match_exactly() {
        let tags = refs(&["refs/tags/release-1.0.0", "refs/tags/1.2.0"]);
        assert_eq!(latest_tag_version(&tags, "tags/", 3, ".").as_deref(), Some("1.2.0"));
    }

    #[test]
    fn custom_separator() {
        let tags = refs(&["refs/tags/v1_2", "refs/tags/v1_10", "refs/tags/v1.11"]);
        assert_eq!(latest_tag_version(&tags, "tags/v", 2, "_").as_deref(), Some("1_10"));
    }

    #[test]
    fn none_when_nothing_matches() {
        assert_eq!(latest_tag_version(&refs(&["refs/tags/nightly"]), "tags/", 3, "."), None);
        assert_eq!(latest_tag_version(&[], "tags/", 3, "."), None);
    }

    #[test]
    fn ties_resolve_to_later_listing() {
        let tags = refs(&["refs/tags/01.0.0", "refs/tags/1.0.0"]);
        assert_eq!(latest_tag_version(&tags, "tags/", 3, ".").as_deref(), Some("1.0.0"));
    }
}
