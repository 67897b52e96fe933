// Dot-separated numeric version comparison

use std::cmp::Ordering;

/// Compare two dot-separated versions component by component.
///
/// Missing trailing components count as zero, so `4.5.1` and `4.5.1.0` are
/// equal. Segments that are not non-negative integers also count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let va = parse(a);
    let vb = parse(b);
    for i in 0..va.len().max(vb.len()) {
        let ca = va.get(i).copied().unwrap_or(0);
        let cb = vb.get(i).copied().unwrap_or(0);
        match ca.cmp(&cb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Returns true if `a` is newer than `b`
pub fn version_newer(a: &str, b: &str) -> bool {
    compare_versions(a, b) == Ordering::Greater
}

/// Strip an optional leading `v` from a release tag (`v4.6.0` -> `4.6.0`).
/// Only the first character is considered; a `v` elsewhere is left alone.
pub fn strip_tag_prefix(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('v').unwrap_or(tag)
}

fn parse(v: &str) -> Vec<u64> {
    v.trim()
        .split('.')
        .map(|s| s.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeros_are_equal() {
        assert_eq!(compare_versions("4.5.1", "4.5.1.0"), Ordering::Equal);
        assert_eq!(compare_versions("4.5", "4.5.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1", "1.0"), Ordering::Equal);
    }

    #[test]
    fn first_differing_component_decides() {
        assert_eq!(compare_versions("4.6.0", "4.5.9"), Ordering::Greater);
        assert_eq!(compare_versions("4.5.10", "4.5.9"), Ordering::Greater);
        assert_eq!(compare_versions("3.99", "4.0"), Ordering::Less);
        assert_eq!(compare_versions("4.5.1.1", "4.5.1"), Ordering::Greater);
    }

    #[test]
    fn antisymmetric_and_reflexive() {
        let versions = ["0", "1.0", "1.0.1", "1.2", "2.0.0.1", "10.0", "4.5.1", "4.6.0"];
        for a in versions {
            assert_eq!(compare_versions(a, a), Ordering::Equal);
            for b in versions {
                assert_eq!(compare_versions(a, b), compare_versions(b, a).reverse());
            }
        }
    }

    #[test]
    fn non_numeric_segments_count_as_zero() {
        assert_eq!(compare_versions("1.x.3", "1.0.3"), Ordering::Equal);
        assert_eq!(compare_versions("", "0"), Ordering::Equal);
        assert!(version_newer("1.1", "1.beta"));
    }

    #[test]
    fn version_newer_is_strict() {
        assert!(version_newer("4.6.0", "4.5.1"));
        assert!(!version_newer("4.5.1", "4.5.1"));
        assert!(!version_newer("4.5.0", "4.5.1"));
    }

    #[test]
    fn strips_only_leading_v() {
        assert_eq!(strip_tag_prefix("v4.6.0"), "4.6.0");
        assert_eq!(strip_tag_prefix("4.6.0"), "4.6.0");
        assert_eq!(strip_tag_prefix("4.6.0-rev2"), "4.6.0-rev2");
        assert_eq!(strip_tag_prefix("vv1.0"), "v1.0");
    }
}
