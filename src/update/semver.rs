use std::cmp::Ordering;

use semver::Version;

/// Parse a plain release version ("1", "1.2", "1.2.3") into a semver::Version,
/// padding missing components with zeros. Pre-release and build suffixes are
/// rejected so they go through the segment comparison instead.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_release_version(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized)
        .ok()
        .filter(|v| v.pre.is_empty() && v.build.is_empty())
}

/// Compare two version strings.
///
/// Plain release versions are compared with semver. Anything else is split
/// into segments on `.`, `-`, `_`, `+` and on digit/letter boundaries, then
/// compared segment by segment: numbers numerically, words by their release
/// stage (dev < alpha < beta < RC < number < pl), unknown words lowest.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    if let (Some(l), Some(r)) = (parse_release_version(left), parse_release_version(right)) {
        return l.cmp(&r);
    }

    let left = segments(left);
    let right = segments(right);

    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = compare_segments(l, r);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    // A trailing number makes a version newer, a trailing word is ranked
    // against a bare number ("1.0rc1" < "1.0" < "1.0pl1")
    match left.len().cmp(&right.len()) {
        Ordering::Equal => Ordering::Equal,
        Ordering::Greater => trailing_rank(&left[right.len()]),
        Ordering::Less => trailing_rank(&right[left.len()]).reverse(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Word(String),
}

fn segments(version: &str) -> Vec<Segment> {
    let mut result = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, result: &mut Vec<Segment>| {
        if current.is_empty() {
            return;
        }
        let segment = match current.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Word(std::mem::take(current)),
        };
        current.clear();
        result.push(segment);
    };

    for c in version.chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            flush(&mut current, &mut result);
            continue;
        }
        let boundary = current
            .chars()
            .last()
            .is_some_and(|last| last.is_ascii_digit() != c.is_ascii_digit());
        if boundary {
            flush(&mut current, &mut result);
        }
        current.push(c);
    }
    flush(&mut current, &mut result);

    result
}

/// Rank of a release-stage word; numbers sit between RC and pl
fn stage_rank(word: &str) -> i8 {
    match word.to_ascii_lowercase().as_str() {
        "dev" => 0,
        "alpha" | "a" => 1,
        "beta" | "b" => 2,
        "rc" => 3,
        "pl" | "p" => 5,
        _ => -1,
    }
}

const NUMBER_RANK: i8 = 4;

fn compare_segments(left: &Segment, right: &Segment) -> Ordering {
    match (left, right) {
        (Segment::Number(l), Segment::Number(r)) => l.cmp(r),
        (Segment::Number(_), Segment::Word(r)) => NUMBER_RANK.cmp(&stage_rank(r)),
        (Segment::Word(l), Segment::Number(_)) => stage_rank(l).cmp(&NUMBER_RANK),
        (Segment::Word(l), Segment::Word(r)) => stage_rank(l).cmp(&stage_rank(r)),
    }
}

/// Ordering of a version with one extra `segment` against the shorter one
fn trailing_rank(segment: &Segment) -> Ordering {
    match segment {
        Segment::Number(_) => Ordering::Greater,
        Segment::Word(word) => stage_rank(word).cmp(&NUMBER_RANK),
    }
}

/// Returns true if `candidate` is strictly newer than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(current, candidate) == Ordering::Less
}
