//! "Did you mean" lookup over registered verbs.

/// Minimum similarity for a suggestion to be offered.
pub const SUGGEST_CUTOFF: f64 = 0.6;

/// Similarity ratio in `[0, 1]`: twice the longest-common-subsequence length
/// over the combined length. 1.0 means equal strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let total = a.chars().count() + b.chars().count();
    (2 * lcs_len(a, b)) as f64 / total as f64
}

fn lcs_len(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];

    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Best candidate above [`SUGGEST_CUTOFF`], if any.
pub fn closest<'a, I>(target: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|c| (c, similarity(target, c)))
        .filter(|(_, score)| *score >= SUGGEST_CUTOFF)
        .max_by(|(_, x), (_, y)| x.total_cmp(y))
        .map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("help", "help"), 1.0);
    }

    #[test]
    fn transposition_still_close() {
        assert!(similarity("hlep", "help") >= SUGGEST_CUTOFF);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(similarity("play", "invites") < SUGGEST_CUTOFF);
    }

    #[test]
    fn closest_picks_best_match() {
        let verbs = ["help", "invites", "play", "subjects"];
        assert_eq!(closest("invies", verbs), Some("invites"));
        assert_eq!(closest("hlep", verbs), Some("help"));
        assert_eq!(closest("zzzz", verbs), None);
    }
}
