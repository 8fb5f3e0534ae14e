//! Edit-distance ranking for sources whose search API doesn't rank by relevance.

/// Levenshtein distance between `a` and `b`, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Sort `items` by ascending distance between `name(item)` and `query`.
///
/// The sort is stable: equally distant items keep the source's order.
pub fn rank_by_similarity<T, F>(items: &mut [T], query: &str, name: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by_cached_key(|item| levenshtein(name(item), query));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("naruto", "naruto"), 0);
    }

    #[test]
    fn distance_counts_chars_not_bytes() {
        assert_eq!(levenshtein("ナルト", "ナルト疾風伝"), 3);
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn ranks_closest_first() {
        let mut names = vec!["Naruto Shippuden", "Boruto", "Naruto"];
        rank_by_similarity(&mut names, "Naruto", |n| n);
        assert_eq!(names, vec!["Naruto", "Boruto", "Naruto Shippuden"]);
    }

    #[test]
    fn ties_keep_source_order() {
        let mut names = vec![("abd", 0), ("abe", 1), ("abc", 2), ("abf", 3)];
        rank_by_similarity(&mut names, "abc", |n| n.0);
        let order: Vec<_> = names.iter().map(|n| n.1).collect();
        assert_eq!(order, vec![2, 0, 1, 3]);
    }

    #[test]
    fn ranking_is_non_decreasing() {
        let mut names = vec!["one piece film red", "one punch man", "one piece", "piece"];
        rank_by_similarity(&mut names, "one piece", |n| n);
        let distances: Vec<_> = names.iter().map(|n| levenshtein(n, "one piece")).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }
}
