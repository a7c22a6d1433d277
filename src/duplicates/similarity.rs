use std::collections::HashMap;

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`, counted in chars.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matched = matching_chars(&a, &b);
    (2 * matched) as f64 / (a.len() + b.len()) as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }

    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

// Longest common block in a[alo..ahi] x b[blo..bhi]; ties go to the earliest start in a, then b.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();
    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_lengths = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let previous = if j == 0 {
                    0
                } else {
                    run_lengths.get(&(j - 1)).copied().unwrap_or(0)
                };
                let k = previous + 1;
                next_lengths.insert(j, k);
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        run_lengths = next_lengths;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::similarity_ratio;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn matches_reference_ratios() {
        assert!(approx(similarity_ratio("abcd", "bcde"), 0.75));
        assert!(approx(similarity_ratio("same", "same"), 1.0));
        assert!(approx(similarity_ratio("abc", "xyz"), 0.0));
        // "Peter M" + "ller" = 11 of 12 chars on each side.
        assert!(approx(
            similarity_ratio("Peter Müller", "Peter Muller"),
            22.0 / 24.0
        ));
    }

    #[test]
    fn recurses_on_both_sides_of_the_longest_block() {
        // blocks: "a", "bcd", "f" -> 5 matched chars out of 6 + 6.
        assert!(approx(similarity_ratio("axbcdf", "abcdyf"), 10.0 / 12.0));
    }

    #[test]
    fn empty_input_scores_zero() {
        assert!(approx(similarity_ratio("", ""), 0.0));
        assert!(approx(similarity_ratio("abc", ""), 0.0));
    }
}
