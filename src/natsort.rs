/// Natural sort key for chapter filenames, so "chapter2" orders before
/// "chapter10".
///
/// A filename stem is split into alternating runs of non-digits and digits.
/// Digit runs compare by numeric value, non-digit runs as lowercased strings,
/// element-wise. The derived `Ord` on [`Segment`] orders any `Number` before
/// any `Text`, which only matters for keys of unequal shape (e.g. "1a" vs
/// "b") where the first differing element decides anyway.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    Number(u64),
    Text(String),
}

pub fn natural_key(stem: &str) -> Vec<Segment> {
    let mut key = Vec::new();
    let mut run = String::new();
    let mut run_is_digit = false;

    for ch in stem.chars() {
        let is_digit = ch.is_ascii_digit();
        if !run.is_empty() && is_digit != run_is_digit {
            key.push(finish_run(run, run_is_digit));
            run = String::new();
        }
        run_is_digit = is_digit;
        run.push(ch);
    }
    if !run.is_empty() {
        key.push(finish_run(run, run_is_digit));
    }

    key
}

fn finish_run(run: String, is_digit: bool) -> Segment {
    if is_digit {
        // Digit runs longer than u64 fall back to string comparison
        match run.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Text(run),
        }
    } else {
        Segment::Text(run.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_by_key(|n| natural_key(n));
        names
    }

    #[test]
    fn numeric_runs_compare_by_value() {
        assert_eq!(
            sorted(vec!["ch10", "ch1", "ch2"]),
            vec!["ch1", "ch2", "ch10"]
        );
    }

    #[test]
    fn text_runs_compare_case_insensitively() {
        assert_eq!(
            sorted(vec!["Beta", "alpha", "Gamma"]),
            vec!["alpha", "Beta", "Gamma"]
        );
    }

    #[test]
    fn mixed_prefixes() {
        assert_eq!(
            sorted(vec!["02-end", "01-intro", "10-coda"]),
            vec!["01-intro", "02-end", "10-coda"]
        );
    }

    #[test]
    fn plain_names_are_untouched() {
        assert_eq!(
            sorted(vec!["prologue", "epilogue"]),
            vec!["epilogue", "prologue"]
        );
    }

    #[test]
    fn key_shape() {
        assert_eq!(
            natural_key("ch12b"),
            vec![
                Segment::Text("ch".into()),
                Segment::Number(12),
                Segment::Text("b".into()),
            ]
        );
    }
}
