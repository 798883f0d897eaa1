use super::Stage;

/// Runs strictly longer than this are collapsed.
const MAX_KEPT_RUN: usize = 3;

/// Length a collapsed run is cut down to.
const COLLAPSED_RUN: usize = 2;

/// Collapses a character repeated 4+ times to two copies (`looooove` -> `loove`).
///
/// Collapsing to two rather than one keeps legitimately doubled letters intact.
/// Characters compare case-insensitively; the collapsed run repeats its first
/// character. Whitespace runs are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepeatCollapse;

impl RepeatCollapse {
    pub const NAME: &'static str = "repeat_collapse";
}

fn same_ignoring_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

impl Stage for RepeatCollapse {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(first) = rest.chars().next() {
            // Byte length of the run starting at `first`
            let run_bytes = rest
                .char_indices()
                .find(|&(_, ch)| !same_ignoring_case(ch, first))
                .map_or(rest.len(), |(idx, _)| idx);
            let (run, tail) = rest.split_at(run_bytes);

            if !first.is_whitespace() && run.chars().count() > MAX_KEPT_RUN {
                result.extend(std::iter::repeat(first).take(COLLAPSED_RUN));
            } else {
                result.push_str(run);
            }
            rest = tail;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_long_runs_to_two() {
        assert_eq!(RepeatCollapse.apply("looooove"), "loove");
        assert_eq!(RepeatCollapse.apply("noooooo!!!!!"), "noo!!");
        assert_eq!(RepeatCollapse.apply("1111112"), "112");
    }

    #[test]
    fn test_threshold_is_exact() {
        assert_eq!(RepeatCollapse.apply("aaa"), "aaa");
        assert_eq!(RepeatCollapse.apply("aaaa"), "aa");
        assert_eq!(RepeatCollapse.apply("hmmm ok"), "hmmm ok");
    }

    #[test]
    fn test_run_of_five_yields_two() {
        assert_eq!(RepeatCollapse.apply("x?????y"), "x??y");
    }

    #[test]
    fn test_case_insensitive_runs() {
        assert_eq!(RepeatCollapse.apply("NOooo way"), "NOO way");
        assert_eq!(RepeatCollapse.apply("aAaA"), "aa");
    }

    #[test]
    fn test_whitespace_runs_untouched() {
        assert_eq!(RepeatCollapse.apply("a     b"), "a     b");
    }

    #[test]
    fn test_non_ascii_runs() {
        assert_eq!(RepeatCollapse.apply("ééééé!"), "éé!");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(RepeatCollapse.apply(""), "");
    }
}
