/// Affix condition patterns.
///
/// A condition is a simplified character-class pattern: literal characters,
/// `.` for any character, `[abc]` for a set and `[^abc]` for its complement.
/// It is matched against one edge of the reconstructed stem, the edge where
/// the affix `add` string attaches. No other regex punctuation is allowed.
pub struct CondPattern {
    cnd_def: String,
    /// one element per pattern position: (characters, included)
    cnd_atoms: Vec<(String, bool)>,
    /// a malformed pattern never matches
    cnd_bad: bool,
}

impl CondPattern {
    pub fn new(def: &str) -> CondPattern {
        let mut atoms: Vec<(String, bool)> = vec![];
        let mut bad = false;
        let mut in_brackets = false;
        let mut included = true;
        let mut bracket_chars = String::new();
        // uk_UA.aff wraps some conditions in "(^...)"; strip the wrapper
        let cleaned = if def.starts_with("(^") && def.ends_with(')') {
            &def[2..def.len() - 1]
        } else {
            def
        };
        for c in cleaned.chars() {
            if c == '[' {
                if in_brackets {
                    bad = true;
                }
                in_brackets = true;
                included = true;
            } else if c == ']' {
                if !in_brackets {
                    bad = true;
                }
                atoms.push((bracket_chars.clone(), included));
                bracket_chars.clear();
                in_brackets = false;
            } else if c == '^' && in_brackets && included {
                included = false;
            } else if c == '.' && !in_brackets {
                // empty excluded set: any character qualifies
                atoms.push((String::new(), false));
            } else if in_brackets {
                bracket_chars.push(c);
            } else if "{}*+?()".contains(c) {
                bad = true;
            } else {
                atoms.push((c.to_string(), true));
            }
        }
        if in_brackets {
            bad = true;
        }
        CondPattern {
            cnd_def: def.to_string(),
            cnd_atoms: atoms,
            cnd_bad: bad,
        }
    }

    /// True when the pattern matches the trailing characters of `s`
    /// (the check for suffixes).
    pub fn matches_end(&self, s: &str) -> bool {
        if self.cnd_bad {
            return false;
        }
        if self.cnd_atoms.len() > s.chars().count() {
            return false;
        }
        for ((chars, included), c) in self.cnd_atoms.iter().rev().zip(s.chars().rev()) {
            if chars.contains(c) != *included {
                return false;
            }
        }
        true
    }

    /// True when the pattern matches the leading characters of `s`
    /// (the check for prefixes).
    pub fn matches_start(&self, s: &str) -> bool {
        if self.cnd_bad {
            return false;
        }
        if self.cnd_atoms.len() > s.chars().count() {
            return false;
        }
        for ((chars, included), c) in self.cnd_atoms.iter().zip(s.chars()) {
            if chars.contains(c) != *included {
                return false;
            }
        }
        true
    }
}

impl std::fmt::Display for CondPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.cnd_def)
    }
}

#[cfg(test)]
mod tests {
    use super::CondPattern;

    #[test]
    fn literal_and_class() {
        let set = CondPattern::new("[ai]to");
        let lit = CondPattern::new("ato");
        assert_eq!(set.matches_end("regato"), true);
        assert_eq!(set.matches_end("regoto"), false);
        assert_eq!(set.matches_end("regar"), false);
        assert_eq!(set.matches_end("to"), false);
        assert_eq!(lit.matches_end("regato"), true);
        assert_eq!(lit.matches_end("regat"), false);
        assert_eq!(lit.matches_end("regito"), false);
    }

    #[test]
    fn negated_class() {
        let cond = CondPattern::new("[^ey]");
        assert_eq!(cond.matches_end("walk"), true);
        assert_eq!(cond.matches_end("free"), false);
        assert_eq!(cond.matches_start("oak"), true);
        assert_eq!(cond.matches_start("elm"), false);
    }

    #[test]
    fn dot_and_empty() {
        let any = CondPattern::new(".");
        assert_eq!(any.matches_end("a"), true);
        assert_eq!(any.matches_end(""), false);
        let empty = CondPattern::new("");
        assert_eq!(empty.matches_end(""), true);
        assert_eq!(empty.matches_start("anything"), true);
    }

    #[test]
    fn prefix_side() {
        let cond = CondPattern::new("con");
        assert_eq!(cond.matches_start("contar"), true);
        assert_eq!(cond.matches_start("cantar"), false);
    }

    #[test]
    fn malformed_never_matches() {
        let cond = CondPattern::new("a(b");
        assert_eq!(cond.matches_end("ab"), false);
        let unclosed = CondPattern::new("[ab");
        assert_eq!(unclosed.matches_end("a"), false);
    }
}
