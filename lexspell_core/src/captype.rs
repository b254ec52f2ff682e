/// Case classification of words and the case variants tried against the dictionary.
///
/// A dictionary entry written `Paris` must match user input `Paris` or `PARIS`,
/// but not `paris`; which variants to try depends on the case class of the input.

/// The case class of a word, judged over its cased characters only.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum CapType {
    /// all characters lowercase (or caseless)
    No,
    /// first character uppercase, the remaining lowercase
    Init,
    /// every cased character uppercase
    All,
    /// initial uppercase with mixed case elsewhere
    HuhInit,
    /// initial lowercase with at least one internal uppercase
    Huh,
}

/// Classifies the case pattern of a word.
pub fn guess_captype(word: &str) -> CapType {
    let lowered = word.to_lowercase();
    if lowered == word {
        return CapType::No;
    }
    if lower_first(word) == lowered {
        return CapType::Init;
    }
    if word.to_uppercase() == word {
        return CapType::All;
    }
    let first_cased_upper = match word.chars().next() {
        Some(c) => c.to_lowercase().to_string() != c.to_string(),
        None => false,
    };
    if first_cased_upper {
        return CapType::HuhInit;
    }
    CapType::Huh
}

/// Lowercases only the first character.
fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// Language-dependent lowering rules.
///
/// With CHECKSHARPS, `SS` in uppercase words may stand for `ß`, so lowering
/// produces several candidate spellings. For Turkic collation, `İ` lowers
/// to `i` and `I` to `ı`.
pub struct Collation {
    col_sharp_s: bool,
    col_dotless_i: bool,
}

impl Collation {
    pub fn new(col_sharp_s: bool, col_dotless_i: bool) -> Collation {
        Collation {
            col_sharp_s,
            col_dotless_i,
        }
    }

    /// All lowercased spellings of `word`. Usually one; empty when the word
    /// cannot be lowered at all (a leading `İ` outside Turkic collation, or
    /// an uppercase word already containing `ß` under CHECKSHARPS).
    pub fn lower(&self, word: &str) -> Vec<String> {
        if word.chars().next() == Some('İ') && !self.col_dotless_i {
            return vec![];
        }
        if self.col_sharp_s && word.contains('ß') {
            let without: String = word.chars().filter(|c| *c != 'ß').collect();
            if guess_captype(&without) == CapType::All {
                // CHECKSHARPS also prohibits an uppercase word keeping "ß"
                return vec![];
            }
        }
        let lowered = if self.col_dotless_i {
            let mapped: String = word
                .chars()
                .map(|c| match c {
                    'İ' => 'i',
                    'I' => 'ı',
                    other => other,
                })
                .collect();
            mapped.to_lowercase()
        } else {
            // drop the combining dot left by default lowercasing of 'İ'
            word.to_lowercase().replace("i\u{307}", "i")
        };
        if self.col_sharp_s && word.contains("SS") {
            let chars: Vec<char> = lowered.chars().collect();
            let mut result = vec![];
            Self::sharp_s_variants(&chars, 0, &mut result);
            result.push(lowered);
            return result;
        }
        vec![lowered]
    }

    /// Every spelling in which some non-overlapping "ss" substrings,
    /// at positions `start` or later, are replaced by "ß".
    fn sharp_s_variants(chars: &[char], start: usize, out: &mut Vec<String>) {
        let mut pos = start;
        loop {
            if pos + 2 > chars.len() {
                return;
            }
            if chars[pos] == 's' && chars[pos + 1] == 's' {
                break;
            }
            pos += 1;
        }
        let mut replaced: Vec<char> = Vec::with_capacity(chars.len() - 1);
        replaced.extend_from_slice(&chars[..pos]);
        replaced.push('ß');
        replaced.extend_from_slice(&chars[pos + 2..]);
        out.push(replaced.iter().collect());
        Self::sharp_s_variants(&replaced, pos + 1, out);
        Self::sharp_s_variants(chars, pos + 2, out);
    }

    /// The case class of `word` and the list of case variants to try
    /// against the dictionary, the original spelling first.
    pub fn variants(&self, word: &str) -> (CapType, Vec<String>) {
        let captype = guess_captype(word);
        let mut result = vec![word.to_string()];
        match captype {
            CapType::No | CapType::Huh => {}
            CapType::Init => {
                result.extend(self.lower(word));
            }
            CapType::HuhInit => {
                // only the initial letter is lowered, the rest is kept
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    let rest = chars.as_str();
                    for low in self.lower(&first.to_string()) {
                        result.push(low + rest);
                    }
                }
            }
            CapType::All => {
                result.extend(self.lower(word));
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    let rest = chars.as_str();
                    for low in self.lower(rest) {
                        result.push(format!("{}{}", first, low));
                    }
                }
            }
        }
        (captype, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("web", CapType::No)]
    #[case("Hague", CapType::Init)]
    #[case("UNICEF", CapType::All)]
    #[case("OpenOffice.org", CapType::HuhInit)]
    #[case("openOffice", CapType::Huh)]
    #[case("中国", CapType::No)]
    #[case("", CapType::No)]
    fn captype_guess(#[case] word: &str, #[case] expected: CapType) {
        assert_eq!(guess_captype(word), expected);
    }

    #[test]
    fn plain_lowering() {
        let col = Collation::new(false, false);
        assert_eq!(col.lower("LONDON"), vec!["london"]);
        assert_eq!(col.lower("İstanbul"), Vec::<String>::new());
        // default lowercasing of 'İ' leaves a combining dot that must go
        assert_eq!(col.lower("DİZİ"), vec!["dizi"]);
    }

    #[test]
    fn turkic_lowering() {
        let col = Collation::new(false, true);
        assert_eq!(col.lower("İSTANBUL"), vec!["istanbul"]);
        assert_eq!(col.lower("ILIK"), vec!["ılık"]);
    }

    #[test]
    fn sharp_s_lowering() {
        let col = Collation::new(true, false);
        let got = col.lower("STRASSE");
        assert_eq!(got, vec!["straße", "strasse"]);
        // uppercase word with a real 'ß' cannot be lowered under CHECKSHARPS
        assert_eq!(col.lower("STRAßE"), Vec::<String>::new());
        // two sites produce every non-overlapping combination
        let got = col.lower("MASSESS");
        assert!(got.contains(&"maßeß".to_string()));
        assert!(got.contains(&"massess".to_string()));
        assert!(got.contains(&"masseß".to_string()));
        assert!(got.contains(&"maßess".to_string()));
    }

    #[test]
    fn variant_lists() {
        let col = Collation::new(false, false);
        let (cap, v) = col.variants("Paris");
        assert_eq!(cap, CapType::Init);
        assert_eq!(v, vec!["Paris", "paris"]);
        let (cap, v) = col.variants("PARIS");
        assert_eq!(cap, CapType::All);
        assert_eq!(v, vec!["PARIS", "paris", "Paris"]);
        let (cap, v) = col.variants("OpenOffice.org");
        assert_eq!(cap, CapType::HuhInit);
        assert_eq!(v, vec!["OpenOffice.org", "openOffice.org"]);
        let (cap, v) = col.variants("openOffice.org");
        assert_eq!(cap, CapType::Huh);
        assert_eq!(v, vec!["openOffice.org"]);
    }
}
