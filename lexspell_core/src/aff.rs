/// The parsed affix description: flags, prefix/suffix entries, compounding
/// rules and patterns, conversion tables, and every scalar option. Built
/// once by the readers and immutable afterwards.
use hashbrown::HashSet;
use regex::Regex;

use crate::condition::CondPattern;

/// Flags are opaque tokens; all four encodings normalize to this one type.
/// Equality is identity and sets are the only operation the engine needs.
pub type Flag = String;
pub type FlagSet = HashSet<Flag>;

/// Value of the FLAG directive: how flag strings are split into flags.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum FlagFormat {
    /// default, one ASCII character per flag
    Short,
    /// "FLAG long", two characters per flag
    Long,
    /// "FLAG num", decimal numbers separated by commas
    Numeric,
    /// "FLAG UTF-8", one Unicode character per flag
    Utf8,
}

/// One PFX or SFX table line, flattened: the entry carries the flag and the
/// cross-product marker of its class header.
pub struct AffixEntry {
    pub afe_flag: Flag,
    pub afe_cross: bool,
    /// text removed from the stem before attaching `afe_add`
    pub afe_strip: String,
    /// text attached at the word edge
    pub afe_add: String,
    /// matched against the stem on the side where `afe_add` attaches
    pub afe_cond: CondPattern,
    /// flags carried by the affixed form itself (after "/" in the add field)
    pub afe_flags: FlagSet,
}

/// A compound rule: a micro-regex over the flag alphabet with `*` and `?`.
///
/// Besides the full match deciding a finished compound, a partial (prefix)
/// match prunes the recursion: a parts sequence is only extended while its
/// flag string can still grow into an accepted one.
pub struct CompoundRule {
    pub cmr_text: String,
    cmr_flags: FlagSet,
    cmr_full: Option<Regex>,
    cmr_partial: Option<Regex>,
}

impl CompoundRule {
    pub fn new(text: &str) -> CompoundRule {
        let mut flags = FlagSet::new();
        let mut parts: Vec<String> = vec![];
        let mut bad = false;
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '(' {
                // long and numeric flags are parenthesized: (aa)(bb)*(cc)
                let mut atom = String::new();
                let mut j = i + 1;
                while j < chars.len() && chars[j] != ')' {
                    atom.push(chars[j]);
                    j += 1;
                }
                if j >= chars.len() || atom.is_empty() {
                    bad = true;
                    break;
                }
                j += 1;
                let mut part = format!("({})", atom);
                if j < chars.len() && (chars[j] == '*' || chars[j] == '?') {
                    part.push(chars[j]);
                    j += 1;
                }
                flags.insert(atom);
                parts.push(part);
                i = j;
            } else if chars[i] == '*' || chars[i] == '?' {
                bad = true;
                break;
            } else {
                let mut part = chars[i].to_string();
                flags.insert(part.clone());
                i += 1;
                if i < chars.len() && (chars[i] == '*' || chars[i] == '?') {
                    part.push(chars[i]);
                    i += 1;
                }
                parts.push(part);
            }
        }
        let (full, partial) = if bad || parts.is_empty() {
            (None, None)
        } else {
            // the partial form nests every tail as optional: A(B(C)?)?
            let mut rev = parts.iter().rev();
            let mut partial_text = rev.next().map(String::clone).unwrap_or_default();
            for part in rev {
                partial_text = format!("{}({})?", part, partial_text);
            }
            (
                Regex::new(&format!("^(?:{})$", text)).ok(),
                Regex::new(&format!("^(?:{})$", partial_text)).ok(),
            )
        };
        CompoundRule {
            cmr_text: text.to_string(),
            cmr_flags: flags,
            cmr_full: full,
            cmr_partial: partial,
        }
    }

    pub fn full_match(&self, flag_sets: &[&FlagSet]) -> bool {
        match &self.cmr_full {
            Some(re) => self.product_match(re, flag_sets),
            None => false,
        }
    }

    pub fn partial_match(&self, flag_sets: &[&FlagSet]) -> bool {
        match &self.cmr_partial {
            Some(re) => self.product_match(re, flag_sets),
            None => false,
        }
    }

    /// A part may carry several rule-relevant flags, so the match has to try
    /// the cartesian product of one representative flag per part.
    fn product_match(&self, re: &Regex, flag_sets: &[&FlagSet]) -> bool {
        let mut relevant: Vec<Vec<&str>> = Vec::with_capacity(flag_sets.len());
        for set in flag_sets {
            let inter: Vec<&str> = set
                .iter()
                .filter(|f| self.cmr_flags.contains(*f))
                .map(|f| f.as_str())
                .collect();
            if inter.is_empty() {
                return false;
            }
            relevant.push(inter);
        }
        let mut idx = vec![0usize; relevant.len()];
        loop {
            let mut candidate = String::new();
            for (k, choices) in relevant.iter().enumerate() {
                candidate.push_str(choices[idx[k]]);
            }
            if re.is_match(&candidate) {
                return true;
            }
            let mut k = relevant.len();
            loop {
                if k == 0 {
                    return false;
                }
                k -= 1;
                idx[k] += 1;
                if idx[k] < relevant[k].len() {
                    break;
                }
                idx[k] = 0;
            }
        }
    }
}

/// A CHECKCOMPOUNDPATTERN row: a bounded constraint on an adjacent pair of
/// compound parts. A `0` stem in the affix file means "any stem, but the
/// part must be affixed", kept here as the `no_affix` markers.
pub struct CompoundPattern {
    pub cpt_left_stem: String,
    pub cpt_left_flag: Option<Flag>,
    pub cpt_left_no_affix: bool,
    pub cpt_right_stem: String,
    pub cpt_right_flag: Option<Flag>,
    pub cpt_right_no_affix: bool,
    #[allow(dead_code)]
    pub cpt_replacement: Option<String>,
}

impl CompoundPattern {
    pub fn matches(
        &self,
        left_stem: &str,
        left_is_base: bool,
        left_flags: &FlagSet,
        right_stem: &str,
        right_is_base: bool,
        right_flags: &FlagSet,
    ) -> bool {
        left_stem.ends_with(&self.cpt_left_stem)
            && right_stem.starts_with(&self.cpt_right_stem)
            && (!self.cpt_left_no_affix || !left_is_base)
            && (!self.cpt_right_no_affix || !right_is_base)
            && self.cpt_left_flag.as_ref().map_or(true, |f| left_flags.contains(f))
            && self.cpt_right_flag.as_ref().map_or(true, |f| right_flags.contains(f))
    }
}

struct ConvRow {
    crw_search: String,
    crw_at_start: bool,
    crw_at_end: bool,
    crw_replace: String,
}

/// An ICONV/OCONV rewrite table. At each position the longest matching
/// pattern wins and the scan continues past the consumed text.
pub struct ConvTable {
    cnv_rows: Vec<ConvRow>,
}

impl ConvTable {
    /// Builds a table from raw affix-file pairs. Underscores anchor a
    /// pattern to the word start or end; in the replacement they stand
    /// for a space.
    pub fn new(pairs: &[(String, String)]) -> ConvTable {
        let mut rows = vec![];
        for (pattern, replacement) in pairs {
            let search = pattern.replace('_', "");
            if search.is_empty() {
                continue;
            }
            rows.push(ConvRow {
                crw_search: search,
                crw_at_start: pattern.starts_with('_'),
                crw_at_end: pattern.ends_with('_'),
                crw_replace: replacement.replace('_', " "),
            });
        }
        ConvTable { cnv_rows: rows }
    }

    pub fn is_empty(&self) -> bool {
        self.cnv_rows.is_empty()
    }

    pub fn apply(&self, word: &str) -> String {
        let mut result = String::with_capacity(word.len());
        let mut pos = 0usize;
        while pos < word.len() {
            let mut best: Option<&ConvRow> = None;
            for row in &self.cnv_rows {
                if row.crw_at_start && pos != 0 {
                    continue;
                }
                if row.crw_at_end && pos + row.crw_search.len() != word.len() {
                    continue;
                }
                if !word[pos..].starts_with(&row.crw_search) {
                    continue;
                }
                if best.map_or(true, |b| row.crw_search.len() > b.crw_search.len()) {
                    best = Some(row);
                }
            }
            if let Some(row) = best {
                result.push_str(&row.crw_replace);
                pos += row.crw_search.len();
            } else {
                let c = word[pos..].chars().next().unwrap_or('\u{0}');
                result.push(c);
                pos += c.len_utf8();
            }
        }
        result
    }
}

/// A compiled BREAK pattern. Patterns anchored with `^` or `$` act on word
/// edges; all others must have at least one character on each side.
pub struct BreakPattern {
    brk_re: Regex,
}

impl BreakPattern {
    pub fn new(pattern: &str) -> Option<BreakPattern> {
        let escaped = regex::escape(pattern)
            .replace("\\^", "^")
            .replace("\\$", "$");
        let full = if escaped.starts_with('^') || escaped.ends_with('$') {
            format!("({})", escaped)
        } else {
            format!(".({}).", escaped)
        };
        match Regex::new(&full) {
            Ok(brk_re) => Some(BreakPattern { brk_re }),
            Err(_) => None,
        }
    }

    /// Byte spans of the break text itself for every match in `text`.
    pub fn splits(&self, text: &str) -> Vec<(usize, usize)> {
        let mut out = vec![];
        for caps in self.brk_re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                out.push((m.start(), m.end()));
            }
        }
        out
    }
}

/// Everything the affix file configures, resolved and immutable.
/// Field names follow the affix-file directive names.
pub struct Aff {
    pub aff_encoding: String,
    pub aff_lang: String,
    pub aff_flag_format: FlagFormat,
    /// characters deleted from input words and from affix add strings
    pub aff_ignore: String,
    pub aff_try: String,
    pub aff_key: String,
    pub aff_wordchars: String,

    pub aff_prefixes: Vec<AffixEntry>,
    pub aff_suffixes: Vec<AffixEntry>,
    /// flag alias table (AF); referenced by 1-based ordinal
    pub aff_af: Vec<FlagSet>,

    pub aff_rep: Vec<(String, String)>,
    pub aff_map: Vec<Vec<String>>,
    pub aff_iconv: ConvTable,
    pub aff_oconv: ConvTable,
    pub aff_break: Vec<String>,

    pub aff_compound_rules: Vec<CompoundRule>,
    pub aff_compound_patterns: Vec<CompoundPattern>,

    pub aff_forbiddenword: Option<Flag>,
    pub aff_nosuggest: Option<Flag>,
    pub aff_keepcase: Option<Flag>,
    pub aff_circumfix: Option<Flag>,
    pub aff_needaffix: Option<Flag>,
    pub aff_forceucase: Option<Flag>,
    pub aff_warn: Option<Flag>,
    pub aff_compoundflag: Option<Flag>,
    pub aff_compoundbegin: Option<Flag>,
    pub aff_compoundmiddle: Option<Flag>,
    pub aff_compoundend: Option<Flag>,
    pub aff_onlyincompound: Option<Flag>,
    pub aff_compoundpermit: Option<Flag>,
    pub aff_compoundforbid: Option<Flag>,

    pub aff_compoundmin: usize,
    pub aff_compoundwordmax: Option<usize>,

    pub aff_checksharps: bool,
    pub aff_checkcompoundcase: bool,
    pub aff_checkcompounddup: bool,
    pub aff_checkcompoundrep: bool,
    pub aff_checkcompoundtriple: bool,
    pub aff_simplifiedtriple: bool,
    pub aff_fullstrip: bool,
    pub aff_complexprefixes: bool,
    pub aff_nosplitsugs: bool,
    pub aff_onlymaxdiff: bool,
    pub aff_maxdiff: i32,
    pub aff_maxcpdsugs: u32,
    pub aff_maxngramsugs: u32,
}

pub const DEFAULT_BREAK: [&str; 3] = ["-", "^-", "-$"];

impl Aff {
    pub fn new() -> Aff {
        Aff {
            aff_encoding: String::from("UTF-8"),
            aff_lang: String::new(),
            aff_flag_format: FlagFormat::Short,
            aff_ignore: String::new(),
            aff_try: String::new(),
            aff_key: String::new(),
            aff_wordchars: String::new(),
            aff_prefixes: vec![],
            aff_suffixes: vec![],
            aff_af: vec![],
            aff_rep: vec![],
            aff_map: vec![],
            aff_iconv: ConvTable::new(&[]),
            aff_oconv: ConvTable::new(&[]),
            aff_break: DEFAULT_BREAK.iter().map(|s| s.to_string()).collect(),
            aff_compound_rules: vec![],
            aff_compound_patterns: vec![],
            aff_forbiddenword: None,
            aff_nosuggest: None,
            aff_keepcase: None,
            aff_circumfix: None,
            aff_needaffix: None,
            aff_forceucase: None,
            aff_warn: None,
            aff_compoundflag: None,
            aff_compoundbegin: None,
            aff_compoundmiddle: None,
            aff_compoundend: None,
            aff_onlyincompound: None,
            aff_compoundpermit: None,
            aff_compoundforbid: None,
            aff_compoundmin: 3,
            aff_compoundwordmax: None,
            aff_checksharps: false,
            aff_checkcompoundcase: false,
            aff_checkcompounddup: false,
            aff_checkcompoundrep: false,
            aff_checkcompoundtriple: false,
            aff_simplifiedtriple: false,
            aff_fullstrip: false,
            aff_complexprefixes: false,
            aff_nosplitsugs: false,
            aff_onlymaxdiff: false,
            aff_maxdiff: -1,
            aff_maxcpdsugs: 0,
            aff_maxngramsugs: 0,
        }
    }

    /// Splits a flag string into flags according to the FLAG directive.
    /// A string that is a valid 1-based ordinal into the AF alias table
    /// stands for that alias set.
    pub fn parse_flags(&self, text: &str) -> Vec<Flag> {
        if text.is_empty() {
            return vec![];
        }
        if !self.aff_af.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(ordinal) = text.parse::<usize>() {
                if ordinal >= 1 && ordinal <= self.aff_af.len() {
                    return self.aff_af[ordinal - 1].iter().cloned().collect();
                }
            }
        }
        match self.aff_flag_format {
            FlagFormat::Short | FlagFormat::Utf8 => {
                text.chars().map(|c| c.to_string()).collect()
            }
            FlagFormat::Long => {
                let mut flags = vec![];
                let mut pair = String::new();
                for c in text.chars() {
                    pair.push(c);
                    if pair.chars().count() == 2 {
                        flags.push(std::mem::take(&mut pair));
                    }
                }
                // an odd trailing character is dropped
                flags
            }
            FlagFormat::Numeric => text
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn parse_flag(&self, text: &str) -> Option<Flag> {
        self.parse_flags(text).into_iter().next()
    }

    /// Turkic collation applies to these languages regardless of region.
    pub fn dotless_i(&self) -> bool {
        matches!(
            self.aff_lang.split(|c| c == '_' || c == '-').next(),
            Some("tr") | Some("az") | Some("crh")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(flags: &[&str]) -> FlagSet {
        flags.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn compound_rule_short_flags() {
        let rule = CompoundRule::new("N*M");
        let n = set(&["N"]);
        let m = set(&["M"]);
        assert!(rule.full_match(&[&n, &m]));
        assert!(rule.full_match(&[&n, &n, &m]));
        assert!(rule.full_match(&[&m]));
        assert!(!rule.full_match(&[&n]));
        assert!(!rule.full_match(&[&m, &n]));
        assert!(rule.partial_match(&[&n]));
        assert!(rule.partial_match(&[&n, &n]));
        assert!(!rule.partial_match(&[&m, &n]));
    }

    #[test]
    fn compound_rule_parenthesized() {
        let rule = CompoundRule::new("(aa)(bb)*(cc)");
        let a = set(&["aa"]);
        let b = set(&["bb"]);
        let c = set(&["cc"]);
        assert!(rule.full_match(&[&a, &c]));
        assert!(rule.full_match(&[&a, &b, &b, &c]));
        assert!(!rule.full_match(&[&b, &c]));
        assert!(rule.partial_match(&[&a, &b]));
    }

    #[test]
    fn compound_rule_multi_flag_parts() {
        // a part carrying several relevant flags matches through any of them
        let rule = CompoundRule::new("NM");
        let both = set(&["N", "M", "X"]);
        assert!(rule.full_match(&[&both, &both]));
        let n_only = set(&["N"]);
        assert!(rule.full_match(&[&n_only, &both]));
        assert!(!rule.full_match(&[&both, &n_only]));
        let unrelated = set(&["X"]);
        assert!(!rule.full_match(&[&n_only, &unrelated]));
    }

    #[test]
    fn conv_table_longest_match() {
        let table = ConvTable::new(&[
            ("a".to_string(), "A".to_string()),
            ("ab".to_string(), "Z".to_string()),
        ]);
        assert_eq!(table.apply("aabx"), "AZx");
    }

    #[test]
    fn conv_table_anchors() {
        let table = ConvTable::new(&[
            ("_x".to_string(), "y".to_string()),
            ("x_".to_string(), "z".to_string()),
        ]);
        assert_eq!(table.apply("xax"), "yaz");
        assert_eq!(table.apply("axa"), "axa");
    }

    #[test]
    fn conv_table_underscore_replacement() {
        let table = ConvTable::new(&[("foo".to_string(), "a_b".to_string())]);
        assert_eq!(table.apply("foo"), "a b");
    }

    #[test]
    fn break_pattern_edges() {
        let inner = BreakPattern::new("-").unwrap();
        assert_eq!(inner.splits("a-b"), vec![(1, 2)]);
        // an unanchored pattern needs a character on each side
        assert_eq!(inner.splits("-ab"), vec![]);
        let leading = BreakPattern::new("^-").unwrap();
        assert_eq!(leading.splits("-ab"), vec![(0, 1)]);
        let trailing = BreakPattern::new("-$").unwrap();
        assert_eq!(trailing.splits("ab-"), vec![(2, 3)]);
    }

    #[test]
    fn flag_formats() {
        let mut aff = Aff::new();
        assert_eq!(aff.parse_flags("AB"), vec!["A", "B"]);
        aff.aff_flag_format = FlagFormat::Long;
        assert_eq!(aff.parse_flags("TbTc"), vec!["Tb", "Tc"]);
        aff.aff_flag_format = FlagFormat::Numeric;
        assert_eq!(aff.parse_flags("1001,1002"), vec!["1001", "1002"]);
        aff.aff_flag_format = FlagFormat::Utf8;
        assert_eq!(aff.parse_flags("öä"), vec!["ö", "ä"]);
    }

    #[test]
    fn flag_aliases() {
        let mut aff = Aff::new();
        aff.aff_af = vec![
            ["A", "B"].iter().map(|f| f.to_string()).collect(),
        ];
        let mut got = aff.parse_flags("1");
        got.sort();
        assert_eq!(got, vec!["A", "B"]);
        // out-of-range ordinals fall back to plain flag parsing
        assert_eq!(aff.parse_flags("9"), vec!["9"]);
    }
}
