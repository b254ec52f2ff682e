/// Line-based reader for the affix description. The reader never fails:
/// recoverable problems become parse notes and the offending line is
/// skipped, since real-world affix files are full of oddities a checker
/// has to shrug off.
use hashbrown::HashMap;
use tracing::debug;

use crate::aff::{Aff, AffixEntry, CompoundPattern, CompoundRule, ConvTable, Flag, FlagFormat};
use crate::condition::CondPattern;

/// A comment on a single line, or a file-level problem when the line
/// number is zero.
pub struct ParseNote {
    pub psn_line: u32,
    pub psn_text: String,
}

pub struct AffReader {
    ard_aff: Aff,
    ard_notes: Vec<ParseNote>,
    ard_line_no: u32,
    /// per affix class (keyed by kind and flag): the cross-product marker
    /// and how many member lines its header still announces
    ard_affix_classes: HashMap<(bool, Flag), (bool, u32)>,
    ard_iconv: Vec<(String, String)>,
    ard_oconv: Vec<(String, String)>,
    ard_break: Vec<String>,
    ard_break_given: bool,
    ard_unknown: HashMap<String, u32>,
}

/// Outdated directive names kept by many dictionaries.
fn directive_synonym(name: &str) -> &str {
    match name {
        "PSEUDOROOT" => "NEEDAFFIX",
        "COMPOUNDLAST" => "COMPOUNDEND",
        other => other,
    }
}

impl AffReader {
    pub fn new() -> AffReader {
        AffReader {
            ard_aff: Aff::new(),
            ard_notes: vec![],
            ard_line_no: 0,
            ard_affix_classes: HashMap::new(),
            ard_iconv: vec![],
            ard_oconv: vec![],
            ard_break: vec![],
            ard_break_given: false,
            ard_unknown: HashMap::new(),
        }
    }

    fn note(&mut self, text: &str) {
        self.ard_notes.push(ParseNote {
            psn_line: self.ard_line_no,
            psn_text: text.to_string(),
        });
    }

    pub fn read_line(&mut self, raw: &str) {
        self.ard_line_no += 1;
        let mut line = raw.trim_end_matches(['\r', '\n']);
        if self.ard_line_no == 1 {
            line = line.trim_start_matches('\u{feff}');
        }
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let name = directive_synonym(tokens[0]).to_string();
        self.dispatch(&name, &tokens[1..]);
    }

    /// Drops a trailing end-of-line comment from a token list.
    fn without_comment<'a>(args: &'a [&'a str]) -> &'a [&'a str] {
        match args.iter().position(|t| t.starts_with('#')) {
            Some(at) => &args[..at],
            None => args,
        }
    }

    /// A counted-table line with a single numeric argument is the
    /// table header; the count is only advisory.
    fn is_table_header(args: &[&str]) -> bool {
        args.len() == 1 && args[0].chars().all(|c| c.is_ascii_digit())
    }

    fn dispatch(&mut self, name: &str, raw_args: &[&str]) {
        let args: Vec<&str> = Self::without_comment(raw_args).to_vec();
        match name {
            "SET" => self.take_string(&args, |aff, v| aff.aff_encoding = v),
            "LANG" => self.take_string(&args, |aff, v| aff.aff_lang = v),
            "IGNORE" => self.take_string(&args, |aff, v| aff.aff_ignore = v),
            "TRY" => self.take_string(&args, |aff, v| aff.aff_try = v),
            "KEY" => self.take_string(&args, |aff, v| aff.aff_key = v),
            "WORDCHARS" => self.take_string(&args, |aff, v| aff.aff_wordchars = v),
            "FLAG" => match args.first().copied() {
                Some("long") => self.ard_aff.aff_flag_format = FlagFormat::Long,
                Some("num") => self.ard_aff.aff_flag_format = FlagFormat::Numeric,
                Some("UTF-8") => self.ard_aff.aff_flag_format = FlagFormat::Utf8,
                Some(other) => {
                    let text = format!("unknown FLAG value: {}", other);
                    self.note(&text);
                }
                None => self.note("missing FLAG value"),
            },
            "FORBIDDENWORD" => self.take_flag(&args, |aff, f| aff.aff_forbiddenword = Some(f)),
            "NOSUGGEST" => self.take_flag(&args, |aff, f| aff.aff_nosuggest = Some(f)),
            "KEEPCASE" => self.take_flag(&args, |aff, f| aff.aff_keepcase = Some(f)),
            "CIRCUMFIX" => self.take_flag(&args, |aff, f| aff.aff_circumfix = Some(f)),
            "NEEDAFFIX" => self.take_flag(&args, |aff, f| aff.aff_needaffix = Some(f)),
            "FORCEUCASE" => self.take_flag(&args, |aff, f| aff.aff_forceucase = Some(f)),
            "WARN" => self.take_flag(&args, |aff, f| aff.aff_warn = Some(f)),
            "COMPOUNDFLAG" => self.take_flag(&args, |aff, f| aff.aff_compoundflag = Some(f)),
            "COMPOUNDBEGIN" => self.take_flag(&args, |aff, f| aff.aff_compoundbegin = Some(f)),
            "COMPOUNDMIDDLE" => self.take_flag(&args, |aff, f| aff.aff_compoundmiddle = Some(f)),
            "COMPOUNDEND" => self.take_flag(&args, |aff, f| aff.aff_compoundend = Some(f)),
            "ONLYINCOMPOUND" => self.take_flag(&args, |aff, f| aff.aff_onlyincompound = Some(f)),
            "COMPOUNDPERMITFLAG" => self.take_flag(&args, |aff, f| aff.aff_compoundpermit = Some(f)),
            "COMPOUNDFORBIDFLAG" => self.take_flag(&args, |aff, f| aff.aff_compoundforbid = Some(f)),
            "COMPOUNDMIN" => self.take_number(&args, |aff, n| {
                // zero is documented to behave as one
                aff.aff_compoundmin = (n as usize).max(1)
            }),
            "COMPOUNDWORDMAX" => {
                self.take_number(&args, |aff, n| aff.aff_compoundwordmax = Some(n as usize))
            }
            "MAXDIFF" => self.take_number(&args, |aff, n| aff.aff_maxdiff = n as i32),
            "MAXCPDSUGS" => self.take_number(&args, |aff, n| aff.aff_maxcpdsugs = n),
            "MAXNGRAMSUGS" => self.take_number(&args, |aff, n| aff.aff_maxngramsugs = n),
            "CHECKSHARPS" => self.ard_aff.aff_checksharps = true,
            "CHECKCOMPOUNDCASE" => self.ard_aff.aff_checkcompoundcase = true,
            "CHECKCOMPOUNDDUP" => self.ard_aff.aff_checkcompounddup = true,
            "CHECKCOMPOUNDREP" => self.ard_aff.aff_checkcompoundrep = true,
            "CHECKCOMPOUNDTRIPLE" => self.ard_aff.aff_checkcompoundtriple = true,
            "SIMPLIFIEDTRIPLE" => self.ard_aff.aff_simplifiedtriple = true,
            "FULLSTRIP" => self.ard_aff.aff_fullstrip = true,
            "COMPLEXPREFIXES" => self.ard_aff.aff_complexprefixes = true,
            "NOSPLITSUGS" => self.ard_aff.aff_nosplitsugs = true,
            "ONLYMAXDIFF" => self.ard_aff.aff_onlymaxdiff = true,
            "PFX" => self.read_affix_line(true, &args),
            "SFX" => self.read_affix_line(false, &args),
            "REP" => {
                if !Self::is_table_header(&args) {
                    self.read_pair(&args, |rdr, pair| rdr.ard_aff.aff_rep.push(pair));
                }
            }
            "ICONV" => {
                if !Self::is_table_header(&args) {
                    self.read_pair(&args, |rdr, pair| rdr.ard_iconv.push(pair));
                }
            }
            "OCONV" => {
                if !Self::is_table_header(&args) {
                    self.read_pair(&args, |rdr, pair| rdr.ard_oconv.push(pair));
                }
            }
            "BREAK" => {
                if Self::is_table_header(&args) {
                    // "BREAK 0" disables breaking altogether
                    self.ard_break_given = true;
                    self.ard_break.clear();
                } else if let Some(pattern) = args.first() {
                    self.ard_break.push(pattern.to_string());
                } else {
                    self.note("missing BREAK pattern");
                }
            }
            "MAP" => {
                if !Self::is_table_header(&args) {
                    match args.first() {
                        Some(group) => {
                            let parsed = Self::parse_map_groups(group);
                            self.ard_aff.aff_map.push(parsed);
                        }
                        None => self.note("missing MAP characters"),
                    }
                }
            }
            "AF" => {
                if !Self::is_table_header(&args) {
                    match args.first() {
                        Some(flags) => {
                            let set = self.ard_aff.parse_flags(flags).into_iter().collect();
                            self.ard_aff.aff_af.push(set);
                        }
                        None => self.note("missing AF flags"),
                    }
                }
            }
            "COMPOUNDRULE" => {
                if !Self::is_table_header(&args) {
                    match args.first() {
                        Some(rule) => {
                            let compiled = CompoundRule::new(rule);
                            self.ard_aff.aff_compound_rules.push(compiled);
                        }
                        None => self.note("missing COMPOUNDRULE pattern"),
                    }
                }
            }
            "CHECKCOMPOUNDPATTERN" => {
                if !Self::is_table_header(&args) {
                    self.read_compound_pattern(&args);
                }
            }
            other => {
                *self.ard_unknown.entry(other.to_string()).or_insert(0) += 1;
            }
        }
    }

    fn take_string<F: FnOnce(&mut Aff, String)>(&mut self, args: &[&str], store: F) {
        match args.first() {
            Some(value) => store(&mut self.ard_aff, value.to_string()),
            None => self.note("missing value"),
        }
    }

    fn take_flag<F: FnOnce(&mut Aff, Flag)>(&mut self, args: &[&str], store: F) {
        match args.first().and_then(|v| self.ard_aff.parse_flag(v)) {
            Some(flag) => store(&mut self.ard_aff, flag),
            None => self.note("missing flag value"),
        }
    }

    fn take_number<F: FnOnce(&mut Aff, u32)>(&mut self, args: &[&str], store: F) {
        match args.first().and_then(|v| v.parse::<u32>().ok()) {
            Some(number) => store(&mut self.ard_aff, number),
            None => self.note("expected a number"),
        }
    }

    fn read_pair<F: FnOnce(&mut Self, (String, String))>(&mut self, args: &[&str], store: F) {
        if args.len() < 2 {
            self.note("expected two arguments");
            return;
        }
        store(self, (args[0].to_string(), args[1].to_string()));
    }

    /// "PFX f Y 6" opens a class of six members; as long as the announced
    /// count is not exhausted, further lines with the same flag are class
    /// members like "PFX f 0 con [^abehilopru]" or "SFX A r ción/S ar".
    fn read_affix_line(&mut self, is_prefix: bool, args: &[&str]) {
        if args.len() < 3 {
            self.note("affix line needs flag, strip and add fields");
            return;
        }
        let flag = match self.ard_aff.parse_flag(args[0]) {
            Some(flag) => flag,
            None => {
                self.note("missing flag in affix line");
                return;
            }
        };
        let open = self
            .ard_affix_classes
            .get(&(is_prefix, flag.clone()))
            .map_or(false, |&(_, remaining)| remaining > 0);
        if !open && args[2].chars().all(|c| c.is_ascii_digit()) {
            let cross = args[1] == "Y";
            let count = args[2].parse::<u32>().unwrap_or(0);
            self.ard_affix_classes.insert((is_prefix, flag), (cross, count));
            return;
        }
        let header = self
            .ard_affix_classes
            .get_mut(&(is_prefix, flag.clone()))
            .map(|(cross, remaining)| {
                *remaining = remaining.saturating_sub(1);
                *cross
            });
        let cross = match header {
            Some(cross) => cross,
            None => {
                self.note("affix line before its class header");
                false
            }
        };
        let strip = if args[1] == "0" { "" } else { args[1] };
        let (add_raw, carried) = match args[2].split_once('/') {
            Some((add, flags)) => (add, self.ard_aff.parse_flags(flags)),
            None => (args[2], vec![]),
        };
        let add_raw = if add_raw == "0" { "" } else { add_raw };
        let ignore = self.ard_aff.aff_ignore.clone();
        let add: String = add_raw.chars().filter(|c| !ignore.contains(*c)).collect();
        let condition = args.get(3).copied().unwrap_or(".");
        let entry = AffixEntry {
            afe_flag: flag,
            afe_cross: cross,
            afe_strip: strip.to_string(),
            afe_add: add,
            afe_cond: CondPattern::new(condition),
            afe_flags: carried.into_iter().collect(),
        };
        if is_prefix {
            self.ard_aff.aff_prefixes.push(entry);
        } else {
            self.ard_aff.aff_suffixes.push(entry);
        }
    }

    fn read_compound_pattern(&mut self, args: &[&str]) {
        if args.len() < 2 {
            self.note("CHECKCOMPOUNDPATTERN needs two sides");
            return;
        }
        let (left_stem, left_flag) = self.split_pattern_side(args[0]);
        let (right_stem, right_flag) = self.split_pattern_side(args[1]);
        let pattern = CompoundPattern {
            cpt_left_no_affix: left_stem == "0",
            cpt_left_stem: if left_stem == "0" { String::new() } else { left_stem },
            cpt_left_flag: left_flag,
            cpt_right_no_affix: right_stem == "0",
            cpt_right_stem: if right_stem == "0" { String::new() } else { right_stem },
            cpt_right_flag: right_flag,
            cpt_replacement: args.get(2).map(|s| s.to_string()),
        };
        self.ard_aff.aff_compound_patterns.push(pattern);
    }

    fn split_pattern_side(&self, side: &str) -> (String, Option<Flag>) {
        match side.split_once('/') {
            Some((stem, flags)) => (stem.to_string(), self.ard_aff.parse_flag(flags)),
            None => (side.to_string(), None),
        }
    }

    /// "(aa)(bb)c" are the groups ["aa", "bb", "c"].
    fn parse_map_groups(text: &str) -> Vec<String> {
        let mut groups = vec![];
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '(' {
                let mut group = String::new();
                i += 1;
                while i < chars.len() && chars[i] != ')' {
                    group.push(chars[i]);
                    i += 1;
                }
                i += 1;
                if !group.is_empty() {
                    groups.push(group);
                }
            } else {
                groups.push(chars[i].to_string());
                i += 1;
            }
        }
        groups
    }

    pub fn finish(mut self) -> (Aff, Vec<ParseNote>) {
        self.ard_aff.aff_iconv = ConvTable::new(&self.ard_iconv);
        self.ard_aff.aff_oconv = ConvTable::new(&self.ard_oconv);
        if self.ard_break_given {
            self.ard_aff.aff_break = self.ard_break;
        }
        if !self.ard_unknown.is_empty() {
            debug!(directives = ?self.ard_unknown, "unparsed affix directives");
        }
        (self.ard_aff, self.ard_notes)
    }
}

/// Parses a whole affix file given as lines.
pub fn parse_aff<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> (Aff, Vec<ParseNote>) {
    let mut reader = AffReader::new();
    for line in lines {
        reader.read_line(line);
    }
    reader.finish()
}
