/// The lookup engine: decides whether a word is correctly spelled.
///
/// A word is accepted when some case variant of it has a valid analysis,
/// either as a stem with up to two prefixes and two suffixes, or as a
/// compound of several such parts. The search is a short-circuiting
/// enumeration: the first witness ends it, and validation happens inside
/// the enumeration, not after it.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::aff::{Aff, AffixEntry, BreakPattern, Flag, FlagSet};
use crate::captype::{guess_captype, CapType, Collation};
use crate::dic::Dic;
use crate::trie::AffixTrie;

/// Strings of digits (with an optional decimal part) are always accepted.
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("number pattern"));

/// How deep the break engine may recurse.
const MAX_BREAK_DEPTH: u32 = 10;

/// Options of a single check call.
#[derive(Clone, Copy)]
pub struct CheckParams {
    /// try the case variants of the word, not just the word itself
    pub ckp_capitalization: bool,
    /// accept entries carrying the NOSUGGEST flag
    pub ckp_allow_nosuggest: bool,
    /// try BREAK patterns when the whole word has no analysis
    pub ckp_allow_break: bool,
}

impl Default for CheckParams {
    fn default() -> CheckParams {
        CheckParams {
            ckp_capitalization: true,
            ckp_allow_nosuggest: true,
            ckp_allow_break: true,
        }
    }
}

/// Where a compound part sits; affix permissions differ per position.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum CompoundPos {
    Begin,
    Middle,
    End,
}

/// One decomposition of a candidate string. Affix slots hold indexes into
/// the configuration tables; the root binds a dictionary homonym once the
/// form is validated. `frm_suffix` is the suffix next to the stem (the one
/// the stem's flags must authorize); `frm_suffix2` is stacked on top of it,
/// authorized by the flags `frm_suffix` carries. Prefixes mirror that.
#[derive(Clone)]
struct AffixForm {
    frm_text: String,
    frm_stem: String,
    frm_prefix: Option<u32>,
    frm_prefix2: Option<u32>,
    frm_suffix: Option<u32>,
    frm_suffix2: Option<u32>,
    frm_root: Option<u32>,
}

impl AffixForm {
    fn bare(text: &str) -> AffixForm {
        AffixForm {
            frm_text: text.to_string(),
            frm_stem: text.to_string(),
            frm_prefix: None,
            frm_prefix2: None,
            frm_suffix: None,
            frm_suffix2: None,
            frm_root: None,
        }
    }

    fn is_base(&self) -> bool {
        self.frm_prefix.is_none() && self.frm_suffix.is_none()
    }
}

/// The engine. Built once from the parsed configuration and word list,
/// read-only afterwards; a single instance can serve parallel callers.
pub struct Lookup {
    lkp_aff: Aff,
    lkp_dic: Dic,
    /// keyed by the add string of each prefix
    lkp_prefix_trie: AffixTrie,
    /// keyed by the reversed add string of each suffix
    lkp_suffix_trie: AffixTrie,
    lkp_break: Vec<BreakPattern>,
    lkp_collation: Collation,
}

impl Lookup {
    pub fn new(lkp_aff: Aff, lkp_dic: Dic) -> Lookup {
        let mut prefix_trie = AffixTrie::new();
        for (id, pfx) in lkp_aff.aff_prefixes.iter().enumerate() {
            prefix_trie.insert(pfx.afe_add.chars(), id as u32);
        }
        let mut suffix_trie = AffixTrie::new();
        for (id, sfx) in lkp_aff.aff_suffixes.iter().enumerate() {
            suffix_trie.insert(sfx.afe_add.chars().rev(), id as u32);
        }
        let mut break_patterns = vec![];
        for pattern in &lkp_aff.aff_break {
            if let Some(compiled) = BreakPattern::new(pattern) {
                break_patterns.push(compiled);
            }
        }
        let collation = Collation::new(lkp_aff.aff_checksharps, lkp_aff.dotless_i());
        debug!(
            prefixes = lkp_aff.aff_prefixes.len(),
            suffixes = lkp_aff.aff_suffixes.len(),
            words = lkp_dic.dic_words.len(),
            "lookup engine ready"
        );
        Lookup {
            lkp_aff,
            lkp_dic,
            lkp_prefix_trie: prefix_trie,
            lkp_suffix_trie: suffix_trie,
            lkp_break: break_patterns,
            lkp_collation: collation,
        }
    }

    pub fn aff(&self) -> &Aff {
        &self.lkp_aff
    }

    pub fn dic(&self) -> &Dic {
        &self.lkp_dic
    }

    pub fn check(&self, word: &str) -> bool {
        self.check_with(word, &CheckParams::default())
    }

    /// The top-level decision procedure: forbidden-word gate, input
    /// conversion, IGNORE filter, numeric gate, analysis of the case
    /// variants, and finally the break engine.
    pub fn check_with(&self, word: &str, params: &CheckParams) -> bool {
        trace!(word, "check");
        if let Some(forbidden) = &self.lkp_aff.aff_forbiddenword {
            if self.lkp_dic.has_flag_all(word, forbidden) {
                return false;
            }
        }
        let mut word = word.to_string();
        if !self.lkp_aff.aff_iconv.is_empty() {
            word = self.lkp_aff.aff_iconv.apply(&word);
        }
        if !self.lkp_aff.aff_ignore.is_empty() {
            let ignore = &self.lkp_aff.aff_ignore;
            word.retain(|c| !ignore.contains(c));
        }
        if NUMBER_RE.is_match(&word) {
            return true;
        }
        if self.is_found(&word, params) {
            return true;
        }
        if !params.ckp_allow_break {
            return false;
        }
        self.try_breaking(&word, 0, params)
    }

    /// True when some case variant of `word` has a valid analysis.
    fn is_found(&self, word: &str, params: &CheckParams) -> bool {
        if params.ckp_capitalization {
            let (captype, variants) = self.lkp_collation.variants(word);
            for variant in &variants {
                if self.analyze(variant, captype, params.ckp_allow_nosuggest) {
                    return true;
                }
            }
            false
        } else {
            self.analyze(word, guess_captype(word), params.ckp_allow_nosuggest)
        }
    }

    /// Affix forms first, then compounds.
    fn analyze(&self, word: &str, captype: CapType, allow_nosuggest: bool) -> bool {
        if !self
            .word_forms(word, captype, None, allow_nosuggest, false)
            .is_empty()
        {
            return true;
        }
        self.has_compound(word, captype, allow_nosuggest)
    }

    // Break engine
    // ------------

    /// Recursively partitions `text` at break-pattern matches. Only the
    /// tail is partitioned further, so a partition is a sequence of heads
    /// plus the final remainder; every non-empty chunk must pass the
    /// top-level check without further breaking.
    fn try_breaking(&self, text: &str, depth: u32, params: &CheckParams) -> bool {
        if depth > MAX_BREAK_DEPTH {
            return false;
        }
        if depth > 0 && self.check_chunk(text, params) {
            return true;
        }
        for pattern in &self.lkp_break {
            for (start, end) in pattern.splits(text) {
                let head = &text[..start];
                let rest = &text[end..];
                if head.is_empty() || self.check_chunk(head, params) {
                    if rest.is_empty() || self.try_breaking(rest, depth + 1, params) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn check_chunk(&self, chunk: &str, params: &CheckParams) -> bool {
        let sub = CheckParams {
            ckp_allow_break: false,
            ..*params
        };
        self.check_with(chunk, &sub)
    }

    // Affix forms
    // -----------

    /// All validated decompositions of `word` in the given compound
    /// position (or standalone), each bound to a dictionary homonym.
    fn word_forms(
        &self,
        word: &str,
        captype: CapType,
        pos: Option<CompoundPos>,
        allow_nosuggest: bool,
        with_forbidden: bool,
    ) -> Vec<AffixForm> {
        let aff = &self.lkp_aff;
        let mut found = vec![];
        for form in self.affix_candidates(word, pos) {
            // A forbidden stem poisons every affixed or in-compound reading
            // of it; bare standalone stems were already gated at top level.
            if !with_forbidden && (pos.is_some() || !form.is_base()) {
                if let Some(forbidden) = &aff.aff_forbiddenword {
                    if self.lkp_dic.has_flag(&form.frm_stem, forbidden) {
                        return found;
                    }
                }
            }
            let mut exact = false;
            for &id in self.lkp_dic.homonyms(&form.frm_stem) {
                let mut candidate = form.clone();
                candidate.frm_root = Some(id);
                if self.good_form(&candidate, pos, captype, allow_nosuggest, false) {
                    exact = true;
                    found.push(candidate);
                }
            }
            // A FORCEUCASE stem may open a compound with a capitalized
            // initial; look it up lowercased as well.
            if aff.aff_forceucase.is_some()
                && captype == CapType::Init
                && pos == Some(CompoundPos::Begin)
            {
                for &id in self.lkp_dic.homonyms(&form.frm_stem.to_lowercase()) {
                    let mut candidate = form.clone();
                    candidate.frm_root = Some(id);
                    if self.good_form(&candidate, pos, captype, allow_nosuggest, false) {
                        exact = true;
                        found.push(candidate);
                    }
                }
            }
            if !exact && pos.is_none() {
                for &id in self.lkp_dic.homonyms_ci(&form.frm_stem) {
                    let mut candidate = form.clone();
                    candidate.frm_root = Some(id);
                    if self.good_form(&candidate, pos, captype, allow_nosuggest, true) {
                        found.push(candidate);
                    }
                }
            }
        }
        found
    }

    /// The affix-form enumerator: the identity form, suffix-stripped forms,
    /// prefix-stripped forms, and cross-product combinations, subject to the
    /// position rules for compound parts.
    fn affix_candidates(&self, word: &str, pos: Option<CompoundPos>) -> Vec<AffixForm> {
        let aff = &self.lkp_aff;
        let mut forms = vec![AffixForm::bare(word)];
        let permit: Vec<Flag> = aff.aff_compoundpermit.iter().cloned().collect();
        let (suffix_ok, prefix_ok, prefix_req, suffix_req, forbidden) = match pos {
            None => (true, true, vec![], vec![], vec![]),
            Some(p) => (
                p == CompoundPos::End || aff.aff_compoundpermit.is_some(),
                p == CompoundPos::Begin || aff.aff_compoundpermit.is_some(),
                if p == CompoundPos::Begin {
                    vec![]
                } else {
                    permit.clone()
                },
                if p == CompoundPos::End {
                    vec![]
                } else {
                    permit.clone()
                },
                aff.aff_compoundforbid.iter().cloned().collect(),
            ),
        };
        if suffix_ok {
            self.desuffix(word, &suffix_req, &forbidden, false, false, &mut forms);
        }
        if prefix_ok {
            let mut prefixed = vec![];
            self.deprefix(word, &prefix_req, &forbidden, false, &mut prefixed);
            for pform in prefixed {
                let cross = pform
                    .frm_prefix
                    .map(|id| aff.aff_prefixes[id as usize].afe_cross)
                    .unwrap_or(false);
                let text = pform.frm_text.clone();
                let stem = pform.frm_stem.clone();
                let prefix = pform.frm_prefix;
                forms.push(pform);
                if suffix_ok && cross {
                    let mut combined = vec![];
                    self.desuffix(&stem, &suffix_req, &forbidden, false, true, &mut combined);
                    for mut sform in combined {
                        sform.frm_text = text.clone();
                        sform.frm_prefix = prefix;
                        forms.push(sform);
                    }
                }
            }
        }
        forms
    }

    /// Strips one suffix, and (one nesting level deep) a second one whose
    /// carried flags must include the first suffix's flag.
    fn desuffix(
        &self,
        word: &str,
        required: &[Flag],
        forbidden: &[Flag],
        nested: bool,
        crossproduct: bool,
        out: &mut Vec<AffixForm>,
    ) {
        let mut candidates = vec![];
        self.lkp_suffix_trie
            .collect_prefixes(word.chars().rev(), &mut candidates);
        for id in candidates {
            let suffix = &self.lkp_aff.aff_suffixes[id as usize];
            if crossproduct && !suffix.afe_cross {
                continue;
            }
            if !required.iter().all(|f| suffix.afe_flags.contains(f)) {
                continue;
            }
            if forbidden.iter().any(|f| suffix.afe_flags.contains(f)) {
                continue;
            }
            let stem = match Self::strip_from_end(word, suffix) {
                Some(stem) => stem,
                None => continue,
            };
            if !suffix.afe_cond.matches_end(&stem) {
                continue;
            }
            let mut form = AffixForm::bare(word);
            form.frm_stem = stem;
            form.frm_suffix = Some(id);
            out.push(form.clone());
            if !nested {
                let mut inner_required: Vec<Flag> = Vec::with_capacity(required.len() + 1);
                inner_required.push(suffix.afe_flag.clone());
                inner_required.extend_from_slice(required);
                let mut inner = vec![];
                self.desuffix(
                    &form.frm_stem,
                    &inner_required,
                    forbidden,
                    true,
                    crossproduct,
                    &mut inner,
                );
                for mut nested_form in inner {
                    nested_form.frm_suffix2 = Some(id);
                    nested_form.frm_text = word.to_string();
                    out.push(nested_form);
                }
            }
        }
    }

    /// The prefix counterpart of `desuffix`.
    fn deprefix(
        &self,
        word: &str,
        required: &[Flag],
        forbidden: &[Flag],
        nested: bool,
        out: &mut Vec<AffixForm>,
    ) {
        let mut candidates = vec![];
        self.lkp_prefix_trie
            .collect_prefixes(word.chars(), &mut candidates);
        for id in candidates {
            let prefix = &self.lkp_aff.aff_prefixes[id as usize];
            if !required.iter().all(|f| prefix.afe_flags.contains(f)) {
                continue;
            }
            if forbidden.iter().any(|f| prefix.afe_flags.contains(f)) {
                continue;
            }
            let stem = match Self::strip_from_start(word, prefix) {
                Some(stem) => stem,
                None => continue,
            };
            if !prefix.afe_cond.matches_start(&stem) {
                continue;
            }
            let mut form = AffixForm::bare(word);
            form.frm_stem = stem;
            form.frm_prefix = Some(id);
            out.push(form.clone());
            if !nested {
                let mut inner_required: Vec<Flag> = Vec::with_capacity(required.len() + 1);
                inner_required.push(prefix.afe_flag.clone());
                inner_required.extend_from_slice(required);
                let mut inner = vec![];
                self.deprefix(&form.frm_stem, &inner_required, forbidden, true, &mut inner);
                for mut nested_form in inner {
                    nested_form.frm_prefix2 = Some(id);
                    nested_form.frm_text = word.to_string();
                    out.push(nested_form);
                }
            }
        }
    }

    /// word = stem_without_strip + add  ->  stem = prefix_of_word + strip
    fn strip_from_end(word: &str, suffix: &AffixEntry) -> Option<String> {
        if !word.ends_with(&suffix.afe_add) {
            return None;
        }
        let cut = word.len() - suffix.afe_add.len();
        Some(format!("{}{}", &word[..cut], suffix.afe_strip))
    }

    fn strip_from_start(word: &str, prefix: &AffixEntry) -> Option<String> {
        if !word.starts_with(&prefix.afe_add) {
            return None;
        }
        Some(format!("{}{}", prefix.afe_strip, &word[prefix.afe_add.len()..]))
    }

    // Form validation
    // ---------------

    /// Combined flags of a form: the root's plus those carried by the
    /// innermost prefix and suffix.
    fn form_flags(&self, form: &AffixForm) -> FlagSet {
        let mut flags = match form.frm_root {
            Some(id) => self.lkp_dic.word(id).wrd_flags.clone(),
            None => FlagSet::new(),
        };
        if let Some(id) = form.frm_prefix {
            flags.extend(self.lkp_aff.aff_prefixes[id as usize].afe_flags.iter().cloned());
        }
        if let Some(id) = form.frm_suffix {
            flags.extend(self.lkp_aff.aff_suffixes[id as usize].afe_flags.iter().cloned());
        }
        flags
    }

    fn affix_flag_sets<'a>(&'a self, form: &AffixForm) -> Vec<&'a FlagSet> {
        let mut sets = vec![];
        if let Some(id) = form.frm_prefix2 {
            sets.push(&self.lkp_aff.aff_prefixes[id as usize].afe_flags);
        }
        if let Some(id) = form.frm_prefix {
            sets.push(&self.lkp_aff.aff_prefixes[id as usize].afe_flags);
        }
        if let Some(id) = form.frm_suffix {
            sets.push(&self.lkp_aff.aff_suffixes[id as usize].afe_flags);
        }
        if let Some(id) = form.frm_suffix2 {
            sets.push(&self.lkp_aff.aff_suffixes[id as usize].afe_flags);
        }
        sets
    }

    /// Decides whether a decomposition bound to a dictionary entry
    /// satisfies every flag constraint for its context.
    fn good_form(
        &self,
        form: &AffixForm,
        pos: Option<CompoundPos>,
        captype: CapType,
        allow_nosuggest: bool,
        check_cap: bool,
    ) -> bool {
        let aff = &self.lkp_aff;
        let root = match form.frm_root {
            Some(id) => self.lkp_dic.word(id),
            None => return false,
        };
        let root_flags = &root.wrd_flags;
        let all_flags = self.form_flags(form);
        let root_cap = guess_captype(&root.wrd_stem);

        if !allow_nosuggest {
            if let Some(nosuggest) = &aff.aff_nosuggest {
                if root_flags.contains(nosuggest) {
                    return false;
                }
            }
        }

        if captype != root_cap {
            if let Some(keepcase) = &aff.aff_keepcase {
                if root_flags.contains(keepcase) && !aff.aff_checksharps {
                    return false;
                }
            }
            // non-lowercase dictionary words match only their own case
            // or an all-caps rendering
            if check_cap && captype != CapType::All && root_cap != CapType::No {
                return false;
            }
        }

        if let Some(needaffix) = &aff.aff_needaffix {
            if form.is_base() {
                if root_flags.contains(needaffix) {
                    return false;
                }
            } else if self
                .affix_flag_sets(form)
                .iter()
                .all(|set| set.contains(needaffix))
            {
                // NEEDAFFIX on an affix means "needs another affix beyond me"
                return false;
            }
        }

        if let Some(id) = form.frm_prefix {
            if !all_flags.contains(&aff.aff_prefixes[id as usize].afe_flag) {
                return false;
            }
        }
        if let Some(id) = form.frm_suffix {
            if !all_flags.contains(&aff.aff_suffixes[id as usize].afe_flag) {
                return false;
            }
        }

        if let Some(circumfix) = &aff.aff_circumfix {
            let prefix_circ = form
                .frm_prefix
                .map(|id| self.lkp_aff.aff_prefixes[id as usize].afe_flags.contains(circumfix))
                .unwrap_or(false);
            let suffix_circ = form
                .frm_suffix
                .map(|id| self.lkp_aff.aff_suffixes[id as usize].afe_flags.contains(circumfix))
                .unwrap_or(false);
            if prefix_circ != suffix_circ {
                return false;
            }
        }

        match pos {
            None => {
                if let Some(onlyincompound) = &aff.aff_onlyincompound {
                    if all_flags.contains(onlyincompound) {
                        return false;
                    }
                }
                true
            }
            Some(p) => {
                if let Some(compound) = &aff.aff_compoundflag {
                    if all_flags.contains(compound) {
                        return true;
                    }
                }
                let position_flag = match p {
                    CompoundPos::Begin => &aff.aff_compoundbegin,
                    CompoundPos::Middle => &aff.aff_compoundmiddle,
                    CompoundPos::End => &aff.aff_compoundend,
                };
                match position_flag {
                    Some(flag) => all_flags.contains(flag),
                    None => false,
                }
            }
        }
    }

    // Compounding
    // -----------

    fn has_compound(&self, word: &str, captype: CapType, allow_nosuggest: bool) -> bool {
        let aff = &self.lkp_aff;
        if aff.aff_compoundbegin.is_some() || aff.aff_compoundflag.is_some() {
            let mut parts = vec![];
            if self.compound_by_flags(word, &mut parts, captype, allow_nosuggest) {
                return true;
            }
        }
        if !aff.aff_compound_rules.is_empty() {
            let rules: Vec<usize> = (0..aff.aff_compound_rules.len()).collect();
            let mut part_words = vec![];
            let mut part_texts = vec![];
            if self.compound_by_rules(word, &mut part_words, &mut part_texts, &rules, captype) {
                return true;
            }
        }
        false
    }

    /// Recursive splitter driven by the COMPOUNDFLAG/BEGIN/MIDDLE/END
    /// machinery. `parts` accumulates the left parts of the split under
    /// construction; a split completes when the remainder is itself a valid
    /// final part and the whole sequence survives the sanity checks.
    fn compound_by_flags(
        &self,
        rest: &str,
        parts: &mut Vec<AffixForm>,
        captype: CapType,
        allow_nosuggest: bool,
    ) -> bool {
        let aff = &self.lkp_aff;
        if !parts.is_empty() {
            for form in self.word_forms(rest, captype, Some(CompoundPos::End), allow_nosuggest, false)
            {
                parts.push(form);
                let good = !self.bad_compound(parts, captype);
                parts.pop();
                if good {
                    return true;
                }
            }
        } else if let Some(forbidden) = &aff.aff_forbiddenword {
            // "forbiddenword's" must not be rescued by decompounding when
            // the affixed whole is itself forbidden
            for candidate in self.word_forms(rest, captype, None, true, true) {
                if self.form_flags(&candidate).contains(forbidden) {
                    return false;
                }
            }
        }
        let min = aff.aff_compoundmin.max(1);
        let rest_len = rest.chars().count();
        if rest_len < min * 2 {
            return false;
        }
        if let Some(max) = aff.aff_compoundwordmax {
            if parts.len() >= max {
                return false;
            }
        }
        let pos = if parts.is_empty() {
            CompoundPos::Begin
        } else {
            CompoundPos::Middle
        };
        let offsets: Vec<usize> = rest.char_indices().map(|(i, _)| i).collect();
        for split in min..=rest_len - min {
            let cut = offsets[split];
            let head = &rest[..cut];
            let tail = &rest[cut..];
            for form in self.word_forms(head, captype, Some(pos), allow_nosuggest, false) {
                parts.push(form);
                let done = self.compound_by_flags(tail, parts, captype, allow_nosuggest);
                parts.pop();
                if done {
                    return true;
                }
            }
            if aff.aff_simplifiedtriple {
                // a tripled letter may be written once at the boundary;
                // retry the head with its last letter doubled
                if let Some(last) = head.chars().last() {
                    if tail.chars().next() == Some(last) {
                        let doubled = format!("{}{}", head, last);
                        for mut form in
                            self.word_forms(&doubled, captype, Some(pos), allow_nosuggest, false)
                        {
                            form.frm_text = head.to_string();
                            parts.push(form);
                            let done =
                                self.compound_by_flags(tail, parts, captype, allow_nosuggest);
                            parts.pop();
                            if done {
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }

    /// Alternate splitter driven by COMPOUNDRULE patterns over the flag
    /// alphabet. Only rules that still partially match the accumulated
    /// flag sequence survive into the recursion.
    fn compound_by_rules(
        &self,
        rest: &str,
        part_words: &mut Vec<u32>,
        part_texts: &mut Vec<String>,
        rules: &[usize],
        captype: CapType,
    ) -> bool {
        let aff = &self.lkp_aff;
        if !part_words.is_empty() {
            for &id in self.lkp_dic.homonyms(rest) {
                let mut flag_sets: Vec<&FlagSet> = part_words
                    .iter()
                    .map(|&w| &self.lkp_dic.word(w).wrd_flags)
                    .collect();
                flag_sets.push(&self.lkp_dic.word(id).wrd_flags);
                if rules
                    .iter()
                    .any(|&r| aff.aff_compound_rules[r].full_match(&flag_sets))
                {
                    let mut forms: Vec<AffixForm> =
                        part_texts.iter().map(|t| AffixForm::bare(t)).collect();
                    forms.push(AffixForm::bare(rest));
                    if !self.bad_compound(&forms, captype) {
                        return true;
                    }
                }
            }
        }
        let min = aff.aff_compoundmin.max(1);
        let rest_len = rest.chars().count();
        if rest_len < min * 2 {
            return false;
        }
        if let Some(max) = aff.aff_compoundwordmax {
            if part_words.len() >= max {
                return false;
            }
        }
        let offsets: Vec<usize> = rest.char_indices().map(|(i, _)| i).collect();
        for split in min..=rest_len - min {
            let cut = offsets[split];
            let head = &rest[..cut];
            let tail = &rest[cut..];
            for &id in self.lkp_dic.homonyms(head) {
                let mut flag_sets: Vec<&FlagSet> = part_words
                    .iter()
                    .map(|&w| &self.lkp_dic.word(w).wrd_flags)
                    .collect();
                flag_sets.push(&self.lkp_dic.word(id).wrd_flags);
                let surviving: Vec<usize> = rules
                    .iter()
                    .copied()
                    .filter(|&r| aff.aff_compound_rules[r].partial_match(&flag_sets))
                    .collect();
                if surviving.is_empty() {
                    continue;
                }
                part_words.push(id);
                part_texts.push(head.to_string());
                let done = self.compound_by_rules(tail, part_words, part_texts, &surviving, captype);
                part_words.pop();
                part_texts.pop();
                if done {
                    return true;
                }
            }
        }
        false
    }

    /// The post-hoc sanity checks on a completed compound candidate.
    fn bad_compound(&self, parts: &[AffixForm], captype: CapType) -> bool {
        let aff = &self.lkp_aff;
        if let Some(forceucase) = &aff.aff_forceucase {
            if captype != CapType::All && captype != CapType::Init {
                if let Some(last) = parts.last() {
                    if self.lkp_dic.has_flag(&last.frm_text, forceucase) {
                        return true;
                    }
                }
            }
        }
        for idx in 0..parts.len().saturating_sub(1) {
            let left_form = &parts[idx];
            let right_form = &parts[idx + 1];
            let left = &left_form.frm_text;
            let right = &right_form.frm_text;

            if let Some(forbid) = &aff.aff_compoundforbid {
                // only beginning and middle parts are gated, never the last
                if self.lkp_dic.has_flag(left, forbid) {
                    return true;
                }
            }

            // a compound may not exist verbatim as two space-separated words
            let spaced = format!("{} {}", left, right);
            if !self.word_forms(&spaced, captype, None, true, false).is_empty() {
                return true;
            }

            if aff.aff_checkcompoundrep {
                let joined = format!("{}{}", left, right);
                for candidate in self.rep_variants(&joined) {
                    if !self.word_forms(&candidate, captype, None, true, false).is_empty() {
                        return true;
                    }
                }
            }

            if aff.aff_checkcompoundtriple && Self::boundary_triple(left, right) {
                return true;
            }

            if aff.aff_checkcompoundcase {
                let l = left.chars().last();
                let r = right.chars().next();
                if let (Some(l), Some(r)) = (l, r) {
                    if (Self::upper_or_caseless(l) || Self::upper_or_caseless(r))
                        && l != '-'
                        && r != '-'
                    {
                        return true;
                    }
                }
            }

            for pattern in &aff.aff_compound_patterns {
                if pattern.matches(
                    &left_form.frm_stem,
                    left_form.is_base(),
                    &self.form_flags(left_form),
                    &right_form.frm_stem,
                    right_form.is_base(),
                    &self.form_flags(right_form),
                ) {
                    return true;
                }
            }

            if aff.aff_checkcompounddup && left == right && idx == parts.len() - 2 {
                return true;
            }
        }
        false
    }

    /// Three identical letters across the boundary.
    fn boundary_triple(left: &str, right: &str) -> bool {
        let l: Vec<char> = left.chars().rev().take(2).collect();
        let r: Vec<char> = right.chars().take(2).collect();
        if l.len() >= 2 && !r.is_empty() && l[0] == l[1] && l[0] == r[0] {
            return true;
        }
        if !l.is_empty() && r.len() >= 2 && l[0] == r[0] && r[0] == r[1] {
            return true;
        }
        false
    }

    fn upper_or_caseless(c: char) -> bool {
        c.to_uppercase().collect::<String>() == c.to_string()
    }

    /// Every single-site application of a REP table entry to `text`.
    fn rep_variants(&self, text: &str) -> Vec<String> {
        let mut out = vec![];
        if text.chars().count() < 2 {
            return out;
        }
        for (pattern, replacement) in &self.lkp_aff.aff_rep {
            if pattern.is_empty() {
                continue;
            }
            let mut from = 0usize;
            while let Some(found) = text[from..].find(pattern.as_str()) {
                let at = from + found;
                let candidate = format!(
                    "{}{}{}",
                    &text[..at],
                    replacement,
                    &text[at + pattern.len()..]
                );
                // a replacement producing a word pair is a suggestion
                // concern, not a lookup one
                if !candidate.contains(' ') {
                    out.push(candidate);
                }
                from = at
                    + text[at..]
                        .chars()
                        .next()
                        .map(|c| c.len_utf8())
                        .unwrap_or(1);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aff_reader::parse_aff;
    use crate::dic_reader::parse_dic;
    use rstest::rstest;

    fn engine(aff_text: &str, dic_text: &str) -> Lookup {
        let (aff, aff_notes) = parse_aff(aff_text.lines());
        assert!(aff_notes.is_empty(), "affix fixture has parse problems");
        let (dic, dic_notes) = parse_dic(&aff, dic_text.lines());
        assert!(dic_notes.is_empty(), "dic fixture has parse problems");
        Lookup::new(aff, dic)
    }

    #[test]
    fn plain_and_suffixed_words() {
        let lookup = engine(
            "SET UTF-8\n\
             SFX S Y 1\n\
             SFX S 0 s .\n\
             SFX G Y 2\n\
             SFX G e ing e\n\
             SFX G 0 ing [^ey]\n",
            "2\n\
             create/G\n\
             creation/S\n",
        );
        assert!(lookup.check("creation"));
        assert!(lookup.check("creations"));
        assert!(lookup.check("create"));
        assert!(lookup.check("creating"));
        assert!(!lookup.check("createion"));
        assert!(!lookup.check("creationg"));
        assert!(!lookup.check("created"));
    }

    #[test]
    fn numbers_always_accepted() {
        let lookup = engine("SET UTF-8\n", "1\nword\n");
        assert!(lookup.check("13"));
        assert!(lookup.check("13.5"));
        assert!(!lookup.check("13.5.2"));
        assert!(!lookup.check("13a"));
    }

    #[test]
    fn repeated_checks_are_deterministic() {
        let lookup = engine("SET UTF-8\n", "1\nword\n");
        for _ in 0..3 {
            assert!(lookup.check("word"));
            assert!(!lookup.check("sword"));
        }
    }

    #[test]
    fn capitalized_dictionary_words() {
        let lookup = engine("SET UTF-8\n", "2\nParis\nOpenOffice.org\n");
        assert!(lookup.check("Paris"));
        assert!(lookup.check("PARIS"));
        assert!(!lookup.check("paris"));
        assert!(lookup.check("OpenOffice.org"));
        assert!(lookup.check("OPENOFFICE.ORG"));
        assert!(!lookup.check("openoffice.org"));
        assert!(!lookup.check("Openoffice.org"));
    }

    #[test]
    fn lowercase_entries_accept_any_casing() {
        let lookup = engine("SET UTF-8\n", "1\nword\n");
        assert!(lookup.check("word"));
        assert!(lookup.check("Word"));
        assert!(lookup.check("WORD"));
        assert!(!lookup.check("WoRd"));
    }

    #[test]
    fn capitalization_can_be_disabled() {
        let lookup = engine("SET UTF-8\n", "1\nParis\n");
        let exact_only = CheckParams {
            ckp_capitalization: false,
            ..CheckParams::default()
        };
        assert!(lookup.check("PARIS"));
        assert!(!lookup.check_with("PARIS", &exact_only));
        assert!(lookup.check_with("Paris", &exact_only));
    }

    #[test]
    fn keepcase_accepts_only_dictionary_casing() {
        let lookup = engine("SET UTF-8\nKEEPCASE k\n", "2\nfoo/k\nBar/k\n");
        assert!(lookup.check("foo"));
        assert!(!lookup.check("Foo"));
        assert!(!lookup.check("FOO"));
        assert!(lookup.check("Bar"));
        assert!(!lookup.check("BAR"));
        assert!(!lookup.check("bar"));
    }

    #[test]
    fn sharp_s_words() {
        let lookup = engine(
            "SET UTF-8\nCHECKSHARPS\nKEEPCASE k\n",
            "1\nStraße/k\n",
        );
        assert!(lookup.check("Straße"));
        assert!(lookup.check("STRASSE"));
        assert!(!lookup.check("STRAßE"));
        assert!(!lookup.check("strasse"));
    }

    #[test]
    fn turkic_lowering_variants() {
        let lookup = engine("SET UTF-8\nLANG tr_TR\n", "1\nılık\n");
        assert!(lookup.check("ılık"));
        assert!(lookup.check("ILIK"));
        let plain = engine("SET UTF-8\n", "1\nılık\n");
        assert!(!plain.check("ILIK"));
    }

    #[test]
    fn forbidden_word_blocks_all_readings() {
        let lookup = engine(
            "SET UTF-8\n\
             FORBIDDENWORD !\n\
             SFX S Y 1\n\
             SFX S 0 s .\n",
            "2\nfoo/!S\nbar/S\n",
        );
        assert!(!lookup.check("foo"));
        assert!(!lookup.check("foos"));
        assert!(lookup.check("bar"));
        assert!(lookup.check("bars"));
    }

    #[test]
    fn forbidden_word_blocks_decompounding() {
        let lookup = engine(
            "SET UTF-8\n\
             FORBIDDENWORD !\n\
             COMPOUNDFLAG C\n\
             SFX S Y 1\n\
             SFX S 0 s .\n",
            "3\nfoo/C\nbars/C\nfoobar/!S\n",
        );
        assert!(!lookup.check("foobars"));
        let without = engine(
            "SET UTF-8\n\
             FORBIDDENWORD !\n\
             COMPOUNDFLAG C\n",
            "2\nfoo/C\nbars/C\n",
        );
        assert!(without.check("foobars"));
    }

    #[rstest]
    #[case("foobar", true)]
    #[case("foofoo", true)]
    #[case("barfoo", true)]
    #[case("foofoobar", true)]
    #[case("foox", false)]
    #[case("fobar", false)]
    fn compounding_by_flag(#[case] word: &str, #[case] expected: bool) {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCOMPOUNDMIN 3\n",
            "2\nfoo/C\nbar/C\n",
        );
        assert_eq!(lookup.check(word), expected);
    }

    #[test]
    fn compound_position_flags() {
        let lookup = engine(
            "SET UTF-8\n\
             COMPOUNDBEGIN B\n\
             COMPOUNDMIDDLE M\n\
             COMPOUNDEND E\n\
             COMPOUNDMIN 3\n",
            "3\nfoo/B\nmid/M\nbar/E\n",
        );
        assert!(lookup.check("foobar"));
        assert!(lookup.check("foomidbar"));
        assert!(!lookup.check("barfoo"));
        assert!(!lookup.check("foomid"));
        assert!(!lookup.check("midbar"));
    }

    #[test]
    fn compound_word_max_bounds_splitting() {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCOMPOUNDMIN 3\nCOMPOUNDWORDMAX 2\n",
            "1\nfoo/C\n",
        );
        assert!(lookup.check("foofoo"));
        // the final part joins after the bound is checked, so one more
        // part than the configured maximum still passes
        assert!(lookup.check("foofoofoo"));
        assert!(!lookup.check("foofoofoofoo"));
    }

    #[rstest]
    #[case("abc", true)]
    #[case("ac", true)]
    #[case("aabc", true)]
    #[case("ab", false)]
    #[case("ca", false)]
    #[case("c", false)]
    fn compounding_by_rule(#[case] word: &str, #[case] expected: bool) {
        let lookup = engine(
            "SET UTF-8\n\
             COMPOUNDMIN 1\n\
             COMPOUNDRULE 1\n\
             COMPOUNDRULE N*M\n",
            "3\na/N\nb/N\nc/M\n",
        );
        assert_eq!(lookup.check(word), expected);
    }

    #[test]
    fn compound_rules_with_long_flags() {
        let lookup = engine(
            "SET UTF-8\n\
             FLAG long\n\
             COMPOUNDMIN 1\n\
             COMPOUNDRULE 1\n\
             COMPOUNDRULE (aa)(bb)?(cc)\n",
            "3\nx/aa\ny/bb\nz/cc\n",
        );
        assert!(lookup.check("xyz"));
        assert!(lookup.check("xz"));
        assert!(!lookup.check("yz"));
        assert!(!lookup.check("xy"));
    }

    #[test]
    fn only_in_compound() {
        let lookup = engine(
            "SET UTF-8\nONLYINCOMPOUND O\nCOMPOUNDFLAG C\nCOMPOUNDMIN 3\n",
            "2\nfog/OC\nhorn/C\n",
        );
        assert!(!lookup.check("fog"));
        assert!(lookup.check("horn"));
        assert!(lookup.check("foghorn"));
    }

    #[test]
    fn need_affix_stems_and_affixes() {
        let lookup = engine(
            "SET UTF-8\n\
             NEEDAFFIX n\n\
             SFX S Y 1\n\
             SFX S 0 s .\n\
             SFX T Y 1\n\
             SFX T 0 ed/n .\n",
            "2\ncook/nST\nlook/ST\n",
        );
        assert!(!lookup.check("cook"));
        assert!(lookup.check("cooks"));
        assert!(lookup.check("look"));
        // a form whose every affix itself needs an affix stays invalid
        assert!(!lookup.check("cooked"));
        assert!(!lookup.check("looked"));
    }

    #[test]
    fn circumfix_requires_both_sides() {
        let lookup = engine(
            "SET UTF-8\n\
             CIRCUMFIX X\n\
             PFX P Y 1\n\
             PFX P 0 pre/X .\n\
             SFX S Y 1\n\
             SFX S 0 ost/X .\n",
            "1\nbig/PS\n",
        );
        assert!(lookup.check("big"));
        assert!(lookup.check("prebigost"));
        assert!(!lookup.check("prebig"));
        assert!(!lookup.check("bigost"));
    }

    #[test]
    fn cross_product_is_required_for_combining() {
        let combined = engine(
            "SET UTF-8\n\
             PFX P Y 1\n\
             PFX P 0 un .\n\
             SFX S Y 1\n\
             SFX S 0 ed .\n",
            "1\nlock/PS\n",
        );
        assert!(combined.check("unlocked"));
        let no_cross = engine(
            "SET UTF-8\n\
             PFX P Y 1\n\
             PFX P 0 un .\n\
             SFX S N 1\n\
             SFX S 0 ed .\n",
            "1\nlock/PS\n",
        );
        assert!(no_cross.check("locked"));
        assert!(no_cross.check("unlock"));
        assert!(!no_cross.check("unlocked"));
    }

    #[test]
    fn two_suffix_nesting_follows_carried_flags() {
        let lookup = engine(
            "SET UTF-8\n\
             SFX S Y 1\n\
             SFX S 0 s .\n\
             SFX D Y 1\n\
             SFX D 0 ed/S .\n",
            "1\nwork/D\n",
        );
        assert!(lookup.check("work"));
        assert!(lookup.check("worked"));
        assert!(lookup.check("workeds"));
        // the stem's flags do not authorize the bare plural
        assert!(!lookup.check("works"));
    }

    #[test]
    fn compound_permit_gates_inner_affixes() {
        let closed = engine(
            "SET UTF-8\n\
             COMPOUNDFLAG C\n\
             COMPOUNDMIN 3\n\
             SFX S Y 1\n\
             SFX S 0 s .\n",
            "2\nfoo/CS\nbar/C\n",
        );
        assert!(!closed.check("foosbar"));
        let permitted = engine(
            "SET UTF-8\n\
             COMPOUNDFLAG C\n\
             COMPOUNDMIN 3\n\
             COMPOUNDPERMITFLAG P\n\
             SFX S Y 1\n\
             SFX S 0 s/P .\n",
            "2\nfoo/CS\nbar/C\n",
        );
        assert!(permitted.check("foosbar"));
    }

    #[test]
    fn compound_forbid_flag_blocks_left_parts() {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCOMPOUNDFORBIDFLAG F\nCOMPOUNDMIN 3\n",
            "3\nfoo/CF\nbar/C\nbaz/C\n",
        );
        assert!(!lookup.check("foobar"));
        assert!(lookup.check("barbaz"));
        assert!(lookup.check("barfoo"));
    }

    #[test]
    fn force_uppercase_of_last_part() {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nFORCEUCASE U\nCOMPOUNDMIN 3\n",
            "2\nfoo/C\nbar/CU\n",
        );
        assert!(!lookup.check("foobar"));
        assert!(lookup.check("Foobar"));
        assert!(lookup.check("FOOBAR"));
        assert!(lookup.check("barfoo"));
    }

    #[test]
    fn compound_duplication_check() {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCHECKCOMPOUNDDUP\nCOMPOUNDMIN 3\n",
            "2\nfoo/C\nbar/C\n",
        );
        assert!(!lookup.check("foofoo"));
        assert!(lookup.check("foobar"));
        assert!(lookup.check("foofoobar"));
    }

    #[test]
    fn compound_triple_check() {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCHECKCOMPOUNDTRIPLE\nCOMPOUNDMIN 3\n",
            "2\nkaff/C\nffee/C\n",
        );
        assert!(!lookup.check("kaffffee"));
        let plain = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCOMPOUNDMIN 3\n",
            "2\nkaff/C\nffee/C\n",
        );
        assert!(plain.check("kaffffee"));
    }

    #[test]
    fn simplified_triple_at_boundary() {
        let aff = "SET UTF-8\n\
                   COMPOUNDFLAG C\n\
                   COMPOUNDMIN 3\n\
                   CHECKCOMPOUNDTRIPLE\n\
                   SIMPLIFIEDTRIPLE\n";
        let lookup = engine(aff, "2\ntall/C\nlur/C\n");
        assert!(lookup.check("tallur"));
        assert!(!lookup.check("talllur"));
        let strict = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCOMPOUNDMIN 3\nCHECKCOMPOUNDTRIPLE\n",
            "2\ntall/C\nlur/C\n",
        );
        assert!(!strict.check("tallur"));
    }

    #[test]
    fn compound_case_check() {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCHECKCOMPOUNDCASE\nCOMPOUNDMIN 3\n",
            "3\nfoo/C\nBar/C\nbaz/C\n",
        );
        assert!(!lookup.check("fooBar"));
        assert!(lookup.check("foobaz"));
    }

    #[test]
    fn compound_rep_check() {
        let lookup = engine(
            "SET UTF-8\n\
             COMPOUNDFLAG C\n\
             COMPOUNDMIN 2\n\
             CHECKCOMPOUNDREP\n\
             REP 1\n\
             REP eo iao\n",
            "3\nme/C\now/C\nmiaow\n",
        );
        assert!(!lookup.check("meow"));
        let without = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCOMPOUNDMIN 2\n",
            "3\nme/C\now/C\nmiaow\n",
        );
        assert!(without.check("meow"));
    }

    #[test]
    fn compound_pattern_check() {
        let lookup = engine(
            "SET UTF-8\n\
             COMPOUNDFLAG C\n\
             COMPOUNDMIN 3\n\
             CHECKCOMPOUNDPATTERN 1\n\
             CHECKCOMPOUNDPATTERN o b\n",
            "2\nfoo/C\nbar/C\n",
        );
        assert!(!lookup.check("foobar"));
        assert!(lookup.check("barfoo"));
    }

    #[test]
    fn compounds_may_not_exist_with_a_space() {
        let lookup = engine(
            "SET UTF-8\nCOMPOUNDFLAG C\nCOMPOUNDMIN 3\n",
            "3\nice/C\ncream/C\nice cream\n",
        );
        assert!(!lookup.check("icecream"));
    }

    #[test]
    fn break_patterns_split_input() {
        let lookup = engine("SET UTF-8\n", "2\nfoo\nbar\n");
        assert!(lookup.check("foo-bar"));
        assert!(lookup.check("foo-bar-foo"));
        assert!(lookup.check("-foo"));
        assert!(lookup.check("bar-"));
        assert!(!lookup.check("foo-baz"));
        let no_break = CheckParams {
            ckp_allow_break: false,
            ..CheckParams::default()
        };
        assert!(!lookup.check_with("foo-bar", &no_break));
    }

    #[test]
    fn break_can_be_disabled_or_replaced() {
        let disabled = engine("SET UTF-8\nBREAK 0\n", "2\nfoo\nbar\n");
        assert!(!disabled.check("foo-bar"));
        let slashes = engine(
            "SET UTF-8\nBREAK 1\nBREAK //\n",
            "2\nfoo\nbar\n",
        );
        assert!(slashes.check("foo//bar"));
        assert!(!slashes.check("foo-bar"));
    }

    #[test]
    fn input_conversion_applies_before_lookup() {
        let lookup = engine(
            "SET UTF-8\nICONV 1\nICONV ’ '\n",
            "1\ndon't\n",
        );
        assert!(lookup.check("don’t"));
        assert!(lookup.check("don't"));
    }

    #[test]
    fn ignored_characters_are_erased() {
        let lookup = engine("SET UTF-8\nIGNORE x\n", "1\nfxoo\n");
        assert!(lookup.check("foo"));
        assert!(lookup.check("fxoo"));
        assert!(lookup.check("fooxx"));
    }

    #[test]
    fn nosuggest_gate() {
        let lookup = engine("SET UTF-8\nNOSUGGEST N\n", "2\ndamn/N\nhello\n");
        assert!(lookup.check("damn"));
        let gated = CheckParams {
            ckp_allow_nosuggest: false,
            ..CheckParams::default()
        };
        assert!(!lookup.check_with("damn", &gated));
        assert!(lookup.check_with("hello", &gated));
    }

    #[test]
    fn homonyms_are_tried_in_order() {
        // the first homonym forbids, the second allows the suffix
        let lookup = engine(
            "SET UTF-8\n\
             ONLYINCOMPOUND O\n\
             SFX S Y 1\n\
             SFX S 0 s .\n",
            "2\nwalk/O\nwalk/S\n",
        );
        assert!(lookup.check("walk"));
        assert!(lookup.check("walks"));
    }
}

