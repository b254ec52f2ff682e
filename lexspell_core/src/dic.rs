/// The word list: stems with flag sets, plus the homonym indexes.
use hashbrown::HashMap;

use crate::aff::{Flag, FlagSet};

/// One dictionary entry. Entries sharing a stem are homonyms and keep
/// their file order.
pub struct Word {
    pub wrd_stem: String,
    pub wrd_flags: FlagSet,
    /// morphological fields, opaque to the engine
    #[allow(dead_code)]
    pub wrd_morph: Vec<String>,
}

pub struct Dic {
    pub dic_words: Vec<Word>,
    dic_index: HashMap<String, Vec<u32>>,
    dic_index_lower: HashMap<String, Vec<u32>>,
}

const NO_IDS: &[u32] = &[];

impl Dic {
    pub fn new() -> Dic {
        Dic {
            dic_words: vec![],
            dic_index: HashMap::new(),
            dic_index_lower: HashMap::new(),
        }
    }

    pub fn push(&mut self, word: Word) {
        let id = self.dic_words.len() as u32;
        self.dic_index
            .entry(word.wrd_stem.clone())
            .or_insert_with(Vec::new)
            .push(id);
        self.dic_index_lower
            .entry(word.wrd_stem.to_lowercase())
            .or_insert_with(Vec::new)
            .push(id);
        self.dic_words.push(word);
    }

    pub fn word(&self, id: u32) -> &Word {
        &self.dic_words[id as usize]
    }

    /// Ids of the homonyms of `stem`, in insertion order.
    pub fn homonyms(&self, stem: &str) -> &[u32] {
        match self.dic_index.get(stem) {
            Some(ids) => ids,
            None => NO_IDS,
        }
    }

    /// Ids of the homonyms of an already-lowered stem in the
    /// case-insensitive index.
    pub fn homonyms_ci(&self, stem_lowered: &str) -> &[u32] {
        match self.dic_index_lower.get(stem_lowered) {
            Some(ids) => ids,
            None => NO_IDS,
        }
    }

    /// True when some homonym of `stem` carries `flag`.
    pub fn has_flag(&self, stem: &str, flag: &Flag) -> bool {
        self.homonyms(stem)
            .iter()
            .any(|&id| self.dic_words[id as usize].wrd_flags.contains(flag))
    }

    /// True when `stem` is present and every one of its homonyms
    /// carries `flag`.
    pub fn has_flag_all(&self, stem: &str, flag: &Flag) -> bool {
        let ids = self.homonyms(stem);
        !ids.is_empty()
            && ids
                .iter()
                .all(|&id| self.dic_words[id as usize].wrd_flags.contains(flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(stem: &str, flags: &str) -> Word {
        Word {
            wrd_stem: stem.to_string(),
            wrd_flags: flags.chars().map(|c| c.to_string()).collect(),
            wrd_morph: vec![],
        }
    }

    #[test]
    fn homonyms_keep_insertion_order() {
        let mut dic = Dic::new();
        dic.push(word("works", "A"));
        dic.push(word("work", "B"));
        dic.push(word("works", "C"));
        let ids = dic.homonyms("works");
        assert_eq!(ids, &[0, 2]);
        assert!(dic.word(ids[0]).wrd_flags.contains("A"));
        assert!(dic.word(ids[1]).wrd_flags.contains("C"));
        assert_eq!(dic.homonyms("gone"), &[] as &[u32]);
    }

    #[test]
    fn lowercase_index() {
        let mut dic = Dic::new();
        dic.push(word("OpenOffice.org", "X"));
        assert_eq!(dic.homonyms("openoffice.org"), &[] as &[u32]);
        assert_eq!(dic.homonyms_ci("openoffice.org"), &[0]);
    }

    #[test]
    fn flag_queries() {
        let mut dic = Dic::new();
        dic.push(word("foo", "!"));
        dic.push(word("foo", "!S"));
        dic.push(word("bar", "S"));
        let forbidden = "!".to_string();
        assert!(dic.has_flag("foo", &forbidden));
        assert!(dic.has_flag_all("foo", &forbidden));
        assert!(!dic.has_flag_all("bar", &forbidden));
        assert!(!dic.has_flag_all("missing", &forbidden));
    }
}
