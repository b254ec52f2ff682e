/// Line-based reader for the word list. The first line carries the entry
/// count; every further line is `stem`, optionally `/FLAGS`, optionally
/// whitespace-separated morphology fields. Stems keep their file order so
/// homonyms stay ordered.
use crate::aff::Aff;
use crate::aff_reader::ParseNote;
use crate::dic::{Dic, Word};

pub struct DicReader {
    dcr_dic: Dic,
    dcr_notes: Vec<ParseNote>,
    dcr_line_no: u32,
    dcr_count: Option<u32>,
}

impl DicReader {
    pub fn new() -> DicReader {
        DicReader {
            dcr_dic: Dic::new(),
            dcr_notes: vec![],
            dcr_line_no: 0,
            dcr_count: None,
        }
    }

    fn note(&mut self, text: &str) {
        self.dcr_notes.push(ParseNote {
            psn_line: self.dcr_line_no,
            psn_text: text.to_string(),
        });
    }

    pub fn read_line(&mut self, aff: &Aff, raw: &str) {
        self.dcr_line_no += 1;
        let mut line = raw.trim_end_matches(['\r', '\n']);
        if self.dcr_line_no == 1 {
            line = line.trim_start_matches('\u{feff}');
        }
        if line.trim().is_empty() {
            return;
        }
        if self.dcr_count.is_none() {
            match line.trim().parse::<u32>() {
                Ok(count) => {
                    self.dcr_count = Some(count);
                    return;
                }
                Err(_) => {
                    self.note("entry count missing, treating the line as a word");
                    self.dcr_count = Some(0);
                }
            }
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            return;
        }
        // trailing fields shaped like "po:noun" (or bare numbers) are
        // morphology; everything else, spaces included, belongs to the word
        let mut word_parts = vec![fields[0]];
        let mut morph: Vec<String> = vec![];
        for &field in &fields[1..] {
            if Self::is_morph_field(field) {
                morph.push(field.to_string());
            } else {
                word_parts.push(field);
            }
        }
        let flagged = word_parts.join(" ");
        let (stem_raw, flags_raw) = match Self::split_flags(&flagged) {
            Ok(split) => split,
            Err(()) => {
                self.note("slash at the start of a word");
                return;
            }
        };
        let mut stem = stem_raw.replace("\\/", "/");
        if !aff.aff_ignore.is_empty() {
            let ignore = &aff.aff_ignore;
            stem.retain(|c| !ignore.contains(c));
        }
        let flags = match flags_raw {
            Some(text) => aff.parse_flags(text).into_iter().collect(),
            None => Default::default(),
        };
        self.dcr_dic.push(Word {
            wrd_stem: stem,
            wrd_flags: flags,
            wrd_morph: morph,
        });
    }

    /// True for fields like "po:verb", "st:foot" or bare numbers.
    fn is_morph_field(field: &str) -> bool {
        if !field.is_empty() && field.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        let chars: Vec<char> = field.chars().collect();
        chars.len() >= 4
            && (chars[0].is_alphanumeric() || chars[0] == '_')
            && (chars[1].is_alphanumeric() || chars[1] == '_')
            && chars[2] == ':'
    }

    /// Splits at the first slash that is not escaped with a backslash.
    fn split_flags(flagged: &str) -> Result<(&str, Option<&str>), ()> {
        let mut prev: Option<char> = None;
        for (at, c) in flagged.char_indices() {
            if c == '/' && prev != Some('\\') {
                if at == 0 {
                    return Err(());
                }
                return Ok((&flagged[..at], Some(&flagged[at + 1..])));
            }
            prev = Some(c);
        }
        Ok((flagged, None))
    }

    pub fn finish(self) -> (Dic, Vec<ParseNote>) {
        (self.dcr_dic, self.dcr_notes)
    }
}

/// Parses a whole word list given as lines.
pub fn parse_dic<'a, I: IntoIterator<Item = &'a str>>(aff: &Aff, lines: I) -> (Dic, Vec<ParseNote>) {
    let mut reader = DicReader::new();
    for line in lines {
        reader.read_line(aff, line);
    }
    reader.finish()
}
