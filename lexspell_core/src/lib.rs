//! Hunspell-compatible spell checking, the lookup side: given a parsed
//! affix description and word list, decide whether a string is a correctly
//! spelled word. File access lives in `lexspell_std`; this crate only
//! consumes lines and answers queries.

pub mod aff;
pub mod aff_reader;
pub mod captype;
pub mod condition;
pub mod dic;
pub mod dic_reader;
pub mod lookup;
pub mod trie;

pub use aff::Aff;
pub use aff_reader::{parse_aff, ParseNote};
pub use dic::Dic;
pub use dic_reader::parse_dic;
pub use lookup::{CheckParams, Lookup};
