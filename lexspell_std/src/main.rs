// The lexspell executable: load a dictionary, check words.
//
//   lexspell <dictionary> [words...]
//
// <dictionary> is a base path ("./dicts/en_US"), a zip archive, or an
// installed dictionary name ("en_US"). With no words on the command line,
// standard input is read and misspelled tokens are printed one per line.
use std::io::{self, BufRead};
use std::process::ExitCode;

use lexspell_std::{Dictionary, DictError};
use tracing_subscriber::EnvFilter;

fn load(target: &str) -> Result<Dictionary, DictError> {
    if target.ends_with(".zip") || target.ends_with(".xpi") || target.ends_with(".odt") {
        return Dictionary::from_zip(target);
    }
    match Dictionary::from_files(target) {
        Ok(dictionary) => Ok(dictionary),
        Err(DictError::Io { .. }) => Dictionary::from_system(target),
        Err(other) => Err(other),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let target = match args.first() {
        Some(target) => target,
        None => {
            eprintln!("usage: lexspell <dictionary> [words...]");
            return ExitCode::from(2);
        }
    };
    let dictionary = match load(target) {
        Ok(dictionary) => dictionary,
        Err(error) => {
            eprintln!("lexspell: {}", error);
            return ExitCode::from(2);
        }
    };
    for note in dictionary.notes() {
        eprintln!("lexspell: line {}: {}", note.psn_line, note.psn_text);
    }
    let mut all_good = true;
    if args.len() > 1 {
        for word in &args[1..] {
            let good = dictionary.check(word);
            println!("{} {}", if good { "*" } else { "&" }, word);
            all_good = all_good && good;
        }
    } else {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            for token in line.split_whitespace() {
                if !dictionary.check(token) {
                    println!("{}", token);
                    all_good = false;
                }
            }
        }
    }
    if all_good {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
