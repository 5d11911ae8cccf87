use include_dir::{include_dir, Dir};
use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

static DATA_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/data");

const SENTENCES_FILE: &str = "sentences.json";

#[derive(Deserialize, Clone, Debug)]
struct SentenceList {
    #[allow(dead_code)]
    name: String,
    sentences: Vec<String>,
}

/// Where target sentences come from
pub trait SentenceSource {
    fn next_sentence(&mut self) -> String;
}

/// Uniform random choice over a list. An empty list yields empty targets.
#[derive(Debug, Clone)]
pub struct RandomSentences {
    sentences: Vec<String>,
    rng: StdRng,
}

impl RandomSentences {
    /// The phrase list compiled into the binary
    pub fn embedded() -> Self {
        Self::from_list(embedded_sentences())
    }

    pub fn from_list(sentences: Vec<String>) -> Self {
        Self {
            sentences,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }
}

impl Default for RandomSentences {
    fn default() -> Self {
        Self::embedded()
    }
}

impl SentenceSource for RandomSentences {
    fn next_sentence(&mut self) -> String {
        self.sentences
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }
}

/// Always the same prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSentences(pub String);

impl SentenceSource for FixedSentences {
    fn next_sentence(&mut self) -> String {
        self.0.clone()
    }
}

fn embedded_sentences() -> Vec<String> {
    let Some(contents) = DATA_DIR
        .get_file(SENTENCES_FILE)
        .and_then(|file| file.contents_utf8())
    else {
        warn!("embedded {SENTENCES_FILE} missing");
        return Vec::new();
    };

    match serde_json::from_str::<SentenceList>(contents) {
        Ok(list) => list.sentences,
        Err(err) => {
            warn!("embedded {SENTENCES_FILE} unreadable: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_list_loads() {
        let source = RandomSentences::embedded();
        assert!(!source.sentences().is_empty());
        assert!(source.sentences().iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn random_choice_comes_from_the_list() {
        let mut source = RandomSentences::from_list(vec!["one".into(), "two".into()]).with_seed(7);
        for _ in 0..20 {
            let s = source.next_sentence();
            assert!(s == "one" || s == "two");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let list: Vec<String> = RandomSentences::embedded().sentences().to_vec();
        let mut a = RandomSentences::from_list(list.clone()).with_seed(42);
        let mut b = RandomSentences::from_list(list).with_seed(42);
        for _ in 0..5 {
            assert_eq!(a.next_sentence(), b.next_sentence());
        }
    }

    #[test]
    fn empty_list_gives_empty_target() {
        let mut source = RandomSentences::from_list(Vec::new());
        assert_eq!(source.next_sentence(), "");
    }

    #[test]
    fn fixed_prompt_repeats() {
        let mut source = FixedSentences("hi there".into());
        assert_eq!(source.next_sentence(), "hi there");
        assert_eq!(source.next_sentence(), "hi there");
    }
}
