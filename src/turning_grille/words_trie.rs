use super::CrackerError;
use super::NOT_CAPITAL_ENGLISH_LETTERS_RE;

use std::fs::read_to_string;
use std::path::Path;
use std::str::Chars;

const NUMBER_OF_LETTERS: usize = ('Z' as usize) - ('A' as usize) + 1;

struct TrieNode {
    children: [Option<Box<Self>>; NUMBER_OF_LETTERS],
    word_end: bool,
}

impl TrieNode {
    #[inline]
    fn new() -> Self {
        Self {
            children: [const { None }; NUMBER_OF_LETTERS],
            word_end: false,
        }
    }

    #[inline]
    fn get_or_create_child(&mut self, c: char) -> &mut Self {
        let i: usize = (c as usize) - ('A' as usize);
        self.children[i].get_or_insert_with(|| Box::new(TrieNode::new()))
    }

    #[inline]
    fn get_child(&self, c: char) -> Option<&Self> {
        let i: usize = (c as usize) - ('A' as usize);
        self.children[i].as_deref()
    }
}

/// Multi-pattern scorer over a fixed dictionary. Read-only after
/// construction, safe to call from any number of threads.
pub struct WordsTrie {
    root: TrieNode,
}

impl WordsTrie {
    pub fn load(words_file_path: impl AsRef<Path>) -> Result<Self, CrackerError> {
        let words_file_path = words_file_path.as_ref();
        let contents: String =
            read_to_string(words_file_path).map_err(|source| CrackerError::Io {
                path: words_file_path.display().to_string(),
                source,
            })?;
        Ok(Self::from_words(contents.lines()))
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ret: Self = Self {
            root: TrieNode::new(),
        };

        for word in words {
            let word: String = word.as_ref().to_uppercase();
            let word = NOT_CAPITAL_ENGLISH_LETTERS_RE.replace_all(&word, "");

            // Words shorter than 3 letters are too noisy to score with.
            if word.chars().count() >= 3 {
                Self::add_word(&mut ret.root, word.chars());
            }
        }

        ret
    }

    fn add_word(parent: &mut TrieNode, mut chars: Chars) {
        match chars.next() {
            None => {
                parent.word_end = true;
            }
            Some(c) => {
                Self::add_word(parent.get_or_create_child(c), chars);
            }
        }
    }

    /// Counts every occurrence of every dictionary word in `text`, overlaps
    /// included. One trie iterator is kept alive per candidate match start.
    #[inline]
    pub fn count_words(&self, text: &str) -> usize {
        let mut iterators: Vec<Option<&TrieNode>> = vec![None; text.len() + 1];
        iterators[0] = Some(&self.root);

        let mut words: usize = 0;
        for c in text.chars() {
            let mut i: usize = 0;
            let mut j: usize = 0;

            while let Some(current_node) = iterators[i] {
                let next_node: Option<&TrieNode> = current_node.get_child(c);
                iterators[i] = None;
                i += 1;

                match next_node {
                    None => continue,
                    Some(next_node) => {
                        if next_node.word_end {
                            words += 1;
                        }
                    }
                }
                iterators[j] = next_node;
                j += 1;
            }
            iterators[j] = Some(&self.root);
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_overlapping_and_embedded_words() {
        let trie = WordsTrie::from_words(["the", "there", "here", "cat"]);

        assert_eq!(trie.count_words("THERE"), 3);
        assert_eq!(trie.count_words("CATHERE"), 3);
        assert_eq!(trie.count_words("XYZ"), 0);
        assert_eq!(trie.count_words(""), 0);
    }

    #[test]
    fn normalizes_and_skips_short_words() {
        let trie = WordsTrie::from_words(["The", "a", "it", "do-or"]);

        assert_eq!(trie.count_words("THE"), 1);
        // One- and two-letter words are not indexed.
        assert_eq!(trie.count_words("AIT"), 0);
        // Punctuation is stripped before indexing.
        assert_eq!(trie.count_words("DOOR"), 1);
    }
}
