//! CLIP byte-level BPE tokenizer.
//!
//! Loads `vocab.json` (token string → id) and `merges.txt` (ordered merge
//! rules) and turns text into fixed-length token-id sequences for the CLIP
//! text tower.
//!
//! ```text
//! text → lowercase/trim → pre-tokens → byte remap → BPE merge → ids
//!      → [SOT, ids..., EOT, 0, 0, ...] (77 entries)
//! ```
//!
//! Two lossy behaviors of the reference tokenizer are kept: merged symbols
//! missing from the vocabulary are dropped, and sequences longer than the
//! context are cut. Both are counted in [`TokenizerStats`].

pub mod bpe;
pub mod byte_encoder;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TokenizerError;

pub use bpe::MergeRanks;
use byte_encoder::encode_bytes;

/// Fixed sequence length of the CLIP text encoder.
pub const CONTEXT_LENGTH: usize = 77;

/// Start-of-text marker.
pub const START_OF_TEXT: &str = "<|startoftext|>";

/// End-of-text marker.
pub const END_OF_TEXT: &str = "<|endoftext|>";

/// One-to-one lowercasing: each char maps to the first char of its
/// lowercase form, with no context rules (final sigma stays `σ`).
fn fold_case(text: &str) -> String {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Prompt template applied to every category.
pub fn category_prompt(category: &str) -> String {
    format!("a photo of {category}")
}

/// Pre-tokenization pattern, alternatives tried in order at each position.
///
/// Whitespace is the ASCII set `[\t\n\f\r ]`; other unicode spaces fall into
/// the symbol run.
static PRE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<\|startoftext\|>|<\|endoftext\|>|'s|'t|'re|'ve|'m|'ll|'d|\p{L}+|\p{N}|[^\t\n\x0C\r \p{L}\p{N}]+",
    )
    .expect("pre-token pattern is valid")
});

/// A fixed-length, zero-padded token-id sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    ids: [i64; CONTEXT_LENGTH],
}

impl TokenSequence {
    /// Token ids, padding included.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// 1 where the id is non-zero, 0 for padding.
    pub fn attention_mask(&self) -> [i64; CONTEXT_LENGTH] {
        self.ids.map(|id| i64::from(id != 0))
    }

    /// Number of non-padding entries.
    pub fn real_len(&self) -> usize {
        self.ids.iter().filter(|&&id| id != 0).count()
    }
}

/// Snapshot of the lossy-encoding counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    /// Encodes whose token list did not fit the context length.
    pub truncated_sequences: u64,
    /// Merged symbols dropped because the vocabulary lacks them.
    pub dropped_symbols: u64,
}

/// CLIP BPE tokenizer. Read-only after load and safe to share across threads.
pub struct ClipTokenizer {
    encoder: HashMap<String, i64>,
    decoder: Vec<String>,
    merges: MergeRanks,
    start_id: i64,
    end_id: i64,
    truncated: AtomicU64,
    dropped: AtomicU64,
}

impl ClipTokenizer {
    /// Load the tokenizer from `vocab.json` and `merges.txt`.
    pub fn load(vocab_path: &Path, merges_path: &Path) -> Result<Self, TokenizerError> {
        let vocab_json =
            std::fs::read_to_string(vocab_path).map_err(|e| TokenizerError::Vocabulary {
                path: vocab_path.to_path_buf(),
                message: e.to_string(),
            })?;
        let encoder: HashMap<String, i64> =
            serde_json::from_str(&vocab_json).map_err(|e| TokenizerError::Vocabulary {
                path: vocab_path.to_path_buf(),
                message: format!("invalid JSON: {e}"),
            })?;

        let merges_text =
            std::fs::read_to_string(merges_path).map_err(|e| TokenizerError::Merges {
                path: merges_path.to_path_buf(),
                message: e.to_string(),
            })?;
        let merges = MergeRanks::parse(&merges_text);

        let tokenizer = Self::from_parts(encoder, merges, vocab_path)?;
        tracing::debug!(
            "Loaded CLIP tokenizer ({} tokens, {} merges)",
            tokenizer.vocab_size(),
            tokenizer.merges.len()
        );
        Ok(tokenizer)
    }

    /// Build a tokenizer from an in-memory vocabulary and merge table.
    ///
    /// The vocabulary must assign every id in `[0, len)` to exactly one
    /// string and must contain both text markers.
    pub fn from_vocab(
        encoder: HashMap<String, i64>,
        merges: MergeRanks,
    ) -> Result<Self, TokenizerError> {
        Self::from_parts(encoder, merges, Path::new("<memory>"))
    }

    fn from_parts(
        encoder: HashMap<String, i64>,
        merges: MergeRanks,
        origin: &Path,
    ) -> Result<Self, TokenizerError> {
        let invalid = |message: String| TokenizerError::Vocabulary {
            path: PathBuf::from(origin),
            message,
        };

        let mut decoder: Vec<Option<String>> = vec![None; encoder.len()];
        for (token, &id) in &encoder {
            let slot = usize::try_from(id)
                .ok()
                .and_then(|i| decoder.get_mut(i))
                .ok_or_else(|| {
                    invalid(format!(
                        "id {id} for {token:?} outside [0, {})",
                        encoder.len()
                    ))
                })?;
            if let Some(existing) = slot.replace(token.clone()) {
                return Err(invalid(format!(
                    "id {id} assigned to both {existing:?} and {token:?}"
                )));
            }
        }
        // Ids are unique and in range, so every slot is filled.
        let decoder: Vec<String> = decoder.into_iter().flatten().collect();

        let start_id = *encoder
            .get(START_OF_TEXT)
            .ok_or_else(|| invalid(format!("missing {START_OF_TEXT}")))?;
        let end_id = *encoder
            .get(END_OF_TEXT)
            .ok_or_else(|| invalid(format!("missing {END_OF_TEXT}")))?;

        Ok(Self {
            encoder,
            decoder,
            merges,
            start_id,
            end_id,
            truncated: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Number of vocabulary entries.
    pub fn vocab_size(&self) -> usize {
        self.decoder.len()
    }

    /// Id of the start-of-text marker.
    pub fn start_id(&self) -> i64 {
        self.start_id
    }

    /// Id of the end-of-text marker.
    pub fn end_id(&self) -> i64 {
        self.end_id
    }

    /// Vocabulary id of a token string.
    pub fn token_to_id(&self, token: &str) -> Option<i64> {
        self.encoder.get(token).copied()
    }

    /// Token string for a vocabulary id.
    pub fn id_to_token(&self, id: i64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.decoder.get(i))
            .map(String::as_str)
    }

    /// Current lossy-encoding counters.
    pub fn stats(&self) -> TokenizerStats {
        TokenizerStats {
            truncated_sequences: self.truncated.load(Ordering::Relaxed),
            dropped_symbols: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Encode text into a start/end-wrapped, zero-padded sequence.
    ///
    /// Never fails: unknown symbols are skipped and overlong input is cut
    /// to the context length, possibly losing the end-of-text marker.
    pub fn encode(&self, text: &str) -> TokenSequence {
        let text = fold_case(text.trim());

        let mut tokens = vec![self.start_id];
        for piece in PRE_TOKEN.find_iter(&text) {
            for symbol in self.merges.merge(&encode_bytes(piece.as_str())) {
                match self.encoder.get(&symbol) {
                    Some(&id) => tokens.push(id),
                    None => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("Dropping out-of-vocabulary symbol {symbol:?}");
                    }
                }
            }
        }
        tokens.push(self.end_id);

        if tokens.len() > CONTEXT_LENGTH {
            self.truncated.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "Truncating {} tokens to context length {}",
                tokens.len(),
                CONTEXT_LENGTH
            );
        }

        let mut ids = [0i64; CONTEXT_LENGTH];
        for (slot, id) in ids.iter_mut().zip(tokens) {
            *slot = id;
        }
        TokenSequence { ids }
    }

    /// Encode each category with the photo prompt template and concatenate
    /// the sequences in input order (row-major `[n, CONTEXT_LENGTH]`).
    pub fn encode_categories<S: AsRef<str>>(&self, categories: &[S]) -> Vec<i64> {
        let mut flat = Vec::with_capacity(categories.len() * CONTEXT_LENGTH);
        for category in categories {
            let prompt = category_prompt(category.as_ref());
            flat.extend_from_slice(self.encode(&prompt).ids());
        }
        flat
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small vocabulary in CLIP's layout: byte symbols, their `</w>`
    /// forms, a handful of merged words, then the two markers.
    pub(crate) fn test_tokenizer() -> ClipTokenizer {
        let words = [
            "a</w>", "ph", "pho", "phot", "photo</w>", "of</w>", "ca", "cat</w>", "oc", "oce",
            "ocea", "ocean</w>", "'s</w>", "do", "dog</w>",
        ];
        let merges = [
            "#version: 0.2",
            "p h",
            "ph o",
            "pho t",
            "phot o</w>",
            "o f</w>",
            "c a",
            "ca t</w>",
            "o c",
            "oc e",
            "oce a",
            "ocea n</w>",
            "' s</w>",
            "d o",
            "do g</w>",
            "x y</w>",
        ];

        let mut encoder = HashMap::new();
        for c in byte_encoder::BYTE_ENCODER {
            let next = encoder.len() as i64;
            encoder.insert(c.to_string(), next);
        }
        for c in byte_encoder::BYTE_ENCODER {
            let next = encoder.len() as i64;
            encoder.insert(format!("{c}</w>"), next);
        }
        for word in words {
            let next = encoder.len() as i64;
            encoder.entry(word.to_string()).or_insert(next);
        }
        for marker in [START_OF_TEXT, END_OF_TEXT] {
            let next = encoder.len() as i64;
            encoder.insert(marker.to_string(), next);
        }

        ClipTokenizer::from_vocab(encoder, MergeRanks::parse(&merges.join("\n"))).unwrap()
    }

    fn id(tok: &ClipTokenizer, token: &str) -> i64 {
        tok.token_to_id(token).unwrap()
    }

    #[test]
    fn test_encode_always_context_length() {
        let tok = test_tokenizer();
        let long = "word ".repeat(200);
        for text in ["", "cat", "a photo of a cat", long.as_str()] {
            assert_eq!(tok.encode(text).ids().len(), CONTEXT_LENGTH);
        }
    }

    #[test]
    fn test_encode_empty() {
        let tok = test_tokenizer();
        let seq = tok.encode("");
        assert_eq!(seq.ids()[0], tok.start_id());
        assert_eq!(seq.ids()[1], tok.end_id());
        assert!(seq.ids()[2..].iter().all(|&id| id == 0));
    }

    #[test]
    fn test_encode_whitespace_only_is_empty() {
        let tok = test_tokenizer();
        assert_eq!(tok.encode("  \t\n "), tok.encode(""));
    }

    #[test]
    fn test_encode_prompt() {
        let tok = test_tokenizer();
        let seq = tok.encode("a photo of a cat");
        let expected = [
            tok.start_id(),
            id(&tok, "a</w>"),
            id(&tok, "photo</w>"),
            id(&tok, "of</w>"),
            id(&tok, "a</w>"),
            id(&tok, "cat</w>"),
            tok.end_id(),
        ];
        assert_eq!(&seq.ids()[..7], &expected);
        assert_eq!(seq.real_len(), 7);
    }

    #[test]
    fn test_encode_lowercases_and_trims() {
        let tok = test_tokenizer();
        assert_eq!(tok.encode("  A Photo Of A CAT \n"), tok.encode("a photo of a cat"));
    }

    #[test]
    fn test_encode_contraction_is_its_own_pre_token() {
        let tok = test_tokenizer();
        let seq = tok.encode("dog's");
        assert_eq!(seq.ids()[1], id(&tok, "dog</w>"));
        assert_eq!(seq.ids()[2], id(&tok, "'s</w>"));
        assert_eq!(seq.ids()[3], tok.end_id());
    }

    #[test]
    fn test_encode_digits_are_single_pre_tokens() {
        let tok = test_tokenizer();
        let seq = tok.encode("42");
        assert_eq!(seq.ids()[1], id(&tok, "4</w>"));
        assert_eq!(seq.ids()[2], id(&tok, "2</w>"));
    }

    #[test]
    fn test_encode_symbol_run() {
        let tok = test_tokenizer();
        // "!?" has no merge, so it stays two symbols of one pre-token.
        let seq = tok.encode("cat!?");
        assert_eq!(seq.ids()[1], id(&tok, "cat</w>"));
        assert_eq!(seq.ids()[2], id(&tok, "!"));
        assert_eq!(seq.ids()[3], id(&tok, "?</w>"));
    }

    #[test]
    fn test_encode_markers_are_single_tokens() {
        let tok = test_tokenizer();
        let seq = tok.encode("<|endoftext|> cat");
        // One pre-token, spelled out in byte symbols since no merge covers it.
        assert_eq!(seq.ids()[1], id(&tok, "<"));
        let n = seq.real_len();
        assert_eq!(seq.ids()[n - 3], id(&tok, "></w>"));
        assert_eq!(seq.ids()[n - 2], id(&tok, "cat</w>"));
        assert_eq!(seq.ids()[n - 1], tok.end_id());
    }

    #[test]
    fn test_encode_non_ascii_uses_byte_symbols() {
        let tok = test_tokenizer();
        let seq = tok.encode("é");
        assert_eq!(seq.ids()[1], id(&tok, "\u{C3}"));
        assert_eq!(seq.ids()[2], id(&tok, "\u{A9}</w>"));
        assert_eq!(seq.ids()[3], tok.end_id());
    }

    #[test]
    fn test_unknown_symbols_are_dropped_and_counted() {
        let tok = test_tokenizer();
        // "x y</w>" is a merge rule but "xy</w>" is not in the vocabulary.
        let seq = tok.encode("a xy cat");
        assert_eq!(tok.stats().dropped_symbols, 1);
        assert_eq!(seq.ids()[1], id(&tok, "a</w>"));
        assert_eq!(seq.ids()[2], id(&tok, "cat</w>"));
        assert_eq!(seq.ids()[3], tok.end_id());
    }

    #[test]
    fn test_truncation_keeps_length_and_counts() {
        let tok = test_tokenizer();
        let long = "cat ".repeat(100);
        let seq = tok.encode(&long);
        assert_eq!(seq.ids().len(), CONTEXT_LENGTH);
        assert_eq!(seq.ids()[0], tok.start_id());
        // Cut before reaching the end marker.
        assert_eq!(seq.ids()[CONTEXT_LENGTH - 1], id(&tok, "cat</w>"));
        assert!(!seq.ids().contains(&tok.end_id()));
        assert_eq!(tok.stats().truncated_sequences, 1);
    }

    #[test]
    fn test_exactly_full_sequence_is_not_truncated() {
        let tok = test_tokenizer();
        let text = "cat ".repeat(CONTEXT_LENGTH - 2);
        let seq = tok.encode(&text);
        assert_eq!(seq.ids()[CONTEXT_LENGTH - 1], tok.end_id());
        assert_eq!(tok.stats().truncated_sequences, 0);
    }

    #[test]
    fn test_attention_mask_follows_ids() {
        let tok = test_tokenizer();
        let seq = tok.encode("a cat");
        let mask = seq.attention_mask();
        assert_eq!(&mask[..4], &[1, 1, 1, 1]);
        assert!(mask[4..].iter().all(|&m| m == 0));
    }

    #[test]
    fn test_encode_categories_concatenates_in_order() {
        let tok = test_tokenizer();
        let flat = tok.encode_categories(&["cat", "ocean"]);
        assert_eq!(flat.len(), 2 * CONTEXT_LENGTH);
        assert_eq!(&flat[..CONTEXT_LENGTH], tok.encode("a photo of cat").ids());
        assert_eq!(&flat[CONTEXT_LENGTH..], tok.encode("a photo of ocean").ids());
        assert_eq!(flat[CONTEXT_LENGTH + 4], id(&tok, "ocean</w>"));
    }

    #[test]
    fn test_id_to_token_roundtrip() {
        let tok = test_tokenizer();
        let cat = id(&tok, "cat</w>");
        assert_eq!(tok.id_to_token(cat), Some("cat</w>"));
        assert_eq!(tok.id_to_token(-1), None);
        assert_eq!(tok.id_to_token(tok.vocab_size() as i64), None);
    }

    #[test]
    fn test_vocab_missing_marker_is_rejected() {
        let mut encoder = HashMap::new();
        encoder.insert(START_OF_TEXT.to_string(), 0);
        let err = ClipTokenizer::from_vocab(encoder, MergeRanks::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains(END_OF_TEXT));
    }

    #[test]
    fn test_vocab_with_gap_is_rejected() {
        let mut encoder = HashMap::new();
        encoder.insert(START_OF_TEXT.to_string(), 0);
        encoder.insert(END_OF_TEXT.to_string(), 5);
        assert!(ClipTokenizer::from_vocab(encoder, MergeRanks::default()).is_err());
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.json");
        let merges = dir.path().join("merges.txt");
        std::fs::write(
            &vocab,
            r#"{"!": 0, "a</w>": 1, "<|startoftext|>": 2, "<|endoftext|>": 3}"#,
        )
        .unwrap();
        std::fs::write(&merges, "#version: 0.2\n").unwrap();

        let tok = ClipTokenizer::load(&vocab, &merges).unwrap();
        assert_eq!(&tok.encode("a").ids()[..4], &[2, 1, 3, 0]);
    }

    #[test]
    fn test_load_missing_merges_is_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.json");
        std::fs::write(&vocab, r#"{"<|startoftext|>": 0, "<|endoftext|>": 1}"#).unwrap();

        let err = ClipTokenizer::load(&vocab, &dir.path().join("merges.txt"))
            .err()
            .unwrap();
        assert!(matches!(err, TokenizerError::Merges { .. }));
    }

    #[test]
    fn test_load_bad_json_is_vocabulary_error() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.json");
        std::fs::write(&vocab, "not json").unwrap();

        let err = ClipTokenizer::load(&vocab, &dir.path().join("merges.txt"))
            .err()
            .unwrap();
        assert!(matches!(err, TokenizerError::Vocabulary { .. }));
    }

    #[test]
    fn test_uppercase_folds_char_by_char() {
        let tok = test_tokenizer();
        assert_eq!(tok.encode("ΟΔΟΣ"), tok.encode("οδοσ"));
        assert_ne!(tok.encode("ΟΔΟΣ"), tok.encode("οδος"));
        assert_eq!(tok.encode("İ"), tok.encode("i"));
        assert_eq!(fold_case("İstanbul"), "istanbul");
    }

    #[test]
    fn test_byte_vocab_layouts() {
        let markers = [START_OF_TEXT.to_string(), END_OF_TEXT.to_string()];

        // Sequential ids: every slot in [0, len) filled once.
        let mut sequential = HashMap::new();
        let symbols = byte_encoder::BYTE_ENCODER
            .iter()
            .map(|c| c.to_string())
            .chain(byte_encoder::BYTE_ENCODER.iter().map(|c| format!("{c}</w>")))
            .chain(markers.clone());
        for symbol in symbols {
            let next = sequential.len() as i64;
            sequential.insert(symbol, next);
        }
        let tok = ClipTokenizer::from_vocab(sequential, MergeRanks::default()).unwrap();
        assert_eq!(tok.vocab_size(), 514);

        // Interleaved `c` at len and `c</w>` at len + 256 collides past byte 128.
        let mut interleaved = HashMap::new();
        for c in byte_encoder::BYTE_ENCODER {
            let next = interleaved.len() as i64;
            interleaved.insert(c.to_string(), next);
            interleaved.insert(format!("{c}</w>"), next + 256);
        }
        for marker in markers {
            let next = interleaved.len() as i64;
            interleaved.insert(marker, next);
        }
        assert!(ClipTokenizer::from_vocab(interleaved, MergeRanks::default()).is_err());
    }
}
