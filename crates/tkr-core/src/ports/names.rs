use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

/// Characters used in generated suffixes. Vowels and look-alike digits are left out.
pub const NAME_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Length of every generated suffix.
pub const SUFFIX_LEN: usize = 5;

/// Upper bound for object and container names.
pub const MAX_NAME_LEN: usize = 63;

/// Produces short suffixes that make generated names unique.
pub trait NameGenerator: Send + Sync {
    /// A fresh suffix of [`SUFFIX_LEN`] characters from [`NAME_ALPHABET`].
    fn suffix(&self) -> String;
}

/// Random suffixes from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNames;

impl NameGenerator for RandomNames {
    fn suffix(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..SUFFIX_LEN)
            .filter_map(|_| NAME_ALPHABET.choose(&mut rng).map(|b| char::from(*b)))
            .collect()
    }
}

/// Deterministic suffixes: the counter rendered in base 27 over [`NAME_ALPHABET`].
///
/// The first suffix is `bbbbb`, the next `bbbbc`, and so on.
#[derive(Debug, Default)]
pub struct SequenceNames {
    next: AtomicUsize,
}

impl SequenceNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(n: usize) -> Self {
        Self {
            next: AtomicUsize::new(n),
        }
    }

    /// The suffix produced for the `n`-th call.
    pub fn nth(n: usize) -> String {
        let base = NAME_ALPHABET.len();
        let mut digits = [NAME_ALPHABET[0]; SUFFIX_LEN];
        let mut rest = n;
        for slot in digits.iter_mut().rev() {
            *slot = NAME_ALPHABET[rest % base];
            rest /= base;
        }
        digits.iter().map(|b| char::from(*b)).collect()
    }
}

impl NameGenerator for SequenceNames {
    fn suffix(&self) -> String {
        Self::nth(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// `<base>-<suffix>`, with `base` cut so the result fits [`MAX_NAME_LEN`].
pub fn restrict_length_with_suffix(base: &str, names: &dyn NameGenerator) -> String {
    let max_base = MAX_NAME_LEN - SUFFIX_LEN - 1;
    let base = match base.char_indices().nth(max_base) {
        Some((idx, _)) => &base[..idx],
        None => base,
    };
    format!("{base}-{}", names.suffix())
}

/// `<prefix><name>`, cut to [`MAX_NAME_LEN`].
///
/// Characters are dropped from the middle of `name` so that a trailing
/// `-<suffix>` from [`restrict_length_with_suffix`] survives the cut.
pub fn restrict_length_with_prefix(prefix: &str, name: &str) -> String {
    let full = format!("{prefix}{name}");
    if full.chars().count() <= MAX_NAME_LEN {
        return full;
    }
    let chars: Vec<char> = name.chars().collect();
    let tail = (SUFFIX_LEN + 1).min(chars.len());
    let head = MAX_NAME_LEN.saturating_sub(prefix.chars().count() + tail);

    let mut out = String::from(prefix);
    out.extend(&chars[..head.min(chars.len() - tail)]);
    out.extend(&chars[chars.len() - tail..]);
    out
}
