use crate::error::GeneratorError;
use crate::Generator;
use rand::Rng;
use snip_core::shortcode::MAX_LENGTH;
use snip_core::ShortCode;

/// Upper and lower case letters followed by digits.
pub const BASE62_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const DEFAULT_LENGTH: usize = 6;

/// Draws every symbol of a code uniformly at random from an alphabet.
///
/// With the default 62 symbols and length 6 there are about 5.68e10 codes.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
    alphabet: Vec<u8>,
}

impl RandomGenerator {
    /// Creates a base62 generator producing codes of `length` symbols.
    pub fn new(length: usize) -> Result<Self, GeneratorError> {
        Self::with_alphabet(length, BASE62_ALPHABET)
    }

    /// Creates a generator drawing from a custom alphabet.
    ///
    /// The alphabet must be non-empty, ASCII alphanumeric and free of
    /// duplicates, otherwise some codes would be more likely than others or
    /// would not be valid short codes.
    pub fn with_alphabet(
        length: usize,
        alphabet: impl AsRef<[u8]>,
    ) -> Result<Self, GeneratorError> {
        if length == 0 || length > MAX_LENGTH {
            return Err(GeneratorError::InvalidLength {
                length,
                max: MAX_LENGTH,
            });
        }

        let alphabet = alphabet.as_ref().to_vec();
        if alphabet.is_empty() {
            return Err(GeneratorError::EmptyAlphabet);
        }
        for (i, &symbol) in alphabet.iter().enumerate() {
            if !symbol.is_ascii_alphanumeric() {
                return Err(GeneratorError::InvalidSymbol(symbol as char));
            }
            if alphabet[..i].contains(&symbol) {
                return Err(GeneratorError::DuplicateSymbol(symbol as char));
            }
        }

        Ok(Self { length, alphabet })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of distinct codes this generator can produce.
    pub fn code_space(&self) -> u128 {
        (self.alphabet.len() as u128).saturating_pow(self.length as u32)
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            alphabet: BASE62_ALPHABET.to_vec(),
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..self.length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
