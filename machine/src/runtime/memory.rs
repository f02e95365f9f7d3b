use thiserror::Error;

use crate::constants::{Address, Word};

/// Represents errors related to memory accesses
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was outside the memory
    #[error("address {0} is out of bounds")]
    OutOfBounds(Address),

    /// A negative word was used as an address
    #[error("negative word {0} used as an address")]
    NegativeAddress(Word),
}

/// Convert a word into a memory address.
///
/// # Errors
///
/// It fails if the word is negative.
pub(crate) fn word_to_address(word: Word) -> Result<Address, MemoryError> {
    Address::try_from(word).map_err(|_| MemoryError::NegativeAddress(word))
}

/// Holds the memory cells of the machine.
///
/// Addresses double as instruction and data addresses; there is no code/data
/// segregation. Every access is bounds-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    inner: Vec<Word>,
}

impl From<Vec<Word>> for Memory {
    fn from(words: Vec<Word>) -> Self {
        Self { inner: words }
    }
}

impl Memory {
    /// Get the word at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get(&self, address: Address) -> Result<Word, MemoryError> {
        self.inner
            .get(address)
            .copied()
            .ok_or(MemoryError::OutOfBounds(address))
    }

    /// Get a mutable reference to the word at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get_mut(&mut self, address: Address) -> Result<&mut Word, MemoryError> {
        self.inner
            .get_mut(address)
            .ok_or(MemoryError::OutOfBounds(address))
    }

    /// The full memory image, used for answer extraction and dumps
    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.inner
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn get_test() {
        let memory = Memory::from(vec![1, 2, 3]);
        assert_eq!(memory.get(0), Ok(1));
        assert_eq!(memory.get(2), Ok(3));
        assert_eq!(memory.get(3), Err(MemoryError::OutOfBounds(3)));
    }

    #[test]
    fn get_mut_test() {
        let mut memory = Memory::from(vec![1, 2, 3]);
        *memory.get_mut(1).unwrap() = 42;
        assert_eq!(memory.words(), &[1, 42, 3]);
        assert_eq!(
            memory.get_mut(99).unwrap_err(),
            MemoryError::OutOfBounds(99)
        );
    }

    #[test]
    fn word_to_address_test() {
        assert_eq!(word_to_address(7), Ok(7));
        assert_eq!(word_to_address(-1), Err(MemoryError::NegativeAddress(-1)));
    }
}
