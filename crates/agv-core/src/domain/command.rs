//! Command addressing types: which vehicle, which state.
//!
//! A command on the wire is always "put target `NNN` into state `S`".  The two
//! halves are validated here once, so the codec and the scheduler can assume
//! they always fit the fixed-width frame.

use std::fmt;

use thiserror::Error;

/// Largest target id that fits the three-digit field of a frame.
pub const MAX_TARGET_ID: u16 = 999;

/// Errors raised when a command argument cannot be represented on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The target id needs more than three decimal digits.
    #[error("target id {0} does not fit in 3 digits (max {MAX_TARGET_ID})")]
    TargetIdOutOfRange(u32),

    /// The state is not a single ASCII character.
    #[error("state {0:?} is not a single ASCII character")]
    NonAsciiState(char),
}

/// Identifier of an addressed vehicle, always in `0..=999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u16);

impl TargetId {
    /// Validates `id` against the three-digit field width.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::TargetIdOutOfRange`] for ids above 999.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use agv_core::TargetId;
    ///
    /// assert_eq!(TargetId::new(700).unwrap().get(), 700);
    /// assert!(TargetId::new(1000).is_err());
    /// ```
    pub fn new(id: u32) -> Result<Self, CommandError> {
        if id > u32::from(MAX_TARGET_ID) {
            return Err(CommandError::TargetIdOutOfRange(id));
        }
        Ok(Self(id as u16))
    }

    /// Returns the numeric id.
    pub fn get(self) -> u16 {
        self.0
    }

    /// Returns the id zero-padded to the three ASCII digits used on the wire.
    pub fn to_digits(self) -> [u8; 3] {
        let id = self.0;
        [
            b'0' + (id / 100) as u8,
            b'0' + (id / 10 % 10) as u8,
            b'0' + (id % 10) as u8,
        ]
    }

    /// Parses the three-digit wire field back into an id.
    ///
    /// Returns `None` if any byte is not an ASCII digit.
    pub fn from_digits(digits: &[u8; 3]) -> Option<Self> {
        digits
            .iter()
            .try_fold(0u16, |acc, &b| {
                b.is_ascii_digit().then(|| acc * 10 + u16::from(b - b'0'))
            })
            .map(Self)
    }
}

impl TryFrom<u32> for TargetId {
    type Error = CommandError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// The one-character state requested for a vehicle.
///
/// The peer defines what each character means; the gateway only guarantees
/// that it occupies exactly one byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgvState(u8);

impl AgvState {
    /// Validates that `state` is a single ASCII character.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NonAsciiState`] for characters outside ASCII.
    pub fn new(state: char) -> Result<Self, CommandError> {
        if !state.is_ascii() {
            return Err(CommandError::NonAsciiState(state));
        }
        Ok(Self(state as u8))
    }

    /// Wraps a raw byte taken from an inbound frame.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the wire byte.
    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// Returns the state as a character.
    pub fn as_char(self) -> char {
        char::from(self.0)
    }
}

impl TryFrom<char> for AgvState {
    type Error = CommandError;

    fn try_from(state: char) -> Result<Self, Self::Error> {
        Self::new(state)
    }
}

impl fmt::Display for AgvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Key of a scheduled command: one entry per `(target, state)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandKey {
    pub target: TargetId,
    pub state: AgvState,
}

impl CommandKey {
    pub fn new(target: TargetId, state: AgvState) -> Self {
        Self { target, state }
    }

    /// Validates raw caller arguments into a key.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if either half is not representable.
    pub fn parse(target_id: u32, state: char) -> Result<Self, CommandError> {
        Ok(Self {
            target: TargetId::new(target_id)?,
            state: AgvState::new(state)?,
        })
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.target, self.state)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_id_accepts_full_three_digit_range() {
        assert_eq!(TargetId::new(0).unwrap().get(), 0);
        assert_eq!(TargetId::new(999).unwrap().get(), 999);
    }

    #[test]
    fn test_target_id_rejects_four_digits() {
        assert_eq!(
            TargetId::new(1000),
            Err(CommandError::TargetIdOutOfRange(1000))
        );
    }

    #[test]
    fn test_target_id_digits_are_zero_padded() {
        // Arrange
        let id = TargetId::new(7).unwrap();

        // Act
        let digits = id.to_digits();

        // Assert
        assert_eq!(&digits, b"007");
        assert_eq!(id.to_string(), "007");
    }

    #[test]
    fn test_target_id_from_digits_parses_wire_field() {
        assert_eq!(TargetId::from_digits(b"700"), Some(TargetId::new(700).unwrap()));
        assert_eq!(TargetId::from_digits(b"000"), Some(TargetId::new(0).unwrap()));
    }

    #[test]
    fn test_target_id_from_digits_rejects_non_digits() {
        assert_eq!(TargetId::from_digits(b"7A0"), None);
    }

    #[test]
    fn test_agv_state_rejects_non_ascii() {
        assert_eq!(AgvState::new('é'), Err(CommandError::NonAsciiState('é')));
    }

    #[test]
    fn test_agv_state_keeps_character_verbatim() {
        let state = AgvState::new('1').unwrap();
        assert_eq!(state.as_byte(), b'1');
        assert_eq!(state.as_char(), '1');
    }

    #[test]
    fn test_command_key_parse_validates_both_halves() {
        assert!(CommandKey::parse(700, '1').is_ok());
        assert!(matches!(
            CommandKey::parse(1200, '1'),
            Err(CommandError::TargetIdOutOfRange(1200))
        ));
        assert!(matches!(
            CommandKey::parse(700, 'ß'),
            Err(CommandError::NonAsciiState('ß'))
        ));
    }

    #[test]
    fn test_command_key_display() {
        let key = CommandKey::parse(42, 'S').unwrap();
        assert_eq!(key.to_string(), "042/S");
    }
}
