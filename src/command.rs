//! # Encoded Commands
//!
//! A [`Command`] is an immutable ESC/POS byte sequence. Encoder functions in
//! [`crate::protocol`] produce them, the [`crate::layout`] composer
//! concatenates them, and the bridge writes them to the printer.
//!
//! Across process or language boundaries a command travels as standard
//! base64 text:
//!
//! ```
//! use boleta::command::Command;
//! use boleta::protocol::commands;
//!
//! let init = commands::init();
//! assert_eq!(init.to_base64(), "G0A=");
//! assert_eq!(Command::from_base64("G0A=").unwrap(), init);
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::BoletaError;

/// An encoded ESC/POS byte sequence in exact wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Command(Vec<u8>);

impl Command {
    /// The empty command.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Concatenate commands in order.
    pub fn concat<I>(commands: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut buf = Vec::new();
        for cmd in commands {
            buf.extend_from_slice(cmd.as_ref());
        }
        Self(buf)
    }

    /// Decode a base64 transport payload.
    pub fn from_base64(payload: &str) -> Result<Self, BoletaError> {
        STANDARD
            .decode(payload.trim())
            .map(Self)
            .map_err(|e| BoletaError::InvalidData(e.to_string()))
    }

    /// Encode as base64 for transport.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Command {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Command {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Command {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromIterator<Command> for Command {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self::concat(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_preserves_order() {
        let a = Command::from(vec![0x1B, 0x40]);
        let b = Command::from(vec![0x0A]);
        assert_eq!(Command::concat([&a, &b]).as_bytes(), &[0x1B, 0x40, 0x0A]);
        assert_eq!(Command::concat([&b, &a]).as_bytes(), &[0x0A, 0x1B, 0x40]);
    }

    #[test]
    fn test_concat_nothing_is_empty() {
        let none: Vec<Command> = Vec::new();
        assert!(Command::concat(none).is_empty());
    }

    #[test]
    fn test_base64_decode_rejects_garbage() {
        let err = Command::from_base64("not base64!!").unwrap_err();
        assert!(matches!(err, BoletaError::InvalidData(_)));
    }

    #[test]
    fn test_base64_trims_whitespace() {
        let cmd = Command::from_base64("  CgoK\n").unwrap();
        assert_eq!(cmd.as_bytes(), &[0x0A, 0x0A, 0x0A]);
    }
}
