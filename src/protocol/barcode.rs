//! # ESC/POS Two-Dimensional Code Commands
//!
//! QR codes are printed by the printer's own symbol generator through the
//! `GS ( k` function family. Nothing is rasterised on the host.
//!
//! ## QR Code Usage
//!
//! QR codes are generated in a multi-step process:
//!
//! 1. Configure QR settings (model, module size, error correction)
//! 2. Store the data in the symbol storage area
//! 3. Print the stored symbol
//!
//! ```
//! use boleta::command::Command;
//! use boleta::protocol::barcode::qr;
//!
//! let data = Command::concat([
//!     qr::set_model(qr::QrModel::Model2),
//!     qr::set_module_size(6),
//!     qr::set_error_correction(qr::QrErrorLevel::L),
//!     qr::store_data(b"https://example.com"),
//!     qr::print(),
//! ]);
//! assert!(!data.is_empty());
//! ```
//!
//! ## Framing
//!
//! Every function is `GS ( k pL pH cn fn [params]` where `pL pH` is the
//! little-endian count of the bytes following them and `cn = 49` selects
//! the QR symbol type.

pub mod qr {
    use serde::{Deserialize, Serialize};

    use crate::command::Command;
    use crate::protocol::commands::{GS, u16_le};

    /// `cn` byte selecting the QR Code symbol
    const CN_QR: u8 = 0x31;

    /// QR Code model selection
    ///
    /// | Model | Max Version | Features |
    /// |-------|-------------|----------|
    /// | Model 1 | 14 | Original QR |
    /// | Model 2 | 40 | Enhanced, with alignment patterns |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum QrModel {
        Model1 = 0x31,
        #[default]
        Model2 = 0x32,
    }

    /// QR Code error correction level
    ///
    /// | Level | Recovery |
    /// |-------|----------|
    /// | L | ~7% |
    /// | M | ~15% |
    /// | Q | ~25% |
    /// | H | ~30% |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum QrErrorLevel {
        #[default]
        L = 0x30,
        M = 0x31,
        Q = 0x32,
        H = 0x33,
    }

    /// Build a `GS ( k` function block for the QR symbol.
    fn function(fn_code: u8, params: &[u8]) -> Vec<u8> {
        // pL pH count cn + fn + params
        let len = (params.len() + 2) as u16;
        let [p_l, p_h] = u16_le(len);
        let mut cmd = Vec::with_capacity(7 + params.len());
        cmd.extend_from_slice(&[GS, b'(', b'k', p_l, p_h, CN_QR, fn_code]);
        cmd.extend_from_slice(params);
        cmd
    }

    /// # Select QR Model (GS ( k, fn 65)
    ///
    /// | Format | Bytes |
    /// |--------|-------|
    /// | Hex    | 1D 28 6B 04 00 31 41 n 00 |
    ///
    /// `n = 0x31` Model 1, `n = 0x32` Model 2.
    pub fn set_model(model: QrModel) -> Command {
        Command::from(function(0x41, &[model as u8, 0x00]))
    }

    /// # Set Module Size (GS ( k, fn 67)
    ///
    /// | Format | Bytes |
    /// |--------|-------|
    /// | Hex    | 1D 28 6B 03 00 31 43 n |
    ///
    /// `n` is the width of one module in dots. Epson documents 1-16;
    /// values outside that range are sent as-is and the printer's behavior
    /// is undefined.
    pub fn set_module_size(size: u8) -> Command {
        Command::from(function(0x43, &[size]))
    }

    /// # Select Error Correction Level (GS ( k, fn 69)
    ///
    /// | Format | Bytes |
    /// |--------|-------|
    /// | Hex    | 1D 28 6B 03 00 31 45 n |
    pub fn set_error_correction(level: QrErrorLevel) -> Command {
        Command::from(function(0x45, &[level as u8]))
    }

    /// # Store Symbol Data (GS ( k, fn 80)
    ///
    /// | Format | Bytes |
    /// |--------|-------|
    /// | Hex    | 1D 28 6B pL pH 31 50 30 d1...dk |
    ///
    /// `pL = (k + 3) mod 256`, `pH = (k + 3) div 256`. The three extra bytes
    /// are `cn`, `fn` and `m = 0x30`.
    ///
    /// Data longer than 65532 bytes does not fit the length field; the high
    /// byte wraps and the printer will misread the block.
    pub fn store_data(data: &[u8]) -> Command {
        let len = data.len() + 3;
        let p_l = (len % 256) as u8;
        let p_h = (len / 256) as u8;
        let mut cmd = Vec::with_capacity(8 + data.len());
        cmd.extend_from_slice(&[GS, b'(', b'k', p_l, p_h, CN_QR, 0x50, 0x30]);
        cmd.extend_from_slice(data);
        Command::from(cmd)
    }

    /// # Print Stored Symbol (GS ( k, fn 81)
    ///
    /// | Format | Bytes |
    /// |--------|-------|
    /// | Hex    | 1D 28 6B 03 00 31 51 30 |
    pub fn print() -> Command {
        Command::from(function(0x51, &[0x30]))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_set_model() {
            assert_eq!(
                set_model(QrModel::Model2).as_bytes(),
                &[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]
            );
            assert_eq!(
                set_model(QrModel::Model1).as_bytes(),
                &[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x31, 0x00]
            );
        }

        #[test]
        fn test_set_module_size_unchecked() {
            assert_eq!(
                set_module_size(6).as_bytes(),
                &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, 0x06]
            );
            assert_eq!(set_module_size(200).as_bytes()[7], 200);
        }

        #[test]
        fn test_error_correction_levels() {
            for (level, n) in [
                (QrErrorLevel::L, 0x30),
                (QrErrorLevel::M, 0x31),
                (QrErrorLevel::Q, 0x32),
                (QrErrorLevel::H, 0x33),
            ] {
                assert_eq!(
                    set_error_correction(level).as_bytes(),
                    &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, n]
                );
            }
        }

        #[test]
        fn test_store_data_length_prefix() {
            for len in [0usize, 1, 252, 253, 255, 256, 300] {
                let data = vec![b'x'; len];
                let cmd = store_data(&data);
                let bytes = cmd.as_bytes();
                assert_eq!(bytes[3] as usize, (len + 3) % 256, "pL for len {}", len);
                assert_eq!(bytes[4] as usize, (len + 3) / 256, "pH for len {}", len);
                assert_eq!(&bytes[5..8], &[0x31, 0x50, 0x30]);
                assert_eq!(&bytes[8..], data.as_slice());
            }
        }

        #[test]
        fn test_print() {
            assert_eq!(
                print().as_bytes(),
                &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]
            );
        }
    }
}
