//! CDC line coding: baud rate, stop bits, parity and data bits.
//!
//! The wire format is the 7-byte structure exchanged by the
//! SET_LINE_CODING / GET_LINE_CODING requests:
//!
//! ```text
//! dwDTERate   u32 le   data terminal rate, bits per second
//! bCharFormat u8       0 = 1 stop bit, 1 = 1.5 stop bits, 2 = 2 stop bits
//! bParityType u8       0 = none, 1 = odd, 2 = even, 3 = mark, 4 = space
//! bDataBits   u8       5, 6, 7, 8 or 16
//! ```

/// Error decoding a line coding structure from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodingError {
    /// Payload is not exactly 7 bytes.
    Length,
    /// A field holds a value outside the protocol's vocabulary.
    Value,
}

/// Stop bit configuration (bCharFormat).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CharFormat {
    Stop1 = 0,
    Stop1p5 = 1,
    Stop2 = 2,
}

impl CharFormat {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Stop1),
            1 => Some(Self::Stop1p5),
            2 => Some(Self::Stop2),
            _ => None,
        }
    }
}

/// Parity configuration (bParityType).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Parity {
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

impl Parity {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Odd),
            2 => Some(Self::Even),
            3 => Some(Self::Mark),
            4 => Some(Self::Space),
            _ => None,
        }
    }
}

/// Word length (bDataBits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataBits {
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Sixteen = 16,
}

impl DataBits {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            5 => Some(Self::Five),
            6 => Some(Self::Six),
            7 => Some(Self::Seven),
            8 => Some(Self::Eight),
            16 => Some(Self::Sixteen),
            _ => None,
        }
    }
}

/// The full line coding structure.
///
/// # Example
///
/// ```
/// use cdc_proto::LineCoding;
///
/// let coding = LineCoding::parse(&[0x00, 0xc2, 0x01, 0x00, 0, 0, 8]).unwrap();
/// assert_eq!(coding.rate, 115_200);
/// assert_eq!(coding.encode(), [0x00, 0xc2, 0x01, 0x00, 0, 0, 8]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCoding {
    pub rate: u32,
    pub format: CharFormat,
    pub parity: Parity,
    pub data_bits: DataBits,
}

/// Size of the line coding structure on the wire.
pub const LINE_CODING_SIZE: usize = 7;

impl LineCoding {
    /// Power-on line coding: 9600 8N1.
    pub const DEFAULT: Self = Self {
        rate: 9600,
        format: CharFormat::Stop1,
        parity: Parity::None,
        data_bits: DataBits::Eight,
    };

    /// Decode a SET_LINE_CODING payload.
    pub fn parse(raw: &[u8]) -> Result<Self, CodingError> {
        if raw.len() != LINE_CODING_SIZE {
            return Err(CodingError::Length);
        }
        let rate = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let format = CharFormat::from_u8(raw[4]).ok_or(CodingError::Value)?;
        let parity = Parity::from_u8(raw[5]).ok_or(CodingError::Value)?;
        let data_bits = DataBits::from_u8(raw[6]).ok_or(CodingError::Value)?;
        Ok(Self {
            rate,
            format,
            parity,
            data_bits,
        })
    }

    /// Encode for a GET_LINE_CODING response.
    #[must_use]
    pub fn encode(&self) -> [u8; LINE_CODING_SIZE] {
        let rate = self.rate.to_le_bytes();
        [
            rate[0],
            rate[1],
            rate[2],
            rate[3],
            self.format as u8,
            self.parity as u8,
            self.data_bits as u8,
        ]
    }
}

impl Default for LineCoding {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_115200_8n1() {
        let coding = LineCoding::parse(&[0x00, 0xc2, 0x01, 0x00, 0, 0, 8]).unwrap();
        assert_eq!(coding.rate, 115_200);
        assert_eq!(coding.format, CharFormat::Stop1);
        assert_eq!(coding.parity, Parity::None);
        assert_eq!(coding.data_bits, DataBits::Eight);
    }

    #[test]
    fn test_encode_parse_identity() {
        let coding = LineCoding {
            rate: 230_400,
            format: CharFormat::Stop2,
            parity: Parity::Even,
            data_bits: DataBits::Eight,
        };
        assert_eq!(LineCoding::parse(&coding.encode()), Ok(coding));
    }

    #[test]
    fn test_parse_rejects_short_payload() {
        assert_eq!(
            LineCoding::parse(&[0x80, 0x25, 0x00]),
            Err(CodingError::Length)
        );
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        // char format 3 does not exist
        assert_eq!(
            LineCoding::parse(&[0x80, 0x25, 0x00, 0x00, 3, 0, 8]),
            Err(CodingError::Value)
        );
        // parity 5 does not exist
        assert_eq!(
            LineCoding::parse(&[0x80, 0x25, 0x00, 0x00, 0, 5, 8]),
            Err(CodingError::Value)
        );
        // 9 data bits do not exist
        assert_eq!(
            LineCoding::parse(&[0x80, 0x25, 0x00, 0x00, 0, 0, 9]),
            Err(CodingError::Value)
        );
    }

    #[test]
    fn test_default_is_9600_8n1() {
        let coding = LineCoding::default();
        assert_eq!(coding.rate, 9600);
        assert_eq!(coding.encode()[4..], [0, 0, 8]);
    }
}
