//! Class codes and functional descriptor constants for CDC interface
//! assembly. Only what a CDC-ACM serial device needs.

/// Communication interface class.
pub const USB_CLASS_CDC: u8 = 0x02;
/// Data interface class.
pub const USB_CLASS_CDC_DATA: u8 = 0x0a;

/// Abstract Control Model subclass (communication interface).
pub const CDC_SUBCLASS_ACM: u8 = 0x02;
/// No protocol on either interface.
pub const CDC_PROTOCOL_NONE: u8 = 0x00;

/// CS_INTERFACE descriptor type.
pub const CS_INTERFACE: u8 = 0x24;

/// Functional descriptor subtypes.
pub const CDC_TYPE_HEADER: u8 = 0x00;
pub const CDC_TYPE_CALL_MANAGEMENT: u8 = 0x01;
pub const CDC_TYPE_ACM: u8 = 0x02;
pub const CDC_TYPE_UNION: u8 = 0x06;

/// bcdCDC revision advertised in the header functional descriptor.
pub const CDC_BCD_VERSION: u16 = 0x0110;

/// bmCapabilities for the ACM functional descriptor: line coding and
/// serial state only (no network connection, no send-break).
pub const ACM_CAPABILITY_LINE_CODING: u8 = 0x02;
