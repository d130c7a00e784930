//! The two code tables.
//!
//! No byte value appears in both tables; `tests::code_spaces_are_disjoint`
//! keeps it that way.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $byte:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $byte, )+
        }

        impl $name {
            /// Every code in the table, in wire order.
            pub const ALL: &'static [$name] = &[$( $name::$variant, )+];

            /// Look up a code byte.
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $( $byte => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// The wire byte.
            pub fn as_byte(self) -> u8 {
                self as u8
            }

            /// Protocol name, e.g. `success` or `touchEvent`.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, UnknownName> {
                match s {
                    $( $label => Ok($name::$variant), )+
                    other => Err(UnknownName(other.to_string())),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }
    };
}

code_table! {
    /// Result of a host command.
    ResponseCode {
        InvalidInstruction = 0x00 => "invalidInstruction",
        Success = 0x01 => "success",
        InvalidComponentId = 0x02 => "invalidComponentID",
        InvalidPageId = 0x03 => "invalidPageID",
        InvalidPictureId = 0x04 => "invalidPictureID",
        InvalidFontId = 0x05 => "invalidFontID",
        InvalidBaudRate = 0x11 => "invalidBaudRate",
        InvalidCurveControl = 0x12 => "invalidCurveControl",
        InvalidVariableName = 0x1a => "invalidVariableName",
        InvalidVariableOperation = 0x1b => "invalidVariableOperation",
        AssignmentFailure = 0x1c => "assignmentFailure",
        EepromFailure = 0x1d => "eepromFailure",
        InvalidParameterQuantity = 0x1e => "invalidParameterQuantity",
        IoOperationFailure = 0x1f => "ioOperationFailure",
        UndefinedEscapeCharacter = 0x20 => "undefinedEscapeCharacter",
        VariableNameTooLong = 0x23 => "variableNameTooLong",
    }
}

code_table! {
    /// Unsolicited device notification.
    EventCode {
        TouchEvent = 0x65 => "touchEvent",
        PageId = 0x66 => "pageId",
        TouchCoordinate = 0x67 => "touchCoordinate",
        TouchCoordinateOnWake = 0x68 => "touchCoordinateOnWake",
        StringData = 0x70 => "stringData",
        NumericData = 0x71 => "numericData",
        AutoSleep = 0x86 => "autoSleep",
        AutoWake = 0x87 => "autoWake",
        Startup = 0x88 => "startup",
        CardUpgrade = 0x89 => "cardUpgrade",
        TransmitFinished = 0xfd => "transmitFinished",
        TransmitReady = 0xfe => "transmitReady",
    }
}

impl ResponseCode {
    pub fn is_success(self) -> bool {
        self == ResponseCode::Success
    }
}

/// A name that matches no code in the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown code name '{0}'")]
pub struct UnknownName(pub String);

/// A classified leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Response(ResponseCode),
    Event(EventCode),
}

impl Code {
    /// Classify a leading byte, or `None` if it belongs to neither table.
    pub fn classify(byte: u8) -> Option<Self> {
        if let Some(code) = ResponseCode::from_byte(byte) {
            return Some(Code::Response(code));
        }
        EventCode::from_byte(byte).map(Code::Event)
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Code::Response(code) => code.as_byte(),
            Code::Event(code) => code.as_byte(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Code::Response(code) => code.name(),
            Code::Event(code) => code.name(),
        }
    }
}
