use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorType};

/// Characteristic and descriptor flags, spelled the way BlueZ spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeFlag {
    Broadcast,
    Read,
    WriteWithoutResponse,
    Write,
    Notify,
    Indicate,
    AuthenticatedSignedWrites,
    ReliableWrite,
    WritableAuxiliaries,
    EncryptRead,
    EncryptWrite,
    EncryptAuthenticatedRead,
    EncryptAuthenticatedWrite,
    SecureRead,
    SecureWrite,
}

impl AttributeFlag {
    pub const ALL: [AttributeFlag; 15] = [
        AttributeFlag::Broadcast,
        AttributeFlag::Read,
        AttributeFlag::WriteWithoutResponse,
        AttributeFlag::Write,
        AttributeFlag::Notify,
        AttributeFlag::Indicate,
        AttributeFlag::AuthenticatedSignedWrites,
        AttributeFlag::ReliableWrite,
        AttributeFlag::WritableAuxiliaries,
        AttributeFlag::EncryptRead,
        AttributeFlag::EncryptWrite,
        AttributeFlag::EncryptAuthenticatedRead,
        AttributeFlag::EncryptAuthenticatedWrite,
        AttributeFlag::SecureRead,
        AttributeFlag::SecureWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeFlag::Broadcast => "broadcast",
            AttributeFlag::Read => "read",
            AttributeFlag::WriteWithoutResponse => "write-without-response",
            AttributeFlag::Write => "write",
            AttributeFlag::Notify => "notify",
            AttributeFlag::Indicate => "indicate",
            AttributeFlag::AuthenticatedSignedWrites => "authenticated-signed-writes",
            AttributeFlag::ReliableWrite => "reliable-write",
            AttributeFlag::WritableAuxiliaries => "writable-auxiliaries",
            AttributeFlag::EncryptRead => "encrypt-read",
            AttributeFlag::EncryptWrite => "encrypt-write",
            AttributeFlag::EncryptAuthenticatedRead => "encrypt-authenticated-read",
            AttributeFlag::EncryptAuthenticatedWrite => "encrypt-authenticated-write",
            AttributeFlag::SecureRead => "secure-read",
            AttributeFlag::SecureWrite => "secure-write",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            AttributeFlag::Read
                | AttributeFlag::EncryptRead
                | AttributeFlag::EncryptAuthenticatedRead
                | AttributeFlag::SecureRead
        )
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            AttributeFlag::Write
                | AttributeFlag::WriteWithoutResponse
                | AttributeFlag::ReliableWrite
                | AttributeFlag::AuthenticatedSignedWrites
                | AttributeFlag::EncryptWrite
                | AttributeFlag::EncryptAuthenticatedWrite
                | AttributeFlag::SecureWrite
        )
    }

    /// Flags BlueZ accepts on a `GattDescriptor1`.
    pub fn is_descriptor_flag(&self) -> bool {
        matches!(
            self,
            AttributeFlag::Read
                | AttributeFlag::Write
                | AttributeFlag::EncryptRead
                | AttributeFlag::EncryptWrite
                | AttributeFlag::EncryptAuthenticatedRead
                | AttributeFlag::EncryptAuthenticatedWrite
                | AttributeFlag::SecureRead
                | AttributeFlag::SecureWrite
        )
    }
}

impl fmt::Display for AttributeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeFlag::ALL
            .iter()
            .copied()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| {
                Error::new(
                    "AttributeFlag",
                    format!("unknown flag {s:?}"),
                    ErrorType::InvalidAttribute,
                )
            })
    }
}

/// Declared flag set. Keeps declaration order and drops duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags(Vec<AttributeFlag>);

impl Flags {
    pub fn new(flags: &[AttributeFlag]) -> Self {
        flags.iter().copied().collect()
    }

    pub fn contains(&self, flag: AttributeFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = AttributeFlag> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn allows_read(&self) -> bool {
        self.iter().any(|flag| flag.is_read())
    }

    pub fn allows_write(&self) -> bool {
        self.iter().any(|flag| flag.is_write())
    }

    pub fn allows_notify(&self) -> bool {
        self.contains(AttributeFlag::Notify) || self.contains(AttributeFlag::Indicate)
    }

    /// First flag that is not valid on a descriptor.
    pub fn first_non_descriptor_flag(&self) -> Option<AttributeFlag> {
        self.iter().find(|flag| !flag.is_descriptor_flag())
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|flag| flag.as_str().to_string()).collect()
    }
}

impl FromIterator<AttributeFlag> for Flags {
    fn from_iter<I: IntoIterator<Item = AttributeFlag>>(iter: I) -> Self {
        let mut flags = Vec::new();
        for flag in iter {
            if !flags.contains(&flag) {
                flags.push(flag);
            }
        }
        Flags(flags)
    }
}

impl FromStr for Flags {
    type Err = Error;

    /// Parses a comma separated list such as `read,notify`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(AttributeFlag::from_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_names_round_trip() {
        for flag in AttributeFlag::ALL {
            assert_eq!(flag.as_str().parse::<AttributeFlag>().unwrap(), flag);
        }
        assert!("notify-please".parse::<AttributeFlag>().is_err());
    }

    #[test]
    fn flags_keep_declaration_order() {
        let flags: Flags = "notify, secure-read,notify".parse().unwrap();
        assert_eq!(flags.to_strings(), vec!["notify", "secure-read"]);
        assert!(flags.allows_read());
        assert!(!flags.allows_write());
        assert!(flags.allows_notify());
    }

    #[test]
    fn descriptor_flags() {
        let flags = Flags::new(&[AttributeFlag::Read, AttributeFlag::Write]);
        assert_eq!(flags.first_non_descriptor_flag(), None);
        let flags = Flags::new(&[AttributeFlag::Read, AttributeFlag::Notify]);
        assert_eq!(flags.first_non_descriptor_flag(), Some(AttributeFlag::Notify));
    }
}
