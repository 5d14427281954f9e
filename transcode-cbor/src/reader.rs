//! Low-level CBOR head/argument and payload reader (spec §4.6.1, §4.6.3:
//! "dispatches by peeking major/minor"). Operates directly on a borrowed
//! [`transcode_core::Buffer`]; callers peek the next head to decide what to
//! do, then consume it.

use transcode_core::Buffer;

use crate::error::{CborError, CborErrorKind};
use crate::head::*;

/// A decoded head byte: the major type, and either a resolved argument or
/// the indefinite-length marker (minor 31 on majors 2-5/7's string/list/map
/// forms).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Head {
    pub(crate) major: u8,
    pub(crate) minor: u8,
}

pub(crate) struct CborReader<'a> {
    buf: &'a mut Buffer,
}

impl<'a> CborReader<'a> {
    pub(crate) fn new(buf: &'a mut Buffer) -> Self {
        Self { buf }
    }

    /// Read and consume one head byte, without resolving its argument.
    pub(crate) fn read_head(&mut self) -> Result<Head, CborError> {
        let byte = self.buf.read_byte()?;
        let (major, minor) = split_head(byte);
        Ok(Head { major, minor })
    }

    /// Peek the next head byte's major/minor without consuming it.
    pub(crate) fn peek_head(&mut self) -> Result<Head, CborError> {
        let byte = *self
            .buf
            .peek()
            .first()
            .ok_or_else(|| CborError::de(CborErrorKind::TruncatedArgument))?;
        let (major, minor) = split_head(byte);
        Ok(Head { major, minor })
    }

    /// Resolve a minor value into its argument: `Some(n)` for a definite
    /// count/length, `None` for the indefinite marker (minor 31).
    pub(crate) fn read_argument(&mut self, major: u8, minor: u8) -> Result<Option<u64>, CborError> {
        match minor {
            0..=23 => Ok(Some(minor as u64)),
            MINOR_ONE_BYTE => Ok(Some(self.buf.read_byte()? as u64)),
            MINOR_TWO_BYTES => {
                let bytes = self.buf.read_byte_array(2)?;
                Ok(Some(u16::from_be_bytes([bytes[0], bytes[1]]) as u64))
            }
            MINOR_FOUR_BYTES => {
                let bytes = self.buf.read_byte_array(4)?;
                Ok(Some(u32::from_be_bytes(bytes.try_into().unwrap()) as u64))
            }
            MINOR_EIGHT_BYTES => {
                let bytes = self.buf.read_byte_array(8)?;
                Ok(Some(u64::from_be_bytes(bytes.try_into().unwrap())))
            }
            MINOR_INDEFINITE => Ok(None),
            _ => Err(CborError::de(CborErrorKind::UnexpectedMinor { major, minor })),
        }
    }

    /// Read a head and resolve its argument in one step.
    pub(crate) fn read_uint(&mut self) -> Result<(u8, Option<u64>), CborError> {
        let head = self.read_head()?;
        let value = self.read_argument(head.major, head.minor)?;
        Ok((head.major, value))
    }

    pub(crate) fn read_bytes_payload(&mut self, n: u64) -> Result<Vec<u8>, CborError> {
        self.buf
            .read_byte_array(n as usize)
            .map_err(|_| CborError::de(CborErrorKind::TruncatedArgument))
    }

    /// Read a definite- or indefinite-length byte/text string body, given
    /// its already-consumed head (spec §4.6.1: indefinite chunks must be
    /// definite-length chunks of the same major; nesting is rejected).
    pub(crate) fn read_string_body(&mut self, major: u8, head: Head) -> Result<Vec<u8>, CborError> {
        match self.read_argument(major, head.minor)? {
            Some(len) => self.read_bytes_payload(len),
            None => {
                let mut out = Vec::new();
                loop {
                    let next = self.peek_head()?;
                    if next.major == MAJOR_SIMPLE && next.minor == MINOR_BREAK {
                        self.read_head()?;
                        break;
                    }
                    let chunk_head = self.read_head()?;
                    if chunk_head.major != major {
                        return Err(CborError::de(CborErrorKind::UnexpectedMinor {
                            major: chunk_head.major,
                            minor: chunk_head.minor,
                        }));
                    }
                    if chunk_head.minor == MINOR_INDEFINITE {
                        return Err(CborError::de(CborErrorKind::NestedIndefinite));
                    }
                    let len = self
                        .read_argument(chunk_head.major, chunk_head.minor)?
                        .expect("definite chunk");
                    out.extend(self.read_bytes_payload(len)?);
                }
                Ok(out)
            }
        }
    }

    pub(crate) fn expect_break(&mut self) -> Result<(), CborError> {
        let head = self.read_head()?;
        if head.major == MAJOR_SIMPLE && head.minor == MINOR_BREAK {
            Ok(())
        } else {
            Err(CborError::de(CborErrorKind::ExpectedBreak))
        }
    }
}
