//! The `(code, length, value)` option trailer shared by the lease messages.
//!
//! Decoding walks the trailer exactly once. It stops at a pad (zero) code, at
//! the end code, at a zero-length option, or when the data runs out. An option
//! whose declared length would read past the end of the data is an error, and
//! the whole trailer has to be treated as malformed.

use super::bytes::{BytesIn, BytesOut};
use super::Error;

pub const PAD: u8 = 0;
pub const END: u8 = 255;

/// A single undecoded option.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawOption<'a> {
    pub code: u8,
    pub data: &'a [u8],
}

/// Iterates the options of a trailer, yielding an error at most once.
pub struct OptionsIn<'a> {
    bytes: BytesIn<'a>,
    done: bool,
}

impl<'a> OptionsIn<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            bytes: BytesIn::new(data),
            done: false,
        }
    }

    fn decode(&mut self) -> Result<Option<RawOption<'a>>, Error> {
        if self.bytes.available() < 2 {
            return Ok(None);
        }

        let code = self.bytes.byte()?;
        if code == PAD || code == END {
            return Ok(None);
        }

        let len = self.bytes.byte()? as usize;
        if len == 0 {
            return Ok(None);
        }

        let data = self.bytes.slice(len)?;

        Ok(Some(RawOption { code, data }))
    }
}

impl<'a> Iterator for OptionsIn<'a> {
    type Item = Result<RawOption<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let option = self.decode().transpose();
        if !matches!(option, Some(Ok(_))) {
            self.done = true;
        }

        option
    }
}

/// Appends options to a message under construction.
pub struct OptionsOut<'a, 'b> {
    bytes: &'a mut BytesOut<'b>,
}

impl<'a, 'b> OptionsOut<'a, 'b> {
    pub fn new(bytes: &'a mut BytesOut<'b>) -> Self {
        Self { bytes }
    }

    pub fn option(&mut self, code: u8, data: &[u8]) -> Result<&mut Self, Error> {
        let len = u8::try_from(data.len()).map_err(|_| Error::InvalidFormat)?;

        self.bytes.byte(code)?.byte(len)?.push(data)?;

        Ok(self)
    }

    /// Terminates the trailer with the end code followed by a zero pad byte.
    pub fn finish(self) -> Result<usize, Error> {
        self.bytes.byte(END)?.byte(PAD)?;

        Ok(self.bytes.len())
    }
}
