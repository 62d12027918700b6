use super::Error;

/// A bounds-checked reader over a received byte slice.
pub struct BytesIn<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BytesIn<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn available(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn byte(&mut self) -> Result<u8, Error> {
        self.arr::<1>().map(|arr| arr[0])
    }

    pub fn be_u16(&mut self) -> Result<u16, Error> {
        self.arr().map(u16::from_be_bytes)
    }

    pub fn slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if len > self.available() {
            Err(Error::DataUnderflow)
        } else {
            let data = &self.data[self.offset..self.offset + len];
            self.offset += len;

            Ok(data)
        }
    }

    pub fn skip(&mut self, len: usize) -> Result<&mut Self, Error> {
        self.slice(len)?;

        Ok(self)
    }

    pub fn arr<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let slice = self.slice(N)?;

        let mut data = [0; N];
        data.copy_from_slice(slice);

        Ok(data)
    }

    pub fn remaining(&mut self) -> &'a [u8] {
        let data = &self.data[self.offset..];

        self.offset = self.data.len();

        data
    }

    /// Reads exactly `N` bytes and fails if anything is left afterwards.
    pub fn remaining_arr<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        if self.available() != N {
            Err(Error::InvalidFormat)
        } else {
            self.arr::<N>()
        }
    }
}

/// A bounds-checked writer over a caller-supplied buffer.
pub struct BytesOut<'a> {
    buf: &'a mut [u8],
    offset: usize,
}

impl<'a> BytesOut<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.offset
    }

    pub fn byte(&mut self, data: u8) -> Result<&mut Self, Error> {
        self.push(&[data])
    }

    pub fn be_u16(&mut self, data: u16) -> Result<&mut Self, Error> {
        self.push(&data.to_be_bytes())
    }

    pub fn zeros(&mut self, len: usize) -> Result<&mut Self, Error> {
        if len > self.buf.len() - self.offset {
            Err(Error::BufferOverflow)
        } else {
            self.buf[self.offset..self.offset + len].fill(0);
            self.offset += len;

            Ok(self)
        }
    }

    pub fn push(&mut self, data: &[u8]) -> Result<&mut Self, Error> {
        if data.len() > self.buf.len() - self.offset {
            Err(Error::BufferOverflow)
        } else {
            self.buf[self.offset..self.offset + data.len()].copy_from_slice(data);
            self.offset += data.len();

            Ok(self)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_past_end() {
        let mut bytes = BytesIn::new(&[1, 2, 3]);

        assert_eq!(bytes.be_u16(), Ok(0x0102));
        assert_eq!(bytes.be_u16(), Err(Error::DataUnderflow));
        assert_eq!(bytes.byte(), Ok(3));
        assert_eq!(bytes.available(), 0);
    }

    #[test]
    fn test_remaining_arr_exact() {
        assert_eq!(BytesIn::new(&[1, 2]).remaining_arr::<1>(), Err(Error::InvalidFormat));
        assert_eq!(BytesIn::new(&[1]).remaining_arr::<2>(), Err(Error::InvalidFormat));
        assert_eq!(BytesIn::new(&[7]).remaining_arr::<1>(), Ok([7]));
    }

    #[test]
    fn test_write_overflow() {
        let mut buf = [0xaa; 6];
        let mut bytes = BytesOut::new(&mut buf);

        bytes.push(&[1, 2, 3, 4]).unwrap().zeros(1).unwrap();
        assert_eq!(bytes.push(&[9, 9]).err(), Some(Error::BufferOverflow));
        assert_eq!(bytes.len(), 5);

        assert_eq!(buf, [1, 2, 3, 4, 0, 0xaa]);
    }
}
