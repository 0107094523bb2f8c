use std::io::{self, Read, Seek, Write};

/// Trait for a readable and seekable stream.
pub trait ReadSeek: Read + Seek {}
impl<R: Read + Seek + ?Sized> ReadSeek for R {}

/// Trait for a writable and seekable stream.
pub trait WriteSeek: Write + Seek {}
impl<W: Write + Seek + ?Sized> WriteSeek for W {}

/// Trait for an object which can be read from a stream.
pub trait ReadFrom<R: Read + ?Sized>: Sized {
    /// The error type returned from `read_from()`.
    type Error;

    /// Reads an instance of this object from `reader`.
    fn read_from(reader: &mut R) -> Result<Self, Self::Error>;

    /// Fills a slice with instances of this object read from `reader`.
    fn read_all_from(reader: &mut R, buf: &mut [Self]) -> Result<(), Self::Error> {
        for elem in buf {
            *elem = Self::read_from(reader)?;
        }
        Ok(())
    }
}

/// Trait for an object which can be written to a stream.
pub trait WriteTo<W: Write + ?Sized>: Sized {
    /// The error type returned from `write_to()`.
    type Error;

    /// Writes this object to `writer`.
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error>;

    /// Writes a slice of instances of this object to `writer`.
    fn write_all_to(writer: &mut W, buf: &[Self]) -> Result<(), Self::Error> {
        for elem in buf {
            elem.write_to(writer)?;
        }
        Ok(())
    }
}

/// `ReadFrom` implementation for reading bytes
impl<R: Read + ?Sized> ReadFrom<R> for u8 {
    type Error = io::Error;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        let b = &mut [0u8];
        reader.read_exact(b)?;
        Ok(b[0])
    }
    fn read_all_from(reader: &mut R, buf: &mut [u8]) -> Result<(), Self::Error> {
        reader.read_exact(buf)
    }
}

/// `WriteTo` implementation for writing bytes
impl<W: Write + ?Sized> WriteTo<W> for u8 {
    type Error = io::Error;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        writer.write_all(&[*self])
    }
    fn write_all_to(writer: &mut W, buf: &[u8]) -> Result<(), Self::Error> {
        writer.write_all(buf)
    }
}

/// `ReadFrom` implementation for reading arrays of trivial types
impl<R: Read + ?Sized, T: ReadFrom<R> + Default + Copy, const N: usize> ReadFrom<R> for [T; N] {
    type Error = T::Error;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        let mut result = [T::default(); N];
        T::read_all_from(reader, &mut result)?;
        Ok(result)
    }
}

/// `WriteTo` implementation for writing arrays of trivial types
impl<W: Write + ?Sized, T: WriteTo<W>, const N: usize> WriteTo<W> for [T; N] {
    type Error = T::Error;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        T::write_all_to(writer, self)
    }
}
