//! Fixed-capacity matrices and their wire form
//!
//! ```text
//! offset  size  field
//! 0       4     size (little-endian u32, at most MAX_SIZE)
//! 4       144   elements, row-major, MAX_SIZE x MAX_SIZE little-endian u32
//! ```
//!
//! A request carries two matrices back to back; a reply carries one.

use rpmsg::{Result, RpmsgError};

/// Largest supported dimension
pub const MAX_SIZE: usize = 6;

/// Encoded size of one matrix
pub const MATRIX_WIRE_SIZE: usize = 4 + MAX_SIZE * MAX_SIZE * 4;

/// Encoded size of a multiply request
pub const REQUEST_WIRE_SIZE: usize = 2 * MATRIX_WIRE_SIZE;

/// A square matrix of dimension `size`, stored in a `MAX_SIZE` grid
///
/// Cells outside `size` are carried on the wire but ignored by arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Matrix {
    size: u32,
    elements: [[u32; MAX_SIZE]; MAX_SIZE],
}

impl Matrix {
    /// Creates a zero matrix
    pub fn new(size: usize) -> Result<Self> {
        if size > MAX_SIZE {
            return Err(RpmsgError::InvalidParam);
        }
        Ok(Self {
            size: size as u32,
            elements: [[0; MAX_SIZE]; MAX_SIZE],
        })
    }

    /// Creates a matrix from its rows
    pub fn from_rows(rows: &[&[u32]]) -> Result<Self> {
        let mut matrix = Self::new(rows.len())?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != rows.len() {
                return Err(RpmsgError::InvalidParam);
            }
            matrix.elements[i][..row.len()].copy_from_slice(row);
        }
        Ok(matrix)
    }

    /// Creates the identity matrix
    pub fn identity(size: usize) -> Result<Self> {
        let mut matrix = Self::new(size)?;
        for i in 0..size {
            matrix.elements[i][i] = 1;
        }
        Ok(matrix)
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Returns the cell at row `i`, column `j`
    pub fn get(&self, i: usize, j: usize) -> Option<u32> {
        self.elements.get(i)?.get(j).copied()
    }

    /// Multiplies `self` by `other`
    ///
    /// The result takes the dimension of `self`. Arithmetic wraps on
    /// overflow, as the remote firmware's unsigned arithmetic does.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        let mut result = Matrix {
            size: self.size,
            elements: [[0; MAX_SIZE]; MAX_SIZE],
        };

        for i in 0..self.size() {
            for j in 0..other.size() {
                for k in 0..result.size() {
                    let product = self.elements[i][k].wrapping_mul(other.elements[k][j]);
                    result.elements[i][j] = result.elements[i][j].wrapping_add(product);
                }
            }
        }
        result
    }

    /// Encodes the matrix
    pub fn to_bytes(&self) -> [u8; MATRIX_WIRE_SIZE] {
        let mut out = [0u8; MATRIX_WIRE_SIZE];
        out[..4].copy_from_slice(&self.size.to_le_bytes());
        let cells = self.elements.iter().flatten();
        for (chunk, value) in out[4..].chunks_exact_mut(4).zip(cells) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decodes a matrix
    ///
    /// Fails with `InvalidBufferSize` on a wrong length and `InvalidParam`
    /// when the dimension exceeds [`MAX_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != MATRIX_WIRE_SIZE {
            return Err(RpmsgError::InvalidBufferSize);
        }

        let mut words = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        let size = words.next().ok_or(RpmsgError::InvalidBufferSize)?;
        let mut matrix = Self::new(size as usize)?;
        for (cell, value) in matrix.elements.iter_mut().flatten().zip(words) {
            *cell = value;
        }
        Ok(matrix)
    }
}

/// Encodes a multiply request
pub fn encode_request(lhs: &Matrix, rhs: &Matrix) -> Vec<u8> {
    let mut out = Vec::with_capacity(REQUEST_WIRE_SIZE);
    out.extend_from_slice(&lhs.to_bytes());
    out.extend_from_slice(&rhs.to_bytes());
    out
}

/// Decodes a multiply request into its two operands
pub fn decode_request(bytes: &[u8]) -> Result<(Matrix, Matrix)> {
    if bytes.len() != REQUEST_WIRE_SIZE {
        return Err(RpmsgError::InvalidBufferSize);
    }
    let (lhs, rhs) = bytes.split_at(MATRIX_WIRE_SIZE);
    Ok((Matrix::from_bytes(lhs)?, Matrix::from_bytes(rhs)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_sizes() {
        assert_eq!(MATRIX_WIRE_SIZE, 148);
        assert_eq!(REQUEST_WIRE_SIZE, 296);
    }

    #[test]
    fn test_multiply_2x2() {
        let a = Matrix::from_rows(&[&[1, 2], &[3, 4]]).unwrap();
        let b = Matrix::from_rows(&[&[5, 6], &[7, 8]]).unwrap();
        let expected = Matrix::from_rows(&[&[19, 22], &[43, 50]]).unwrap();
        assert_eq!(a.multiply(&b), expected);
    }

    #[test]
    fn test_multiply_by_identity() {
        let a = Matrix::from_rows(&[&[2, 0, 1], &[1, 3, 2], &[0, 4, 5]]).unwrap();
        assert_eq!(a.multiply(&Matrix::identity(3).unwrap()), a);
    }

    #[test]
    fn test_multiply_wraps_on_overflow() {
        let a = Matrix::from_rows(&[&[u32::MAX]]).unwrap();
        let b = Matrix::from_rows(&[&[2]]).unwrap();
        assert_eq!(a.multiply(&b).get(0, 0), Some(u32::MAX - 1));
    }

    #[test]
    fn test_rejects_oversized_dimension() {
        assert_eq!(Matrix::new(7), Err(RpmsgError::InvalidParam));

        let mut bytes = Matrix::new(2).unwrap().to_bytes();
        bytes[..4].copy_from_slice(&7u32.to_le_bytes());
        assert_eq!(Matrix::from_bytes(&bytes), Err(RpmsgError::InvalidParam));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        assert_eq!(
            Matrix::from_rows(&[&[1, 2], &[3]]),
            Err(RpmsgError::InvalidParam)
        );
    }

    #[test]
    fn test_layout_is_row_major_le() {
        let a = Matrix::from_rows(&[&[1, 2], &[3, 4]]).unwrap();
        let bytes = a.to_bytes();
        assert_eq!(&bytes[..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        // Row 1 starts after a full MAX_SIZE-wide row.
        let row1 = 4 + MAX_SIZE * 4;
        assert_eq!(&bytes[row1..row1 + 4], &3u32.to_le_bytes());
    }

    #[test]
    fn test_request_decoding() {
        let a = Matrix::identity(2).unwrap();
        let b = Matrix::from_rows(&[&[9, 8], &[7, 6]]).unwrap();
        let (lhs, rhs) = decode_request(&encode_request(&a, &b)).unwrap();
        assert_eq!(lhs, a);
        assert_eq!(rhs, b);

        assert_eq!(
            decode_request(&[0; 10]),
            Err(RpmsgError::InvalidBufferSize)
        );
    }
}
