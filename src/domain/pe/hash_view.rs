//! Canonical Authenticode hash view over a parsed image.
//!
//! The digest covers the whole file except the `CheckSum` field, the
//! certificate table directory entry and the certificate table itself,
//! followed by enough zero bytes to reach the next 8-byte boundary.

use std::ops::Range;

use super::layout::align_to_certificate_boundary;
use super::PeImage;

/// Ordered, non-overlapping file ranges that feed the digest, plus trailing padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticodeRanges {
    pub included: Vec<Range<usize>>,
    /// Number of zero bytes hashed after the last range.
    pub padding: usize,
}

impl AuthenticodeRanges {
    /// Total number of bytes fed to the hasher.
    #[must_use]
    pub fn hashed_len(&self) -> usize {
        self.included.iter().map(|range| range.len()).sum::<usize>() + self.padding
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HashViewError {
    #[error("excluded regions out of order: 0x{next_start:x} starts before 0x{previous_end:x}")]
    OutOfOrder {
        previous_end: usize,
        next_start: usize,
    },
    #[error("range end 0x{end:x} exceeds file length 0x{len:x}")]
    OutOfBounds { end: usize, len: usize },
}

/// Borrowed view that knows which bytes of an image are covered by the digest.
#[derive(Clone, Debug)]
pub struct PeHashView<'a> {
    image: &'a PeImage<'a>,
}

impl<'a> PeHashView<'a> {
    #[must_use]
    pub fn new(image: &'a PeImage<'a>) -> Self {
        Self { image }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.image.bytes()
    }

    /// Compute the digest ranges, checking that they are ordered and in bounds.
    pub fn ranges(&self) -> Result<AuthenticodeRanges, HashViewError> {
        let checksum = self.image.checksum_range();
        let directory = self.image.certificate_directory_range();
        let content_end = self.image.content_end();
        let len = self.image.len();

        if checksum.end > directory.start {
            return Err(HashViewError::OutOfOrder {
                previous_end: checksum.end,
                next_start: directory.start,
            });
        }
        if directory.end > content_end {
            return Err(HashViewError::OutOfOrder {
                previous_end: directory.end,
                next_start: content_end,
            });
        }
        if content_end > len {
            return Err(HashViewError::OutOfBounds {
                end: content_end,
                len,
            });
        }

        let included = vec![
            0..checksum.start,
            checksum.end..directory.start,
            directory.end..content_end,
        ];
        Ok(AuthenticodeRanges {
            included,
            padding: align_to_certificate_boundary(content_end) - content_end,
        })
    }

    /// Iterate the hashed slices in file order. Padding is not included.
    pub fn slices(&self) -> Result<impl Iterator<Item = &'a [u8]>, HashViewError> {
        let bytes = self.as_bytes();
        let ranges = self.ranges()?;
        Ok(ranges.included.into_iter().map(move |range| &bytes[range]))
    }
}
