//! Read-only PE/COFF header parser.
//!
//! Walks DOS header → PE signature → COFF header → optional header → data
//! directories → section table, validating every offset against the buffer
//! before it is dereferenced. Nothing is copied: the parsed view borrows the
//! input bytes.

use std::ops::Range;

use super::layout::{
    align_to_certificate_boundary, DataDirectory, OptionalHeaderKind, WinCertificate,
    CERTIFICATE_TABLE_INDEX, CHECKSUM_OFFSET, CHECKSUM_SIZE, COFF_HEADER_SIZE,
    DATA_DIRECTORY_SIZE, DOS_E_LFANEW_OFFSET, DOS_HEADER_SIZE, MAX_DATA_DIRECTORIES,
    MAX_SECTIONS, OPTIONAL_HEADER_MAGIC_PE32, OPTIONAL_HEADER_MAGIC_PE32_PLUS, PE_SIGNATURE,
    PE_SIGNATURE_SIZE, SECTION_HEADER_SIZE, WIN_CERTIFICATE_HEADER_SIZE,
};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PeParseError {
    #[error("file too short for DOS header ({len} bytes)")]
    TooShort { len: usize },
    #[error("missing MZ signature")]
    MissingMz,
    #[error("PE header pointer 0x{offset:x} out of range")]
    OutOfRangePeHeader { offset: usize },
    #[error("missing PE signature")]
    MissingPe,
    #[error("truncated {structure}: needs {end} bytes, file has {len}")]
    Truncated {
        structure: &'static str,
        end: usize,
        len: usize,
    },
    #[error("unknown optional header magic 0x{0:04x}")]
    BadMagic(u16),
    #[error("optional header size {declared} too small, {required} bytes required")]
    OptionalHeaderTooSmall { declared: u16, required: usize },
    #[error("data directory count {count} exceeds {max}")]
    DirectoryCountMismatch { count: u32, max: u32 },
    #[error("image has {count} data directories; no certificate table entry")]
    MissingCertificateDirectory { count: u32 },
    #[error("section count {count} exceeds loader limit of {max}")]
    SectionCountOverflow { count: u16, max: u16 },
    #[error("section {index} ({name}) raw data ends at 0x{end:x} beyond file length 0x{len:x}")]
    SectionDataOutOfRange {
        index: usize,
        name: String,
        end: usize,
        len: usize,
    },
    #[error("certificate table 0x{offset:x}+0x{size:x} outside file of length 0x{len:x}")]
    CertificateTableOutOfRange { offset: u32, size: u32, len: usize },
    #[error("certificate table at 0x{offset:x} overlaps headers ending at 0x{headers_end:x}")]
    CertificateTableOverlapsHeaders { offset: usize, headers_end: usize },
    #[error("certificate table at 0x{offset:x} overlaps section data ending at 0x{sections_end:x}")]
    CertificateTableOverlapsSections { offset: usize, sections_end: usize },
    #[error("malformed WIN_CERTIFICATE entry at 0x{offset:x}")]
    MalformedCertificateEntry { offset: usize },
}

/// COFF file header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoffHeader {
    pub machine: u16,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

/// Optional header fields used by the signer and its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalHeader {
    pub kind: OptionalHeaderKind,
    pub address_of_entry_point: u32,
    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub number_of_rva_and_sizes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: String,
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub characteristics: u32,
}

impl SectionHeader {
    /// File range covered by the section's raw data.
    #[must_use]
    pub fn raw_range(&self) -> Range<usize> {
        let start = self.pointer_to_raw_data as usize;
        start..start + self.size_of_raw_data as usize
    }
}

/// Byte offsets of the structures the signer excludes or rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    pub pe_offset: usize,
    pub optional_header_offset: usize,
    /// `CheckSum` field.
    pub checksum: Range<usize>,
    /// Certificate table entry in the data directory array.
    pub certificate_directory: Range<usize>,
    /// Section header table.
    pub section_table: Range<usize>,
}

/// Parsed, borrowed view over a PE/COFF image.
#[derive(Debug, Clone)]
pub struct PeImage<'a> {
    bytes: &'a [u8],
    coff: CoffHeader,
    optional: OptionalHeader,
    data_directories: Vec<DataDirectory>,
    sections: Vec<SectionHeader>,
    layout: HeaderLayout,
    certificate_table: Option<Range<usize>>,
}

fn slice<'a>(
    data: &'a [u8],
    offset: usize,
    size: usize,
    structure: &'static str,
) -> Result<&'a [u8], PeParseError> {
    let end = offset.checked_add(size).ok_or(PeParseError::Truncated {
        structure,
        end: usize::MAX,
        len: data.len(),
    })?;
    data.get(offset..end).ok_or(PeParseError::Truncated {
        structure,
        end,
        len: data.len(),
    })
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn u64_at(data: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

impl<'a> PeImage<'a> {
    /// Parse `data`, failing on the first structural inconsistency.
    pub fn parse(data: &'a [u8]) -> Result<Self, PeParseError> {
        if data.len() < DOS_HEADER_SIZE {
            return Err(PeParseError::TooShort { len: data.len() });
        }
        if &data[0..2] != b"MZ" {
            return Err(PeParseError::MissingMz);
        }
        let pe_offset = u32_at(data, DOS_E_LFANEW_OFFSET) as usize;
        if pe_offset
            .checked_add(PE_SIGNATURE_SIZE)
            .map_or(true, |end| end > data.len())
        {
            return Err(PeParseError::OutOfRangePeHeader { offset: pe_offset });
        }
        if &data[pe_offset..pe_offset + PE_SIGNATURE_SIZE] != PE_SIGNATURE {
            return Err(PeParseError::MissingPe);
        }

        let coff_offset = pe_offset + PE_SIGNATURE_SIZE;
        let coff_bytes = slice(data, coff_offset, COFF_HEADER_SIZE, "COFF header")?;
        let coff = CoffHeader {
            machine: u16_at(coff_bytes, 0),
            number_of_sections: u16_at(coff_bytes, 2),
            time_date_stamp: u32_at(coff_bytes, 4),
            size_of_optional_header: u16_at(coff_bytes, 16),
            characteristics: u16_at(coff_bytes, 18),
        };
        if coff.number_of_sections > MAX_SECTIONS {
            return Err(PeParseError::SectionCountOverflow {
                count: coff.number_of_sections,
                max: MAX_SECTIONS,
            });
        }

        let optional_header_offset = coff_offset + COFF_HEADER_SIZE;
        let magic = u16_at(slice(data, optional_header_offset, 2, "optional header")?, 0);
        let kind = match magic {
            OPTIONAL_HEADER_MAGIC_PE32 => OptionalHeaderKind::Pe32,
            OPTIONAL_HEADER_MAGIC_PE32_PLUS => OptionalHeaderKind::Pe32Plus,
            other => return Err(PeParseError::BadMagic(other)),
        };

        let fixed_size = kind.data_directories_offset();
        let declared = coff.size_of_optional_header;
        if (declared as usize) < fixed_size {
            return Err(PeParseError::OptionalHeaderTooSmall {
                declared,
                required: fixed_size,
            });
        }
        let opt = slice(
            data,
            optional_header_offset,
            declared as usize,
            "optional header",
        )?;

        let image_base = match kind {
            OptionalHeaderKind::Pe32 => u64::from(u32_at(opt, 28)),
            OptionalHeaderKind::Pe32Plus => u64_at(opt, 24),
        };
        let number_of_rva_and_sizes = u32_at(opt, kind.rva_count_offset());
        if number_of_rva_and_sizes > MAX_DATA_DIRECTORIES {
            return Err(PeParseError::DirectoryCountMismatch {
                count: number_of_rva_and_sizes,
                max: MAX_DATA_DIRECTORIES,
            });
        }
        let required = fixed_size + number_of_rva_and_sizes as usize * DATA_DIRECTORY_SIZE;
        if (declared as usize) < required {
            return Err(PeParseError::OptionalHeaderTooSmall { declared, required });
        }
        if (number_of_rva_and_sizes as usize) <= CERTIFICATE_TABLE_INDEX {
            return Err(PeParseError::MissingCertificateDirectory {
                count: number_of_rva_and_sizes,
            });
        }

        let optional = OptionalHeader {
            kind,
            address_of_entry_point: u32_at(opt, 16),
            image_base,
            section_alignment: u32_at(opt, 32),
            file_alignment: u32_at(opt, 36),
            size_of_image: u32_at(opt, 56),
            size_of_headers: u32_at(opt, 60),
            checksum: u32_at(opt, CHECKSUM_OFFSET),
            subsystem: u16_at(opt, 68),
            dll_characteristics: u16_at(opt, 70),
            number_of_rva_and_sizes,
        };

        let data_directories: Vec<DataDirectory> = (0..number_of_rva_and_sizes as usize)
            .map(|index| {
                let at = fixed_size + index * DATA_DIRECTORY_SIZE;
                DataDirectory {
                    virtual_address: u32_at(opt, at),
                    size: u32_at(opt, at + 4),
                }
            })
            .collect();

        let checksum_start = optional_header_offset + CHECKSUM_OFFSET;
        let directory_start =
            optional_header_offset + fixed_size + CERTIFICATE_TABLE_INDEX * DATA_DIRECTORY_SIZE;
        let section_table_start = optional_header_offset + declared as usize;
        let section_table_len = coff.number_of_sections as usize * SECTION_HEADER_SIZE;
        let section_bytes = slice(data, section_table_start, section_table_len, "section table")?;

        let mut sections = Vec::with_capacity(coff.number_of_sections as usize);
        for (index, raw) in section_bytes.chunks_exact(SECTION_HEADER_SIZE).enumerate() {
            let name = String::from_utf8_lossy(&raw[0..8])
                .trim_end_matches('\0')
                .to_string();
            let section = SectionHeader {
                name,
                virtual_size: u32_at(raw, 8),
                virtual_address: u32_at(raw, 12),
                size_of_raw_data: u32_at(raw, 16),
                pointer_to_raw_data: u32_at(raw, 20),
                characteristics: u32_at(raw, 36),
            };
            if section.size_of_raw_data > 0 && section.raw_range().end > data.len() {
                return Err(PeParseError::SectionDataOutOfRange {
                    index,
                    end: section.raw_range().end,
                    name: section.name,
                    len: data.len(),
                });
            }
            sections.push(section);
        }

        let layout = HeaderLayout {
            pe_offset,
            optional_header_offset,
            checksum: checksum_start..checksum_start + CHECKSUM_SIZE,
            certificate_directory: directory_start..directory_start + DATA_DIRECTORY_SIZE,
            section_table: section_table_start..section_table_start + section_table_len,
        };

        let certificate_table =
            Self::locate_certificate_table(
                data,
                data_directories[CERTIFICATE_TABLE_INDEX],
                &layout,
                &sections,
            )?;

        Ok(Self {
            bytes: data,
            coff,
            optional,
            data_directories,
            sections,
            layout,
            certificate_table,
        })
    }

    fn locate_certificate_table(
        data: &[u8],
        directory: DataDirectory,
        layout: &HeaderLayout,
        sections: &[SectionHeader],
    ) -> Result<Option<Range<usize>>, PeParseError> {
        if directory.is_empty() {
            if directory.virtual_address != 0 {
                log::debug!(
                    "Certificate table offset 0x{:x} with zero size treated as absent",
                    directory.virtual_address
                );
            }
            return Ok(None);
        }
        let start = directory.virtual_address as usize;
        let end = start
            .checked_add(directory.size as usize)
            .filter(|end| *end <= data.len())
            .ok_or(PeParseError::CertificateTableOutOfRange {
                offset: directory.virtual_address,
                size: directory.size,
                len: data.len(),
            })?;
        if start < layout.section_table.end {
            return Err(PeParseError::CertificateTableOverlapsHeaders {
                offset: start,
                headers_end: layout.section_table.end,
            });
        }
        let sections_end = sections
            .iter()
            .filter(|section| section.size_of_raw_data > 0)
            .map(|section| section.raw_range().end)
            .max()
            .unwrap_or(0);
        if start < sections_end {
            return Err(PeParseError::CertificateTableOverlapsSections {
                offset: start,
                sections_end,
            });
        }
        if end != data.len() {
            log::warn!(
                "Certificate table 0x{start:x}..0x{end:x} is not at end of file (len=0x{:x})",
                data.len()
            );
        }
        Ok(Some(start..end))
    }

    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
    #[must_use]
    pub fn coff_header(&self) -> &CoffHeader {
        &self.coff
    }
    #[must_use]
    pub fn optional_header(&self) -> &OptionalHeader {
        &self.optional
    }
    #[must_use]
    pub fn is_pe32_plus(&self) -> bool {
        self.optional.kind == OptionalHeaderKind::Pe32Plus
    }
    #[must_use]
    pub fn data_directories(&self) -> &[DataDirectory] {
        &self.data_directories
    }
    #[must_use]
    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }
    #[must_use]
    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    /// Byte range of the `CheckSum` field.
    #[must_use]
    pub fn checksum_range(&self) -> Range<usize> {
        self.layout.checksum.clone()
    }

    /// Byte range of the certificate table data directory entry.
    #[must_use]
    pub fn certificate_directory_range(&self) -> Range<usize> {
        self.layout.certificate_directory.clone()
    }

    /// The certificate table data directory entry as stored in the image.
    #[must_use]
    pub fn certificate_directory(&self) -> DataDirectory {
        self.data_directories[CERTIFICATE_TABLE_INDEX]
    }

    /// File range of an existing certificate table, if any.
    #[must_use]
    pub fn certificate_table(&self) -> Option<Range<usize>> {
        self.certificate_table.clone()
    }

    /// Offset where signed content ends: the certificate table start, or EOF.
    #[must_use]
    pub fn content_end(&self) -> usize {
        self.certificate_table
            .as_ref()
            .map_or(self.bytes.len(), |table| table.start)
    }

    /// Offset at which a new `WIN_CERTIFICATE` will be placed.
    #[must_use]
    pub fn signature_offset(&self) -> usize {
        align_to_certificate_boundary(self.content_end())
    }

    /// End of the mapped image: the larger of `SizeOfHeaders` and the end of
    /// the last section's raw data. Anything between this and the certificate
    /// table is overlay.
    #[must_use]
    pub fn end_of_image(&self) -> usize {
        let sections_end = self
            .sections
            .iter()
            .filter(|section| section.size_of_raw_data > 0)
            .map(|section| section.raw_range().end)
            .max()
            .unwrap_or(0);
        sections_end
            .max(self.optional.size_of_headers as usize)
            .min(self.bytes.len())
    }

    /// Overlay bytes between the end of the image and the signed-content end.
    #[must_use]
    pub fn overlay_len(&self) -> usize {
        self.content_end().saturating_sub(self.end_of_image())
    }

    /// Enumerate the `WIN_CERTIFICATE` entries of an existing certificate table.
    pub fn win_certificates(&self) -> Result<Vec<WinCertificate>, PeParseError> {
        let Some(table) = self.certificate_table.clone() else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        let mut offset = table.start;
        while offset < table.end {
            let header = slice(self.bytes, offset, WIN_CERTIFICATE_HEADER_SIZE, "WIN_CERTIFICATE")
                .map_err(|_| PeParseError::MalformedCertificateEntry { offset })?;
            let length = u32_at(header, 0);
            let entry_end = offset
                .checked_add(length as usize)
                .filter(|end| *end <= table.end)
                .ok_or(PeParseError::MalformedCertificateEntry { offset })?;
            if (length as usize) < WIN_CERTIFICATE_HEADER_SIZE {
                return Err(PeParseError::MalformedCertificateEntry { offset });
            }
            entries.push(WinCertificate {
                length,
                revision: u16_at(header, 4),
                cert_type: u16_at(header, 6),
                certificate: self.bytes[offset + WIN_CERTIFICATE_HEADER_SIZE..entry_end].to_vec(),
            });
            offset = align_to_certificate_boundary(entry_end);
        }
        Ok(entries)
    }
}
