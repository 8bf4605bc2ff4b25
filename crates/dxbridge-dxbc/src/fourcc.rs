use core::fmt;

/// A four-character chunk identifier (`DXBC`, `ISGN`, `SHEX`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const DXBC: Self = Self(*b"DXBC");
    pub const ISGN: Self = Self(*b"ISGN");
    pub const ISG1: Self = Self(*b"ISG1");
    pub const OSGN: Self = Self(*b"OSGN");
    pub const OSG1: Self = Self(*b"OSG1");
    pub const PSGN: Self = Self(*b"PSGN");
    pub const PSG1: Self = Self(*b"PSG1");
    pub const PCSG: Self = Self(*b"PCSG");
    pub const PCG1: Self = Self(*b"PCG1");
    pub const SHDR: Self = Self(*b"SHDR");
    pub const SHEX: Self = Self(*b"SHEX");

    /// Returns the alternate spelling some toolchains emit for signature chunks
    /// (`ISGN` <-> `ISG1`, `PCSG` <-> `PCG1`, ...).
    pub fn signature_variant(self) -> Option<Self> {
        Some(match self {
            Self::ISGN => Self::ISG1,
            Self::OSGN => Self::OSG1,
            Self::PSGN => Self::PSG1,
            Self::PCSG => Self::PCG1,
            Self::ISG1 => Self::ISGN,
            Self::OSG1 => Self::OSGN,
            Self::PSG1 => Self::PSGN,
            Self::PCG1 => Self::PCSG,
            _ => return None,
        })
    }

    /// `*SG1` / `PCG1` chunks use the 32-byte signature entry layout.
    pub fn is_v1_signature(self) -> bool {
        self.0[3] == b'1'
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC(\"{self}\")")
    }
}
