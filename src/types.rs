use core::fmt;

pub const MAX_CONNECTIONS: usize = 4;
pub const MAX_SCAN_CANDIDATES: usize = 32;
pub const MAX_PCL_CHANNELS: usize = 64;
pub const MAX_BUNDLE_CANDIDATES: usize = 8;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConnectionId(pub u8);

impl ConnectionId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vdev{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: Self = Self([0; 6]);
    pub const BROADCAST: Self = Self([0xff; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Band {
    Ghz2 = 0,
    Ghz5 = 1,
    Ghz6 = 2,
}

impl Band {
    // Channel-center ranges used by the regulatory helpers of most stacks.
    pub const fn from_freq(freq_mhz: u16) -> Option<Self> {
        match freq_mhz {
            2401..=2495 => Some(Self::Ghz2),
            4900..=5920 => Some(Self::Ghz5),
            5925..=7125 => Some(Self::Ghz6),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ghz2 => "2g",
            Self::Ghz5 => "5g",
            Self::Ghz6 => "6g",
        }
    }

    pub const fn mask_bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of bands, one bit per [`Band`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BandMask(pub u8);

impl BandMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b111);

    pub const fn contains(self, band: Band) -> bool {
        self.0 & band.mask_bit() != 0
    }

    pub const fn with(self, band: Band) -> Self {
        Self(self.0 | band.mask_bit())
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when the mask holds any band other than `band`.
    pub const fn has_other_than(self, band: Band) -> bool {
        self.0 & !band.mask_bit() & Self::ALL.0 != 0
    }
}
