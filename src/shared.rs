use std::fmt;

use serde::{Deserialize, Serialize};

pub type ASN = u32;

/// Relationship of a neighbor as seen from the AS holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Relationships {
    Providers = 1,
    Peers = 2,
    Customers = 3,
    Siblings = 4,
    Unknown = 5,
}

impl Relationships {
    /// Relationship codes used by CAIDA serial-2 files.
    pub fn from_caida_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Relationships::Customers),
            0 => Some(Relationships::Peers),
            _ => None,
        }
    }
}

impl fmt::Display for Relationships {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationships::Providers => "provider",
            Relationships::Peers => "peer",
            Relationships::Customers => "customer",
            Relationships::Siblings => "sibling",
            Relationships::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Direction of one hop of an AS path, walking from the origin toward the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HopDirection {
    Peer,
    Up,
    Down,
    Unknown,
}

impl HopDirection {
    /// Numeric code used in exported path files.
    pub fn code(&self) -> i8 {
        match self {
            HopDirection::Peer => 0,
            HopDirection::Up => 1,
            HopDirection::Down => -1,
            HopDirection::Unknown => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathShape {
    ValleyViolation,
    Up,
    UpPeer,
    UpDown,
    UpPeerDown,
    Peer,
    PeerDown,
    Down,
    Unknown,
}

impl fmt::Display for PathShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathShape::ValleyViolation => "valley_violation",
            PathShape::Up => "Up",
            PathShape::UpPeer => "Up-Peer",
            PathShape::UpDown => "Up-Down",
            PathShape::UpPeerDown => "Up-Peer-Down",
            PathShape::Peer => "Peer",
            PathShape::PeerDown => "Peer-Down",
            PathShape::Down => "Down",
            PathShape::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ROAValidity {
    Valid = 0,
    Unknown = 1,
    InvalidOrigin = 2,
}

impl fmt::Display for ROAValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ROAValidity::Valid => "VALID",
            ROAValidity::Unknown => "UNKNOWN",
            ROAValidity::InvalidOrigin => "INVALID_ORIGIN",
        };
        write!(f, "{}", s)
    }
}

/// Kind of forged path a hijacker announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForgedPathKind {
    /// The hijacker claims to be the origin.
    Type0,
    /// The hijacker claims the victim as its next hop.
    Type1,
}

impl ForgedPathKind {
    /// Number of forged hops, used to name the path export files.
    pub fn hops(&self) -> usize {
        match self {
            ForgedPathKind::Type0 => 0,
            ForgedPathKind::Type1 => 1,
        }
    }

    pub fn forged_path(&self, victim: ASN) -> Vec<ASN> {
        match self {
            ForgedPathKind::Type0 => Vec::new(),
            ForgedPathKind::Type1 => vec![victim],
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PrefixError {
    #[error("invalid IPv4 prefix {0:?}, expected A.B.C.D/M")]
    InvalidFormat(String),
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("line {line}: invalid relationship record ({reason})")]
    InvalidRecord { line: usize, reason: String },
    #[error("unknown relationship code {0}")]
    UnknownRelationship(i32),
    #[error("AS{0} not found in the graph")]
    UnknownAsn(ASN),
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UsageError {
    #[error("give either a percentage of ASes or a list of ASes to enable ROV, not both or neither")]
    RovSelectionConflict,
    #[error("percentage {0} out of range, expected a value in (0, 100]")]
    InvalidPercentage(f64),
    #[error("AS{asn} has no {kind} prefix to propagate")]
    NoAnnouncement { asn: ASN, kind: &'static str },
    #[error("invalid degree ranges: {0}")]
    InvalidClusterRanges(String),
    #[error("missing {0}")]
    MissingInput(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Prefix(#[from] PrefixError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, SimError>;
