//! Composite identifiers.
//!
//! Every id renders as a plain digit string and parses back losslessly, so
//! ids stay stable through repeated splits and through persistence:
//!
//! - vehicle road: `{source}{part:03}`
//! - pedestrian road: `{source}{split:02}`
//! - sidewalk: `{from}{to}{side}{split:02}`, node fields zero-padded to a
//!   common width of at least six digits
//! - crossing: `{owner sidewalk stem}{kind}{split:02}`

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use serde::{Serialize, Serializer};

use crate::geometry::Side;
use crate::{Error, NodeId, WayId};

const MIN_NODE_WIDTH: usize = 6;
/// Largest split index representable in two digits.
pub const MAX_SPLIT_INDEX: u8 = 99;

fn digit_count(value: u64) -> usize {
    value.checked_ilog10().map_or(1, |d| d as usize + 1)
}

fn invalid(text: &str) -> Error {
    Error::InvalidId(text.to_string())
}

fn parse_number<T: FromStr>(digits: &str, whole: &str) -> Result<T, Error> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(whole));
    }
    digits.parse().map_err(|_| invalid(whole))
}

/// Splits off the last `width` characters of an all-digit id.
fn split_suffix(text: &str, width: usize) -> Result<(&str, &str), Error> {
    if !text.bytes().all(|b| b.is_ascii_digit()) || text.len() <= width {
        return Err(invalid(text));
    }
    Ok(text.split_at(text.len() - width))
}

fn side_digit(side: Side) -> u8 {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

/// Vehicle road id: source way plus a three digit part index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId {
    pub source: WayId,
    pub part: u16,
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.source, self.part)
    }
}

impl FromStr for VehicleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, part) = split_suffix(s, 3)?;
        Ok(VehicleId {
            source: parse_number(source, s)?,
            part: parse_number(part, s)?,
        })
    }
}

/// Pedestrian road id: source way plus a two digit split index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PedestrianId {
    pub source: WayId,
    pub split: u8,
}

impl PedestrianId {
    pub fn new(source: WayId) -> Self {
        PedestrianId { source, split: 0 }
    }
}

impl fmt::Display for PedestrianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.source, self.split)
    }
}

impl FromStr for PedestrianId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, split) = split_suffix(s, 2)?;
        Ok(PedestrianId {
            source: parse_number(source, s)?,
            split: parse_number(split, s)?,
        })
    }
}

/// Sidewalk id without its split index: the directed edge it was built
/// along and the side of that edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SidewalkStem {
    pub from: NodeId,
    pub to: NodeId,
    pub side: Side,
}

impl fmt::Display for SidewalkStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = MIN_NODE_WIDTH
            .max(digit_count(self.from))
            .max(digit_count(self.to));
        write!(
            f,
            "{:0width$}{:0width$}{}",
            self.from,
            self.to,
            side_digit(self.side)
        )
    }
}

impl FromStr for SidewalkStem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (nodes, side) = split_suffix(s, 1)?;
        let side = match side {
            "0" => Side::Left,
            "1" => Side::Right,
            _ => return Err(invalid(s)),
        };
        if nodes.len() < 2 * MIN_NODE_WIDTH || nodes.len() % 2 != 0 {
            return Err(invalid(s));
        }
        let (from, to) = nodes.split_at(nodes.len() / 2);
        Ok(SidewalkStem {
            from: parse_number(from, s)?,
            to: parse_number(to, s)?,
            side,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SidewalkId {
    pub stem: SidewalkStem,
    pub split: u8,
}

impl SidewalkId {
    pub fn new(from: NodeId, to: NodeId, side: Side) -> Self {
        SidewalkId {
            stem: SidewalkStem { from, to, side },
            split: 0,
        }
    }

    pub fn side(&self) -> Side {
        self.stem.side
    }

    /// Id of the companion sidewalk on the other side of the same edge.
    #[must_use]
    pub fn neighbour_id(&self) -> SidewalkId {
        SidewalkId {
            stem: SidewalkStem {
                side: self.stem.side.opposite(),
                ..self.stem
            },
            split: self.split,
        }
    }
}

impl fmt::Display for SidewalkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.stem, self.split)
    }
}

impl FromStr for SidewalkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stem, split) = split_suffix(s, 2)?;
        Ok(SidewalkId {
            stem: stem.parse().map_err(|_| invalid(s))?,
            split: parse_number(split, s)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrossingKind {
    /// Mapped crossing at a tagged node.
    Official,
    /// Generated at regular intervals along a sidewalk pair.
    Regular,
}

impl CrossingKind {
    fn digit(self) -> u8 {
        match self {
            CrossingKind::Official => 0,
            CrossingKind::Regular => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrossingStem {
    pub owner: SidewalkStem,
    pub kind: CrossingKind,
}

impl fmt::Display for CrossingStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.owner, self.kind.digit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrossingId {
    pub stem: CrossingStem,
    pub split: u8,
}

impl CrossingId {
    pub fn kind(&self) -> CrossingKind {
        self.stem.kind
    }
}

impl fmt::Display for CrossingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.stem, self.split)
    }
}

impl FromStr for CrossingId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, split) = split_suffix(s, 2)?;
        let (owner, kind) = split_suffix(head, 1).map_err(|_| invalid(s))?;
        let kind = match kind {
            "0" => CrossingKind::Official,
            "1" => CrossingKind::Regular,
            _ => return Err(invalid(s)),
        };
        Ok(CrossingId {
            stem: CrossingStem {
                owner: owner.parse().map_err(|_| invalid(s))?,
                kind,
            },
            split: parse_number(split, s)?,
        })
    }
}

macro_rules! serialize_as_string {
    ($($id:ty),+) => {
        $(
            impl Serialize for $id {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }
        )+
    };
}

serialize_as_string!(VehicleId, PedestrianId, SidewalkId, CrossingId);

/// Id prefix that split indices are allocated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdStem {
    Pedestrian(WayId),
    Sidewalk(SidewalkStem),
    Crossing(CrossingStem),
}

impl fmt::Display for IdStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdStem::Pedestrian(source) => write!(f, "pedestrian road {source}"),
            IdStem::Sidewalk(stem) => write!(f, "sidewalk {stem}"),
            IdStem::Crossing(stem) => write!(f, "crossing {stem}"),
        }
    }
}

/// Next free split index per id stem. Indices are never reused.
#[derive(Debug, Default, Clone)]
pub(crate) struct SplitCounters {
    next: HashMap<IdStem, u8>,
}

impl SplitCounters {
    /// Marks `split` as taken under `stem`.
    pub(crate) fn register(&mut self, stem: IdStem, split: u8) {
        let next = self.next.entry(stem).or_insert(0);
        *next = (*next).max(split.saturating_add(1));
    }

    /// Number of split indices still free under `stem`.
    pub(crate) fn remaining(&self, stem: IdStem) -> usize {
        let next = self.next.get(&stem).copied().unwrap_or(0);
        (usize::from(MAX_SPLIT_INDEX) + 1).saturating_sub(usize::from(next))
    }

    pub(crate) fn allocate(&mut self, stem: IdStem) -> Result<u8, Error> {
        let next = self.next.entry(stem).or_insert(0);
        if *next > MAX_SPLIT_INDEX {
            return Err(Error::SplitIndexExhausted(stem.to_string()));
        }
        let split = *next;
        *next += 1;
        Ok(split)
    }
}
