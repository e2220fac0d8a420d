use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::board::{Strain, Vulnerability, dealer_for_board};
use super::cards::{CardError, Direction, Hand, Hands, Seat, Suit};
use super::event::{BoardKey, EventDate, EventId};

const HANDVIEWER_URL: &str = "https://www.bridgebase.com/tools/handviewer.html";

/// Double-dummy tricks for each declarer seat and strain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrickTable {
    tricks: [[u8; 5]; 4],
}

impl TrickTable {
    pub fn from_rows(tricks: [[u8; 5]; 4]) -> Self {
        Self { tricks }
    }

    pub fn get(&self, declarer: Seat, strain: Strain) -> u8 {
        self.tricks[declarer.index()][strain.index()]
    }

    pub fn set(&mut self, declarer: Seat, strain: Strain, tricks: u8) {
        self.tricks[declarer.index()][strain.index()] = tricks;
    }

    /// Best of the two partners' trick counts in `strain`.
    pub fn side_max(&self, direction: Direction, strain: Strain) -> u8 {
        let [a, b] = direction.seats();
        self.get(a, strain).max(self.get(b, strain))
    }

    pub fn is_within_range(&self) -> bool {
        self.tricks.iter().flatten().all(|t| *t <= 13)
    }
}

impl Serialize for TrickTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for seat in Seat::ALL {
            let row: StrainRow = StrainRow(self.tricks[seat.index()]);
            map.serialize_entry(&seat, &row)?;
        }
        map.end()
    }
}

struct StrainRow([u8; 5]);

impl Serialize for StrainRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        for strain in Strain::ALL {
            map.serialize_entry(strain.as_str(), &self.0[strain.index()])?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TrickTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, HashMap<String, u8>>::deserialize(deserializer)?;
        let mut table = TrickTable::default();
        for seat in Seat::ALL {
            let row = raw
                .get(&seat.letter().to_string())
                .ok_or_else(|| serde::de::Error::custom(format!("missing seat {seat}")))?;
            for strain in Strain::ALL {
                let tricks = row.get(strain.as_str()).copied().ok_or_else(|| {
                    serde::de::Error::custom(format!("missing {strain} for seat {seat}"))
                })?;
                table.set(seat, strain, tricks);
            }
        }
        Ok(table)
    }
}

/// Par outcome in the stored layout. A passed-out board has no declarer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimum {
    pub text: String,
    pub score: i32,
    pub declarer: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<Strain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tricks: Option<u8>,
}

impl Optimum {
    pub fn pass_out() -> Self {
        Self {
            text: "Pass Out".to_string(),
            score: 0,
            declarer: None,
            contract: None,
            level: None,
            strain: None,
            tricks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fit {
    pub suit: Suit,
    pub length: u8,
    pub tricks: u8,
}

/// Law of Total Tricks indicator for the deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lott {
    pub total_tricks: u8,
    pub ns_fit: Fit,
    pub ew_fit: Fit,
}

/// Everything the double-dummy pass attaches to a deal.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub dd_analysis: TrickTable,
    pub optimum: Optimum,
    pub lott: Lott,
}

/// One board's cards plus derived metadata, as kept in `hands_database.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DealRecord")]
pub struct Deal {
    pub event_id: EventId,
    pub board: u32,
    #[serde(with = "crate::domain::event::lenient_date")]
    pub date: Option<EventDate>,
    pub dealer: Seat,
    pub vulnerability: Vulnerability,
    #[serde(rename = "N")]
    north: Hand,
    #[serde(rename = "E")]
    east: Hand,
    #[serde(rename = "S")]
    south: Hand,
    #[serde(rename = "W")]
    west: Hand,
    #[serde(skip_serializing_if = "Option::is_none")]
    dd_analysis: Option<TrickTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optimum: Option<Optimum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lott: Option<Lott>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lin_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bbo_url: Option<String>,
    /// Fields written by other tools are carried through untouched.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct DealRecord {
    event_id: EventId,
    board: u32,
    #[serde(default, with = "crate::domain::event::lenient_date")]
    date: Option<EventDate>,
    #[serde(default)]
    dealer: Option<Seat>,
    #[serde(default)]
    vulnerability: Option<Vulnerability>,
    #[serde(rename = "N")]
    north: Hand,
    #[serde(rename = "E")]
    east: Hand,
    #[serde(rename = "S")]
    south: Hand,
    #[serde(rename = "W")]
    west: Hand,
    #[serde(default)]
    dd_analysis: Option<TrickTable>,
    #[serde(default)]
    optimum: Option<Optimum>,
    #[serde(default)]
    lott: Option<Lott>,
    #[serde(default)]
    lin_string: Option<String>,
    #[serde(default)]
    bbo_url: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<DealRecord> for Deal {
    fn from(record: DealRecord) -> Self {
        let mut deal = Deal {
            dealer: record.dealer.unwrap_or_else(|| dealer_for_board(record.board)),
            vulnerability: record
                .vulnerability
                .unwrap_or_else(|| Vulnerability::for_board(record.board)),
            event_id: record.event_id,
            board: record.board,
            date: record.date,
            north: record.north,
            east: record.east,
            south: record.south,
            west: record.west,
            dd_analysis: None,
            optimum: None,
            lott: None,
            lin_string: record.lin_string,
            bbo_url: record.bbo_url,
            extra: record.extra,
        };
        // Partial analyses from older tools are dropped so the deal is re-solved.
        if let (Some(dd), Some(optimum), Some(lott)) = (record.dd_analysis, record.optimum, record.lott) {
            deal.set_enrichment(Enrichment {
                dd_analysis: dd,
                optimum,
                lott,
            });
        }
        if deal.lin_string.is_none() || deal.bbo_url.is_none() {
            deal.refresh_viewer_link();
        }
        deal
    }
}

impl Deal {
    /// New deal with dealer and vulnerability derived from the board number.
    pub fn new(event_id: EventId, board: u32, date: Option<EventDate>, hands: Hands) -> Self {
        let mut deal = Self {
            event_id,
            board,
            date,
            dealer: dealer_for_board(board),
            vulnerability: Vulnerability::for_board(board),
            north: *hands.get(Seat::N),
            east: *hands.get(Seat::E),
            south: *hands.get(Seat::S),
            west: *hands.get(Seat::W),
            dd_analysis: None,
            optimum: None,
            lott: None,
            lin_string: None,
            bbo_url: None,
            extra: Map::new(),
        };
        deal.refresh_viewer_link();
        deal
    }

    pub fn key(&self) -> BoardKey {
        BoardKey::new(self.event_id.clone(), self.board)
    }

    pub fn hands(&self) -> Hands {
        Hands::new(self.north, self.east, self.south, self.west)
    }

    pub fn validate_cards(&self) -> Result<(), CardError> {
        self.hands().validate()
    }

    pub fn same_cards(&self, other: &Deal) -> bool {
        self.hands() == other.hands()
    }

    pub fn is_enriched(&self) -> bool {
        self.dd_analysis.is_some() && self.optimum.is_some() && self.lott.is_some()
    }

    pub fn dd_analysis(&self) -> Option<&TrickTable> {
        self.dd_analysis.as_ref()
    }

    pub fn optimum(&self) -> Option<&Optimum> {
        self.optimum.as_ref()
    }

    pub fn lott(&self) -> Option<&Lott> {
        self.lott.as_ref()
    }

    pub fn set_enrichment(&mut self, enrichment: Enrichment) {
        self.dd_analysis = Some(enrichment.dd_analysis);
        self.optimum = Some(enrichment.optimum);
        self.lott = Some(enrichment.lott);
    }

    pub fn lin_string(&self) -> Option<&str> {
        self.lin_string.as_deref()
    }

    pub fn bbo_url(&self) -> Option<&str> {
        self.bbo_url.as_deref()
    }

    /// Re-tag the deal with another event id; cards are untouched.
    pub fn retag(&mut self, event_id: EventId) {
        self.event_id = event_id;
    }

    fn refresh_viewer_link(&mut self) {
        let lin = lin_string(&self.hands(), self.board, self.dealer, self.vulnerability);
        self.bbo_url = Some(format!("{}?lin={}", HANDVIEWER_URL, urlencoding::encode(&lin)));
        self.lin_string = Some(lin);
    }
}

/// BBO hand-viewer record: dealer digit then South, West, North, East hands.
pub fn lin_string(hands: &Hands, board: u32, dealer: Seat, vulnerability: Vulnerability) -> String {
    let dealer_digit = match dealer {
        Seat::S => 1,
        Seat::W => 2,
        Seat::N => 3,
        Seat::E => 4,
    };
    let hand_text = [Seat::S, Seat::W, Seat::N, Seat::E]
        .iter()
        .map(|seat| {
            let hand = hands.get(*seat);
            Suit::ALL
                .iter()
                .map(|suit| format!("{}{}", suit.letter(), hand.suit_string(*suit)))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "qx|o{board}|md|{dealer_digit}{hand_text}|rh||ah|Board {board}|sv|{}|pg||",
        vulnerability.lin_code()
    )
}
