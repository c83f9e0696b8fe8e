//! Decoding of 32-bit page transition codes.
//!
//! The low byte of a transition carries the core navigation category; the
//! high byte carries independent qualifier flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const CORE_MASK: u32 = 0xFF;

// ── TransitionType ────────────────────────────────────────────────────────────

/// Primary category of a visit transition.
///
/// Serialized as its snake_case name; unrecognised core values are kept as
/// `unknown_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransitionType {
    Link,
    Typed,
    AutoBookmark,
    AutoSubframe,
    ManualSubframe,
    Generated,
    AutoToplevel,
    FormSubmit,
    Reload,
    Keyword,
    KeywordGenerated,
    Unknown(u8),
}

/// Core value → category, indexed by core value.
const CORE_TYPES: [TransitionType; 11] = [
    TransitionType::Link,
    TransitionType::Typed,
    TransitionType::AutoBookmark,
    TransitionType::AutoSubframe,
    TransitionType::ManualSubframe,
    TransitionType::Generated,
    TransitionType::AutoToplevel,
    TransitionType::FormSubmit,
    TransitionType::Reload,
    TransitionType::Keyword,
    TransitionType::KeywordGenerated,
];

impl TransitionType {
    /// Map a core value (the low byte of a transition) to its category.
    pub fn from_core(core: u8) -> Self {
        CORE_TYPES
            .get(core as usize)
            .copied()
            .unwrap_or(TransitionType::Unknown(core))
    }

    fn name(&self) -> &'static str {
        match self {
            TransitionType::Link => "link",
            TransitionType::Typed => "typed",
            TransitionType::AutoBookmark => "auto_bookmark",
            TransitionType::AutoSubframe => "auto_subframe",
            TransitionType::ManualSubframe => "manual_subframe",
            TransitionType::Generated => "generated",
            TransitionType::AutoToplevel => "auto_toplevel",
            TransitionType::FormSubmit => "form_submit",
            TransitionType::Reload => "reload",
            TransitionType::Keyword => "keyword",
            TransitionType::KeywordGenerated => "keyword_generated",
            TransitionType::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionType::Unknown(core) => write!(f, "unknown_{core}"),
            known => f.write_str(known.name()),
        }
    }
}

impl FromStr for TransitionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(known) = CORE_TYPES.iter().find(|t| t.name() == s) {
            return Ok(*known);
        }
        s.strip_prefix("unknown_")
            .and_then(|n| n.parse::<u8>().ok())
            .map(TransitionType::Unknown)
            .ok_or_else(|| format!("unrecognised transition type: {s}"))
    }
}

impl TryFrom<String> for TransitionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransitionType> for String {
    fn from(value: TransitionType) -> Self {
        value.to_string()
    }
}

// ── TransitionQualifier ───────────────────────────────────────────────────────

/// Independent qualifier flag carried in the high byte of a transition.
///
/// Variants are declared in ascending bit order; that order is the order in
/// which [`TransitionDecoder::decode`] emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionQualifier {
    ChainStart,
    ChainEnd,
    ClientRedirect,
    ServerRedirect,
    IsRedirect,
    FromAddressBar,
    HomePage,
    UserGesture,
}

impl TransitionQualifier {
    /// All qualifiers, ascending by bit value.
    pub const ALL: [TransitionQualifier; 8] = [
        TransitionQualifier::ChainStart,
        TransitionQualifier::ChainEnd,
        TransitionQualifier::ClientRedirect,
        TransitionQualifier::ServerRedirect,
        TransitionQualifier::IsRedirect,
        TransitionQualifier::FromAddressBar,
        TransitionQualifier::HomePage,
        TransitionQualifier::UserGesture,
    ];

    /// The bit mask signalling this qualifier.
    pub fn mask(self) -> u32 {
        match self {
            TransitionQualifier::ChainStart => 0x0100_0000,
            TransitionQualifier::ChainEnd => 0x0200_0000,
            TransitionQualifier::ClientRedirect => 0x0400_0000,
            TransitionQualifier::ServerRedirect => 0x0800_0000,
            TransitionQualifier::IsRedirect => 0x1000_0000,
            TransitionQualifier::FromAddressBar => 0x2000_0000,
            TransitionQualifier::HomePage => 0x4000_0000,
            TransitionQualifier::UserGesture => 0x8000_0000,
        }
    }
}

// ── TransitionDecoder ─────────────────────────────────────────────────────────

/// Splits a raw transition code into its category and qualifiers.
pub struct TransitionDecoder;

impl TransitionDecoder {
    /// Decode `transition`. Total: every 32-bit input yields a result.
    pub fn decode(transition: u32) -> (TransitionType, Vec<TransitionQualifier>) {
        let core = (transition & CORE_MASK) as u8;
        let qualifiers = TransitionQualifier::ALL
            .into_iter()
            .filter(|q| transition & q.mask() != 0)
            .collect();
        (TransitionType::from_core(core), qualifiers)
    }

    /// Decode a value read from a database column.
    ///
    /// Only the low 32 bits are meaningful; anything above is discarded.
    pub fn decode_raw(raw: i64) -> (TransitionType, Vec<TransitionQualifier>) {
        Self::decode(raw as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── categories ────────────────────────────────────────────────────────────

    #[test]
    fn test_named_categories() {
        let expected = [
            "link",
            "typed",
            "auto_bookmark",
            "auto_subframe",
            "manual_subframe",
            "generated",
            "auto_toplevel",
            "form_submit",
            "reload",
            "keyword",
            "keyword_generated",
        ];
        for (core, name) in expected.iter().enumerate() {
            let (category, qualifiers) = TransitionDecoder::decode(core as u32);
            assert_eq!(category.to_string(), *name);
            assert!(!matches!(category, TransitionType::Unknown(_)));
            assert!(qualifiers.is_empty());
        }
    }

    #[test]
    fn test_unknown_category_boundary() {
        let (category, _) = TransitionDecoder::decode(11);
        assert_eq!(category, TransitionType::Unknown(11));
        assert_eq!(category.to_string(), "unknown_11");

        let (category, _) = TransitionDecoder::decode(0xFF);
        assert_eq!(category.to_string(), "unknown_255");
    }

    #[test]
    fn test_core_ignores_middle_bits() {
        // Bits 8..24 belong to neither the core nor the qualifiers.
        let (category, qualifiers) = TransitionDecoder::decode(0x0000_1208);
        assert_eq!(category, TransitionType::Reload);
        assert!(qualifiers.is_empty());
    }

    // ── qualifiers ────────────────────────────────────────────────────────────

    #[test]
    fn test_single_qualifier_bits() {
        for q in TransitionQualifier::ALL {
            let (_, qualifiers) = TransitionDecoder::decode(q.mask());
            assert_eq!(qualifiers, vec![q]);
        }
    }

    #[test]
    fn test_combined_qualifiers_ascending_order() {
        let (category, qualifiers) = TransitionDecoder::decode(0x8100_0000);
        assert_eq!(category, TransitionType::Link);
        assert_eq!(
            qualifiers,
            vec![TransitionQualifier::ChainStart, TransitionQualifier::UserGesture]
        );

        let (_, qualifiers) = TransitionDecoder::decode(0x3000_0001);
        assert_eq!(
            qualifiers,
            vec![
                TransitionQualifier::IsRedirect,
                TransitionQualifier::FromAddressBar
            ]
        );
    }

    #[test]
    fn test_all_bits_set() {
        let (category, qualifiers) = TransitionDecoder::decode(u32::MAX);
        assert_eq!(category, TransitionType::Unknown(255));
        assert_eq!(qualifiers, TransitionQualifier::ALL.to_vec());
    }

    #[test]
    fn test_decode_raw_truncates_to_u32() {
        let (category, qualifiers) = TransitionDecoder::decode_raw(0x1_0000_0001);
        assert_eq!(category, TransitionType::Typed);
        assert!(qualifiers.is_empty());

        // Signed storage of a set high bit.
        let (_, qualifiers) = TransitionDecoder::decode_raw(-2_113_929_216); // 0x82000000
        assert_eq!(
            qualifiers,
            vec![TransitionQualifier::ChainEnd, TransitionQualifier::UserGesture]
        );
    }

    // ── serde ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_transition_type_serde() {
        let json = serde_json::to_string(&TransitionType::FormSubmit).unwrap();
        assert_eq!(json, "\"form_submit\"");
        let json = serde_json::to_string(&TransitionType::Unknown(42)).unwrap();
        assert_eq!(json, "\"unknown_42\"");

        let back: TransitionType = serde_json::from_str("\"unknown_42\"").unwrap();
        assert_eq!(back, TransitionType::Unknown(42));
        assert!(serde_json::from_str::<TransitionType>("\"teleport\"").is_err());
    }

    #[test]
    fn test_qualifier_serde() {
        let json = serde_json::to_string(&TransitionQualifier::FromAddressBar).unwrap();
        assert_eq!(json, "\"from_address_bar\"");
    }
}
