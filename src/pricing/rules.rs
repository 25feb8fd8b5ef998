//! Declarative rules for pulling a price out of a feed document.
//!
//! Feeds disagree on field names, casing and number formats, so each
//! instrument class maps to an ordered list of rules. The first rule that
//! yields a value wins.

use super::parse::parse_decimal_value;
use crate::core::InstrumentClass;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// Quote fields in priority order: buy, then sell, then a plain price.
const BUY_FIELDS: &[&str] = &["buying", "buy", "alış", "alis", "alis_fiyati"];
const SELL_FIELDS: &[&str] = &["selling", "sell", "satış", "satis", "satis_fiyati"];
const PRICE_FIELDS: &[&str] = &["price", "value", "last", "rate"];

/// Known spellings of the per-gram gold entry, tried before any heuristic.
const GOLD_FIELDS: &[&str] = &[
    "gram-altin",
    "GRA",
    "gram_altin",
    "gramaltin",
    "GramAltin",
    "Gram Altın",
];
const GOLD_TYPE_FIELDS: &[&str] = &["Tür", "tür", "Type", "type", "Name", "name"];
const GOLD_WORDS: &[&str] = &["altin", "altın", "gold"];

/// Upper bound (exclusive) for a believable per-gram gold price.
const MAX_GOLD_GRAM_PRICE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    BuiltIn,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Quote object stored under a currency code, e.g. `{"USD": {"Buying": "32,15"}}`.
    ByCurrencyCode(&'static str),
    /// Per-gram gold quote found by known names or name/type heuristics.
    ByGoldName,
    /// The document itself is the quote: a bare number, string or quote object.
    GenericValue,
}

impl ExtractionRule {
    pub fn apply(&self, doc: &Value) -> Option<Decimal> {
        match self {
            ExtractionRule::ByCurrencyCode(code) => {
                let obj = doc.as_object()?;
                let entry = obj.get(*code).or_else(|| {
                    obj.iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(code))
                        .map(|(_, v)| v)
                })?;
                quote_value(entry)
            }
            ExtractionRule::ByGoldName => {
                let gram = gold_candidates(doc.as_object()?)
                    .into_iter()
                    .find_map(quote_value)?;
                (gram > Decimal::ZERO && gram < Decimal::from(MAX_GOLD_GRAM_PRICE)).then_some(gram)
            }
            ExtractionRule::GenericValue => quote_value(doc),
        }
    }
}

/// Ordered rules plus the factor applied to whatever they find.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPlan {
    pub rules: Vec<ExtractionRule>,
    pub multiplier: Decimal,
}

impl ExtractionPlan {
    /// `None` when the class cannot be priced from the given source.
    pub fn for_class(class: InstrumentClass, source: FeedSource) -> Option<Self> {
        let (rules, multiplier) = match (class, source) {
            (InstrumentClass::Currency(currency), FeedSource::BuiltIn) => {
                (vec![ExtractionRule::ByCurrencyCode(currency.code())], Decimal::ONE)
            }
            (InstrumentClass::Currency(currency), FeedSource::Custom) => (
                vec![
                    ExtractionRule::ByCurrencyCode(currency.code()),
                    ExtractionRule::GenericValue,
                ],
                Decimal::ONE,
            ),
            (InstrumentClass::Gold(denomination), _) => {
                (vec![ExtractionRule::ByGoldName], denomination.multiplier())
            }
            (InstrumentClass::Other, FeedSource::Custom) => {
                (vec![ExtractionRule::GenericValue], Decimal::ONE)
            }
            _ => return None,
        };
        Some(Self { rules, multiplier })
    }

    pub fn evaluate(&self, doc: &Value) -> Option<Decimal> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(doc))
            .map(|value| value * self.multiplier)
    }
}

fn field(obj: &Map<String, Value>, names: &[&str]) -> Option<Decimal> {
    names.iter().find_map(|name| {
        obj.iter()
            .filter(|(k, _)| k.to_lowercase() == *name)
            .find_map(|(_, v)| parse_decimal_value(v))
    })
}

/// Reads a quote: scalars parse directly, objects go through the buy, sell
/// and price fields in that order.
pub fn quote_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Object(obj) => field(obj, BUY_FIELDS)
            .or_else(|| field(obj, SELL_FIELDS))
            .or_else(|| field(obj, PRICE_FIELDS)),
        other => parse_decimal_value(other),
    }
}

fn looks_like_gram_gold(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("gram") && GOLD_WORDS.iter().any(|w| name.contains(w))
}

fn declares_gold(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    GOLD_TYPE_FIELDS
        .iter()
        .filter_map(|f| obj.get(*f).and_then(Value::as_str))
        .any(|declared| {
            let declared = declared.to_lowercase();
            GOLD_WORDS.iter().any(|w| declared.contains(w))
        })
}

/// Exact names first, then every field whose name or declared type hints at gram gold.
fn gold_candidates(obj: &Map<String, Value>) -> Vec<&Value> {
    let exact: Vec<&Value> = GOLD_FIELDS.iter().filter_map(|f| obj.get(*f)).collect();
    if !exact.is_empty() {
        return exact;
    }
    obj.iter()
        .filter(|(name, value)| looks_like_gram_gold(name) || declares_gold(value))
        .map(|(_, value)| value)
        .collect()
}
