use crate::content_type::ContentType;
use crate::{Error, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Champs d'en-tête MMS bien connus (code avec le bit de poids fort, comme sur le fil)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HeaderField {
    Bcc = 0x81,
    Cc = 0x82,
    ContentLocation = 0x83,
    ContentType = 0x84,
    Date = 0x85,
    DeliveryReport = 0x86,
    DeliveryTime = 0x87,
    Expiry = 0x88,
    From = 0x89,
    MessageClass = 0x8A,
    MessageId = 0x8B,
    MessageType = 0x8C,
    MmsVersion = 0x8D,
    MessageSize = 0x8E,
    Priority = 0x8F,
    ReadReport = 0x90,
    ReportAllowed = 0x91,
    ResponseStatus = 0x92,
    ResponseText = 0x93,
    SenderVisibility = 0x94,
    Status = 0x95,
    Subject = 0x96,
    To = 0x97,
    TransactionId = 0x98,
    RetrieveStatus = 0x99,
    RetrieveText = 0x9A,
    ReadStatus = 0x9B,
    ReplyCharging = 0x9C,
    ReplyChargingDeadline = 0x9D,
    ReplyChargingId = 0x9E,
    ReplyChargingSize = 0x9F,
    Store = 0xA2,
    Stored = 0xA7,
    DistributionIndicator = 0xB1,
    StatusText = 0xB6,
    ContentClass = 0xBA,
    DrmContent = 0xBB,
    AdaptationAllowed = 0xBC,
    ReplaceId = 0xBD,
    CancelId = 0xBE,
}

/// Primitive d'encodage attendue pour un champ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Octet,
    LongInteger,
    Text,
    EncodedString,
    AddressList,
    Time,
    From,
    MessageClass,
    ContentType,
}

impl HeaderField {
    pub fn from_code(code: u8) -> Option<Self> {
        use HeaderField::*;
        let field = match code {
            0x81 => Bcc,
            0x82 => Cc,
            0x83 => ContentLocation,
            0x84 => ContentType,
            0x85 => Date,
            0x86 => DeliveryReport,
            0x87 => DeliveryTime,
            0x88 => Expiry,
            0x89 => From,
            0x8A => MessageClass,
            0x8B => MessageId,
            0x8C => MessageType,
            0x8D => MmsVersion,
            0x8E => MessageSize,
            0x8F => Priority,
            0x90 => ReadReport,
            0x91 => ReportAllowed,
            0x92 => ResponseStatus,
            0x93 => ResponseText,
            0x94 => SenderVisibility,
            0x95 => Status,
            0x96 => Subject,
            0x97 => To,
            0x98 => TransactionId,
            0x99 => RetrieveStatus,
            0x9A => RetrieveText,
            0x9B => ReadStatus,
            0x9C => ReplyCharging,
            0x9D => ReplyChargingDeadline,
            0x9E => ReplyChargingId,
            0x9F => ReplyChargingSize,
            0xA2 => Store,
            0xA7 => Stored,
            0xB1 => DistributionIndicator,
            0xB6 => StatusText,
            0xBA => ContentClass,
            0xBB => DrmContent,
            0xBC => AdaptationAllowed,
            0xBD => ReplaceId,
            0xBE => CancelId,
            _ => return None,
        };
        Some(field)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn kind(self) -> ValueKind {
        use HeaderField::*;
        match self {
            Bcc | Cc | To => ValueKind::AddressList,
            ContentLocation | MessageId | TransactionId | ReplyChargingId | ReplaceId
            | CancelId => ValueKind::Text,
            ContentType => ValueKind::ContentType,
            Date | MessageSize | ReplyChargingSize => ValueKind::LongInteger,
            DeliveryTime | Expiry | ReplyChargingDeadline => ValueKind::Time,
            From => ValueKind::From,
            MessageClass => ValueKind::MessageClass,
            Subject | ResponseText | RetrieveText | StatusText => ValueKind::EncodedString,
            DeliveryReport | MessageType | MmsVersion | Priority | ReadReport | ReportAllowed
            | ResponseStatus | SenderVisibility | Status | RetrieveStatus | ReadStatus
            | ReplyCharging | Store | Stored | DistributionIndicator | ContentClass
            | DrmContent | AdaptationAllowed => ValueKind::Octet,
        }
    }

    pub fn name(self) -> &'static str {
        use HeaderField::*;
        match self {
            Bcc => "Bcc",
            Cc => "Cc",
            ContentLocation => "X-Mms-Content-Location",
            ContentType => "Content-Type",
            Date => "Date",
            DeliveryReport => "X-Mms-Delivery-Report",
            DeliveryTime => "X-Mms-Delivery-Time",
            Expiry => "X-Mms-Expiry",
            From => "From",
            MessageClass => "X-Mms-Message-Class",
            MessageId => "Message-ID",
            MessageType => "X-Mms-Message-Type",
            MmsVersion => "X-Mms-MMS-Version",
            MessageSize => "X-Mms-Message-Size",
            Priority => "X-Mms-Priority",
            ReadReport => "X-Mms-Read-Report",
            ReportAllowed => "X-Mms-Report-Allowed",
            ResponseStatus => "X-Mms-Response-Status",
            ResponseText => "X-Mms-Response-Text",
            SenderVisibility => "X-Mms-Sender-Visibility",
            Status => "X-Mms-Status",
            Subject => "Subject",
            To => "To",
            TransactionId => "X-Mms-Transaction-Id",
            RetrieveStatus => "X-Mms-Retrieve-Status",
            RetrieveText => "X-Mms-Retrieve-Text",
            ReadStatus => "X-Mms-Read-Status",
            ReplyCharging => "X-Mms-Reply-Charging",
            ReplyChargingDeadline => "X-Mms-Reply-Charging-Deadline",
            ReplyChargingId => "X-Mms-Reply-Charging-ID",
            ReplyChargingSize => "X-Mms-Reply-Charging-Size",
            Store => "X-Mms-Store",
            Stored => "X-Mms-Stored",
            DistributionIndicator => "X-Mms-Distribution-Indicator",
            StatusText => "X-Mms-Status-Text",
            ContentClass => "X-Mms-Content-Class",
            DrmContent => "X-Mms-DRM-Content",
            AdaptationAllowed => "X-Mms-Adaptation-Allowed",
            ReplaceId => "X-Mms-Replace-ID",
            CancelId => "X-Mms-Cancel-ID",
        }
    }
}

/// Encoded-string-value : charset MIBenum optionnel + texte brut
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedString {
    pub charset: Option<u64>,
    pub text: Vec<u8>,
}

impl EncodedString {
    /// MIBenum de UTF-8
    pub const UTF_8: u64 = 106;

    pub fn new(text: impl Into<Vec<u8>>) -> Self {
        Self {
            charset: None,
            text: text.into(),
        }
    }

    pub fn with_charset(charset: u64, text: impl Into<Vec<u8>>) -> Self {
        Self {
            charset: Some(charset),
            text: text.into(),
        }
    }

    pub fn utf8(text: &str) -> Self {
        Self::with_charset(Self::UTF_8, text.as_bytes())
    }
}

impl fmt::Display for EncodedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.text))
    }
}

/// Valeur de date d'expiration / de livraison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeValue {
    /// Secondes depuis l'epoch
    Absolute(u64),
    /// Délai en secondes
    Relative(u64),
}

impl TimeValue {
    pub const ABSOLUTE_TOKEN: u8 = 0x80;
    pub const RELATIVE_TOKEN: u8 = 0x81;
}

/// Champ From : adresse présente ou à insérer par le MMSC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FromAddress {
    Present(EncodedString),
    Insert,
}

impl FromAddress {
    pub const ADDRESS_PRESENT_TOKEN: u8 = 0x80;
    pub const INSERT_ADDRESS_TOKEN: u8 = 0x81;

    pub fn address(&self) -> Option<&EncodedString> {
        match self {
            FromAddress::Present(address) => Some(address),
            FromAddress::Insert => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageClass {
    Personal,
    Advertisement,
    Informational,
    Auto,
    Other(Vec<u8>),
}

impl MessageClass {
    pub fn from_token(token: u8) -> Option<Self> {
        match token {
            0x80 => Some(MessageClass::Personal),
            0x81 => Some(MessageClass::Advertisement),
            0x82 => Some(MessageClass::Informational),
            0x83 => Some(MessageClass::Auto),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<u8> {
        match self {
            MessageClass::Personal => Some(0x80),
            MessageClass::Advertisement => Some(0x81),
            MessageClass::Informational => Some(0x82),
            MessageClass::Auto => Some(0x83),
            MessageClass::Other(_) => None,
        }
    }
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageClass::Personal => write!(f, "personal"),
            MessageClass::Advertisement => write!(f, "advertisement"),
            MessageClass::Informational => write!(f, "informational"),
            MessageClass::Auto => write!(f, "auto"),
            MessageClass::Other(text) => write!(f, "{}", String::from_utf8_lossy(text)),
        }
    }
}

/// Valeur décodée d'un champ d'en-tête
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Octet(u8),
    LongInteger(u64),
    Text(Vec<u8>),
    EncodedString(EncodedString),
    AddressList(Vec<EncodedString>),
    Time(TimeValue),
    From(FromAddress),
    MessageClass(MessageClass),
    ContentType(ContentType),
}

impl HeaderValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            HeaderValue::Octet(_) => ValueKind::Octet,
            HeaderValue::LongInteger(_) => ValueKind::LongInteger,
            HeaderValue::Text(_) => ValueKind::Text,
            HeaderValue::EncodedString(_) => ValueKind::EncodedString,
            HeaderValue::AddressList(_) => ValueKind::AddressList,
            HeaderValue::Time(_) => ValueKind::Time,
            HeaderValue::From(_) => ValueKind::From,
            HeaderValue::MessageClass(_) => ValueKind::MessageClass,
            HeaderValue::ContentType(_) => ValueKind::ContentType,
        }
    }
}

// Implémentation manuelle de Serialize pour un rendu JSON lisible
impl Serialize for HeaderValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            HeaderValue::Octet(v) => serializer.serialize_u8(*v),
            HeaderValue::LongInteger(v) => serializer.serialize_u64(*v),
            HeaderValue::Text(text) => serializer.serialize_str(&String::from_utf8_lossy(text)),
            HeaderValue::EncodedString(s) => serializer.serialize_str(&s.to_string()),
            HeaderValue::AddressList(list) => {
                serializer.serialize_str(&list.iter().map(|a| a.to_string()).join(", "))
            }
            HeaderValue::Time(t) => t.serialize(serializer),
            HeaderValue::From(FromAddress::Present(s)) => serializer.serialize_str(&s.to_string()),
            HeaderValue::From(FromAddress::Insert) => serializer.serialize_str("<insert-address>"),
            HeaderValue::MessageClass(c) => serializer.serialize_str(&c.to_string()),
            HeaderValue::ContentType(ct) => serializer.serialize_str(&ct.to_string()),
        }
    }
}

/// Table des champs d'en-tête d'une PDU
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PduHeaders {
    fields: BTreeMap<HeaderField, HeaderValue>,
}

impl PduHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insère une valeur après avoir vérifié qu'elle a la primitive du champ
    /// (une liste d'adresses vide n'a pas de forme sur le fil)
    pub fn set(&mut self, field: HeaderField, value: HeaderValue) -> Result<()> {
        if value.kind() != field.kind() {
            return Err(Error::malformed(
                field.name(),
                format!("expected {:?} value, got {:?}", field.kind(), value.kind()),
            ));
        }
        if matches!(&value, HeaderValue::AddressList(list) if list.is_empty()) {
            return Err(Error::malformed(field.name(), "address list cannot be empty"));
        }
        self.fields.insert(field, value);
        Ok(())
    }

    /// Insertion sans contrôle, réservée aux appelants qui construisent la bonne primitive
    pub(crate) fn put(&mut self, field: HeaderField, value: HeaderValue) {
        debug_assert_eq!(field.kind(), value.kind());
        self.fields.insert(field, value);
    }

    pub fn remove(&mut self, field: HeaderField) -> Option<HeaderValue> {
        self.fields.remove(&field)
    }

    pub fn get(&self, field: HeaderField) -> Option<&HeaderValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: HeaderField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Champs dans l'ordre croissant des codes
    pub fn iter(&self) -> impl Iterator<Item = (HeaderField, &HeaderValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn octet(&self, field: HeaderField) -> Option<u8> {
        match self.get(field) {
            Some(HeaderValue::Octet(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn long_integer(&self, field: HeaderField) -> Option<u64> {
        match self.get(field) {
            Some(HeaderValue::LongInteger(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, field: HeaderField) -> Option<&[u8]> {
        match self.get(field) {
            Some(HeaderValue::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn encoded_string(&self, field: HeaderField) -> Option<&EncodedString> {
        match self.get(field) {
            Some(HeaderValue::EncodedString(v)) => Some(v),
            _ => None,
        }
    }

    pub fn addresses(&self, field: HeaderField) -> Option<&[EncodedString]> {
        match self.get(field) {
            Some(HeaderValue::AddressList(v)) => Some(v),
            _ => None,
        }
    }

    pub fn time(&self, field: HeaderField) -> Option<TimeValue> {
        match self.get(field) {
            Some(HeaderValue::Time(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn from_address(&self) -> Option<&FromAddress> {
        match self.get(HeaderField::From) {
            Some(HeaderValue::From(v)) => Some(v),
            _ => None,
        }
    }

    pub fn message_class(&self) -> Option<&MessageClass> {
        match self.get(HeaderField::MessageClass) {
            Some(HeaderValue::MessageClass(v)) => Some(v),
            _ => None,
        }
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        match self.get(HeaderField::ContentType) {
            Some(HeaderValue::ContentType(v)) => Some(v),
            _ => None,
        }
    }

    /// Ajoute une adresse à un champ To / Cc / Bcc (champs répétables)
    pub fn append_address(&mut self, field: HeaderField, address: EncodedString) -> Result<()> {
        if field.kind() != ValueKind::AddressList {
            return Err(Error::malformed(field.name(), "not an address field"));
        }
        match self.fields.get_mut(&field) {
            Some(HeaderValue::AddressList(list)) => list.push(address),
            _ => {
                self.fields
                    .insert(field, HeaderValue::AddressList(vec![address]));
            }
        }
        Ok(())
    }

    pub(crate) fn put_octet(&mut self, field: HeaderField, value: u8) {
        self.put(field, HeaderValue::Octet(value));
    }

    pub(crate) fn put_text(&mut self, field: HeaderField, value: impl Into<Vec<u8>>) {
        self.put(field, HeaderValue::Text(value.into()));
    }

    pub(crate) fn put_long_integer(&mut self, field: HeaderField, value: u64) {
        self.put(field, HeaderValue::LongInteger(value));
    }
}

// Implémentation manuelle de Serialize : map nom de champ -> valeur
impl Serialize for PduHeaders {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.name(), value)?;
        }
        map.end()
    }
}
