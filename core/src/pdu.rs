use crate::content_type::ContentType;
use crate::headers::{
    EncodedString, FromAddress, HeaderField, HeaderValue, MessageClass, PduHeaders, TimeValue,
};
use crate::wsp::{Reader, Writer};
use crate::{Error, Result};
use itertools::Itertools;
use serde::Serialize;

/// Types de message MMS reconnus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageType {
    SendReq,
    SendConf,
    NotificationInd,
    NotifyRespInd,
    RetrieveConf,
    AcknowledgeInd,
    DeliveryInd,
    ReadRecInd,
    ReadOrigInd,
    ForwardReq,
    ForwardConf,
}

impl MessageType {
    pub fn from_code(code: u8) -> Option<Self> {
        use MessageType::*;
        let mt = match code {
            0x80 => SendReq,
            0x81 => SendConf,
            0x82 => NotificationInd,
            0x83 => NotifyRespInd,
            0x84 => RetrieveConf,
            0x85 => AcknowledgeInd,
            0x86 => DeliveryInd,
            0x87 => ReadRecInd,
            0x88 => ReadOrigInd,
            0x89 => ForwardReq,
            0x8A => ForwardConf,
            _ => return None,
        };
        Some(mt)
    }

    pub fn code(self) -> u8 {
        use MessageType::*;
        match self {
            SendReq => 0x80,
            SendConf => 0x81,
            NotificationInd => 0x82,
            NotifyRespInd => 0x83,
            RetrieveConf => 0x84,
            AcknowledgeInd => 0x85,
            DeliveryInd => 0x86,
            ReadRecInd => 0x87,
            ReadOrigInd => 0x88,
            ForwardReq => 0x89,
            ForwardConf => 0x8A,
        }
    }

    pub fn name(self) -> &'static str {
        use MessageType::*;
        match self {
            SendReq => "m-send-req",
            SendConf => "m-send-conf",
            NotificationInd => "m-notification-ind",
            NotifyRespInd => "m-notifyresp-ind",
            RetrieveConf => "m-retrieve-conf",
            AcknowledgeInd => "m-acknowledge-ind",
            DeliveryInd => "m-delivery-ind",
            ReadRecInd => "m-read-rec-ind",
            ReadOrigInd => "m-read-orig-ind",
            ForwardReq => "m-forward-req",
            ForwardConf => "m-forward-conf",
        }
    }

    /// Champs obligatoires (hors X-Mms-Message-Type)
    pub fn mandatory_fields(self) -> &'static [HeaderField] {
        use HeaderField as F;
        use MessageType::*;
        match self {
            SendReq => &[F::TransactionId, F::ContentType],
            SendConf => &[F::TransactionId, F::ResponseStatus],
            NotificationInd => &[F::ContentLocation, F::TransactionId],
            NotifyRespInd => &[F::TransactionId, F::Status],
            RetrieveConf => &[F::ContentType],
            AcknowledgeInd => &[F::TransactionId],
            DeliveryInd => &[F::MessageId, F::Status],
            ReadRecInd | ReadOrigInd => &[F::MessageId, F::ReadStatus],
            ForwardReq => &[F::TransactionId, F::To],
            ForwardConf => &[F::TransactionId, F::ResponseStatus],
        }
    }

    /// Types dont le Content-Type est suivi d'un corps conservé
    pub fn carries_body(self) -> bool {
        matches!(self, MessageType::SendReq | MessageType::RetrieveConf)
    }

    /// Types matérialisés par une variante dédiée plutôt que `GenericPdu`
    pub fn has_dedicated_variant(self) -> bool {
        matches!(
            self,
            MessageType::SendReq
                | MessageType::NotificationInd
                | MessageType::RetrieveConf
                | MessageType::DeliveryInd
                | MessageType::ReadOrigInd
        )
    }
}

/// Vérifie la présence des champs obligatoires d'un type de message
pub fn check_mandatory(headers: &PduHeaders, message_type: MessageType) -> Result<()> {
    let missing: Vec<&str> = message_type
        .mandatory_fields()
        .iter()
        .filter(|f| !headers.contains(**f))
        .map(|f| f.name())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidHeader(format!(
            "{} missing {}",
            message_type.name(),
            missing.iter().join(", ")
        )))
    }
}

const PART_CONTENT_LOCATION: u8 = 0x8E;
const PART_CONTENT_ID: u8 = 0xC0;

/// Partie d'un corps multipart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduPart {
    pub content_type: ContentType,
    /// En-têtes de partie bruts (après le Content-Type)
    pub headers: Vec<u8>,
    pub data: Vec<u8>,
}

impl PduPart {
    pub fn new(content_type: ContentType, data: Vec<u8>) -> Self {
        Self {
            content_type,
            headers: Vec::new(),
            data,
        }
    }

    pub fn with_content_location(mut self, location: &[u8]) -> Result<Self> {
        let mut writer = Writer::new();
        writer.write_u8(PART_CONTENT_LOCATION);
        writer.write_text_string("Content-Location", location)?;
        self.headers.extend_from_slice(writer.as_slice());
        Ok(self)
    }

    pub fn with_content_id(mut self, id: &[u8]) -> Result<Self> {
        let mut writer = Writer::new();
        writer.write_u8(PART_CONTENT_ID);
        writer.write_quoted_string("Content-ID", id)?;
        self.headers.extend_from_slice(writer.as_slice());
        Ok(self)
    }

    pub fn content_location(&self) -> Option<Vec<u8>> {
        self.find_header(PART_CONTENT_LOCATION)
    }

    pub fn content_id(&self) -> Option<Vec<u8>> {
        self.find_header(PART_CONTENT_ID)
    }

    fn find_header(&self, wanted: u8) -> Option<Vec<u8>> {
        let mut reader = Reader::new(&self.headers);
        while !reader.is_empty() {
            let code = reader.peek().ok()?;
            if code & 0x80 == 0 {
                reader.read_text_string().ok()?;
                reader.read_text_string().ok()?;
                continue;
            }
            reader.read_u8().ok()?;
            match code {
                PART_CONTENT_ID => {
                    let id = reader.read_quoted_string().ok()?;
                    if code == wanted {
                        return Some(id);
                    }
                }
                c if c == wanted => return reader.read_text_string().ok(),
                _ => reader.skip_value().ok()?,
            }
        }
        None
    }
}

// Implémentation manuelle de Serialize : les données sont résumées par leur taille
impl Serialize for PduPart {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let lossy = |v: Option<Vec<u8>>| v.map(|b| String::from_utf8_lossy(&b).into_owned());
        let mut state = serializer.serialize_struct("PduPart", 4)?;
        state.serialize_field("content_type", &self.content_type.to_string())?;
        state.serialize_field("content_id", &lossy(self.content_id()))?;
        state.serialize_field("content_location", &lossy(self.content_location()))?;
        state.serialize_field("data_len", &self.data.len())?;
        state.end()
    }
}

/// Corps d'un message : multipart, ou contenu unique opaque
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PduBody {
    Multipart(Vec<PduPart>),
    Single(#[serde(serialize_with = "serialize_len")] Vec<u8>),
}

fn serialize_len<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(data.len() as u64)
}

impl PduBody {
    pub fn parts(&self) -> &[PduPart] {
        match self {
            PduBody::Multipart(parts) => parts,
            PduBody::Single(_) => &[],
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, PduBody::Multipart(_))
    }
}

impl Default for PduBody {
    fn default() -> Self {
        PduBody::Single(Vec::new())
    }
}

/// Accès communs à toutes les PDU
pub trait Pdu {
    fn headers(&self) -> &PduHeaders;

    fn message_type(&self) -> MessageType;

    fn transaction_id(&self) -> Option<&[u8]> {
        self.headers().text(HeaderField::TransactionId)
    }

    fn mms_version(&self) -> Option<u8> {
        self.headers().octet(HeaderField::MmsVersion)
    }
}

/// Version MMS 1.2 (short-integer 0x12 encodé)
pub const MMS_VERSION_1_2: u8 = 0x92;

fn base_headers(message_type: MessageType) -> PduHeaders {
    let mut headers = PduHeaders::new();
    headers.put_octet(HeaderField::MessageType, message_type.code());
    headers
}

/// M-Notification.ind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationInd {
    headers: PduHeaders,
}

impl NotificationInd {
    pub fn new(content_location: &[u8], transaction_id: &[u8]) -> Self {
        let mut headers = base_headers(MessageType::NotificationInd);
        headers.put_text(HeaderField::ContentLocation, content_location);
        headers.put_text(HeaderField::TransactionId, transaction_id);
        Self { headers }
    }

    pub(crate) fn from_headers(headers: PduHeaders) -> Self {
        Self { headers }
    }

    pub fn headers_mut(&mut self) -> &mut PduHeaders {
        &mut self.headers
    }

    pub fn content_location(&self) -> Option<&[u8]> {
        self.headers.text(HeaderField::ContentLocation)
    }

    pub fn set_content_location(&mut self, location: Vec<u8>) {
        self.headers.put_text(HeaderField::ContentLocation, location);
    }

    pub fn expiry(&self) -> Option<TimeValue> {
        self.headers.time(HeaderField::Expiry)
    }

    pub fn message_size(&self) -> Option<u64> {
        self.headers.long_integer(HeaderField::MessageSize)
    }

    pub fn message_class(&self) -> Option<&MessageClass> {
        self.headers.message_class()
    }

    pub fn from(&self) -> Option<&FromAddress> {
        self.headers.from_address()
    }

    pub fn subject(&self) -> Option<&EncodedString> {
        self.headers.encoded_string(HeaderField::Subject)
    }

    pub fn with_expiry(mut self, expiry: TimeValue) -> Self {
        self.headers.put(HeaderField::Expiry, HeaderValue::Time(expiry));
        self
    }

    pub fn with_message_size(mut self, size: u64) -> Self {
        self.headers.put_long_integer(HeaderField::MessageSize, size);
        self
    }

    pub fn with_message_class(mut self, class: MessageClass) -> Self {
        self.headers
            .put(HeaderField::MessageClass, HeaderValue::MessageClass(class));
        self
    }

    pub fn with_from(mut self, from: FromAddress) -> Self {
        self.headers.put(HeaderField::From, HeaderValue::From(from));
        self
    }

    pub fn with_version(mut self, version: u8) -> Self {
        self.headers.put_octet(HeaderField::MmsVersion, version);
        self
    }
}

impl Pdu for NotificationInd {
    fn headers(&self) -> &PduHeaders {
        &self.headers
    }

    fn message_type(&self) -> MessageType {
        MessageType::NotificationInd
    }
}

/// M-Delivery.ind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryInd {
    headers: PduHeaders,
}

impl DeliveryInd {
    pub fn new(message_id: &[u8], status: u8) -> Self {
        let mut headers = base_headers(MessageType::DeliveryInd);
        headers.put_text(HeaderField::MessageId, message_id);
        headers.put_octet(HeaderField::Status, status);
        Self { headers }
    }

    pub(crate) fn from_headers(headers: PduHeaders) -> Self {
        Self { headers }
    }

    pub fn headers_mut(&mut self) -> &mut PduHeaders {
        &mut self.headers
    }

    pub fn message_id(&self) -> Option<&[u8]> {
        self.headers.text(HeaderField::MessageId)
    }

    pub fn status(&self) -> Option<u8> {
        self.headers.octet(HeaderField::Status)
    }

    pub fn date(&self) -> Option<u64> {
        self.headers.long_integer(HeaderField::Date)
    }

    pub fn to(&self) -> Option<&[EncodedString]> {
        self.headers.addresses(HeaderField::To)
    }

    pub fn with_date(mut self, date: u64) -> Self {
        self.headers.put_long_integer(HeaderField::Date, date);
        self
    }
}

impl Pdu for DeliveryInd {
    fn headers(&self) -> &PduHeaders {
        &self.headers
    }

    fn message_type(&self) -> MessageType {
        MessageType::DeliveryInd
    }
}

/// M-Read-Orig.ind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadOrigInd {
    headers: PduHeaders,
}

impl ReadOrigInd {
    pub fn new(message_id: &[u8], read_status: u8) -> Self {
        let mut headers = base_headers(MessageType::ReadOrigInd);
        headers.put_text(HeaderField::MessageId, message_id);
        headers.put_octet(HeaderField::ReadStatus, read_status);
        Self { headers }
    }

    pub(crate) fn from_headers(headers: PduHeaders) -> Self {
        Self { headers }
    }

    pub fn headers_mut(&mut self) -> &mut PduHeaders {
        &mut self.headers
    }

    pub fn message_id(&self) -> Option<&[u8]> {
        self.headers.text(HeaderField::MessageId)
    }

    pub fn read_status(&self) -> Option<u8> {
        self.headers.octet(HeaderField::ReadStatus)
    }

    pub fn from(&self) -> Option<&FromAddress> {
        self.headers.from_address()
    }

    pub fn to(&self) -> Option<&[EncodedString]> {
        self.headers.addresses(HeaderField::To)
    }

    pub fn date(&self) -> Option<u64> {
        self.headers.long_integer(HeaderField::Date)
    }
}

impl Pdu for ReadOrigInd {
    fn headers(&self) -> &PduHeaders {
        &self.headers
    }

    fn message_type(&self) -> MessageType {
        MessageType::ReadOrigInd
    }
}

/// M-Retrieve.conf
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrieveConf {
    headers: PduHeaders,
    body: PduBody,
}

impl RetrieveConf {
    pub fn new(content_type: ContentType, body: PduBody) -> Self {
        let mut headers = base_headers(MessageType::RetrieveConf);
        headers.put(HeaderField::ContentType, HeaderValue::ContentType(content_type));
        Self { headers, body }
    }

    pub(crate) fn from_parts(headers: PduHeaders, body: PduBody) -> Self {
        Self { headers, body }
    }

    pub fn headers_mut(&mut self) -> &mut PduHeaders {
        &mut self.headers
    }

    pub fn body(&self) -> &PduBody {
        &self.body
    }

    pub fn message_id(&self) -> Option<&[u8]> {
        self.headers.text(HeaderField::MessageId)
    }

    pub fn date(&self) -> Option<u64> {
        self.headers.long_integer(HeaderField::Date)
    }

    pub fn from(&self) -> Option<&FromAddress> {
        self.headers.from_address()
    }

    pub fn to(&self) -> Option<&[EncodedString]> {
        self.headers.addresses(HeaderField::To)
    }

    pub fn cc(&self) -> Option<&[EncodedString]> {
        self.headers.addresses(HeaderField::Cc)
    }

    pub fn subject(&self) -> Option<&EncodedString> {
        self.headers.encoded_string(HeaderField::Subject)
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.headers.content_type()
    }

    pub fn retrieve_status(&self) -> Option<u8> {
        self.headers.octet(HeaderField::RetrieveStatus)
    }
}

impl Pdu for RetrieveConf {
    fn headers(&self) -> &PduHeaders {
        &self.headers
    }

    fn message_type(&self) -> MessageType {
        MessageType::RetrieveConf
    }
}

/// M-Send.req
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReq {
    headers: PduHeaders,
    body: PduBody,
}

impl SendReq {
    pub fn new(transaction_id: &[u8], content_type: ContentType, body: PduBody) -> Self {
        let mut headers = base_headers(MessageType::SendReq);
        headers.put_text(HeaderField::TransactionId, transaction_id);
        headers.put(HeaderField::ContentType, HeaderValue::ContentType(content_type));
        Self { headers, body }
    }

    pub(crate) fn from_parts(headers: PduHeaders, body: PduBody) -> Self {
        Self { headers, body }
    }

    pub fn headers_mut(&mut self) -> &mut PduHeaders {
        &mut self.headers
    }

    pub fn body(&self) -> &PduBody {
        &self.body
    }

    pub fn from(&self) -> Option<&FromAddress> {
        self.headers.from_address()
    }

    pub fn to(&self) -> Option<&[EncodedString]> {
        self.headers.addresses(HeaderField::To)
    }

    pub fn cc(&self) -> Option<&[EncodedString]> {
        self.headers.addresses(HeaderField::Cc)
    }

    pub fn bcc(&self) -> Option<&[EncodedString]> {
        self.headers.addresses(HeaderField::Bcc)
    }

    pub fn subject(&self) -> Option<&EncodedString> {
        self.headers.encoded_string(HeaderField::Subject)
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.headers.content_type()
    }

    pub fn expiry(&self) -> Option<TimeValue> {
        self.headers.time(HeaderField::Expiry)
    }

    pub fn delivery_report(&self) -> Option<u8> {
        self.headers.octet(HeaderField::DeliveryReport)
    }

    pub fn read_report(&self) -> Option<u8> {
        self.headers.octet(HeaderField::ReadReport)
    }
}

impl Pdu for SendReq {
    fn headers(&self) -> &PduHeaders {
        &self.headers
    }

    fn message_type(&self) -> MessageType {
        MessageType::SendReq
    }
}

/// PDU d'un type reconnu sans variante dédiée (Send.conf, NotifyResp.ind, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericPdu {
    message_type: MessageType,
    headers: PduHeaders,
}

impl GenericPdu {
    pub fn new(message_type: MessageType) -> Result<Self> {
        if message_type.has_dedicated_variant() {
            return Err(Error::InvalidHeader(format!(
                "{} has a dedicated variant",
                message_type.name()
            )));
        }
        Ok(Self {
            message_type,
            headers: base_headers(message_type),
        })
    }

    pub(crate) fn from_headers(message_type: MessageType, headers: PduHeaders) -> Self {
        Self {
            message_type,
            headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut PduHeaders {
        &mut self.headers
    }

    pub fn message_id(&self) -> Option<&[u8]> {
        self.headers.text(HeaderField::MessageId)
    }

    pub fn status(&self) -> Option<u8> {
        self.headers.octet(HeaderField::Status)
    }

    pub fn response_status(&self) -> Option<u8> {
        self.headers.octet(HeaderField::ResponseStatus)
    }
}

impl Pdu for GenericPdu {
    fn headers(&self) -> &PduHeaders {
        &self.headers
    }

    fn message_type(&self) -> MessageType {
        self.message_type
    }
}

/// PDU décodée : union fermée sur les types connus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum PduVariant {
    NotificationInd(NotificationInd),
    DeliveryInd(DeliveryInd),
    ReadOrigInd(ReadOrigInd),
    RetrieveConf(RetrieveConf),
    SendReq(SendReq),
    Generic(GenericPdu),
}

impl PduVariant {
    fn as_pdu(&self) -> &dyn Pdu {
        match self {
            PduVariant::NotificationInd(p) => p,
            PduVariant::DeliveryInd(p) => p,
            PduVariant::ReadOrigInd(p) => p,
            PduVariant::RetrieveConf(p) => p,
            PduVariant::SendReq(p) => p,
            PduVariant::Generic(p) => p,
        }
    }

    pub fn headers(&self) -> &PduHeaders {
        self.as_pdu().headers()
    }

    pub fn message_type(&self) -> MessageType {
        self.as_pdu().message_type()
    }

    pub fn transaction_id(&self) -> Option<&[u8]> {
        self.as_pdu().transaction_id()
    }

    pub fn message_id(&self) -> Option<&[u8]> {
        self.headers().text(HeaderField::MessageId)
    }

    pub fn date(&self) -> Option<u64> {
        self.headers().long_integer(HeaderField::Date)
    }

    pub fn content_location(&self) -> Option<&[u8]> {
        self.headers().text(HeaderField::ContentLocation)
    }

    pub fn body(&self) -> Option<&PduBody> {
        match self {
            PduVariant::RetrieveConf(p) => Some(p.body()),
            PduVariant::SendReq(p) => Some(p.body()),
            _ => None,
        }
    }

    /// Résumé sur une ligne pour les journaux
    pub fn describe(&self) -> String {
        let lossy = |b: Option<&[u8]>| b.map(|b| String::from_utf8_lossy(b).into_owned());
        [
            Some(self.message_type().name().to_string()),
            lossy(self.transaction_id()).map(|t| format!("tid={}", t)),
            lossy(self.message_id()).map(|m| format!("mid={}", m)),
            lossy(self.content_location()).map(|l| format!("location={}", l)),
        ]
        .into_iter()
        .flatten()
        .join(" ")
    }
}

impl From<NotificationInd> for PduVariant {
    fn from(pdu: NotificationInd) -> Self {
        PduVariant::NotificationInd(pdu)
    }
}

impl From<DeliveryInd> for PduVariant {
    fn from(pdu: DeliveryInd) -> Self {
        PduVariant::DeliveryInd(pdu)
    }
}

impl From<ReadOrigInd> for PduVariant {
    fn from(pdu: ReadOrigInd) -> Self {
        PduVariant::ReadOrigInd(pdu)
    }
}

impl From<RetrieveConf> for PduVariant {
    fn from(pdu: RetrieveConf) -> Self {
        PduVariant::RetrieveConf(pdu)
    }
}

impl From<SendReq> for PduVariant {
    fn from(pdu: SendReq) -> Self {
        PduVariant::SendReq(pdu)
    }
}

impl From<GenericPdu> for PduVariant {
    fn from(pdu: GenericPdu) -> Self {
        PduVariant::Generic(pdu)
    }
}
