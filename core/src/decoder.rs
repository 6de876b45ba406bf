use crate::config::CodecConfig;
use crate::content_type::read_content_type;
use crate::headers::{
    FromAddress, HeaderField, HeaderValue, MessageClass, PduHeaders, TimeValue, ValueKind,
};
use crate::pdu::{
    check_mandatory, DeliveryInd, GenericPdu, MessageType, NotificationInd, PduBody, PduPart,
    PduVariant, ReadOrigInd, RetrieveConf, SendReq,
};
use crate::wsp::Reader;
use crate::{Error, Result};
use tracing::debug;

/// Décodeur de PDU MMS (encapsulation WAP-209)
#[derive(Debug, Clone)]
pub struct PduDecoder {
    pub max_pdu_size: usize,
}

impl PduDecoder {
    pub fn new() -> Self {
        Self {
            max_pdu_size: CodecConfig::DEFAULT_MAX_PDU_SIZE,
        }
    }

    pub fn with_max_pdu_size(mut self, size: usize) -> Self {
        self.max_pdu_size = size;
        self
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new().with_max_pdu_size(config.max_pdu_size)
    }

    /// Décode un buffer complet en PDU typée
    pub fn decode(&self, data: &[u8]) -> Result<PduVariant> {
        if data.len() > self.max_pdu_size {
            return Err(Error::malformed(
                "pdu",
                format!("{} bytes exceeds limit of {}", data.len(), self.max_pdu_size),
            ));
        }

        let mut reader = Reader::new(data);
        let headers = parse_headers(&mut reader)?;

        // parse_headers garantit la présence du type en premier champ
        let code = headers
            .octet(HeaderField::MessageType)
            .ok_or_else(|| Error::InvalidHeader("X-Mms-Message-Type missing".to_string()))?;
        let message_type = MessageType::from_code(code).ok_or(Error::UnsupportedType(code))?;

        let body = match headers.content_type() {
            Some(ct) if message_type.carries_body() => {
                Some(parse_body(&mut reader, ct.is_multipart())?)
            }
            Some(_) if !reader.is_empty() => {
                debug!(
                    "{} octets ignorés après Content-Type pour {}",
                    reader.remaining(),
                    message_type.name()
                );
                None
            }
            _ => None,
        };

        check_mandatory(&headers, message_type)?;
        debug!("PDU décodée: {} ({} champs)", message_type.name(), headers.len());

        let pdu = match message_type {
            MessageType::NotificationInd => NotificationInd::from_headers(headers).into(),
            MessageType::DeliveryInd => DeliveryInd::from_headers(headers).into(),
            MessageType::ReadOrigInd => ReadOrigInd::from_headers(headers).into(),
            MessageType::RetrieveConf => {
                RetrieveConf::from_parts(headers, body.unwrap_or_default()).into()
            }
            MessageType::SendReq => SendReq::from_parts(headers, body.unwrap_or_default()).into(),
            other => GenericPdu::from_headers(other, headers).into(),
        };
        Ok(pdu)
    }
}

impl Default for PduDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Décode avec la configuration par défaut
pub fn decode(data: &[u8]) -> Result<PduVariant> {
    PduDecoder::new().decode(data)
}

/// Lit le bloc d'en-têtes jusqu'à la fin du buffer ou jusqu'au Content-Type
pub fn parse_headers(reader: &mut Reader<'_>) -> Result<PduHeaders> {
    let mut headers = PduHeaders::new();
    let mut first = true;

    while !reader.is_empty() {
        let code = reader.peek()?;
        if first && code != HeaderField::MessageType.code() {
            return Err(Error::InvalidHeader(format!(
                "first field must be X-Mms-Message-Type, got {:#04x}",
                code
            )));
        }
        first = false;

        if code & 0x80 == 0 {
            reader.set_field("application-header");
            let name = reader.read_text_string()?;
            reader.read_text_string()?;
            debug!(
                "En-tête applicatif ignoré: {}",
                String::from_utf8_lossy(&name)
            );
            continue;
        }

        reader.read_u8()?;
        let Some(field) = HeaderField::from_code(code) else {
            reader.set_field("unknown-header");
            reader.skip_value()?;
            debug!("Champ d'en-tête non supporté ignoré: {:#04x}", code);
            continue;
        };

        reader.set_field(field.name());
        let value = read_header_value(reader, field)?;
        match value {
            HeaderValue::AddressList(addresses) => {
                for address in addresses {
                    headers.append_address(field, address)?;
                }
            }
            value => headers.put(field, value),
        }

        if field == HeaderField::ContentType {
            break;
        }
    }

    if first {
        return Err(Error::Truncated {
            needed: 1,
            available: 0,
        });
    }
    Ok(headers)
}

/// Lit la valeur d'un champ avec la primitive propre à son code
fn read_header_value(reader: &mut Reader<'_>, field: HeaderField) -> Result<HeaderValue> {
    let value = match field.kind() {
        ValueKind::Octet => {
            let b = reader.peek()?;
            if b & 0x80 == 0 {
                return Err(Error::malformed(
                    field.name(),
                    format!("expected token octet, got {:#04x}", b),
                ));
            }
            HeaderValue::Octet(reader.read_u8()?)
        }
        ValueKind::LongInteger => HeaderValue::LongInteger(reader.read_long_integer()?),
        ValueKind::Text => HeaderValue::Text(reader.read_text_string()?),
        ValueKind::EncodedString => HeaderValue::EncodedString(reader.read_encoded_string()?),
        ValueKind::AddressList => HeaderValue::AddressList(vec![reader.read_encoded_string()?]),
        ValueKind::Time => HeaderValue::Time(read_time(reader)?),
        ValueKind::From => HeaderValue::From(read_from(reader)?),
        ValueKind::MessageClass => HeaderValue::MessageClass(read_message_class(reader)?),
        ValueKind::ContentType => HeaderValue::ContentType(read_content_type(reader)?),
    };
    Ok(value)
}

fn read_time(reader: &mut Reader<'_>) -> Result<TimeValue> {
    let len = reader.read_value_length()?;
    let mut inner = reader.sub_reader(len)?;
    let time = match inner.read_u8()? {
        TimeValue::ABSOLUTE_TOKEN => TimeValue::Absolute(inner.read_long_integer()?),
        TimeValue::RELATIVE_TOKEN => TimeValue::Relative(inner.read_integer_value()?),
        token => {
            return Err(Error::malformed(
                inner.field(),
                format!("unknown time token {:#04x}", token),
            ))
        }
    };
    inner.expect_end()?;
    Ok(time)
}

fn read_from(reader: &mut Reader<'_>) -> Result<FromAddress> {
    let len = reader.read_value_length()?;
    let mut inner = reader.sub_reader(len)?;
    let from = match inner.read_u8()? {
        FromAddress::ADDRESS_PRESENT_TOKEN => FromAddress::Present(inner.read_encoded_string()?),
        FromAddress::INSERT_ADDRESS_TOKEN => FromAddress::Insert,
        token => {
            return Err(Error::malformed(
                inner.field(),
                format!("unknown address token {:#04x}", token),
            ))
        }
    };
    inner.expect_end()?;
    Ok(from)
}

fn read_message_class(reader: &mut Reader<'_>) -> Result<MessageClass> {
    let b = reader.peek()?;
    if b & 0x80 != 0 {
        reader.read_u8()?;
        return MessageClass::from_token(b).ok_or_else(|| {
            Error::malformed(reader.field(), format!("unknown class token {:#04x}", b))
        });
    }
    Ok(MessageClass::Other(reader.read_text_string()?))
}

/// Lit le corps : multipart (nombre de parties en uintvar) ou contenu unique
fn parse_body(reader: &mut Reader<'_>, multipart: bool) -> Result<PduBody> {
    if !multipart {
        return Ok(PduBody::Single(reader.rest().to_vec()));
    }

    reader.set_field("multipart-body");
    let count = reader.read_uintvar()? as usize;
    // Chaque partie occupe au moins trois octets
    let mut parts = Vec::with_capacity(count.min(reader.remaining() / 3));
    for _ in 0..count {
        let headers_len = reader.read_uintvar()? as usize;
        let data_len = reader.read_uintvar()? as usize;
        let mut part_headers = reader.sub_reader(headers_len)?;
        part_headers.set_field("part-content-type");
        let content_type = read_content_type(&mut part_headers)?;
        let headers = part_headers.rest().to_vec();
        let data = reader.read_bytes(data_len)?.to_vec();
        parts.push(PduPart {
            content_type,
            headers,
            data,
        });
    }
    if !reader.is_empty() {
        debug!("{} octets ignorés après le corps multipart", reader.remaining());
    }
    Ok(PduBody::Multipart(parts))
}
