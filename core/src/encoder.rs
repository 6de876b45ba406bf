use crate::content_type::write_content_type;
use crate::headers::{FromAddress, HeaderField, HeaderValue, MessageClass, TimeValue};
use crate::pdu::{check_mandatory, PduBody, PduVariant};
use crate::wsp::Writer;
use crate::{Error, Result};

/// Champs écrits en tête, dans cet ordre, avant les autres
const LEADING_FIELDS: [HeaderField; 3] = [
    HeaderField::MessageType,
    HeaderField::TransactionId,
    HeaderField::MmsVersion,
];

/// Encode une PDU dans l'ordre canonique : type, transaction, version,
/// autres champs par code croissant, puis Content-Type et corps
pub fn encode(pdu: &PduVariant) -> Result<Vec<u8>> {
    let headers = pdu.headers();
    let message_type = pdu.message_type();

    if headers.octet(HeaderField::MessageType) != Some(message_type.code()) {
        return Err(Error::InvalidHeader(format!(
            "X-Mms-Message-Type does not match {}",
            message_type.name()
        )));
    }
    check_mandatory(headers, message_type)?;

    let body = pdu.body();
    if let Some(body) = body {
        let multipart_type = headers.content_type().map(|ct| ct.is_multipart());
        match (body, multipart_type) {
            (PduBody::Multipart(_), Some(false)) => {
                return Err(Error::InvalidHeader(
                    "multipart body requires a multipart content type".to_string(),
                ))
            }
            (PduBody::Single(_), Some(true)) => {
                return Err(Error::InvalidHeader(
                    "multipart content type requires a multipart body".to_string(),
                ))
            }
            _ => {}
        }
    }

    let mut writer = Writer::new();
    for field in LEADING_FIELDS {
        if let Some(value) = headers.get(field) {
            write_field(&mut writer, field, value)?;
        }
    }
    for (field, value) in headers.iter() {
        if LEADING_FIELDS.contains(&field) || field == HeaderField::ContentType {
            continue;
        }
        write_field(&mut writer, field, value)?;
    }
    if let Some(value) = headers.get(HeaderField::ContentType) {
        write_field(&mut writer, HeaderField::ContentType, value)?;
        if let Some(body) = body {
            write_body(&mut writer, body)?;
        }
    }
    Ok(writer.into_inner())
}

fn write_field(writer: &mut Writer, field: HeaderField, value: &HeaderValue) -> Result<()> {
    if value.kind() != field.kind() {
        return Err(Error::InvalidHeader(format!(
            "{} holds a {:?} value",
            field.name(),
            value.kind()
        )));
    }
    let name = field.name();

    if let HeaderValue::AddressList(addresses) = value {
        if addresses.is_empty() {
            return Err(Error::InvalidHeader(format!("{} has no address", name)));
        }
        for address in addresses {
            writer.write_u8(field.code());
            writer.write_encoded_string(name, address)?;
        }
        return Ok(());
    }

    writer.write_u8(field.code());
    match value {
        HeaderValue::Octet(v) => {
            if v & 0x80 == 0 {
                return Err(Error::malformed(
                    name,
                    format!("token octet {:#04x} lacks high bit", v),
                ));
            }
            writer.write_u8(*v);
        }
        HeaderValue::LongInteger(v) => writer.write_long_integer(*v),
        HeaderValue::Text(text) => writer.write_text_string(name, text)?,
        HeaderValue::EncodedString(s) => writer.write_encoded_string(name, s)?,
        HeaderValue::Time(time) => {
            let mut inner = Writer::new();
            match time {
                TimeValue::Absolute(t) => {
                    inner.write_u8(TimeValue::ABSOLUTE_TOKEN);
                    inner.write_long_integer(*t);
                }
                TimeValue::Relative(t) => {
                    inner.write_u8(TimeValue::RELATIVE_TOKEN);
                    inner.write_long_integer(*t);
                }
            }
            writer.write_value_length(name, inner.len())?;
            writer.write_bytes(inner.as_slice());
        }
        HeaderValue::From(from) => {
            let mut inner = Writer::new();
            match from {
                FromAddress::Present(address) => {
                    inner.write_u8(FromAddress::ADDRESS_PRESENT_TOKEN);
                    inner.write_encoded_string(name, address)?;
                }
                FromAddress::Insert => inner.write_u8(FromAddress::INSERT_ADDRESS_TOKEN),
            }
            writer.write_value_length(name, inner.len())?;
            writer.write_bytes(inner.as_slice());
        }
        HeaderValue::MessageClass(MessageClass::Other(text)) => {
            writer.write_text_string(name, text)?
        }
        HeaderValue::MessageClass(class) => {
            if let Some(token) = class.token() {
                writer.write_u8(token);
            }
        }
        HeaderValue::ContentType(ct) => write_content_type(writer, name, ct)?,
        // déjà écrites, un champ par adresse
        HeaderValue::AddressList(_) => {}
    }
    Ok(())
}

fn write_body(writer: &mut Writer, body: &PduBody) -> Result<()> {
    match body {
        PduBody::Single(data) => writer.write_bytes(data),
        PduBody::Multipart(parts) => {
            let count = u32::try_from(parts.len())
                .map_err(|_| Error::malformed("multipart-body", "too many parts"))?;
            writer.write_uintvar(count);
            for part in parts {
                let mut headers = Writer::new();
                write_content_type(&mut headers, "part-content-type", &part.content_type)?;
                headers.write_bytes(&part.headers);
                let headers_len = u32::try_from(headers.len())
                    .map_err(|_| Error::malformed("multipart-body", "part headers too long"))?;
                let data_len = u32::try_from(part.data.len())
                    .map_err(|_| Error::malformed("multipart-body", "part data too long"))?;
                writer.write_uintvar(headers_len);
                writer.write_uintvar(data_len);
                writer.write_bytes(headers.as_slice());
                writer.write_bytes(&part.data);
            }
        }
    }
    Ok(())
}
