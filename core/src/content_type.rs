use crate::wsp::{Reader, Writer, LENGTH_QUOTE, SHORT_LENGTH_MAX};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Types de contenu bien connus (WSP, table des numéros assignés)
const WELL_KNOWN_MEDIA: &[&str] = &[
    "*/*",
    "text/*",
    "text/html",
    "text/plain",
    "text/x-hdml",
    "text/x-ttml",
    "text/x-vCalendar",
    "text/x-vCard",
    "text/vnd.wap.wml",
    "text/vnd.wap.wmlscript",
    "text/vnd.wap.wta-event",
    "multipart/*",
    "multipart/mixed",
    "multipart/form-data",
    "multipart/byteranges",
    "multipart/alternative",
    "application/*",
    "application/java-vm",
    "application/x-www-form-urlencoded",
    "application/x-hdmlc",
    "application/vnd.wap.wmlc",
    "application/vnd.wap.wmlscriptc",
    "application/vnd.wap.wta-eventc",
    "application/vnd.wap.uaprof",
    "application/vnd.wap.wtls-ca-certificate",
    "application/vnd.wap.wtls-user-certificate",
    "application/x-x509-ca-cert",
    "application/x-x509-user-cert",
    "image/*",
    "image/gif",
    "image/jpeg",
    "image/tiff",
    "image/png",
    "image/vnd.wap.wbmp",
    "application/vnd.wap.multipart.*",
    "application/vnd.wap.multipart.mixed",
    "application/vnd.wap.multipart.form-data",
    "application/vnd.wap.multipart.byteranges",
    "application/vnd.wap.multipart.alternative",
    "application/xml",
    "text/xml",
    "application/vnd.wap.wbxml",
    "application/x-x968-cross-cert",
    "application/x-x968-ca-cert",
    "application/x-x968-user-cert",
    "text/vnd.wap.si",
    "application/vnd.wap.sic",
    "text/vnd.wap.sl",
    "application/vnd.wap.slc",
    "text/vnd.wap.co",
    "application/vnd.wap.coc",
    "application/vnd.wap.multipart.related",
    "application/vnd.wap.sia",
    "text/vnd.wap.connectivity-xml",
    "application/vnd.wap.connectivity-wbxml",
    "application/pkcs7-mime",
    "application/vnd.wap.hashed-certificate",
    "application/vnd.wap.signed-certificate",
    "application/vnd.wap.cert-response",
    "application/xhtml+xml",
    "application/wml+xml",
    "text/css",
    "application/vnd.wap.mms-message",
];

pub const TEXT_PLAIN: u32 = 0x03;
pub const IMAGE_JPEG: u32 = 0x1E;
pub const MULTIPART_MIXED: u32 = 0x23;
pub const MULTIPART_RELATED: u32 = 0x33;
pub const MMS_MESSAGE: u32 = 0x3E;

const PARAM_CHARSET: u8 = 0x81;
const PARAM_NAME_V12: u8 = 0x85;
const PARAM_FILENAME_V12: u8 = 0x86;
const PARAM_TYPE: u8 = 0x89;
const PARAM_START_V12: u8 = 0x8A;
const PARAM_NAME: u8 = 0x97;
const PARAM_FILENAME: u8 = 0x98;
const PARAM_START: u8 = 0x99;

/// Nom MIME d'un type bien connu
pub fn well_known_media_name(code: u32) -> Option<&'static str> {
    WELL_KNOWN_MEDIA.get(code as usize).copied()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    WellKnown(u32),
    Extension(Vec<u8>),
}

impl MediaType {
    pub fn name(&self) -> String {
        match self {
            MediaType::WellKnown(code) => well_known_media_name(*code)
                .map(str::to_string)
                .unwrap_or_else(|| format!("well-known/{:#04x}", code)),
            MediaType::Extension(text) => String::from_utf8_lossy(text).into_owned(),
        }
    }

    pub fn is_multipart(&self) -> bool {
        match self {
            MediaType::WellKnown(code) => {
                matches!(*code, 0x0B..=0x0F | 0x22..=0x26 | MULTIPART_RELATED)
            }
            MediaType::Extension(text) => {
                let lower = text.to_ascii_lowercase();
                lower.starts_with(b"multipart/")
                    || lower.starts_with(b"application/vnd.wap.multipart.")
            }
        }
    }

    pub fn is_mms_message(&self) -> bool {
        match self {
            MediaType::WellKnown(code) => *code == MMS_MESSAGE,
            MediaType::Extension(text) => {
                text.eq_ignore_ascii_case(b"application/vnd.wap.mms-message")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UntypedValue {
    Integer(u64),
    Text(Vec<u8>),
}

/// Paramètre d'un Content-Type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentParam {
    /// MIBenum
    Charset(u64),
    /// Type racine d'un multipart/related
    Type(MediaType),
    /// Content-ID de la partie racine
    Start(Vec<u8>),
    Name(Vec<u8>),
    Filename(Vec<u8>),
    Untyped { name: Vec<u8>, value: UntypedValue },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub media: MediaType,
    pub params: Vec<ContentParam>,
}

impl ContentType {
    pub fn new(media: MediaType) -> Self {
        Self {
            media,
            params: Vec::new(),
        }
    }

    pub fn well_known(code: u32) -> Self {
        Self::new(MediaType::WellKnown(code))
    }

    pub fn with_param(mut self, param: ContentParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.media.is_multipart()
    }

    pub fn charset(&self) -> Option<u64> {
        self.params.iter().find_map(|p| match p {
            ContentParam::Charset(c) => Some(*c),
            _ => None,
        })
    }

    pub fn start(&self) -> Option<&[u8]> {
        self.params.iter().find_map(|p| match p {
            ContentParam::Start(s) => Some(s.as_slice()),
            _ => None,
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.media.name())?;
        for param in &self.params {
            match param {
                ContentParam::Charset(c) => write!(f, "; charset={}", c)?,
                ContentParam::Type(t) => write!(f, "; type={}", t.name())?,
                ContentParam::Start(s) => write!(f, "; start={}", String::from_utf8_lossy(s))?,
                ContentParam::Name(s) => write!(f, "; name={}", String::from_utf8_lossy(s))?,
                ContentParam::Filename(s) => {
                    write!(f, "; filename={}", String::from_utf8_lossy(s))?
                }
                ContentParam::Untyped { name, value } => {
                    write!(f, "; {}=", String::from_utf8_lossy(name))?;
                    match value {
                        UntypedValue::Integer(v) => write!(f, "{}", v)?,
                        UntypedValue::Text(t) => write!(f, "{}", String::from_utf8_lossy(t))?,
                    }
                }
            }
        }
        Ok(())
    }
}

/// Lit un Content-Type : forme contrainte ou forme générale avec paramètres
pub fn read_content_type(reader: &mut Reader<'_>) -> Result<ContentType> {
    let b = reader.peek()?;
    if b & 0x80 != 0 {
        let code = reader.read_short_integer()?;
        return Ok(ContentType::well_known(code as u32));
    }
    if b == 0 {
        return Err(Error::malformed(reader.field(), "empty content type"));
    }
    if b > LENGTH_QUOTE {
        let text = reader.read_text_string()?;
        return Ok(ContentType::new(MediaType::Extension(text)));
    }

    let len = reader.read_value_length()?;
    let mut inner = reader.sub_reader(len)?;
    let media = read_media(&mut inner)?;
    let mut params = Vec::new();
    while !inner.is_empty() {
        if let Some(param) = read_param(&mut inner)? {
            params.push(param);
        }
    }
    Ok(ContentType { media, params })
}

fn read_media(reader: &mut Reader<'_>) -> Result<MediaType> {
    let b = reader.peek()?;
    if b & 0x80 != 0 || (1..=SHORT_LENGTH_MAX).contains(&b) {
        let code = reader.read_integer_value()?;
        let code = u32::try_from(code)
            .map_err(|_| Error::malformed(reader.field(), "well-known media out of range"))?;
        Ok(MediaType::WellKnown(code))
    } else {
        Ok(MediaType::Extension(reader.read_text_string()?))
    }
}

fn read_param(reader: &mut Reader<'_>) -> Result<Option<ContentParam>> {
    let b = reader.peek()?;
    if b & 0x80 == 0 {
        if b <= LENGTH_QUOTE {
            return Err(Error::malformed(
                reader.field(),
                format!("unexpected octet {:#04x} in parameters", b),
            ));
        }
        let name = reader.read_text_string()?;
        let value = read_untyped_value(reader)?;
        return Ok(Some(ContentParam::Untyped { name, value }));
    }

    let token = reader.read_u8()?;
    let param = match token {
        PARAM_CHARSET => ContentParam::Charset(reader.read_integer_value()?),
        PARAM_TYPE => {
            if reader.peek()? & 0x80 != 0 {
                ContentParam::Type(MediaType::WellKnown(reader.read_short_integer()? as u32))
            } else {
                ContentParam::Type(MediaType::Extension(reader.read_text_string()?))
            }
        }
        PARAM_START | PARAM_START_V12 => ContentParam::Start(reader.read_text_string()?),
        PARAM_NAME | PARAM_NAME_V12 => ContentParam::Name(reader.read_text_string()?),
        PARAM_FILENAME | PARAM_FILENAME_V12 => ContentParam::Filename(reader.read_text_string()?),
        other => {
            debug!("Paramètre de Content-Type ignoré: {:#04x}", other);
            reader.skip_value()?;
            return Ok(None);
        }
    };
    Ok(Some(param))
}

fn read_untyped_value(reader: &mut Reader<'_>) -> Result<UntypedValue> {
    let b = reader.peek()?;
    if b & 0x80 != 0 || (1..=SHORT_LENGTH_MAX).contains(&b) {
        Ok(UntypedValue::Integer(reader.read_integer_value()?))
    } else {
        Ok(UntypedValue::Text(reader.read_text_string()?))
    }
}

pub fn write_content_type(writer: &mut Writer, field: &str, ct: &ContentType) -> Result<()> {
    if ct.params.is_empty() {
        match &ct.media {
            MediaType::WellKnown(code) if *code <= 0x7F => {
                return writer.write_short_integer(field, *code as u8);
            }
            MediaType::Extension(text) => {
                check_media_text(field, text)?;
                return writer.write_text_string(field, text);
            }
            MediaType::WellKnown(_) => {}
        }
    }

    let mut inner = Writer::new();
    match &ct.media {
        MediaType::WellKnown(code) => inner.write_integer_value(*code as u64),
        MediaType::Extension(text) => {
            check_media_text(field, text)?;
            inner.write_text_string(field, text)?;
        }
    }
    for param in &ct.params {
        write_param(&mut inner, field, param)?;
    }
    writer.write_value_length(field, inner.len())?;
    writer.write_bytes(inner.as_slice());
    Ok(())
}

fn check_media_text(field: &str, text: &[u8]) -> Result<()> {
    match text.first() {
        Some(b) if *b > LENGTH_QUOTE && *b < 0x80 => Ok(()),
        _ => Err(Error::malformed(field, "media type must start with a token character")),
    }
}

fn write_param(writer: &mut Writer, field: &str, param: &ContentParam) -> Result<()> {
    match param {
        ContentParam::Charset(charset) => {
            writer.write_u8(PARAM_CHARSET);
            writer.write_integer_value(*charset);
        }
        ContentParam::Type(MediaType::WellKnown(code)) => {
            let code = u8::try_from(*code)
                .map_err(|_| Error::malformed(field, "type parameter out of short-integer range"))?;
            writer.write_u8(PARAM_TYPE);
            writer.write_short_integer(field, code)?;
        }
        ContentParam::Type(MediaType::Extension(text)) => {
            check_media_text(field, text)?;
            writer.write_u8(PARAM_TYPE);
            writer.write_text_string(field, text)?;
        }
        ContentParam::Start(text) => {
            writer.write_u8(PARAM_START_V12);
            writer.write_text_string(field, text)?;
        }
        ContentParam::Name(text) => {
            writer.write_u8(PARAM_NAME_V12);
            writer.write_text_string(field, text)?;
        }
        ContentParam::Filename(text) => {
            writer.write_u8(PARAM_FILENAME_V12);
            writer.write_text_string(field, text)?;
        }
        ContentParam::Untyped { name, value } => {
            check_media_text(field, name)?;
            writer.write_text_string(field, name)?;
            match value {
                UntypedValue::Integer(v) => writer.write_integer_value(*v),
                UntypedValue::Text(text) => {
                    if text.first().is_some_and(|b| (1..=SHORT_LENGTH_MAX).contains(b)) {
                        return Err(Error::malformed(
                            field,
                            "untyped text value cannot start with a length octet",
                        ));
                    }
                    writer.write_text_string(field, text)?;
                }
            }
        }
    }
    Ok(())
}
