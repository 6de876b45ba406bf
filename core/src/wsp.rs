use crate::headers::EncodedString;
use crate::{Error, Result};

/// Octet de guillemet préfixant un text-string dont le premier octet est >= 0x80
pub const QUOTE: u8 = 0x7F;
/// Préfixe d'un quoted-string
pub const DOUBLE_QUOTE: u8 = b'"';
/// Octet annonçant une longueur encodée en uintvar
pub const LENGTH_QUOTE: u8 = 0x1F;
/// Plus grande valeur de short-length
pub const SHORT_LENGTH_MAX: u8 = 0x1E;

const UINTVAR_MAX_BYTES: usize = 5;
const LONG_INTEGER_MAX_BYTES: usize = 8;

/// Lecteur des primitives WSP sur un buffer emprunté
///
/// Toutes les lectures sont bornées : un champ qui dépasse la fin du buffer
/// produit `Error::Truncated`, jamais une lecture hors limites.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    field: &'static str,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            field: "pdu",
        }
    }

    /// Nom du champ en cours de lecture, utilisé dans les erreurs
    pub fn set_field(&mut self, field: &'static str) {
        self.field = field;
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Octets non encore consommés
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn truncated(&self, needed: usize) -> Error {
        Error::Truncated {
            needed,
            available: self.remaining(),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.field, reason)
    }

    pub fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.truncated(1))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Lecteur limité aux `len` prochains octets (consommés dans ce lecteur)
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>> {
        let field = self.field;
        let data = self.read_bytes(len)?;
        Ok(Reader {
            data,
            pos: 0,
            field,
        })
    }

    /// Échoue si des octets restent après la fin attendue d'une valeur bornée
    pub fn expect_end(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.malformed(format!(
                "{} unexpected trailing bytes in value",
                self.remaining()
            )))
        }
    }

    /// Uintvar : 7 bits par octet, bit 7 = continuation, au plus 5 octets
    pub fn read_uintvar(&mut self) -> Result<u32> {
        let mut value: u64 = 0;
        for _ in 0..UINTVAR_MAX_BYTES {
            let b = self.read_u8()?;
            value = (value << 7) | (b & 0x7F) as u64;
            if b & 0x80 == 0 {
                return u32::try_from(value)
                    .map_err(|_| self.malformed("uintvar exceeds 32 bits"));
            }
        }
        Err(self.malformed("uintvar longer than 5 octets"))
    }

    /// Short-integer : un octet dont le bit de poids fort est à 1
    pub fn read_short_integer(&mut self) -> Result<u8> {
        let b = self.peek()?;
        if b & 0x80 == 0 {
            return Err(self.malformed(format!("expected short-integer, got {:#04x}", b)));
        }
        self.pos += 1;
        Ok(b & 0x7F)
    }

    /// Long-integer : short-length (1..=8 ici) suivi de la valeur big-endian
    pub fn read_long_integer(&mut self) -> Result<u64> {
        let len = self.peek()?;
        if len > SHORT_LENGTH_MAX {
            return Err(self.malformed(format!("expected short-length, got {:#04x}", len)));
        }
        if len == 0 || len as usize > LONG_INTEGER_MAX_BYTES {
            return Err(self.malformed(format!("long-integer of {} octets", len)));
        }
        self.pos += 1;
        let bytes = self.read_bytes(len as usize)?;
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    /// Integer-value : short-integer ou long-integer
    pub fn read_integer_value(&mut self) -> Result<u64> {
        if self.peek()? & 0x80 != 0 {
            self.read_short_integer().map(u64::from)
        } else {
            self.read_long_integer()
        }
    }

    /// Value-length : short-length, ou 0x1F suivi d'un uintvar
    pub fn read_value_length(&mut self) -> Result<usize> {
        let b = self.peek()?;
        match b {
            0..=SHORT_LENGTH_MAX => {
                self.pos += 1;
                Ok(b as usize)
            }
            LENGTH_QUOTE => {
                self.pos += 1;
                Ok(self.read_uintvar()? as usize)
            }
            _ => Err(self.malformed(format!("expected value-length, got {:#04x}", b))),
        }
    }

    /// Text-string terminé par NUL, guillemet 0x7F éventuel retiré
    ///
    /// Sans guillemet, le premier octet doit être NUL ou un caractère texte :
    /// un octet de longueur ou un octet >= 0x80 désigne une autre primitive.
    pub fn read_text_string(&mut self) -> Result<Vec<u8>> {
        match self.peek()? {
            QUOTE => self.pos += 1,
            b @ (0x01..=LENGTH_QUOTE | 0x80..=0xFF) => {
                return Err(self.malformed(format!("expected text-string, got {:#04x}", b)));
            }
            _ => {}
        }
        let rest = self.rest();
        let Some(end) = rest.iter().position(|b| *b == 0) else {
            return Err(self.truncated(rest.len() + 1));
        };
        let text = rest[..end].to_vec();
        self.pos += end + 1;
        Ok(text)
    }

    /// Quoted-string : '"' suivi d'un texte terminé par NUL
    pub fn read_quoted_string(&mut self) -> Result<Vec<u8>> {
        let b = self.peek()?;
        if b != DOUBLE_QUOTE {
            return Err(self.malformed(format!("expected quoted-string, got {:#04x}", b)));
        }
        self.pos += 1;
        let rest = self.rest();
        let Some(end) = rest.iter().position(|b| *b == 0) else {
            return Err(self.truncated(rest.len() + 1));
        };
        let text = rest[..end].to_vec();
        self.pos += end + 1;
        Ok(text)
    }

    /// Encoded-string-value : text-string, ou value-length + charset + text-string
    pub fn read_encoded_string(&mut self) -> Result<EncodedString> {
        let b = self.peek()?;
        if b > LENGTH_QUOTE {
            return Ok(EncodedString::new(self.read_text_string()?));
        }
        let len = self.read_value_length()?;
        if len == 0 {
            return Ok(EncodedString::default());
        }
        let mut inner = self.sub_reader(len)?;
        let charset = inner.read_integer_value()?;
        let text = inner.read_text_string()?;
        inner.expect_end()?;
        Ok(EncodedString::with_charset(charset, text))
    }

    /// Saute une valeur inconnue selon la règle générique WSP
    pub fn skip_value(&mut self) -> Result<()> {
        let b = self.peek()?;
        match b {
            0..=SHORT_LENGTH_MAX | LENGTH_QUOTE => {
                let len = self.read_value_length()?;
                self.read_bytes(len)?;
            }
            0x20..=0x7F => {
                self.read_text_string()?;
            }
            _ => {
                self.pos += 1;
            }
        }
        Ok(())
    }
}

/// Écrivain des primitives WSP, symétrique de `Reader`
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, b: u8) {
        self.buf.push(b);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_uintvar(&mut self, value: u32) {
        let mut groups = [0u8; 5];
        let mut n = 0;
        let mut v = value;
        loop {
            groups[n] = (v & 0x7F) as u8;
            n += 1;
            v >>= 7;
            if v == 0 {
                break;
            }
        }
        for i in (0..n).rev() {
            let cont = if i > 0 { 0x80 } else { 0x00 };
            self.buf.push(groups[i] | cont);
        }
    }

    pub fn write_short_integer(&mut self, field: &str, value: u8) -> Result<()> {
        if value > 0x7F {
            return Err(Error::malformed(
                field,
                format!("{} does not fit a short-integer", value),
            ));
        }
        self.buf.push(value | 0x80);
        Ok(())
    }

    pub fn write_long_integer(&mut self, value: u64) {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
        let significant = &bytes[skip..];
        self.buf.push(significant.len() as u8);
        self.buf.extend_from_slice(significant);
    }

    pub fn write_integer_value(&mut self, value: u64) {
        if value <= 0x7F {
            self.buf.push(value as u8 | 0x80);
        } else {
            self.write_long_integer(value);
        }
    }

    pub fn write_value_length(&mut self, field: &str, len: usize) -> Result<()> {
        if len <= SHORT_LENGTH_MAX as usize {
            self.buf.push(len as u8);
            return Ok(());
        }
        let len = u32::try_from(len)
            .map_err(|_| Error::malformed(field, "value longer than a uintvar can express"))?;
        self.buf.push(LENGTH_QUOTE);
        self.write_uintvar(len);
        Ok(())
    }

    pub fn write_text_string(&mut self, field: &str, text: &[u8]) -> Result<()> {
        if text.contains(&0) {
            return Err(Error::malformed(field, "text contains a NUL octet"));
        }
        if text.first().is_some_and(|b| *b <= LENGTH_QUOTE) {
            return Err(Error::malformed(field, "text cannot start with a length octet"));
        }
        if text.first().is_some_and(|b| *b >= QUOTE) {
            self.buf.push(QUOTE);
        }
        self.buf.extend_from_slice(text);
        self.buf.push(0);
        Ok(())
    }

    pub fn write_quoted_string(&mut self, field: &str, text: &[u8]) -> Result<()> {
        if text.contains(&0) {
            return Err(Error::malformed(field, "text contains a NUL octet"));
        }
        self.buf.push(DOUBLE_QUOTE);
        self.buf.extend_from_slice(text);
        self.buf.push(0);
        Ok(())
    }

    pub fn write_encoded_string(&mut self, field: &str, value: &EncodedString) -> Result<()> {
        match value.charset {
            None if value.text.is_empty() => {
                self.buf.push(0);
                Ok(())
            }
            None if value.text[0] <= LENGTH_QUOTE => Err(Error::malformed(
                field,
                "text without charset cannot start with a length octet",
            )),
            None => self.write_text_string(field, &value.text),
            Some(charset) => {
                let mut inner = Writer::new();
                inner.write_integer_value(charset);
                inner.write_text_string(field, &value.text)?;
                self.write_value_length(field, inner.len())?;
                self.write_bytes(inner.as_slice());
                Ok(())
            }
        }
    }
}
