use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::ParseError;
use super::constants::{MAX_LABEL_LEN, MAX_NAME_LEN, MAX_POINTER_HOPS};

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;

    /// Read without access to the enclosing packet; compression pointers
    /// cannot be followed and are rejected.
    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError>;

    fn read_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        _packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        self.read(reader)
    }

    fn read_labels<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
    ) -> Result<Vec<String>, ParseError> {
        self.read_labels_with_buffer(reader, None)
    }

    /// Read a domain name as a list of labels (root label omitted).
    fn read_labels_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet_buf: Option<&[u8]>,
    ) -> Result<Vec<String>, ParseError> {
        let mut labels = Vec::new();
        let mut name_len = 1;
        loop {
            let label_len = reader.read_var::<u8>(8)?;
            if label_len == 0 {
                break;
            }
            if label_len & 0xC0 == 0xC0 {
                let low = reader.read_var::<u8>(8)?;
                let offset = (((label_len & 0x3F) as usize) << 8) | low as usize;
                let buf = packet_buf.ok_or(ParseError::InvalidLabel)?;
                labels_at(buf, offset, &mut labels, &mut name_len)?;
                break;
            }
            if label_len & 0xC0 != 0 {
                return Err(ParseError::InvalidLabel);
            }
            let mut buf = vec![0; label_len as usize];
            reader.read_bytes(&mut buf)?;
            push_label(&mut labels, &buf, &mut name_len)?;
        }

        Ok(labels)
    }

    fn write_labels<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        labels: &[String],
    ) -> Result<(), ParseError> {
        let encoded_len: usize = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
        if encoded_len > MAX_NAME_LEN {
            return Err(ParseError::InvalidLabel);
        }
        for label in labels {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(ParseError::InvalidLabel);
            }
            writer.write_var::<u8>(8, label.len() as u8)?;
            writer.write_bytes(label.as_bytes())?;
        }
        writer.write_var::<u8>(8, 0)?;

        Ok(())
    }
}

/// Follow a name starting at `offset` inside the full packet.
pub(crate) fn labels_at(
    packet_buf: &[u8],
    mut offset: usize,
    labels: &mut Vec<String>,
    name_len: &mut usize,
) -> Result<(), ParseError> {
    let mut hops = 0;
    loop {
        let len = *packet_buf.get(offset).ok_or(ParseError::InvalidLabel)?;
        if len == 0 {
            return Ok(());
        }
        if len & 0xC0 == 0xC0 {
            let low = *packet_buf.get(offset + 1).ok_or(ParseError::InvalidLabel)?;
            hops += 1;
            if hops > MAX_POINTER_HOPS {
                return Err(ParseError::InvalidLabel);
            }
            offset = (((len & 0x3F) as usize) << 8) | low as usize;
            continue;
        }
        if len & 0xC0 != 0 {
            return Err(ParseError::InvalidLabel);
        }
        let start = offset + 1;
        let stop = start + len as usize;
        let bytes = packet_buf.get(start..stop).ok_or(ParseError::InvalidLabel)?;
        push_label(labels, bytes, name_len)?;
        offset = stop;
    }
}

fn push_label(labels: &mut Vec<String>, bytes: &[u8], name_len: &mut usize) -> Result<(), ParseError> {
    *name_len += bytes.len() + 1;
    if bytes.len() > MAX_LABEL_LEN || *name_len > MAX_NAME_LEN {
        return Err(ParseError::InvalidLabel);
    }
    let label = String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::InvalidLabel)?;
    labels.push(label);
    Ok(())
}

/// Join labels into a fully qualified presentation name
pub fn labels_to_fqdn(labels: &[String]) -> String {
    if labels.is_empty() {
        return ".".to_string();
    }
    let mut name = labels.join(".");
    name.push('.');
    name
}

/// Split a presentation name into labels, ignoring the trailing root dot
pub fn fqdn_to_labels(name: &str) -> Vec<String> {
    name.trim_end_matches('.')
        .split('.')
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}
