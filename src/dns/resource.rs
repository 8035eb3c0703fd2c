use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{
    ParseError,
    common::{PacketComponent, labels_at, labels_to_fqdn},
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSResource {
    pub labels: Vec<String>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdlength: u16,
    pub rdata: Vec<u8>,
    /// Presentation form of `rdata` for the record types we understand
    pub parsed_rdata: Option<String>,
}

impl DNSResource {
    /// Fully qualified owner name
    pub fn name(&self) -> String {
        labels_to_fqdn(&self.labels)
    }
}

impl PacketComponent for DNSResource {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        let rdlength =
            u16::try_from(self.rdata.len()).map_err(|_| ParseError::RdataTooLong(self.rdata.len()))?;
        writer.write_var::<u16>(16, rdlength)?;
        writer.write_bytes(&self.rdata)?;
        Ok(())
    }

    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError> {
        self.labels = self.read_labels(reader)?;
        self.read_fixed(reader)?;
        self.parsed_rdata = decode_rdata(self.rtype, &self.rdata, None);
        Ok(())
    }

    fn read_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        self.labels = self.read_labels_with_buffer(reader, Some(packet_buf))?;
        self.read_fixed(reader)?;
        self.parsed_rdata = decode_rdata(self.rtype, &self.rdata, Some(packet_buf));
        Ok(())
    }
}

impl DNSResource {
    fn read_fixed<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
    ) -> Result<(), ParseError> {
        self.rtype = reader.read_var::<u16>(16)?.into();
        self.rclass = reader.read_var::<u16>(16)?.into();
        self.ttl = reader.read_var::<u32>(32)?;
        self.rdlength = reader.read_var::<u16>(16)?;
        let mut buf = vec![0_u8; self.rdlength as usize];
        reader.read_bytes(&mut buf)?;
        self.rdata = buf;
        Ok(())
    }
}

/// Render rdata as presentation text. Returns `None` for types we do not
/// decode or for rdata that is malformed.
fn decode_rdata(rtype: DNSResourceType, rdata: &[u8], packet_buf: Option<&[u8]>) -> Option<String> {
    match rtype {
        DNSResourceType::A => {
            let octets: [u8; 4] = rdata.try_into().ok()?;
            Some(Ipv4Addr::from(octets).to_string())
        }
        DNSResourceType::AAAA => {
            let octets: [u8; 16] = rdata.try_into().ok()?;
            Some(Ipv6Addr::from(octets).to_string())
        }
        DNSResourceType::NS | DNSResourceType::CNAME | DNSResourceType::PTR => {
            decode_name(rdata, packet_buf)
        }
        DNSResourceType::MX => {
            let preference = u16::from_be_bytes(rdata.get(..2)?.try_into().ok()?);
            let exchange = decode_name(&rdata[2..], packet_buf)?;
            Some(format!("{} {}", preference, exchange))
        }
        DNSResourceType::TXT => {
            let mut text = String::new();
            let mut pos = 0;
            while pos < rdata.len() {
                let len = rdata[pos] as usize;
                let chunk = rdata.get(pos + 1..pos + 1 + len)?;
                text.push_str(&String::from_utf8_lossy(chunk));
                pos += 1 + len;
            }
            Some(text)
        }
        _ => None,
    }
}

/// Decode a name embedded in rdata; pointers jump into the full packet.
fn decode_name(bytes: &[u8], packet_buf: Option<&[u8]>) -> Option<String> {
    let mut labels = Vec::new();
    let mut name_len = 1;
    let mut pos = 0;
    loop {
        let len = *bytes.get(pos)?;
        if len == 0 {
            break;
        }
        if len & 0xC0 == 0xC0 {
            let low = *bytes.get(pos + 1)?;
            let offset = (((len & 0x3F) as usize) << 8) | low as usize;
            labels_at(packet_buf?, offset, &mut labels, &mut name_len).ok()?;
            break;
        }
        let label = bytes.get(pos + 1..pos + 1 + len as usize)?;
        labels.push(String::from_utf8(label.to_vec()).ok()?);
        pos += 1 + len as usize;
    }
    Some(labels_to_fqdn(&labels))
}
