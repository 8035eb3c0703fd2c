use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::{PacketComponent, fqdn_to_labels, labels_to_fqdn},
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSQuestion {
    pub labels: Vec<String>,
    pub qtype: DNSResourceType,
    pub qclass: DNSResourceClass,
}

impl DNSQuestion {
    /// Build an IN-class question from a presentation name
    pub fn new(name: &str, qtype: DNSResourceType) -> Self {
        Self {
            labels: fqdn_to_labels(name),
            qtype,
            qclass: DNSResourceClass::IN,
        }
    }

    /// Fully qualified query name, e.g. `www.example.com.`
    pub fn name(&self) -> String {
        labels_to_fqdn(&self.labels)
    }
}

impl PacketComponent for DNSQuestion {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.qtype.into())?;
        writer.write_var::<u16>(16, self.qclass.into())?;
        Ok(())
    }

    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError> {
        let labels = self.read_labels(reader)?;
        self.finish_read(reader, labels)
    }

    fn read_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        let labels = self.read_labels_with_buffer(reader, Some(packet_buf))?;
        self.finish_read(reader, labels)
    }
}

impl DNSQuestion {
    fn finish_read<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        labels: Vec<String>,
    ) -> Result<(), ParseError> {
        let qtype = reader
            .read_var::<u16>(16)
            .map_err(|_| ParseError::InvalidQuestionSection)?
            .into();
        let qclass = reader
            .read_var::<u16>(16)
            .map_err(|_| ParseError::InvalidQuestionSection)?
            .into();
        *self = DNSQuestion {
            labels,
            qtype,
            qclass,
        };
        Ok(())
    }
}
