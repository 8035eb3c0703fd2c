use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{ParseError, common::PacketComponent};

const QR_BIT: u16 = 1 << 15;
const AA_BIT: u16 = 1 << 10;
const TC_BIT: u16 = 1 << 9;
const RD_BIT: u16 = 1 << 8;
const RA_BIT: u16 = 1 << 7;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DNSHeader {
    /// The second header word: QR, opcode, AA, TC, RD, RA, Z and rcode
    pub fn flags(&self) -> u16 {
        let mut flags = ((self.opcode as u16 & 0x0F) << 11)
            | ((self.z as u16 & 0x07) << 4)
            | (self.rcode as u16 & 0x0F);
        for (set, bit) in [
            (self.qr, QR_BIT),
            (self.aa, AA_BIT),
            (self.tc, TC_BIT),
            (self.rd, RD_BIT),
            (self.ra, RA_BIT),
        ] {
            if set {
                flags |= bit;
            }
        }
        flags
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.qr = flags & QR_BIT != 0;
        self.opcode = ((flags >> 11) & 0x0F) as u8;
        self.aa = flags & AA_BIT != 0;
        self.tc = flags & TC_BIT != 0;
        self.rd = flags & RD_BIT != 0;
        self.ra = flags & RA_BIT != 0;
        self.z = ((flags >> 4) & 0x07) as u8;
        self.rcode = (flags & 0x0F) as u8;
    }
}

impl PacketComponent for DNSHeader {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        for word in [
            self.id,
            self.flags(),
            self.qdcount,
            self.ancount,
            self.nscount,
            self.arcount,
        ] {
            writer.write_var::<u16>(16, word)?;
        }
        Ok(())
    }

    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError> {
        let mut words = [0u16; 6];
        for word in words.iter_mut() {
            *word = reader
                .read_var::<u16>(16)
                .map_err(|_| ParseError::InvalidHeader)?;
        }
        let [id, flags, qdcount, ancount, nscount, arcount] = words;

        self.id = id;
        self.set_flags(flags);
        self.qdcount = qdcount;
        self.ancount = ancount;
        self.nscount = nscount;
        self.arcount = arcount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_layout() {
        let header = DNSHeader {
            qr: true,
            opcode: 2,
            aa: true,
            rd: true,
            rcode: 3,
            ..Default::default()
        };
        assert_eq!(header.flags(), 0x9503);

        let mut parsed = DNSHeader::default();
        parsed.set_flags(0x9503);
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_standard_query_flags() {
        let mut header = DNSHeader::default();
        header.set_flags(0x0100);
        assert!(!header.qr);
        assert!(header.rd);
        assert_eq!(header.opcode, 0);
        assert_eq!(header.rcode, 0);
    }
}
