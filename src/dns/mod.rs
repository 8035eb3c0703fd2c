pub mod common;
pub mod constants;
pub mod enums;
pub mod header;
pub mod question;
pub mod resource;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use common::PacketComponent;
use header::DNSHeader;
use question::DNSQuestion;
use resource::DNSResource;
use thiserror::Error;
use tracing::{debug, trace};

pub use constants::DNSRcode;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
}

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("Invalid DNS header")]
    InvalidHeader,
    #[error("Invalid DNS label")]
    InvalidLabel,
    #[error("Invalid question section")]
    InvalidQuestionSection,
    #[error("Invalid answer section")]
    InvalidAnswerSection,
    #[error("Invalid authority section")]
    InvalidAuthoritySection,
    #[error("Invalid additional section")]
    InvalidAdditionalSection,
    #[error("Invalid bit stream: {0}")]
    InvalidBitStream(String),
    #[error("Record data of {0} bytes does not fit a 16-bit length")]
    RdataTooLong(usize),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl DNSPacket {
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let mut packet = DNSPacket::default();
        packet.header.read(&mut reader)?;
        debug!(
            "Parsed DNS header: id={}, qr={}, opcode={}, questions={}",
            packet.header.id, packet.header.qr, packet.header.opcode, packet.header.qdcount
        );

        for _ in 0..packet.header.qdcount {
            let mut question = DNSQuestion::default();
            question
                .read_with_buffer(&mut reader, buf)
                .map_err(|e| section_error(e, ParseError::InvalidQuestionSection))?;
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let mut answer = DNSResource::default();
            answer
                .read_with_buffer(&mut reader, buf)
                .map_err(|e| section_error(e, ParseError::InvalidAnswerSection))?;
            packet.answers.push(answer);
        }

        for _ in 0..packet.header.nscount {
            let mut authority = DNSResource::default();
            authority
                .read_with_buffer(&mut reader, buf)
                .map_err(|e| section_error(e, ParseError::InvalidAuthoritySection))?;
            packet.authorities.push(authority);
        }

        for _ in 0..packet.header.arcount {
            let mut resource = DNSResource::default();
            resource
                .read_with_buffer(&mut reader, buf)
                .map_err(|e| section_error(e, ParseError::InvalidAdditionalSection))?;
            packet.resources.push(resource);
        }

        Ok(packet)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::with_capacity(512);
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        // Section counts always reflect the vectors, not the stored header
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16;
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for answer in &self.answers {
            answer.write(&mut writer)?;
        }
        for authority in &self.authorities {
            authority.write(&mut writer)?;
        }
        for resource in &self.resources {
            resource.write(&mut writer)?;
        }

        Ok(buf)
    }

    /// Build an empty reply to `query`: same id, opcode and RD bit, QR set,
    /// first question echoed.
    pub fn reply_to(query: &DNSPacket) -> Self {
        let questions: Vec<DNSQuestion> = query.questions.iter().take(1).cloned().collect();
        DNSPacket {
            header: DNSHeader {
                id: query.header.id,
                qr: true,
                opcode: query.header.opcode,
                rd: query.header.rd,
                rcode: DNSRcode::NOERROR,
                qdcount: questions.len() as u16,
                ..Default::default()
            },
            questions,
            ..Default::default()
        }
    }

    /// Convenience constructor for a single-question query
    pub fn query(id: u16, question: DNSQuestion) -> Self {
        DNSPacket {
            header: DNSHeader {
                id,
                rd: true,
                qdcount: 1,
                ..Default::default()
            },
            questions: vec![question],
            ..Default::default()
        }
    }

    pub fn is_query(&self) -> bool {
        !self.header.qr
    }
}

fn section_error(err: ParseError, section: ParseError) -> ParseError {
    match err {
        ParseError::InvalidLabel => ParseError::InvalidLabel,
        _ => section,
    }
}
