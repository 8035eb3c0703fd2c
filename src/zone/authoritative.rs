//! Authoritative DNS response generation
//!
//! Every reply carries the AA flag. A query either gets the single stored
//! record for its name and type, or NXDOMAIN.

use super::constants::ANSWER_TTL;
use super::loader::ZoneLoader;
use super::Result;
use crate::dns::{DNSPacket, DNSRcode, enums::DNSResourceType};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Authoritative DNS responder
pub struct AuthoritativeResponder {
    loader: Arc<ZoneLoader>,
}

impl AuthoritativeResponder {
    pub fn new(loader: Arc<ZoneLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<ZoneLoader> {
        &self.loader
    }

    /// Answer `query` from the zone owning its first question.
    ///
    /// Only fatal zone errors are returned as `Err`; every other outcome is
    /// a reply.
    pub fn handle(&self, query: &DNSPacket) -> Result<DNSPacket> {
        let mut response = DNSPacket::reply_to(query);
        response.header.aa = true;
        response.header.ra = false;

        let Some(question) = query.questions.first() else {
            debug!("Query {} has no question", query.header.id);
            response.header.rcode = DNSRcode::FORMERR;
            return Ok(response);
        };

        let qname = question.name();
        let qtype = question.qtype;

        // Lookup goes against the snapshot returned here, never a newer one
        let Some(zone) = self.loader.resolve_zone_for(&qname)? else {
            return Ok(name_error(response, &qname, qtype));
        };

        let Some(record) = zone.records.lookup(&qname, qtype) else {
            return Ok(name_error(response, &qname, qtype));
        };

        match record.to_answer(ANSWER_TTL) {
            Ok(answer) => {
                debug!("Answering {} {} from zone {}", qname, qtype, zone.descriptor.name);
                response.answers.push(answer);
            }
            Err(e) => {
                warn!("Cannot encode {} record for {}: {}", qtype, qname, e);
                response.header.rcode = DNSRcode::SERVFAIL;
            }
        }

        Ok(response)
    }
}

fn name_error(mut response: DNSPacket, name: &str, qtype: DNSResourceType) -> DNSPacket {
    info!(name = %name, qtype = %qtype, "DNS PROBE FINISHED NXDOMAIN");
    response.header.rcode = DNSRcode::NXDOMAIN;
    response
}
