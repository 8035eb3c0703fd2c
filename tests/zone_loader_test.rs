mod common;

use common::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use zonekeeper::config::SuffixMatch;
use zonekeeper::dns::{DNSRcode, enums::DNSResourceType};
use zonekeeper::zone::{AuthoritativeResponder, ZoneLoader};

#[test]
fn test_repeated_queries_parse_once() {
    let files = ZoneFiles::new();
    let path = files.write("example.com.zone", EXAMPLE_COM_ZONE);
    let responder = responder(&[("example.com", path)]);

    for _ in 0..10 {
        responder
            .handle(&create_test_query("www.example.com.", DNSResourceType::A))
            .unwrap();
    }
    // Other names in the same zone, including misses, reuse it too
    responder
        .handle(&create_test_query("example.com.", DNSResourceType::MX))
        .unwrap();
    responder
        .handle(&create_test_query("missing.example.com.", DNSResourceType::A))
        .unwrap();

    assert_eq!(responder.loader().load_count(), 1);
}

#[test]
fn test_switching_zones_evicts_previous_records() {
    let files = ZoneFiles::new();
    let com = files.write("example.com.zone", EXAMPLE_COM_ZONE);
    let org = files.write("example.org.zone", EXAMPLE_ORG_ZONE);
    let responder = responder(&[("example.com", com), ("example.org", org)]);
    let loader = responder.loader();

    responder
        .handle(&create_test_query("www.example.com.", DNSResourceType::A))
        .unwrap();
    assert_eq!(loader.load_count(), 1);

    let response = responder
        .handle(&create_test_query("www.example.org.", DNSResourceType::A))
        .unwrap();
    assert_eq!(response.answers[0].parsed_rdata.as_deref(), Some("198.51.100.7"));
    assert_eq!(loader.load_count(), 2);

    let active = loader.active().unwrap();
    assert_eq!(active.descriptor.name, "example.org");
    assert_eq!(active.records.len(), 1);
    assert!(
        active
            .records
            .lookup("www.example.com.", DNSResourceType::A)
            .is_none()
    );

    // Going back re-reads the first zone
    let response = responder
        .handle(&create_test_query("www.example.com.", DNSResourceType::A))
        .unwrap();
    assert_eq!(response.header.rcode, DNSRcode::NOERROR);
    assert_eq!(loader.load_count(), 3);
}

#[test]
fn test_unowned_names_keep_active_zone() {
    let files = ZoneFiles::new();
    let path = files.write("example.com.zone", EXAMPLE_COM_ZONE);
    let responder = responder(&[("example.com", path)]);
    let loader = responder.loader();

    responder
        .handle(&create_test_query("www.example.com.", DNSResourceType::A))
        .unwrap();
    responder
        .handle(&create_test_query("www.example.net.", DNSResourceType::A))
        .unwrap();

    assert_eq!(loader.active().unwrap().descriptor.name, "example.com");
    responder
        .handle(&create_test_query("www.example.com.", DNSResourceType::A))
        .unwrap();
    assert_eq!(loader.load_count(), 1);
}

#[test]
fn test_invalidate_picks_up_edited_file() {
    let files = ZoneFiles::new();
    let path = files.write("example.com.zone", "www.example.com. A 192.0.2.1\n");
    let responder = responder(&[("example.com", path)]);

    let response = responder
        .handle(&create_test_query("www.example.com.", DNSResourceType::A))
        .unwrap();
    assert_eq!(response.answers[0].parsed_rdata.as_deref(), Some("192.0.2.1"));

    files.write("example.com.zone", "www.example.com. A 192.0.2.99\n");

    // Still cached
    let response = responder
        .handle(&create_test_query("www.example.com.", DNSResourceType::A))
        .unwrap();
    assert_eq!(response.answers[0].parsed_rdata.as_deref(), Some("192.0.2.1"));

    responder.loader().invalidate();
    let response = responder
        .handle(&create_test_query("www.example.com.", DNSResourceType::A))
        .unwrap();
    assert_eq!(response.answers[0].parsed_rdata.as_deref(), Some("192.0.2.99"));
}

#[test]
fn test_concurrent_readers_never_see_partial_zone() {
    let files = ZoneFiles::new();

    // Large zones so each switch spends real time parsing
    let mut com = String::new();
    let mut org = String::new();
    for i in 0..1000 {
        com.push_str(&format!("host{}.example.com. A 192.0.2.{}\n", i, i % 250));
        org.push_str(&format!("host{}.example.org. A 198.51.100.{}\n", i, i % 250));
    }
    let com = files.write("example.com.zone", &com);
    let org = files.write("example.org.zone", &org);

    let registry = registry(
        &[("example.com", com), ("example.org", org)],
        SuffixMatch::Legacy,
    );
    let loader = Arc::new(ZoneLoader::new(Arc::new(registry)));
    let responder = Arc::new(AuthoritativeResponder::new(Arc::clone(&loader)));
    let misses = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let responder = Arc::clone(&responder);
            let misses = &misses;
            scope.spawn(move || {
                let zone = if worker % 2 == 0 { "example.com" } else { "example.org" };
                for i in 0..40 {
                    let name = format!("host{}.{}.", (i * 37 + worker) % 1000, zone);
                    let response = responder
                        .handle(&create_test_query(&name, DNSResourceType::A))
                        .unwrap();
                    if response.header.rcode != DNSRcode::NOERROR || response.answers.len() != 1 {
                        misses.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    assert_eq!(misses.load(Ordering::Relaxed), 0);
    assert!(loader.load_count() >= 2);
}
