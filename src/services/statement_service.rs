//! Printable statement of facts for one shipment.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::models::shipment::{FreightType, Shipment, StatementOfFactEvent};

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        "N/A".to_string()
    } else {
        escape_html(value)
    }
}

fn event_row(event: &StatementOfFactEvent) -> String {
    let documents = event
        .documents
        .iter()
        .map(|doc| escape_html(&doc.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        event.timestamp.format("%Y-%m-%d %H:%M"),
        escape_html(&event.description),
        escape_html(&event.created_by.name),
        if documents.is_empty() { "-".to_string() } else { documents },
    )
}

/// Render the statement as a standalone HTML document, events oldest first.
pub fn render_statement(shipment: &Shipment, generated_at: DateTime<Utc>) -> String {
    let details = &shipment.shipment_details;
    let mut events: Vec<&StatementOfFactEvent> = shipment.statement_of_facts.iter().collect();
    events.sort_by_key(|event| event.timestamp);

    let mut html = String::new();
    // writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Statement of Facts - {reference}</title></head><body>\n\
         <h1>Statement of Facts</h1>\n\
         <table class=\"summary\">\
         <tr><th>Reference</th><td>{reference}</td></tr>\
         <tr><th>Consignee</th><td>{consignee}</td></tr>\
         <tr><th>{transport_label}</th><td>{transport}</td></tr>\
         <tr><th>Port of Origin</th><td>{origin}</td></tr>\
         <tr><th>Port of Discharge</th><td>{discharge}</td></tr>\
         </table>\n",
        reference = escape_html(&shipment.reference_number),
        consignee = or_na(&shipment.consignee.name),
        transport_label = match shipment.freight_type {
            FreightType::Sea => "BL Number",
            FreightType::Air => "AWB Number",
        },
        transport = or_na(details.transport_reference(shipment.freight_type)),
        origin = or_na(&details.port_of_origin),
        discharge = or_na(&details.port_of_discharge),
    );

    html.push_str(
        "<table class=\"events\"><thead><tr><th>Date</th><th>Event</th><th>Recorded by</th><th>Documents</th></tr></thead><tbody>\n",
    );
    if events.is_empty() {
        html.push_str("<tr><td colspan=\"4\">No events recorded.</td></tr>\n");
    }
    for event in events {
        html.push_str(&event_row(event));
        html.push('\n');
    }
    let _ = write!(
        html,
        "</tbody></table>\n<p class=\"generated\">Generated {}</p>\n</body></html>\n",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shipment::{
        AttachedDocument, Author, ConsigneeSnapshot, ExporterSnapshot,
        ShipmentDetails,
    };
    use crate::workflow::Stage;
    use chrono::{Duration, TimeZone};

    fn shipment_with(events: Vec<StatementOfFactEvent>) -> Shipment {
        let t = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        Shipment {
            id: "s1".into(),
            reference_number: "CLEX-IMS24-0007".into(),
            freight_type: FreightType::Sea,
            status: Stage::Lodged,
            user_id: "u1".into(),
            consignee_id: None,
            exporter_id: None,
            consignee: ConsigneeSnapshot {
                name: "Bay & Harbor <Imports>".into(),
                ..Default::default()
            },
            exporter: ExporterSnapshot::default(),
            shipment_details: ShipmentDetails {
                bl_number: "MAEU-881".into(),
                port_of_origin: "Busan".into(),
                ..Default::default()
            },
            documents: vec![],
            timeline: vec![],
            notes: vec![],
            cargo: vec![],
            computations: None,
            statement_of_facts: events,
            is_locked: false,
            completion_date: None,
            version: 1,
            created_at: t,
            updated_at: t,
        }
    }

    fn event(id: &str, description: &str, at: DateTime<Utc>) -> StatementOfFactEvent {
        StatementOfFactEvent {
            id: id.into(),
            timestamp: at,
            description: description.into(),
            created_by: Author {
                id: "u1".into(),
                name: "Rhea Broker".into(),
            },
            documents: vec![],
        }
    }

    #[test]
    fn text_is_escaped() {
        let t = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        let html = render_statement(
            &shipment_with(vec![event("e1", "<script>alert(1)</script>", t)]),
            t,
        );
        assert!(html.contains("Bay &amp; Harbor &lt;Imports&gt;"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn events_are_listed_oldest_first() {
        let t = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        let mut late = event("e2", "Container released", t + Duration::days(2));
        late.documents.push(AttachedDocument {
            id: "d1".into(),
            name: "Gate pass".into(),
            url: "/x".into(),
            kind: "pdf".into(),
        });
        let early = event("e1", "Vessel arrived", t);
        let html = render_statement(&shipment_with(vec![late, early]), t);

        let arrived = html.find("Vessel arrived").unwrap();
        let released = html.find("Container released").unwrap();
        assert!(arrived < released);
        assert!(html.contains("Gate pass"));
        assert!(html.contains("MAEU-881"));
        assert!(html.contains("<th>Port of Discharge</th><td>N/A</td>"));
    }

    #[test]
    fn empty_statement_says_so() {
        let t = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        let html = render_statement(&shipment_with(vec![]), t);
        assert!(html.contains("No events recorded."));
        assert!(html.contains("Generated 2024-04-02 10:00 UTC"));
    }
}
