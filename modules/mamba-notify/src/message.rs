//! Channel-agnostic message texts. Built once per dispatch and handed to
//! every channel; the email adapter wraps them in HTML on its own.

use mamba_common::{Hospital, Incident, StockReport};

/// Emergency alert sent to hospital contacts and emergency services when
/// an incident is reported.
pub fn emergency_alert(incident: &Incident, hospital: Option<&Hospital>) -> String {
    let risk = incident
        .risk_level
        .map(|r| format!("{r:?}").to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let mut text = format!(
        "EMERGENCY ALERT\n\
         \n\
         SNAKEBITE INCIDENT REPORTED\n\
         \n\
         Risk Level: {risk}\n\
         Location: {:.4}, {:.4}\n\
         Time: {}\n",
        incident.location.lat,
        incident.location.lng,
        incident.created_at.to_rfc3339(),
    );

    match hospital {
        Some(h) => {
            let antivenom = if h.antivenom_stock.is_available() {
                "Yes"
            } else {
                "Check stock"
            };
            let contact = h
                .contact
                .emergency
                .as_deref()
                .or(h.contact.phone.as_deref())
                .unwrap_or("N/A");
            text.push_str(&format!(
                "\nAssigned Hospital: {}\nAntivenom Available: {}\nContact: {}\n",
                h.name, antivenom, contact
            ));
        }
        None => text.push_str("\nNo eligible hospital available — dispatch pending.\n"),
    }

    text.push_str(&format!(
        "\nResponder ID: {}\nIncident ID: {}\n\nIMMEDIATE ACTION REQUIRED",
        incident.responder_id, incident.id
    ));
    text
}

/// Update sent to a hospital's contacts on reassignment or other changes
/// affecting it.
pub fn hospital_update(hospital: &Hospital, update_type: &str, detail: &serde_json::Value) -> String {
    format!(
        "HOSPITAL UPDATE\n\
         \n\
         Hospital: {}\n\
         Update Type: {}\n\
         Details: {}\n\
         \n\
         Please review and take necessary action.",
        hospital.name, update_type, detail
    )
}

/// Stock alert for a hospital's antivenom inventory. Quantities under five
/// doses are flagged as critical.
pub fn stock_alert(hospital: &Hospital, stock: &StockReport) -> String {
    let urgency = if stock.quantity < 5 { "CRITICAL" } else { "WARNING" };
    let action = if stock.quantity < 5 {
        "URGENT RESTOCK NEEDED"
    } else {
        "Monitor stock levels"
    };
    let expiry = stock
        .expiry_date
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "{urgency} STOCK ALERT\n\
         \n\
         Hospital: {}\n\
         Antivenom Type: {}\n\
         Current Stock: {}\n\
         Expiry Date: {expiry}\n\
         Status: {}\n\
         \n\
         Action Required: {action}",
        hospital.name, stock.antivenom_type, stock.quantity, stock.status
    )
}
