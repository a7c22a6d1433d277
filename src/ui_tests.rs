use super::{
    counters, detail_fields, format_contact_row, format_interaction_row, format_status_row,
    status_color_code, Palette,
};
use crate::app::{ContactDetail, ContactRef, ContactView, EmailView, InteractionView, PhoneView};
use crate::domain::status::ContactStatus;
use crate::imports::ImportStatus;

fn plain() -> Palette {
    Palette { enabled: false }
}

fn sample_contact() -> ContactView {
    ContactView {
        id: 7,
        name: "Ada Lovelace".to_string(),
        description: "Analyst".to_string(),
        frequency_in_days: Some(14),
        linkedin_url: None,
        twitter_url: Some("https://twitter.com/ada".to_string()),
        last_interaction_at: Some("2026-01-01T10:00:00Z".to_string()),
        last_past_interaction_at: Some("2026-01-01T10:00:00Z".to_string()),
        urgency: Some(3),
        status: ContactStatus::OutOfTouch,
        status_code: 1,
        next_due_at: Some("2026-01-15T10:00:00Z".to_string()),
        created_at: "2025-12-01T10:00:00Z".to_string(),
        updated_at: "2025-12-01T10:00:00Z".to_string(),
    }
}

#[test]
fn contact_row_shows_frequency_and_overdue_days() {
    let row = format_contact_row(&sample_contact(), &plain());
    assert_eq!(row, "#7 [OUT_OF_TOUCH] Ada Lovelace every 14d +3d overdue");
}

#[test]
fn contact_row_omits_urgency_when_not_overdue() {
    let mut contact = sample_contact();
    contact.urgency = Some(-4);
    contact.status = ContactStatus::InTouch;
    let row = format_contact_row(&contact, &plain());
    assert_eq!(row, "#7 [IN_TOUCH] Ada Lovelace every 14d");

    contact.frequency_in_days = None;
    contact.urgency = None;
    contact.status = ContactStatus::Hidden;
    assert_eq!(format_contact_row(&contact, &plain()), "#7 [HIDDEN] Ada Lovelace");
}

#[test]
fn interaction_row_lists_date_type_and_contacts() {
    let interaction = InteractionView {
        id: 1,
        type_key: Some("email".to_string()),
        title: "Quarterly sync".to_string(),
        description: "-".to_string(),
        was_at: "2026-02-03T09:30:00Z".to_string(),
        url: None,
        contacts: vec![
            ContactRef {
                id: 7,
                name: "Ada".to_string(),
            },
            ContactRef {
                id: 8,
                name: "Grace".to_string(),
            },
        ],
    };
    assert_eq!(
        format_interaction_row(&interaction, &plain()),
        "2026-02-03 Quarterly sync (email) with Ada, Grace"
    );
}

#[test]
fn detail_fields_include_present_values_only() {
    let detail = ContactDetail {
        contact: sample_contact(),
        avatar_url: "https://www.gravatar.com/avatar/abc?s=128".to_string(),
        last_interaction_since: Some("2 weeks".to_string()),
        due_in: None,
        emails: vec![EmailView {
            id: 1,
            contact_id: 7,
            email: "ada@example.com".to_string(),
        }],
        phones: vec![PhoneView {
            id: 2,
            contact_id: 7,
            number: "+44 20 0000".to_string(),
            label: Some("work".to_string()),
        }],
        interactions: Vec::new(),
        duplicates: Vec::new(),
    };
    let labels = detail_fields(&detail)
        .into_iter()
        .map(|(label, _)| label)
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec!["emails", "phone", "twitter", "last contact", "avatar"]
    );
    let fields = detail_fields(&detail);
    assert_eq!(fields[1].1, "+44 20 0000 (work)");
    assert_eq!(fields[3].1, "2 weeks ago");
}

#[test]
fn status_row_includes_counters() {
    let status = ImportStatus {
        source_type: "csv".to_string(),
        source_ref: "people.csv".to_string(),
        status: "partial".to_string(),
        processed_count: 4,
        imported_count: 2,
        skipped_count: 0,
        error_count: 2,
        checkpoint: Some("5".to_string()),
        last_error: None,
        last_run_at: "2026-02-03T09:30:00Z".to_string(),
    };
    assert_eq!(
        format_status_row(&status, &plain()),
        "csv people.csv partial processed=4 imported=2 skipped=0 errors=2 2026-02-03T09:30:00Z"
    );
    assert_eq!(counters(1, 1, 0, 0), "processed=1 imported=1 skipped=0 errors=0");
}

#[test]
fn palette_paints_only_when_enabled() {
    let colored = Palette { enabled: true };
    assert_eq!(colored.dim("x"), "\x1b[2mx\x1b[0m");
    assert_eq!(colored.run_status("failed"), "\x1b[31mfailed\x1b[0m");
    assert_eq!(plain().heading("Due"), "Due");
    assert_eq!(status_color_code(ContactStatus::InTouch), "32");
    assert_eq!(status_color_code(ContactStatus::Hidden), "90");
}
