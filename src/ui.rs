use std::io::{self, IsTerminal};

use crate::app::{
    ContactDetail, ContactList, ContactView, DashboardView, InteractionTypeView, InteractionView,
    UserView,
};
use crate::domain::status::ContactStatus;
use crate::duplicates::DuplicateSummary;
use crate::google::SyncSummary;
use crate::imports::{ImportStatus, ImportSummary};

pub fn print_contact_list(list: &ContactList) {
    let palette = Palette::auto();
    let heading = match list.status {
        Some(status) => format!("Contacts ({})", status.as_str()),
        None => "Contacts".to_string(),
    };
    println!("{}", palette.heading(&heading));
    println!(
        "{}",
        palette.dim(&format!(
            "selected={} out_of_touch={} in_touch={} hidden={}",
            list.counts.selected, list.counts.out_of_touch, list.counts.in_touch, list.counts.hidden
        ))
    );
    if list.contacts.is_empty() {
        println!("{}", palette.dim("no contacts matched"));
        return;
    }
    for contact in &list.contacts {
        println!("{}", format_contact_row(contact, &palette));
    }
    println!("{}", palette.dim(&format!("{} contact(s)", list.contacts.len())));
}

pub fn print_contact_detail(detail: &ContactDetail) {
    let palette = Palette::auto();
    let contact = &detail.contact;
    println!("{}", format_contact_row(contact, &palette));
    if !contact.description.is_empty() {
        println!("  {}", contact.description);
    }
    for (label, value) in detail_fields(detail) {
        println!("  {} {}", palette.dim(&format!("{label}:")), value);
    }
    if !detail.interactions.is_empty() {
        println!("{}", palette.heading("Interactions"));
        for interaction in &detail.interactions {
            println!("{}", format_interaction_row(interaction, &palette));
        }
    }
    if !detail.duplicates.is_empty() {
        println!("{}", palette.heading("Possible duplicates"));
        for duplicate in &detail.duplicates {
            println!(
                "  {} {} {}",
                palette.id(&format!("#{}", duplicate.other_contact_id)),
                duplicate.other_name,
                palette.dim(&format!("{:.2}", duplicate.similarity))
            );
        }
    }
}

pub fn print_dashboard(view: &DashboardView) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Due"));
    print_rows(&view.due, &palette, "nobody is due");
    println!("{}", palette.heading("Frequent"));
    if view.frequent.is_empty() {
        println!("{}", palette.dim("no recent interactions"));
    }
    for entry in &view.frequent {
        println!(
            "{} {}",
            format_contact_row(&entry.contact, &palette),
            palette.dim(&format!("x{}", entry.interaction_count))
        );
    }
    println!("{}", palette.heading("Recently added"));
    print_rows(&view.recent, &palette, "no contacts yet");
}

pub fn print_interactions(interactions: &[InteractionView]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Interactions"));
    if interactions.is_empty() {
        println!("{}", palette.dim("no interactions"));
        return;
    }
    for interaction in interactions {
        println!("{}", format_interaction_row(interaction, &palette));
    }
}

pub fn print_interaction_types(types: &[InteractionTypeView]) {
    let palette = Palette::auto();
    for kind in types {
        println!("{} {}", palette.id(&kind.key), kind.label);
    }
}

pub fn print_users(users: &[UserView]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Users"));
    for user in users {
        let mut line = format!("{} {}", palette.id(&format!("#{}", user.id)), user.email);
        if let Some(name) = user.name.as_deref() {
            line.push(' ');
            line.push_str(&palette.dim(&format!("({name})")));
        }
        println!("{line}");
    }
}

pub fn print_import_summary(summary: &ImportSummary) {
    let palette = Palette::auto();
    let mut label = format!("{} {}", summary.source_type, summary.source_ref);
    if summary.dry_run {
        label.push_str(" (dry run)");
    }
    println!(
        "{} {} {}",
        palette.heading(&label),
        palette.run_status(&summary.status),
        counters(
            summary.processed_count,
            summary.imported_count,
            summary.skipped_count,
            summary.error_count
        )
    );
    if let Some(error) = summary.last_error.as_deref() {
        println!("  {}", palette.dim(error));
    }
}

pub fn print_run_statuses(statuses: &[ImportStatus]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Runs"));
    if statuses.is_empty() {
        println!("{}", palette.dim("no runs recorded"));
        return;
    }
    for status in statuses {
        println!("{}", format_status_row(status, &palette));
    }
}

pub fn print_sync_summaries(summaries: &[SyncSummary]) {
    let palette = Palette::auto();
    if summaries.is_empty() {
        println!("{}", palette.dim("no linked google accounts"));
        return;
    }
    for summary in summaries {
        println!(
            "{} {} {} contacts_created={}",
            palette.heading(&format!("{} {}", summary.kind, summary.account_email)),
            palette.run_status(&summary.status),
            counters(
                summary.processed_count,
                summary.imported_count,
                summary.skipped_count,
                summary.error_count
            ),
            summary.contacts_created
        );
        if let Some(error) = summary.last_error.as_deref() {
            println!("  {}", palette.dim(error));
        }
    }
}

pub fn print_duplicate_summary(summary: &DuplicateSummary) {
    let palette = Palette::auto();
    println!(
        "{} scanned={} compared={} stored={}",
        palette.heading("Duplicates"),
        summary.contacts_scanned,
        summary.pairs_compared,
        summary.suggestions_stored
    );
}

fn print_rows(contacts: &[ContactView], palette: &Palette, empty: &str) {
    if contacts.is_empty() {
        println!("{}", palette.dim(empty));
    }
    for contact in contacts {
        println!("{}", format_contact_row(contact, palette));
    }
}

fn format_contact_row(contact: &ContactView, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {}",
        palette.id(&format!("#{}", contact.id)),
        palette.status(contact.status),
        contact.name
    );
    if let Some(days) = contact.frequency_in_days {
        line.push(' ');
        line.push_str(&palette.dim(&format!("every {days}d")));
    }
    if let Some(urgency) = contact.urgency.filter(|urgency| *urgency > 0) {
        line.push(' ');
        line.push_str(&palette.paint("31", &format!("+{urgency}d overdue")));
    }
    line
}

fn format_interaction_row(interaction: &InteractionView, palette: &Palette) -> String {
    let date = interaction.was_at.get(..10).unwrap_or(&interaction.was_at);
    let mut line = format!("{} {}", palette.dim(date), interaction.title);
    if let Some(kind) = interaction.type_key.as_deref() {
        line.push(' ');
        line.push_str(&palette.paint("35", &format!("({kind})")));
    }
    if !interaction.contacts.is_empty() {
        let names = interaction
            .contacts
            .iter()
            .map(|contact| contact.name.as_str())
            .collect::<Vec<_>>();
        line.push(' ');
        line.push_str(&palette.paint("90", &format!("with {}", names.join(", "))));
    }
    line
}

fn format_status_row(status: &ImportStatus, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {} {}",
        palette.id(&status.source_type),
        status.source_ref,
        palette.run_status(&status.status),
        counters(
            status.processed_count,
            status.imported_count,
            status.skipped_count,
            status.error_count
        )
    );
    line.push(' ');
    line.push_str(&palette.dim(&status.last_run_at));
    line
}

fn detail_fields(detail: &ContactDetail) -> Vec<(&'static str, String)> {
    let contact = &detail.contact;
    let mut fields = Vec::new();
    if !detail.emails.is_empty() {
        let emails = detail
            .emails
            .iter()
            .map(|email| email.email.as_str())
            .collect::<Vec<_>>();
        fields.push(("emails", emails.join(", ")));
    }
    for phone in &detail.phones {
        let value = match phone.label.as_deref() {
            Some(label) => format!("{} ({label})", phone.number),
            None => phone.number.clone(),
        };
        fields.push(("phone", value));
    }
    if let Some(url) = contact.linkedin_url.as_deref() {
        fields.push(("linkedin", url.to_string()));
    }
    if let Some(url) = contact.twitter_url.as_deref() {
        fields.push(("twitter", url.to_string()));
    }
    if let Some(since) = detail.last_interaction_since.as_deref() {
        fields.push(("last contact", format!("{since} ago")));
    }
    if let Some(due_in) = detail.due_in.as_deref() {
        fields.push(("due in", due_in.to_string()));
    }
    fields.push(("avatar", detail.avatar_url.clone()));
    fields
}

fn counters(processed: u64, imported: u64, skipped: u64, errors: u64) -> String {
    format!("processed={processed} imported={imported} skipped={skipped} errors={errors}")
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn status(&self, status: ContactStatus) -> String {
        let upper = status.as_str().to_ascii_uppercase();
        self.paint(status_color_code(status), &format!("[{upper}]"))
    }

    fn run_status(&self, status: &str) -> String {
        let code = match status {
            "completed" => "32",
            "partial" => "33",
            "failed" => "31",
            _ => "37",
        };
        self.paint(code, status)
    }
}

fn status_color_code(status: ContactStatus) -> &'static str {
    match status {
        ContactStatus::InTouch => "32",
        ContactStatus::OutOfTouch => "31",
        ContactStatus::Hidden => "90",
    }
}

#[cfg(test)]
#[path = "ui_tests.rs"]
mod tests;
