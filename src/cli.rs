use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default() | Effects::BOLD)
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(
    name = "networking",
    version,
    about = "Personal relationship manager: contacts, interactions, and sync jobs.",
    styles = cli_styles()
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "NETWORKING_DB_PATH",
        default_value = ".networking/networking.sqlite",
        help = "SQLite database path."
    )]
    pub db: String,

    #[arg(
        long,
        global = true,
        env = "NETWORKING_CONFIG",
        default_value = crate::config::DEFAULT_CONFIG_PATH,
        help = "TOML config file; a missing file means defaults."
    )]
    pub config: String,

    #[arg(
        short = 'u',
        long,
        global = true,
        env = "NETWORKING_USER",
        help = "Email of the user the command acts as."
    )]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Manage users.")]
    User(UserArgs),
    #[command(about = "Manage contacts.")]
    Contact(ContactArgs),
    #[command(about = "Record a quick touchpoint with a contact.")]
    Touch(TouchArgs),
    #[command(about = "Record or list interactions.")]
    Interaction(InteractionArgs),
    #[command(about = "Show due, frequent, and recent contacts.")]
    Dashboard(JsonArgs),
    #[command(about = "Import contacts from CSV or Trello exports.")]
    Import(ImportArgs),
    #[command(about = "Duplicate contact suggestions.")]
    Duplicates(DuplicatesArgs),
    #[command(about = "Google account linking and Gmail/Calendar sync.")]
    Google(GoogleArgs),
    #[command(about = "Generate demo contacts and interactions.")]
    Seed(SeedArgs),
    #[command(about = "Serve the JSON API.")]
    Serve(ServeArgs),
    #[command(about = "Print or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, Args)]
pub struct JsonArgs {
    #[arg(long, help = "Print JSON instead of the terminal view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum UserSubcommands {
    #[command(about = "Create a user, or update the name of an existing one.")]
    Add(UserAddArgs),
    #[command(about = "List users.")]
    List(JsonArgs),
}

#[derive(Debug, Args)]
pub struct UserAddArgs {
    pub email: String,

    #[arg(short = 'n', long, help = "Display name.")]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct ContactArgs {
    #[command(subcommand)]
    pub command: ContactSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ContactSubcommands {
    #[command(about = "Create a contact.")]
    Add(ContactAddArgs),
    #[command(about = "List contacts, optionally by status.")]
    List(ContactListArgs),
    #[command(about = "Show one contact with emails, phones, and interactions.")]
    Show(ContactShowArgs),
    #[command(about = "Delete a contact.")]
    Delete(ContactIdArgs),
    #[command(about = "Make a contact due more often, less often, or hide it.")]
    Frequency(ContactFrequencyArgs),
}

#[derive(Debug, Args)]
pub struct ContactAddArgs {
    pub name: String,

    #[arg(short = 'd', long, help = "Free-form description.")]
    pub description: Option<String>,

    #[arg(
        short = 'f',
        long = "frequency",
        help = "Desired contact frequency in days; omit to keep the contact hidden."
    )]
    pub frequency_in_days: Option<i64>,

    #[arg(short = 'e', long = "email", help = "Email address (repeatable).")]
    pub emails: Vec<String>,

    #[arg(long, help = "LinkedIn profile URL.")]
    pub linkedin: Option<String>,

    #[arg(long, help = "Twitter profile URL.")]
    pub twitter: Option<String>,
}

#[derive(Debug, Args)]
pub struct ContactListArgs {
    #[arg(
        short = 's',
        long,
        help = "Status name or code: in_touch|0, out_of_touch|1, hidden|2."
    )]
    pub status: Option<String>,

    #[arg(long, help = "Print JSON instead of the terminal view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ContactShowArgs {
    pub id: i64,

    #[arg(long, help = "Print JSON instead of the terminal view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ContactIdArgs {
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct ContactFrequencyArgs {
    pub id: i64,

    #[arg(help = "more-often, less-often, or hide.")]
    pub method: String,
}

#[derive(Debug, Args)]
pub struct TouchArgs {
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct InteractionArgs {
    #[command(subcommand)]
    pub command: InteractionSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum InteractionSubcommands {
    #[command(about = "Record an interaction with one or more contacts.")]
    Add(InteractionAddArgs),
    #[command(about = "List interactions, newest first.")]
    List(JsonArgs),
    #[command(about = "List known interaction types.")]
    Types(JsonArgs),
}

#[derive(Debug, Args)]
pub struct InteractionAddArgs {
    pub title: String,

    #[arg(
        short = 'c',
        long = "contact",
        required = true,
        help = "Contact id (repeatable)."
    )]
    pub contacts: Vec<i64>,

    #[arg(short = 'd', long, help = "Free-form description.")]
    pub description: Option<String>,

    #[arg(short = 't', long = "type", help = "Interaction type key.")]
    pub type_key: Option<String>,

    #[arg(long, help = "RFC3339 time of the interaction (defaults to now).")]
    pub was_at: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(subcommand)]
    pub command: ImportSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ImportSubcommands {
    #[command(about = "Import contacts from a CSV file.")]
    Csv(CsvImportArgs),
    #[command(about = "Import cards and comments from a Trello board export.")]
    Trello(TrelloImportArgs),
    #[command(about = "Show import and sync run statuses.")]
    Status(JsonArgs),
}

#[derive(Debug, Args)]
pub struct CsvImportArgs {
    pub file: String,

    #[arg(long, default_value = "name", help = "Column holding the contact name.")]
    pub name_column: String,

    #[arg(long, default_value = "email", help = "Column holding the email address.")]
    pub email_column: String,

    #[arg(long, help = "Count rows without writing.")]
    pub dry_run: bool,

    #[arg(long, help = "Print JSON instead of the terminal view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TrelloImportArgs {
    pub file: String,

    #[arg(long, help = "Count cards without writing.")]
    pub dry_run: bool,

    #[arg(long, help = "Print JSON instead of the terminal view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DuplicatesArgs {
    #[command(subcommand)]
    pub command: DuplicatesSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum DuplicatesSubcommands {
    #[command(about = "Recompute duplicate suggestions for the user.")]
    Compute(DuplicatesComputeArgs),
}

#[derive(Debug, Args)]
pub struct DuplicatesComputeArgs {
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Drop pairs scoring below this ratio (0.0 to below 1.0)."
    )]
    pub min_similarity: f64,

    #[arg(long, help = "Print JSON instead of the terminal view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct GoogleArgs {
    #[command(subcommand)]
    pub command: GoogleSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum GoogleSubcommands {
    #[command(about = "Store OAuth tokens for the user's Google account.")]
    Link(GoogleLinkArgs),
    #[command(about = "Sync Gmail and Calendar into interactions.")]
    Sync(GoogleSyncArgs),
}

#[derive(Debug, Args)]
pub struct GoogleLinkArgs {
    pub account_email: String,

    #[arg(long, env = "NETWORKING_GOOGLE_ACCESS_TOKEN", help = "OAuth access token.")]
    pub access_token: String,

    #[arg(
        long,
        env = "NETWORKING_GOOGLE_REFRESH_TOKEN",
        help = "OAuth refresh token; kept from the previous link when omitted."
    )]
    pub refresh_token: Option<String>,

    #[arg(long, help = "RFC3339 expiry of the access token.")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Args)]
pub struct GoogleSyncArgs {
    #[arg(long, help = "Sync every linked account instead of only --user.")]
    pub all: bool,

    #[arg(long, help = "Print JSON instead of the terminal view.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[arg(long, default_value_t = 100, help = "Contacts to create.")]
    pub contacts: usize,

    #[arg(long, default_value_t = 100, help = "Interactions per contact.")]
    pub interactions: usize,

    #[arg(long, default_value_t = 1, help = "Seed for the name and date generator.")]
    pub seed: u64,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(short = 'b', long, help = "Bind address; overrides [server] bind.")]
    pub bind: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name; detected from $SHELL when omitted.")]
    pub shell: Option<String>,

    #[arg(long, help = "Write the script to the shell's completion directory.")]
    pub install: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
