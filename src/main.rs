mod app;
mod cli;
mod completions;
mod config;
mod db;
mod domain;
mod duplicates;
mod google;
mod imports;
mod seed;
mod ui;
mod web;

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "networking=info,tower_http=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::{
        Commands, ContactSubcommands, DuplicatesSubcommands, GoogleSubcommands,
        ImportSubcommands, InteractionSubcommands, UserSubcommands,
    };

    let cli = cli::Cli::parse();
    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let config = config::Config::load(Path::new(&cli.config))?;
    let app = app::App::open(&cli.db, config)?;
    let user_email = cli.user.as_deref();

    match cli.command {
        Commands::User(args) => match args.command {
            UserSubcommands::Add(add) => {
                let user = app.ensure_user(&add.email, add.name.as_deref())?;
                println!("user #{} {}", user.id, user.email);
            }
            UserSubcommands::List(out) => {
                let users = app.list_users()?;
                if out.json {
                    print_json(&users);
                } else {
                    ui::print_users(&users);
                }
            }
        },
        Commands::Contact(args) => {
            let user_id = current_user(&app, user_email)?;
            match args.command {
                ContactSubcommands::Add(add) => {
                    let contact = app.create_contact(
                        user_id,
                        app::NewContact {
                            name: add.name,
                            description: add.description,
                            frequency_in_days: add.frequency_in_days,
                            linkedin_url: add.linkedin,
                            twitter_url: add.twitter,
                            emails: add.emails,
                        },
                    )?;
                    println!("created contact #{} {}", contact.id, contact.name);
                }
                ContactSubcommands::List(list) => {
                    let contacts = app.list_contacts_by_status(user_id, list.status.as_deref())?;
                    if list.json {
                        print_json(&contacts);
                    } else {
                        ui::print_contact_list(&contacts);
                    }
                }
                ContactSubcommands::Show(show) => {
                    let detail = app.contact_detail(user_id, show.id)?;
                    if show.json {
                        print_json(&detail);
                    } else {
                        ui::print_contact_detail(&detail);
                    }
                }
                ContactSubcommands::Delete(target) => {
                    app.delete_contact(user_id, target.id)?;
                    println!("deleted contact #{}", target.id);
                }
                ContactSubcommands::Frequency(change) => {
                    let contact = app.change_frequency(user_id, change.id, &change.method)?;
                    match contact.frequency_in_days {
                        Some(days) => println!("contact #{} every {} day(s)", contact.id, days),
                        None => println!("contact #{} hidden", contact.id),
                    }
                }
            }
        }
        Commands::Touch(args) => {
            let user_id = current_user(&app, user_email)?;
            let interaction = app.add_touchpoint(user_id, args.id)?;
            println!("touchpoint #{} recorded at {}", interaction.id, interaction.was_at);
        }
        Commands::Interaction(args) => {
            let user_id = current_user(&app, user_email)?;
            match args.command {
                InteractionSubcommands::Add(add) => {
                    let interaction = app.create_interaction(
                        user_id,
                        app::NewInteraction {
                            title: add.title,
                            description: add.description,
                            was_at: add.was_at,
                            contact_ids: add.contacts,
                            type_key: add.type_key,
                        },
                    )?;
                    println!("created interaction #{} {}", interaction.id, interaction.title);
                }
                InteractionSubcommands::List(out) => {
                    let interactions = app.list_interactions(user_id)?;
                    if out.json {
                        print_json(&interactions);
                    } else {
                        ui::print_interactions(&interactions);
                    }
                }
                InteractionSubcommands::Types(out) => {
                    let types = app.list_interaction_types()?;
                    if out.json {
                        print_json(&types);
                    } else {
                        ui::print_interaction_types(&types);
                    }
                }
            }
        }
        Commands::Dashboard(out) => {
            let user_id = current_user(&app, user_email)?;
            let view = app.dashboard(user_id)?;
            if out.json {
                print_json(&view);
            } else {
                ui::print_dashboard(&view);
            }
        }
        Commands::Import(args) => {
            let user_id = current_user(&app, user_email)?;
            match args.command {
                ImportSubcommands::Csv(csv) => {
                    let options = imports::CsvImportOptions {
                        name_column: csv.name_column,
                        email_column: csv.email_column,
                        dry_run: csv.dry_run,
                    };
                    let summary = app.import_csv_file(user_id, &csv.file, &options)?;
                    print_import(&summary, csv.json);
                }
                ImportSubcommands::Trello(trello) => {
                    let summary = app.import_trello_file(user_id, &trello.file, trello.dry_run)?;
                    print_import(&summary, trello.json);
                }
                ImportSubcommands::Status(out) => {
                    let statuses = app.import_statuses(user_id)?;
                    if out.json {
                        print_json(&statuses);
                    } else {
                        ui::print_run_statuses(&statuses);
                    }
                }
            }
        }
        Commands::Duplicates(args) => {
            let user_id = current_user(&app, user_email)?;
            match args.command {
                DuplicatesSubcommands::Compute(compute) => {
                    let summary = app.compute_duplicates(user_id, compute.min_similarity)?;
                    if compute.json {
                        print_json(&summary);
                    } else {
                        ui::print_duplicate_summary(&summary);
                    }
                }
            }
        }
        Commands::Google(args) => match args.command {
            GoogleSubcommands::Link(link) => {
                let user_id = current_user(&app, user_email)?;
                let credential = app.link_google(
                    user_id,
                    &link.account_email,
                    &link.access_token,
                    link.refresh_token.as_deref(),
                    link.expires_at.as_deref(),
                )?;
                println!("linked google account {}", credential.account_email);
                if !credential.has_refresh_token() {
                    println!("no refresh token stored; sync will need re-auth once the token expires");
                }
            }
            GoogleSubcommands::Sync(sync) => {
                let user_id = if sync.all {
                    None
                } else {
                    Some(current_user(&app, user_email)?)
                };
                let summaries = app.sync_google(user_id)?;
                if sync.json {
                    print_json(&summaries);
                } else {
                    ui::print_sync_summaries(&summaries);
                }
            }
        },
        Commands::Seed(args) => {
            let user_id = current_user(&app, user_email)?;
            let summary = app.seed(
                user_id,
                &seed::SeedOptions {
                    contacts: args.contacts,
                    interactions_per_contact: args.interactions,
                    seed: args.seed,
                },
            )?;
            println!(
                "seeded {} contact(s) and {} interaction(s)",
                summary.contacts_created, summary.interactions_created
            );
        }
        Commands::Serve(args) => {
            let user_id = current_user(&app, user_email)?;
            let bind = args
                .bind
                .unwrap_or_else(|| app.config().server.bind.clone());
            let state = web::WebState::new(app, user_id);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::serve(state, &bind))?;
        }
        Commands::Completions(_) => {}
    }
    Ok(())
}

fn current_user(app: &app::App, email: Option<&str>) -> Result<i64, app::AppError> {
    let email = email.ok_or_else(|| {
        app::AppError::InvalidArgument(
            "no user selected; pass --user or set NETWORKING_USER".to_string(),
        )
    })?;
    Ok(app.require_user(email)?.id)
}

fn print_import(summary: &imports::ImportSummary, json: bool) {
    if json {
        print_json(summary);
    } else {
        ui::print_import_summary(summary);
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
